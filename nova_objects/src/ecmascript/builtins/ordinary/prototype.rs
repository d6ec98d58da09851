// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Prototype objects
//!
//! An object used as the prototype of another gets a Map of its own: prototype
//! Maps are never shared and never record transitions, so code that checks a
//! prototype's shape only has to watch that one Map. Changing the shape of a
//! prototype deoptimizes such code through
//! [`DependencyGroup::PrototypeCheck`](super::dependent_code::DependencyGroup).

use super::{
    is_access_allowed,
    map::{Map, MapFlags},
    map_transitions::{copy, set_prototype, transition_to_prototype},
    migration::{migrate_slow_to_fast, migrate_to_map, publish_map},
};
use crate::ecmascript::{
    abstract_operations::operations_on_objects::report_failed_access_check,
    execution::{Agent, ExceptionType, JsResult, ShouldThrow, embedder::AccessType},
    types::{Object, OrdinaryObject},
};

/// Give `object` an unshared prototype Map. A dictionary-mode prototype is
/// made fast first.
pub fn optimize_as_prototype(agent: &mut Agent, object: OrdinaryObject) {
    if object.map(agent).is_prototype_map(agent) {
        return;
    }
    migrate_slow_to_fast(agent, object, 0, "OptimizeAsPrototype");
    let map = object.map(agent);
    let new_map = if map.is_dictionary_map(agent) {
        // The global object, or a dictionary too large to be made fast.
        Map::copy_drop_descriptors(agent, map)
    } else {
        copy(agent, map, "CopyAsPrototype")
    };
    new_map.set_flag(&mut agent.heap, MapFlags::PROTOTYPE_MAP, true);
    if new_map.is_dictionary_map(agent) {
        publish_map(agent, object, new_map);
    } else {
        migrate_to_map(agent, object, new_map, 0);
    }
    log::trace!("[optimized {object:?} as a prototype with {new_map:?}]");
}

/// Called after a prototype's properties changed in a way that may have
/// left it in dictionary mode. Prototypes are kept fast.
pub(crate) fn reoptimize_if_prototype(agent: &mut Agent, object: OrdinaryObject) {
    let map = object.map(agent);
    if !map.is_prototype_map(agent) || object.has_fast_properties(agent) {
        return;
    }
    migrate_slow_to_fast(agent, object, 0, "ReoptimizeAsPrototype");
}

fn fail(agent: &mut Agent, should_throw: ShouldThrow, message: &'static str) -> JsResult<bool> {
    match should_throw {
        ShouldThrow::ThrowOnError => Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            message,
        )),
        ShouldThrow::DontThrow => Ok(false),
    }
}

/// ### [10.1.2.1 OrdinarySetPrototypeOf ( O, V )](https://tc39.es/ecma262/#sec-ordinarysetprototypeof)
///
/// Objects with the same Map and the same new prototype end up sharing the
/// resulting Map through the prototype transition cache.
pub fn set_prototype_of(
    agent: &mut Agent,
    o: OrdinaryObject,
    v: Option<Object>,
    should_throw: ShouldThrow,
) -> JsResult<bool> {
    if !is_access_allowed(agent, o) {
        report_failed_access_check(agent, o, AccessType::Set)?;
        return Ok(false);
    }

    // 1. Let current be O.[[Prototype]].
    let current = o.prototype(agent);

    // 2. If SameValue(V, current) is true, return true.
    if v == current {
        return Ok(true);
    }

    // 3. Let extensible be O.[[Extensible]].
    // 4. If extensible is false, return false.
    if !o.map(agent).is_extensible(agent) {
        return fail(agent, should_throw, "#<Object> is not extensible");
    }

    // 5. Let p be V.
    let mut p = v;
    // 6. Let done be false.
    // 7. Repeat, while done is false,
    while let Some(p_inner) = p {
        // a. If p is null, then
        //     i. Set done to true.
        // b. Else if SameValue(p, O) is true, then
        if p_inner == o.into_object() {
            // i. Return false.
            return fail(agent, should_throw, "Cyclic __proto__ value");
        }
        // c. Else,
        //    i. If p.[[GetPrototypeOf]] is not the ordinary object internal method defined
        //       in 10.1.1, set done to true.
        //    ii. Else, set p to p.[[Prototype]].
        p = match p_inner {
            Object::Object(object) => object.prototype(agent),
            Object::Proxy(_) => None,
        };
    }

    // 8. Set O.[[Prototype]] to V.
    let map = o.map(agent);
    let new_map = if map.is_dictionary_map(agent) {
        // Dictionary Maps are never shared through transitions.
        let new_map = Map::copy_drop_descriptors(agent, map);
        set_prototype(agent, new_map, v);
        publish_map(agent, o, new_map);
        new_map
    } else {
        let new_map = transition_to_prototype(agent, map, v);
        migrate_to_map(agent, o, new_map, 0);
        new_map
    };
    log::trace!("[set prototype of {o:?}: {map:?} -> {new_map:?}]");

    // 9. Return true.
    Ok(true)
}
