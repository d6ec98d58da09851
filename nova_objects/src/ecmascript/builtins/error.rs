// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::ordinary::{
    add_property, ordinary_object_create_from_map, property_details::PropertyAttributes,
};
use crate::ecmascript::{
    execution::{Agent, ExceptionType},
    types::{ObjectKind, OrdinaryObject, PropertyKey, String, Value},
};

/// ### [20.5.1.1 Error ( message \[ , options \] )](https://tc39.es/ecma262/#sec-error-message)
///
/// Create an Error object of the given type with an own `message`.
pub fn create_error_object(agent: &mut Agent, kind: ExceptionType, message: String) -> OrdinaryObject {
    // 2. Let O be ? OrdinaryCreateFromConstructor(newTarget, "%Error.prototype%", ...).
    let map = agent.intrinsics().error_map(kind);
    let error = ordinary_object_create_from_map(agent, map, ObjectKind::Error(kind));
    // 3. If message is not undefined, then
    // c. Perform CreateNonEnumerableDataPropertyOrThrow(O, "message", msg).
    let key = PropertyKey::from_str(agent, "message");
    add_property(
        agent,
        error,
        key,
        Value::String(message),
        PropertyAttributes::DONT_ENUM,
    );
    log::trace!("Created {} object", kind.name());
    error
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::execution::{JsError, Options};

    #[test]
    fn error_objects_share_a_map_per_type() {
        let mut agent = Agent::new(Options::default());
        let a = agent.throw_exception_with_static_message(ExceptionType::TypeError, "a");
        let b = agent.throw_exception_with_static_message(ExceptionType::TypeError, "b");
        let c = agent.throw_exception_with_static_message(ExceptionType::RangeError, "c");
        let map_of = |agent: &Agent, error: JsError| {
            error.value().as_object().unwrap().as_ordinary().unwrap().map(agent)
        };
        assert_eq!(map_of(&agent, a), map_of(&agent, b));
        assert_ne!(map_of(&agent, a), map_of(&agent, c));
        assert_eq!(b.message(&mut agent).as_deref(), Some("b"));
    }
}
