// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Map transitions
//!
//! Deriving a new Map from an existing one. Every structural change an
//! object goes through (adding a property, changing an accessor, moving to a
//! more general elements kind, becoming non-extensible, changing prototype)
//! first looks for an existing transition out of the current Map and only
//! creates a new Map when none fits. New Maps are connected to their parent
//! so that the next object making the same change finds them.
//!
//! Maps whose transitions are not recorded ("omitted") are free-floating:
//! prototype Maps, Maps created once the transition table is full, and the
//! copies made for normalization.

use super::{
    caches::search_with_cache,
    dependent_code::DependencyGroup,
    descriptor_array::{Accessor, AccessorPair, Descriptor, DescriptorArray, DescriptorValue, FieldType},
    elements_kind::{ElementsKind, FAST_ELEMENTS_KINDS, is_more_general_elements_kind_transition},
    map::{Map, MapFlags},
    map_updater::{prepare_for_data_property, update},
    property_details::{PropertyAttributes, PropertyKind, PropertyLocation, Representation},
    prototype::optimize_as_prototype,
    transitions::{
        SpecialTransition, TransitionKey, Transitions, can_have_more_transitions,
        get_prototype_transition, insert_transition, put_prototype_transition,
        search_property_transition, search_special,
    },
};
use crate::ecmascript::{
    execution::Agent,
    types::{Object, PropertyKey, Value},
};

/// Whether a derived Map is recorded as a transition of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionFlag {
    Insert,
    Omit,
}

/// Where a named store came from; keyed stores normalize sooner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOrigin {
    Named,
    MaybeKeyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationMode {
    ClearInObjectProperties,
    KeepInObjectProperties,
}

/// Record `child` as the transition of `parent` under `key`.
pub(crate) fn connect_transition(agent: &mut Agent, parent: Map, child: Map, key: TransitionKey) {
    if parent.back_pointer(agent).is_some() {
        parent.set_flag(&mut agent.heap, MapFlags::OWNS_DESCRIPTORS, false);
    } else {
        // A root Map keeps ownership: it has no descriptors it does not
        // itself use.
        debug_assert!(parent.owns_descriptors(agent));
    }
    agent.heap[child].back_pointer = Some(parent);
    if !parent.is_prototype_map(agent) {
        insert_transition(&mut agent.heap, parent, key, child);
        parent.deoptimize_dependent_code(agent, DependencyGroup::Transition);
    }
    child.trace(agent, "Transition");
}

/// Append `descriptor` to the descriptor array `map` owns and hand the array
/// over to a new child Map.
fn share_descriptor(agent: &mut Agent, map: Map, descriptor: Descriptor) -> Map {
    debug_assert!(map.owns_descriptors(agent));
    let result = Map::copy_drop_descriptors(agent, map);
    let descriptors = map.descriptors(agent);
    let nof = map.number_of_own_descriptors(agent);
    debug_assert_eq!(descriptors.number_of_descriptors(&agent.heap), nof);
    // The empty array is shared by every root Map and is never appended to.
    let descriptors = if nof == 0 {
        DescriptorArray::allocate(&mut agent.heap, Vec::with_capacity(1))
    } else {
        descriptors
    };
    let key = TransitionKey::property(
        descriptor.key,
        descriptor.details.kind(),
        descriptor.details.attributes(),
    );
    descriptors.append(&mut agent.heap, descriptor);
    result.initialize_descriptors(&mut agent.heap, descriptors);
    connect_transition(agent, map, result, key);
    result
}

/// Derive a Map from `map` using `descriptors` as its own descriptors.
///
/// Transitions are recorded only for non-prototype Maps when requested and
/// the transition table has room; an unrecorded copy has every field
/// generalized, as nothing will ever share it.
pub(crate) fn copy_replace_descriptors(
    agent: &mut Agent,
    map: Map,
    descriptors: DescriptorArray,
    flag: TransitionFlag,
    key: Option<TransitionKey>,
    reason: &str,
) -> Map {
    let result = Map::copy_drop_descriptors(agent, map);
    if !map.is_prototype_map(agent) {
        if flag == TransitionFlag::Insert
            && let Some(key) = key
            && can_have_more_transitions(agent, map)
        {
            result.initialize_descriptors(&mut agent.heap, descriptors);
            connect_transition(agent, map, result, key);
        } else {
            generalize_all_fields(agent, descriptors);
            result.initialize_descriptors(&mut agent.heap, descriptors);
        }
    } else {
        result.initialize_descriptors(&mut agent.heap, descriptors);
    }
    result.trace(agent, reason);
    result
}

/// Turn every field of `descriptors` into a `Tagged` field of type `Any`.
pub(crate) fn generalize_all_fields(agent: &mut Agent, descriptors: DescriptorArray) {
    let count = descriptors.number_of_descriptors(&agent.heap);
    for i in 0..count {
        let details = descriptors.get_details(&agent.heap, i);
        descriptors.set_details(
            &mut agent.heap,
            i,
            details.copy_with_representation(Representation::Tagged),
        );
        if details.location() == PropertyLocation::Field {
            descriptors.set_value(&mut agent.heap, i, DescriptorValue::Field(FieldType::Any));
        }
    }
}

/// Derive a Map that has `descriptor` appended to the descriptors of `map`.
pub(crate) fn copy_add_descriptor(
    agent: &mut Agent,
    map: Map,
    descriptor: Descriptor,
    flag: TransitionFlag,
) -> Map {
    // Share the descriptors only if the Map owns them and is not a root.
    if flag == TransitionFlag::Insert
        && map.owns_descriptors(agent)
        && map.back_pointer(agent).is_some()
        && can_have_more_transitions(agent, map)
    {
        return share_descriptor(agent, map, descriptor);
    }
    let nof = map.number_of_own_descriptors(agent);
    let new_descriptors = map.descriptors(agent).copy_up_to(&mut agent.heap, nof);
    let key = TransitionKey::property(
        descriptor.key,
        descriptor.details.kind(),
        descriptor.details.attributes(),
    );
    new_descriptors.append(&mut agent.heap, descriptor);
    copy_replace_descriptors(agent, map, new_descriptors, flag, Some(key), "CopyAddDescriptor")
}

/// Add `descriptor`, or replace the existing descriptor with the same key.
pub(crate) fn copy_insert_descriptor(
    agent: &mut Agent,
    map: Map,
    descriptor: Descriptor,
    flag: TransitionFlag,
) -> Map {
    match search_with_cache(agent, map, descriptor.key) {
        Some(index) => copy_replace_descriptor(agent, map, index, descriptor, flag),
        None => copy_add_descriptor(agent, map, descriptor, flag),
    }
}

pub(crate) fn copy_replace_descriptor(
    agent: &mut Agent,
    map: Map,
    index: usize,
    descriptor: Descriptor,
    flag: TransitionFlag,
) -> Map {
    let nof = map.number_of_own_descriptors(agent);
    let new_descriptors = map.descriptors(agent).copy_up_to(&mut agent.heap, nof);
    let key = TransitionKey::property(
        descriptor.key,
        descriptor.details.kind(),
        descriptor.details.attributes(),
    );
    new_descriptors.replace(&mut agent.heap, index, descriptor);
    copy_replace_descriptors(
        agent,
        map,
        new_descriptors,
        flag,
        Some(key),
        "CopyReplaceDescriptor",
    )
}

/// Reserved field slots left after a field was added to a Map with
/// `unused` free slots.
fn unused_after_adding_field(agent: &Agent, unused: u32) -> u32 {
    match unused.checked_sub(1) {
        Some(unused) => unused,
        None => agent.options.field_slack - 1,
    }
}

/// Derive a Map adding the data field `key`. Fails when the descriptor
/// ceiling is reached.
pub(crate) fn copy_with_field(
    agent: &mut Agent,
    map: Map,
    key: PropertyKey,
    field_type: FieldType,
    attributes: PropertyAttributes,
    representation: Representation,
    flag: TransitionFlag,
) -> Option<Map> {
    // Ensure the descriptor array does not get too big.
    if map.number_of_own_descriptors(agent) >= agent.options.max_number_of_descriptors {
        return None;
    }
    let index = map.next_free_property_index(&agent.heap);
    let descriptor = Descriptor::data_field(key, index, attributes, representation, field_type);
    let new_map = copy_add_descriptor(agent, map, descriptor, flag);
    let unused = unused_after_adding_field(agent, new_map.unused_property_fields(agent));
    agent.heap[new_map].unused_property_fields = unused;
    Some(new_map)
}

/// Derive a Map adding the data constant `key`.
pub(crate) fn copy_with_constant(
    agent: &mut Agent,
    map: Map,
    key: PropertyKey,
    value: Value,
    attributes: PropertyAttributes,
    flag: TransitionFlag,
) -> Option<Map> {
    if map.number_of_own_descriptors(agent) >= agent.options.max_number_of_descriptors {
        return None;
    }
    let descriptor = Descriptor::data_constant(key, value, attributes);
    Some(copy_add_descriptor(agent, map, descriptor, flag))
}

/// Connect a child of `map` that owns the first `new_descriptor + 1`
/// entries of `descriptors`.
pub(crate) fn copy_install_descriptors(
    agent: &mut Agent,
    map: Map,
    new_descriptor: usize,
    descriptors: DescriptorArray,
) -> Map {
    let result = Map::copy_drop_descriptors(agent, map);
    {
        let record = &mut agent.heap[result];
        record.descriptors = descriptors;
        record.number_of_own_descriptors = new_descriptor as u32 + 1;
    }
    let descriptor = *descriptors.get(&agent.heap, new_descriptor);
    let mut unused = map.unused_property_fields(agent);
    if descriptor.details.location() == PropertyLocation::Field {
        unused = unused_after_adding_field(agent, unused);
    }
    agent.heap[result].unused_property_fields = unused;
    let key = TransitionKey::property(
        descriptor.key,
        descriptor.details.kind(),
        descriptor.details.attributes(),
    );
    connect_transition(agent, map, result, key);
    result
}

/// Copy of `map` with the same descriptors, for a special transition.
pub(crate) fn copy_for_transition(agent: &mut Agent, map: Map) -> Map {
    let new_map = Map::copy_drop_descriptors(agent, map);
    if map.owns_descriptors(agent) {
        // The properties did not change, so the descriptors are shared and
        // their ownership moves to the new Map.
        let descriptors = map.descriptors(agent);
        new_map.initialize_descriptors(&mut agent.heap, descriptors);
    } else {
        // Force a split by copying the descriptors.
        let nof = map.number_of_own_descriptors(agent);
        let descriptors = map.descriptors(agent).copy_up_to(&mut agent.heap, nof);
        new_map.initialize_descriptors(&mut agent.heap, descriptors);
    }
    new_map
}

/// An unconnected copy of `map` with its own copy of the descriptors.
pub fn copy(agent: &mut Agent, map: Map, reason: &str) -> Map {
    let nof = map.number_of_own_descriptors(agent);
    let descriptors = map.descriptors(agent).copy_up_to(&mut agent.heap, nof);
    copy_replace_descriptors(agent, map, descriptors, TransitionFlag::Omit, None, reason)
}

/// The elements-kind transition out of `map`, if any.
fn elements_transition_map(agent: &Agent, map: Map) -> Option<Map> {
    match &agent.heap[map].transitions {
        Transitions::None => None,
        transitions => transitions.iter().find_map(|(key, target)| match key {
            TransitionKey::Special(SpecialTransition::ElementsKind(_)) => Some(target),
            _ => None,
        }),
    }
}

/// Follow elements-kind transitions from `map` towards `to_kind` as far as
/// they exist.
fn find_closest_elements_transition(agent: &Agent, map: Map, to_kind: ElementsKind) -> Map {
    let mut current = map;
    let mut kind = map.elements_kind(agent);
    while kind != to_kind {
        let Some(next) = elements_transition_map(agent, current) else {
            return current;
        };
        kind = next.elements_kind(agent);
        current = next;
    }
    current
}

/// The existing Map reached from `map` through elements-kind transitions to
/// `to_kind`.
pub fn lookup_elements_transition_map(agent: &Agent, map: Map, to_kind: ElementsKind) -> Option<Map> {
    let closest = find_closest_elements_transition(agent, map, to_kind);
    (closest.elements_kind(agent) == to_kind).then_some(closest)
}

fn next_transition_elements_kind(kind: ElementsKind) -> Option<ElementsKind> {
    let position = FAST_ELEMENTS_KINDS.iter().position(|k| *k == kind)?;
    FAST_ELEMENTS_KINDS.get(position + 1).copied()
}

fn add_missing_elements_transitions(agent: &mut Agent, map: Map, to_kind: ElementsKind) -> Map {
    let mut current = map;
    let mut kind = map.elements_kind(agent);
    let flag = if map.is_prototype_map(agent) {
        TransitionFlag::Omit
    } else {
        if kind.is_fast() {
            while kind != to_kind {
                let Some(next) = next_transition_elements_kind(kind) else {
                    break;
                };
                kind = next;
                current = copy_as_elements_kind(agent, current, kind, TransitionFlag::Insert);
            }
        }
        TransitionFlag::Insert
    };
    // Leaving the fast kinds: add the final Map at the end of the chain.
    if kind != to_kind {
        current = copy_as_elements_kind(agent, current, to_kind, flag);
    }
    current
}

pub(crate) fn copy_as_elements_kind(
    agent: &mut Agent,
    map: Map,
    kind: ElementsKind,
    flag: TransitionFlag,
) -> Map {
    let insert_transition = flag == TransitionFlag::Insert
        && can_have_more_transitions(agent, map)
        && elements_transition_map(agent, map).is_none();
    if insert_transition {
        let new_map = copy_for_transition(agent, map);
        new_map.set_elements_kind(&mut agent.heap, kind);
        connect_transition(
            agent,
            map,
            new_map,
            TransitionKey::Special(SpecialTransition::ElementsKind(kind)),
        );
        return new_map;
    }
    // A free-floating Map, as the transition may not be stored.
    let new_map = copy(agent, map, "CopyAsElementsKind");
    new_map.set_elements_kind(&mut agent.heap, kind);
    new_map
}

/// The Map like `map` but with elements kind `kind`, following or creating
/// elements-kind transitions.
pub fn as_elements_kind(agent: &mut Agent, map: Map, kind: ElementsKind) -> Map {
    let closest = find_closest_elements_transition(agent, map, kind);
    if closest.elements_kind(agent) == kind {
        return closest;
    }
    add_missing_elements_transitions(agent, closest, kind)
}

/// The Map an object with `map` moves to when its elements become `to_kind`.
pub(crate) fn transition_elements_to(agent: &mut Agent, map: Map, to_kind: ElementsKind) -> Map {
    let from_kind = map.elements_kind(agent);
    if from_kind == to_kind {
        return map;
    }
    // Arrays on the initial array Map use the cached Maps.
    if agent.caches.initial_array_map(from_kind) == Some(map)
        && let Some(cached) = agent.caches.initial_array_map(to_kind)
    {
        return cached;
    }
    if map.is_dictionary_map(agent) {
        let new_map = copy(agent, map, "CopyAsElementsKind");
        new_map.set_elements_kind(&mut agent.heap, to_kind);
        return new_map;
    }
    let mut allow_store_transition = from_kind.is_fast();
    if to_kind.is_fast() {
        allow_store_transition =
            allow_store_transition && is_more_general_elements_kind_transition(from_kind, to_kind);
    }
    if !allow_store_transition {
        return copy_as_elements_kind(agent, map, to_kind, TransitionFlag::Omit);
    }
    as_elements_kind(agent, map, to_kind)
}

/// The Map `map` leads to through the integrity transition `special`,
/// created on first use.
pub(crate) fn transition_to_integrity_level(
    agent: &mut Agent,
    map: Map,
    special: SpecialTransition,
    reason: &str,
) -> Map {
    debug_assert!(special.is_integrity_level());
    if let Some(target) = search_special(&agent.heap, map, special) {
        return target;
    }
    let new_map = copy_for_prevent_extensions(agent, map, special, reason);
    if special == SpecialTransition::Strong {
        new_map.set_flag(&mut agent.heap, MapFlags::STRONG, true);
    }
    new_map
}

/// A non-extensible copy of `map` with the attributes of `special` added to
/// every property, connected through `special`.
fn copy_for_prevent_extensions(
    agent: &mut Agent,
    map: Map,
    special: SpecialTransition,
    reason: &str,
) -> Map {
    let nof = map.number_of_own_descriptors(agent);
    let descriptors = map.descriptors(agent);
    let new_descriptors =
        descriptors.copy_up_to_add_attributes(agent, nof, special.added_attributes());
    let new_map = copy_replace_descriptors(
        agent,
        map,
        new_descriptors,
        TransitionFlag::Insert,
        Some(TransitionKey::Special(special)),
        reason,
    );
    new_map.set_flag(&mut agent.heap, MapFlags::EXTENSIBLE, false);
    // Typed array elements live in the buffer and keep their kind.
    if !map.elements_kind(agent).is_typed_array() {
        new_map.set_elements_kind(&mut agent.heap, ElementsKind::Dictionary);
    }
    new_map
}

/// A dictionary-mode copy of `map`.
pub(crate) fn copy_normalized(agent: &mut Agent, map: Map, mode: NormalizationMode) -> Map {
    let in_object = match mode {
        NormalizationMode::ClearInObjectProperties => 0,
        NormalizationMode::KeepInObjectProperties => map.in_object_properties(agent),
    };
    let result = Map::raw_copy(agent, map, in_object);
    let record = &mut agent.heap[result];
    record.unused_property_fields = 0;
    record.flags.set(MapFlags::DICTIONARY_MAP, true);
    record.flags.set(MapFlags::STABLE, false);
    result
}

/// The dictionary-mode Map for objects leaving fast mode from `fast_map`.
pub fn normalize(agent: &mut Agent, fast_map: Map, mode: NormalizationMode, reason: &str) -> Map {
    debug_assert!(!fast_map.is_dictionary_map(agent));
    let keep_in_object = mode == NormalizationMode::KeepInObjectProperties;
    let use_cache = !fast_map.is_prototype_map(agent);
    let cached = if use_cache {
        agent
            .caches
            .get_normalized(&agent.heap, fast_map, keep_in_object)
    } else {
        None
    };
    let new_map = match cached {
        Some(map) => map,
        None => {
            let map = copy_normalized(agent, fast_map, mode);
            if use_cache {
                agent.caches.set_normalized(&agent.heap, fast_map, map);
            }
            map
        }
    };
    fast_map.notify_leaf_map_layout_change(agent);
    log::debug!("[Normalize {:?} -> {:?}: {reason}]", fast_map.0, new_map.0);
    new_map.trace(agent, reason);
    new_map
}

/// Returns true if adding one more out-of-object field should normalize
/// the object instead.
pub(crate) fn too_many_fast_properties(agent: &Agent, map: Map, origin: StoreOrigin) -> bool {
    if map.unused_property_fields(agent) != 0 {
        return false;
    }
    if map.is_prototype_map(agent) {
        return false;
    }
    let minimum = match origin {
        StoreOrigin::Named => agent.options.max_fast_properties,
        StoreOrigin::MaybeKeyed => agent.options.fast_properties_soft_limit,
    };
    let in_object = map.in_object_properties(agent);
    let limit = minimum.max(in_object);
    let external = map.number_of_fields(&agent.heap).saturating_sub(in_object);
    external > limit
}

/// The Map of an object with `map` after adding the data property `key`
/// holding `value`.
pub fn transition_to_data_property(
    agent: &mut Agent,
    map: Map,
    key: PropertyKey,
    value: Value,
    attributes: PropertyAttributes,
    origin: StoreOrigin,
) -> Map {
    // Dictionary Maps can always have additional data properties.
    if map.is_dictionary_map(agent) {
        return map;
    }
    // Migrate to the newest Map before storing the property.
    let map = update(agent, map);
    if let Some(transition) =
        search_property_transition(&agent.heap, map, key, PropertyKind::Data, attributes)
    {
        let descriptor = transition
            .last_added(&agent.heap)
            .expect("property transition without descriptors");
        return prepare_for_data_property(agent, transition, descriptor, value);
    }
    let new_map = if value.is_callable(agent) {
        copy_with_constant(agent, map, key, value, attributes, TransitionFlag::Insert)
    } else if !too_many_fast_properties(agent, map, origin) {
        let representation = Representation::for_value(value);
        let field_type = FieldType::optimal_for(agent, value, representation);
        copy_with_field(
            agent,
            map,
            key,
            field_type,
            attributes,
            representation,
            TransitionFlag::Insert,
        )
    } else {
        None
    };
    match new_map {
        Some(new_map) => new_map,
        None => normalize(
            agent,
            map,
            NormalizationMode::ClearInObjectProperties,
            "TooManyFastProperties",
        ),
    }
}

/// The Map of an object with `map` after installing the accessor pair
/// `pair` as property `key`.
pub fn transition_to_accessor_property(
    agent: &mut Agent,
    map: Map,
    key: PropertyKey,
    pair: AccessorPair,
    attributes: PropertyAttributes,
) -> Map {
    // Dictionary Maps can always have additional accessor properties.
    if map.is_dictionary_map(agent) {
        return map;
    }
    // Migrate to the newest Map before transitioning to the new property.
    let map = update(agent, map);
    let mode = if map.is_prototype_map(agent) {
        NormalizationMode::KeepInObjectProperties
    } else {
        NormalizationMode::ClearInObjectProperties
    };
    if let Some(transition) =
        search_property_transition(&agent.heap, map, key, PropertyKind::Accessor, attributes)
    {
        let descriptor = transition
            .last_added(&agent.heap)
            .expect("property transition without descriptors");
        let value = transition.descriptors(agent).get_value(&agent.heap, descriptor);
        return match value {
            DescriptorValue::Accessor(Accessor::Pair(existing)) if existing == pair => transition,
            DescriptorValue::Accessor(Accessor::Pair(_)) => {
                normalize(agent, map, mode, "TransitionToDifferentAccessor")
            }
            _ => normalize(agent, map, mode, "TransitionToAccessorFromNonPair"),
        };
    }
    if let Some(descriptor) = search_with_cache(agent, map, key) {
        if Some(descriptor) != map.last_added(&agent.heap) {
            return normalize(agent, map, mode, "AccessorsOverwritingNonLast");
        }
        let details = map.descriptors(agent).get_details(&agent.heap, descriptor);
        if details.kind() != PropertyKind::Accessor
            || details.location() != PropertyLocation::Descriptor
        {
            return normalize(agent, map, mode, "AccessorsOverwritingNonAccessors");
        }
        if details.attributes() != attributes {
            return normalize(agent, map, mode, "AccessorsWithAttributes");
        }
        let DescriptorValue::Accessor(Accessor::Pair(current)) =
            map.descriptors(agent).get_value(&agent.heap, descriptor)
        else {
            return normalize(agent, map, mode, "AccessorsOverwritingNonPair");
        };
        if current == pair {
            return map;
        }
        // Only components that were never set may be filled in.
        let compatible = (current.getter.is_none() || current.getter == pair.getter)
            && (current.setter.is_none() || current.setter == pair.setter);
        if !compatible {
            return normalize(agent, map, mode, "AccessorsOverwritingAccessors");
        }
    } else if map.number_of_own_descriptors(agent) >= agent.options.max_number_of_descriptors
        || too_many_fast_properties(agent, map, StoreOrigin::Named)
    {
        return normalize(
            agent,
            map,
            NormalizationMode::ClearInObjectProperties,
            "TooManyAccessors",
        );
    }
    let descriptor = Descriptor::accessor_constant(key, Accessor::Pair(pair), attributes);
    copy_insert_descriptor(agent, map, descriptor, TransitionFlag::Insert)
}

/// The Map of an object with `map` after its prototype changed to
/// `prototype`.
pub fn transition_to_prototype(agent: &mut Agent, map: Map, prototype: Option<Object>) -> Map {
    if let Some(cached) = get_prototype_transition(&agent.heap, map, prototype) {
        return cached;
    }
    let new_map = copy(agent, map, "TransitionToPrototype");
    put_prototype_transition(&mut agent.heap, map, prototype, new_map);
    set_prototype(agent, new_map, prototype);
    new_map
}

/// Install `prototype` on `map`, turning an ordinary prototype object into
/// a prototype-optimized one.
pub(crate) fn set_prototype(agent: &mut Agent, map: Map, prototype: Option<Object>) {
    if let Some(Object::Object(prototype)) = prototype {
        optimize_as_prototype(agent, prototype);
    }
    agent.heap[map].prototype = prototype;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::{
        builtins::ordinary::{
            elements_kind::INITIAL_OBJECT_ELEMENTS_KIND,
            map::InstanceType,
        },
        execution::Options,
    };

    fn root(agent: &mut Agent, in_object: u32) -> Map {
        Map::create_root(
            agent,
            InstanceType::Object,
            None,
            in_object,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        )
    }

    #[test]
    fn data_transitions_are_reused() {
        let mut agent = Agent::new(Options::default());
        let map = root(&mut agent, 2);
        let a = PropertyKey::from_str(&mut agent, "a");
        let first = transition_to_data_property(
            &mut agent,
            map,
            a,
            Value::Integer(1),
            PropertyAttributes::NONE,
            StoreOrigin::Named,
        );
        let second = transition_to_data_property(
            &mut agent,
            map,
            a,
            Value::Integer(2),
            PropertyAttributes::NONE,
            StoreOrigin::Named,
        );
        assert_eq!(first, second);
        assert_eq!(first.back_pointer(&agent), Some(map));
        assert_eq!(first.unused_property_fields(&agent), 1);
        assert_eq!(map.number_of_transitions(&agent), 1);
    }

    #[test]
    fn child_maps_share_descriptor_arrays() {
        let mut agent = Agent::new(Options::default());
        let map = root(&mut agent, 4);
        let a = PropertyKey::from_str(&mut agent, "a");
        let b = PropertyKey::from_str(&mut agent, "b");
        let with_a = transition_to_data_property(
            &mut agent,
            map,
            a,
            Value::Integer(1),
            PropertyAttributes::NONE,
            StoreOrigin::Named,
        );
        let with_b = transition_to_data_property(
            &mut agent,
            with_a,
            b,
            Value::Integer(1),
            PropertyAttributes::NONE,
            StoreOrigin::Named,
        );
        assert_eq!(with_a.descriptors(&agent), with_b.descriptors(&agent));
        assert!(!with_a.owns_descriptors(&agent));
        assert!(with_b.owns_descriptors(&agent));
        assert_eq!(with_a.number_of_own_descriptors(&agent), 1);
        assert_eq!(with_b.number_of_own_descriptors(&agent), 2);
    }

    #[test]
    fn out_of_object_fields_grow_by_slack() {
        let mut agent = Agent::new(Options::default());
        let mut map = root(&mut agent, 0);
        let a = PropertyKey::from_str(&mut agent, "a");
        map = transition_to_data_property(
            &mut agent,
            map,
            a,
            Value::Null,
            PropertyAttributes::NONE,
            StoreOrigin::Named,
        );
        assert_eq!(map.unused_property_fields(&agent), 2);
        assert_eq!(map.backing_store_capacity(&agent.heap), 3);
    }

    #[test]
    fn functions_become_constants() {
        let mut agent = Agent::new(Options::default());
        let map = root(&mut agent, 1);
        let f = crate::ecmascript::builtins::builtin_function::create_builtin_function(
            &mut agent,
            |_, _, _| Ok(Value::Undefined),
            "f",
            0,
        );
        let key = PropertyKey::from_str(&mut agent, "f");
        let new_map = transition_to_data_property(
            &mut agent,
            map,
            key,
            f.into_value(),
            PropertyAttributes::NONE,
            StoreOrigin::Named,
        );
        let details = new_map.descriptors(&agent).get_details(&agent.heap, 0);
        assert_eq!(details.location(), PropertyLocation::Descriptor);
        assert_eq!(new_map.unused_property_fields(&agent), 1);
    }

    #[test]
    fn elements_kind_chain_is_built_in_order() {
        let mut agent = Agent::new(Options::default());
        let map = Map::create_root(
            &mut agent,
            InstanceType::Array,
            None,
            0,
            ElementsKind::PackedSmi,
            None,
        );
        let double = as_elements_kind(&mut agent, map, ElementsKind::PackedDouble);
        assert_eq!(double.elements_kind(&agent), ElementsKind::PackedDouble);
        let holey_smi = lookup_elements_transition_map(&agent, map, ElementsKind::HoleySmi).unwrap();
        assert_eq!(double.back_pointer(&agent), Some(holey_smi));
        assert_eq!(as_elements_kind(&mut agent, map, ElementsKind::PackedDouble), double);
    }

    #[test]
    fn full_transition_tables_produce_generalized_copies() {
        let mut agent = Agent::new(Options {
            max_number_of_transitions: 2,
            ..Default::default()
        });
        let map = root(&mut agent, 4);
        let mut results = Vec::new();
        for i in 0..4 {
            let key = PropertyKey::from_str(&mut agent, &format!("p{i}"));
            results.push(transition_to_data_property(
                &mut agent,
                map,
                key,
                Value::Integer(i),
                PropertyAttributes::NONE,
                StoreOrigin::Named,
            ));
        }
        assert_eq!(map.number_of_transitions(&agent), 2);
        for free in &results[2..] {
            assert!(free.back_pointer(&agent).is_none());
            let details = free.descriptors(&agent).get_details(&agent.heap, 0);
            assert_eq!(details.representation(), Representation::Tagged);
        }
    }
}
