// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Map updater
//!
//! Reconfiguring a property of a fast-mode Map in place in the transition
//! tree: generalizing a field's representation or type, changing its
//! attributes or turning an accessor into a data field.
//!
//! The updater replays the old Map's properties from its root, reusing
//! existing transitions wherever they are compatible, merges the old and
//! target descriptors into the most general version of both, and then
//! splits the tree at the first Map where the merged descriptors diverge.
//! Everything hanging off the split point under the diverging key is
//! deprecated. When the tree cannot be repaired the result is a free
//! floating Map with every field generalized.

use super::{
    caches::search_with_cache,
    dependent_code::DependencyGroup,
    descriptor_array::{Descriptor, DescriptorArray, DescriptorValue, FieldType},
    elements_kind::{ElementsKind, is_more_general_elements_kind_transition},
    map::{Map, MapFlags},
    map_transitions::{
        TransitionFlag, as_elements_kind, copy_install_descriptors, copy_replace_descriptors,
        lookup_elements_transition_map, transition_to_integrity_level,
    },
    property_details::{
        PropertyAttributes, PropertyDetails, PropertyKind, PropertyLocation, Representation,
    },
    transitions::{
        SpecialTransition, TransitionKey, can_have_more_transitions, search_property_transition,
        search_special,
    },
};
use crate::{
    ecmascript::{
        execution::Agent,
        types::{PropertyKey, Value},
    },
    heap::Heap,
};

/// Whether the reconfigured property must end up in an object field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// The property is about to be written: it must be a field.
    ForceField,
    /// Only the Map is migrated; constants may stay in the descriptor.
    AllowInDescriptor,
}

/// Least upper bound of two field types.
fn generalize_field_type(type1: FieldType, type2: FieldType) -> FieldType {
    if type1.now_is(type2) {
        type2
    } else if type2.now_is(type1) {
        type1
    } else {
        FieldType::Any
    }
}

/// Field type of descriptor `index`, computed from the constant for a
/// descriptor-located data property.
fn field_type_of(
    agent: &Agent,
    descriptors: DescriptorArray,
    index: usize,
    representation: Representation,
) -> FieldType {
    match descriptors.get_value(&agent.heap, index) {
        DescriptorValue::Field(field_type) => field_type,
        DescriptorValue::Constant(value) => FieldType::optimal_for(agent, value, representation),
        DescriptorValue::Accessor(_) => FieldType::Any,
    }
}

/// Returns true if the descriptor-located values at `index` of both arrays
/// are identical.
fn equal_immutable_values(agent: &Agent, a: DescriptorArray, b: DescriptorArray, index: usize) -> bool {
    a.get_value(&agent.heap, index) == b.get_value(&agent.heap, index)
}

/// Rewrite the field type and representation of descriptor `index` in
/// `map` and every Map below it.
fn update_field_type(
    agent: &mut Agent,
    map: Map,
    index: usize,
    representation: Representation,
    field_type: FieldType,
) {
    let mut worklist = vec![map];
    while let Some(current) = worklist.pop() {
        let descriptors = current.descriptors(agent);
        if current.number_of_own_descriptors(agent) <= index {
            continue;
        }
        let details = descriptors.get_details(&agent.heap, index);
        if details.location() != PropertyLocation::Field {
            continue;
        }
        worklist.extend(agent.heap[current].transitions.iter().map(|(_, target)| target));
        // Representation may only change from None in place.
        debug_assert!(
            details.representation() == representation || details.representation().is_none()
        );
        let descriptor = *descriptors.get(&agent.heap, index);
        if descriptor.value == DescriptorValue::Field(field_type)
            && details.representation() == representation
        {
            // A shared descriptor array was already updated.
            continue;
        }
        let updated = Descriptor::data_field(
            descriptor.key,
            details.field_index(),
            details.attributes(),
            representation,
            field_type,
        );
        descriptors.replace(&mut agent.heap, index, updated);
    }
    agent.caches.clear_descriptor_lookup();
}

/// Generalize the field type of descriptor `index` of `map` to cover
/// `new_field_type`, updating the Map that owns the field and its subtree.
pub(crate) fn generalize_field(
    agent: &mut Agent,
    map: Map,
    index: usize,
    new_representation: Representation,
    new_field_type: FieldType,
) {
    let descriptors = map.descriptors(agent);
    let details = descriptors.get_details(&agent.heap, index);
    let old_representation = details.representation();
    let old_field_type = descriptors.get(&agent.heap, index).field_type();
    // Check if the field type needs to be generalized at all.
    if old_representation == new_representation && new_field_type.now_is(old_field_type) {
        return;
    }
    let field_owner = map.find_field_owner(&agent.heap, index);
    let new_field_type = generalize_field_type(old_field_type, new_field_type);
    update_field_type(agent, field_owner, index, new_representation, new_field_type);
    field_owner.deoptimize_dependent_code(agent, DependencyGroup::FieldType);
    log::debug!(
        "[generalizing field #{index}: {}{{{old_field_type:?}}} -> {}{{{new_field_type:?}}}]",
        old_representation.mnemonic(),
        new_representation.mnemonic(),
    );
}

/// A free-floating copy of `map` with every field generalized to
/// `Tagged`/`Any`. With [`StoreMode::ForceField`] descriptor `modify` is
/// additionally turned into a data field with `attributes`.
pub(crate) fn copy_generalize_all_representations(
    agent: &mut Agent,
    map: Map,
    modify: Option<usize>,
    store_mode: StoreMode,
    kind: PropertyKind,
    attributes: PropertyAttributes,
    reason: &str,
) -> Map {
    debug_assert_eq!(kind, PropertyKind::Data);
    let nof = map.number_of_own_descriptors(agent);
    let descriptors = map.descriptors(agent).copy_up_to(&mut agent.heap, nof);
    super::map_transitions::generalize_all_fields(agent, descriptors);
    let new_map = copy_replace_descriptors(agent, map, descriptors, TransitionFlag::Omit, None, reason);

    // Unless the instance is being migrated, ensure that modify is a field.
    if let Some(modify) = modify {
        let details = descriptors.get_details(&agent.heap, modify);
        let is_field =
            details.kind() == PropertyKind::Data && details.location() == PropertyLocation::Field;
        if store_mode == StoreMode::ForceField && (!is_field || details.attributes() != attributes)
        {
            let field_index = if is_field {
                details.field_index()
            } else {
                new_map.next_free_property_index(&agent.heap)
            };
            let key = descriptors.get_key(&agent.heap, modify);
            let descriptor = Descriptor::data_field(
                key,
                field_index,
                attributes,
                Representation::Tagged,
                FieldType::Any,
            );
            descriptors.replace(&mut agent.heap, modify, descriptor);
            if !is_field {
                let unused = match new_map.unused_property_fields(agent).checked_sub(1) {
                    Some(unused) => unused,
                    None => agent.options.field_slack - 1,
                };
                agent.heap[new_map].unused_property_fields = unused;
            }
        }
        log::debug!(
            "[generalizing all fields of map {:?} for property #{modify}: {reason}]",
            map.0
        );
    } else {
        log::debug!("[generalizing all fields of map {:?}: {reason}]", map.0);
    }
    new_map
}

/// Walk back over the integrity transitions `map` was reached through.
/// Returns the Map they start from and the transitions in the order they
/// were taken; the list is empty if `map` was not reached that way.
fn find_integrity_source(heap: &Heap, map: Map) -> (Map, Vec<SpecialTransition>) {
    let mut source = map;
    let mut integrity_transitions = Vec::new();
    while let Some(parent) = heap[source].back_pointer {
        let special = heap[parent]
            .transitions
            .iter()
            .find_map(|(key, target)| match key {
                TransitionKey::Special(special)
                    if target == source && special.is_integrity_level() =>
                {
                    Some(special)
                }
                _ => None,
            });
        let Some(special) = special else {
            break;
        };
        integrity_transitions.push(special);
        source = parent;
    }
    integrity_transitions.reverse();
    (source, integrity_transitions)
}

/// The Map objects with the deprecated `map` migrate to.
pub fn update(agent: &mut Agent, map: Map) -> Map {
    if !map.is_deprecated(agent) {
        return map;
    }
    reconfigure_property(
        agent,
        map,
        None,
        PropertyKind::Data,
        PropertyAttributes::NONE,
        Representation::None,
        FieldType::None,
        StoreMode::AllowInDescriptor,
    )
}

/// The up-to-date Map for the deprecated `old_map`, found without creating
/// any Map. Returns `None` if the transition tree has no such Map yet.
pub fn try_update(agent: &Agent, old_map: Map) -> Option<Map> {
    if !old_map.is_deprecated(agent) {
        return Some(old_map);
    }
    let (source, integrity_transitions) = find_integrity_source(&agent.heap, old_map);
    if !integrity_transitions.is_empty() {
        let mut new_map = try_update(agent, source)?;
        for special in integrity_transitions {
            new_map = search_special(&agent.heap, new_map, special)?;
        }
        return (!new_map.is_deprecated(agent)).then_some(new_map);
    }
    // Check the state of the root Map.
    let mut root_map = old_map.find_root_map(&agent.heap);
    if !old_map.equivalent_to_for_transition(&agent.heap, root_map) {
        return None;
    }
    let from_kind = root_map.elements_kind(agent);
    let to_kind = old_map.elements_kind(agent);
    if from_kind != to_kind {
        // Follow existing elements kind transitions only.
        root_map = lookup_elements_transition_map(agent, root_map, to_kind)?;
    }
    let root_nof = root_map.number_of_own_descriptors(agent);
    let old_nof = old_map.number_of_own_descriptors(agent);
    let old_descriptors = old_map.descriptors(agent);
    let mut new_map = root_map;
    for i in root_nof..old_nof {
        let old = *old_descriptors.get(&agent.heap, i);
        let old_details = old.details;
        new_map = search_property_transition(
            &agent.heap,
            new_map,
            old.key,
            old_details.kind(),
            old_details.attributes(),
        )?;
        let new_descriptors = new_map.descriptors(agent);
        let new = *new_descriptors.get(&agent.heap, i);
        let new_details = new.details;
        if !old_details
            .representation()
            .fits_into(new_details.representation())
        {
            return None;
        }
        match (new_details.kind(), new_details.location()) {
            (PropertyKind::Data, PropertyLocation::Field) => {
                let new_type = new.field_type();
                match old.value {
                    DescriptorValue::Field(old_type) => {
                        if !old_type.now_is(new_type) {
                            return None;
                        }
                    }
                    DescriptorValue::Constant(value) => {
                        if !new_type.now_contains(agent, value) {
                            return None;
                        }
                    }
                    DescriptorValue::Accessor(_) => return None,
                }
            }
            (PropertyKind::Accessor, PropertyLocation::Field) => return None,
            (_, PropertyLocation::Descriptor) => {
                if old_details.location() == PropertyLocation::Field || old.value != new.value {
                    return None;
                }
            }
        }
    }
    if new_map.number_of_own_descriptors(agent) != old_nof || new_map.is_deprecated(agent) {
        return None;
    }
    Some(new_map)
}

/// Requested shape of descriptor `index` while replaying `old_descriptors`.
struct Requested {
    kind: PropertyKind,
    attributes: PropertyAttributes,
    location: PropertyLocation,
    representation: Representation,
}

/// Reconfigure property `modify` of `old_map` to the given kind,
/// attributes, representation and field type, or, without `modify`,
/// rebuild a deprecated Map from its transition tree.
#[allow(clippy::too_many_arguments)]
pub(crate) fn reconfigure_property(
    agent: &mut Agent,
    old_map: Map,
    modify: Option<usize>,
    new_kind: PropertyKind,
    new_attributes: PropertyAttributes,
    new_representation: Representation,
    new_field_type: FieldType,
    store_mode: StoreMode,
) -> Map {
    debug_assert_eq!(new_kind, PropertyKind::Data);
    debug_assert!(store_mode != StoreMode::ForceField || modify.is_some());
    let old_descriptors = old_map.descriptors(agent);
    let old_nof = old_map.number_of_own_descriptors(agent);

    // A representation generalization away from None keeps the object
    // layout unchanged, as long as the result is not boxed.
    if let Some(modify) = modify
        && !new_representation.is_none()
        && !new_representation.is_double()
    {
        let old_details = old_descriptors.get_details(&agent.heap, modify);
        if old_details.representation().is_none() {
            debug_assert_eq!(old_details.kind(), new_kind);
            debug_assert_eq!(old_details.attributes(), new_attributes);
            let field_owner = old_map.find_field_owner(&agent.heap, modify);
            generalize_field(agent, field_owner, modify, new_representation, new_field_type);
            return old_map;
        }
    }

    let generalize_all = |agent: &mut Agent, reason: &str| {
        copy_generalize_all_representations(
            agent,
            old_map,
            modify,
            store_mode,
            new_kind,
            new_attributes,
            reason,
        )
    };

    // Integrity transitions only change flags and attributes. Reconfigure
    // the Map they start from and take the same transitions again.
    let (source, integrity_transitions) = find_integrity_source(&agent.heap, old_map);
    if !integrity_transitions.is_empty() {
        let source_attributes = match modify {
            Some(modify) => {
                let added = integrity_transitions
                    .iter()
                    .fold(PropertyAttributes::NONE, |attributes, special| {
                        attributes.union(special.added_attributes())
                    });
                let source_details = source.descriptors(agent).get_details(&agent.heap, modify);
                if source_details.kind() != new_kind
                    || source_details.attributes().union(added) != new_attributes
                {
                    return generalize_all(agent, "GenAll_IntegrityAttributes");
                }
                source_details.attributes()
            }
            None => new_attributes,
        };
        let mut new_map = reconfigure_property(
            agent,
            source,
            modify,
            new_kind,
            source_attributes,
            new_representation,
            new_field_type,
            store_mode,
        );
        for special in integrity_transitions {
            new_map = transition_to_integrity_level(agent, new_map, special, "ReconfigureIntegrity");
        }
        return new_map;
    }

    // Check the state of the root Map.
    let mut root_map = old_map.find_root_map(&agent.heap);
    if !old_map.equivalent_to_for_transition(&agent.heap, root_map) {
        return generalize_all(agent, "GenAll_NotEquivalent");
    }
    let from_kind = root_map.elements_kind(agent);
    let to_kind = old_map.elements_kind(agent);
    if from_kind != to_kind
        && to_kind != ElementsKind::Dictionary
        && !(from_kind.is_fast() && is_more_general_elements_kind_transition(from_kind, to_kind))
    {
        return generalize_all(agent, "GenAll_InvalidElementsTransition");
    }
    let root_nof = root_map.number_of_own_descriptors(agent);
    if let Some(modify) = modify
        && modify < root_nof
    {
        let old_details = old_descriptors.get_details(&agent.heap, modify);
        if old_details.kind() != new_kind || old_details.attributes() != new_attributes {
            return generalize_all(agent, "GenAll_RootModification1");
        }
        let is_field = old_details.location() == PropertyLocation::Field;
        let old_type = old_descriptors.get(&agent.heap, modify).field_type();
        if (!is_field && store_mode == StoreMode::ForceField)
            || (is_field
                && (!new_field_type.now_is(old_type)
                    || !new_representation.fits_into(old_details.representation())))
        {
            return generalize_all(agent, "GenAll_RootModification2");
        }
    }

    // From here on, use the Map with the correct elements kind as root.
    if from_kind != to_kind {
        root_map = as_elements_kind(agent, root_map, to_kind);
    }

    let requested = |agent: &Agent, i: usize| -> Requested {
        let old_details = old_descriptors.get_details(&agent.heap, i);
        if modify == Some(i) {
            let representation = if old_details.kind() == new_kind
                && old_details.location() == PropertyLocation::Field
            {
                old_details.representation().generalize(new_representation)
            } else {
                new_representation
            };
            Requested {
                kind: new_kind,
                attributes: new_attributes,
                location: if store_mode == StoreMode::ForceField {
                    PropertyLocation::Field
                } else {
                    old_details.location()
                },
                representation,
            }
        } else {
            Requested {
                kind: old_details.kind(),
                attributes: old_details.attributes(),
                location: old_details.location(),
                representation: old_details.representation(),
            }
        }
    };
    let requested_field_type = |agent: &Agent, i: usize, representation: Representation| {
        let old_details = old_descriptors.get_details(&agent.heap, i);
        if modify == Some(i) {
            if old_details.kind() == new_kind {
                let old_type = field_type_of(agent, old_descriptors, i, representation);
                generalize_field_type(old_type, new_field_type)
            } else {
                new_field_type
            }
        } else {
            field_type_of(agent, old_descriptors, i, representation)
        }
    };

    // Follow the transition tree as long as it is compatible, generalizing
    // field types of the Maps passed along the way.
    let mut target_map = root_map;
    for i in root_nof..old_nof {
        let next = requested(agent, i);
        let key = old_descriptors.get_key(&agent.heap, i);
        let Some(tmp_map) =
            search_property_transition(&agent.heap, target_map, key, next.kind, next.attributes)
        else {
            break;
        };
        let tmp_descriptors = tmp_map.descriptors(agent);
        let tmp_details = tmp_descriptors.get_details(&agent.heap, i);
        if next.kind == PropertyKind::Accessor
            && !equal_immutable_values(agent, old_descriptors, tmp_descriptors, i)
        {
            return generalize_all(agent, "GenAll_Incompatible");
        }
        if next.location == PropertyLocation::Field
            && tmp_details.location() == PropertyLocation::Descriptor
        {
            break;
        }
        let tmp_representation = tmp_details.representation();
        if !next.representation.fits_into(tmp_representation) {
            break;
        }
        if tmp_details.location() == PropertyLocation::Field {
            if next.kind == PropertyKind::Data {
                let next_type = requested_field_type(agent, i, tmp_representation);
                generalize_field(agent, tmp_map, i, tmp_representation, next_type);
            }
        } else if !equal_immutable_values(agent, old_descriptors, tmp_descriptors, i) {
            break;
        }
        debug_assert!(!tmp_map.is_deprecated(agent));
        target_map = tmp_map;
    }

    // Directly change the Map if the target Map is more general.
    let target_nof = target_map.number_of_own_descriptors(agent);
    if target_nof == old_nof
        && (store_mode != StoreMode::ForceField
            || modify.is_some_and(|modify| {
                target_map
                    .descriptors(agent)
                    .get_details(&agent.heap, modify)
                    .location()
                    == PropertyLocation::Field
            }))
    {
        if target_map != old_map {
            old_map.notify_leaf_map_layout_change(agent);
        }
        return target_map;
    }

    // Find the last Map of the tree that the old Map's properties lead to,
    // compatible or not.
    for i in target_nof..old_nof {
        let next = requested(agent, i);
        let key = old_descriptors.get_key(&agent.heap, i);
        let Some(tmp_map) =
            search_property_transition(&agent.heap, target_map, key, next.kind, next.attributes)
        else {
            break;
        };
        let tmp_descriptors = tmp_map.descriptors(agent);
        if next.kind == PropertyKind::Accessor
            && !equal_immutable_values(agent, old_descriptors, tmp_descriptors, i)
        {
            return generalize_all(agent, "GenAll_Incompatible");
        }
        debug_assert!(!tmp_map.is_deprecated(agent));
        target_map = tmp_map;
    }
    let target_nof = target_map.number_of_own_descriptors(agent);
    let target_descriptors = target_map.descriptors(agent);

    // Merge the old and target descriptors into the most general version
    // of both, handing out field indices in order.
    let mut new_descriptors = Vec::with_capacity(old_nof);
    let mut current_offset = 0;
    for i in 0..root_nof {
        let descriptor = *old_descriptors.get(&agent.heap, i);
        if descriptor.details.location() == PropertyLocation::Field {
            current_offset += 1;
        }
        new_descriptors.push(descriptor);
    }
    for i in root_nof..old_nof {
        let old = *old_descriptors.get(&agent.heap, i);
        let old_details = old.details;
        let target = (i < target_nof).then(|| *target_descriptors.get(&agent.heap, i));
        let property_kind_reconfiguration = modify == Some(i) && old_details.kind() != new_kind;
        let (next_kind, next_attributes, next_location, next_representation) = if modify == Some(i)
        {
            debug_assert_eq!(store_mode, StoreMode::ForceField);
            let mut representation = match target {
                Some(target) => new_representation.generalize(target.details.representation()),
                None => new_representation,
            };
            if !property_kind_reconfiguration {
                representation = representation.generalize(old_details.representation());
            }
            (
                new_kind,
                new_attributes,
                PropertyLocation::Field,
                representation,
            )
        } else if let Some(target) = target {
            debug_assert_eq!(target.details.kind(), old_details.kind());
            let location = if old_details.location() == PropertyLocation::Field
                || target.details.location() == PropertyLocation::Field
                || old.value != target.value
            {
                PropertyLocation::Field
            } else {
                PropertyLocation::Descriptor
            };
            (
                target.details.kind(),
                target.details.attributes(),
                location,
                old_details
                    .representation()
                    .generalize(target.details.representation()),
            )
        } else {
            (
                old_details.kind(),
                old_details.attributes(),
                old_details.location(),
                old_details.representation(),
            )
        };
        let key = target.map_or(old.key, |target| target.key);

        if next_location == PropertyLocation::Field {
            debug_assert_eq!(next_kind, PropertyKind::Data);
            let old_type = field_type_of(agent, old_descriptors, i, next_representation);
            let next_field_type = match target {
                Some(target) => {
                    let target_type =
                        field_type_of(agent, target_descriptors, i, next_representation);
                    if modify == Some(i) {
                        let merged = generalize_field_type(target_type, new_field_type);
                        if property_kind_reconfiguration {
                            merged
                        } else {
                            generalize_field_type(old_type, merged)
                        }
                    } else {
                        generalize_field_type(target_type, old_type)
                    }
                }
                None => {
                    if modify == Some(i) && !property_kind_reconfiguration {
                        generalize_field_type(old_type, new_field_type)
                    } else if modify == Some(i) {
                        new_field_type
                    } else {
                        old_type
                    }
                }
            };
            new_descriptors.push(Descriptor::data_field(
                key,
                current_offset,
                next_attributes,
                next_representation,
                next_field_type,
            ));
            current_offset += 1;
        } else {
            let value = match target {
                Some(target) => target.value,
                None => old.value,
            };
            new_descriptors.push(Descriptor {
                key,
                details: PropertyDetails::new(
                    next_kind,
                    next_attributes,
                    PropertyLocation::Descriptor,
                    next_representation,
                    0,
                ),
                value,
            });
        }
    }
    let new_descriptors = DescriptorArray::allocate(&mut agent.heap, new_descriptors);
    debug_assert!(
        store_mode != StoreMode::ForceField
            || modify.is_some_and(|modify| new_descriptors
                .get_details(&agent.heap, modify)
                .location()
                == PropertyLocation::Field)
    );

    let split_map = find_last_match_map(agent, root_map, root_nof, old_nof, new_descriptors);
    let split_nof = split_map.number_of_own_descriptors(agent);
    debug_assert_ne!(old_nof, split_nof);

    let (split_kind, split_attributes) = if modify == Some(split_nof) {
        (new_kind, new_attributes)
    } else {
        let details = old_descriptors.get_details(&agent.heap, split_nof);
        (details.kind(), details.attributes())
    };
    let split_key = old_descriptors.get_key(&agent.heap, split_nof);
    let transition_target_deprecated = deprecate_target(
        agent,
        split_map,
        split_kind,
        split_key,
        split_attributes,
        new_descriptors,
    );

    // A deprecated target leaves its slot in the transition table, so the
    // new transition fits even into a full table.
    if !transition_target_deprecated && !can_have_more_transitions(agent, split_map) {
        return generalize_all(agent, "GenAll_CantHaveMoreTransitions");
    }

    old_map.notify_leaf_map_layout_change(agent);
    if let Some(modify) = modify {
        let details = new_descriptors.get_details(&agent.heap, modify);
        log::debug!(
            "[reconfiguring property #{modify} of map {:?}: {} field at {}]",
            old_map.0,
            details.representation().mnemonic(),
            details.field_index(),
        );
    }

    // Add the missing transitions.
    let mut new_map = split_map;
    for i in split_nof..old_nof {
        new_map = copy_install_descriptors(agent, new_map, i, new_descriptors);
    }
    new_map.set_flag(&mut agent.heap, MapFlags::OWNS_DESCRIPTORS, true);
    new_map
}

/// The deepest Map reachable from `root_map` whose descriptors exactly
/// match the first entries of `descriptors`.
fn find_last_match_map(
    agent: &Agent,
    root_map: Map,
    verbatim: usize,
    length: usize,
    descriptors: DescriptorArray,
) -> Map {
    let mut current = root_map;
    for i in verbatim..length {
        let descriptor = *descriptors.get(&agent.heap, i);
        let details = descriptor.details;
        let Some(next) = search_property_transition(
            &agent.heap,
            current,
            descriptor.key,
            details.kind(),
            details.attributes(),
        ) else {
            break;
        };
        let next_descriptors = next.descriptors(agent);
        let next_descriptor = *next_descriptors.get(&agent.heap, i);
        let next_details = next_descriptor.details;
        if details.location() != next_details.location()
            || details.representation() != next_details.representation()
        {
            break;
        }
        if next_details.location() == PropertyLocation::Field {
            if !descriptor.field_type().now_is(next_descriptor.field_type()) {
                break;
            }
        } else if descriptor.value != next_descriptor.value {
            break;
        }
        current = next;
    }
    current
}

/// Deprecate the subtree of `split_map` reached through the given property
/// and install `new_descriptors` on `split_map` and the ancestors sharing
/// its descriptor array. Returns true if a transition was deprecated.
fn deprecate_target(
    agent: &mut Agent,
    split_map: Map,
    kind: PropertyKind,
    key: PropertyKey,
    attributes: PropertyAttributes,
    new_descriptors: DescriptorArray,
) -> bool {
    let mut transition_target_deprecated = false;
    if let Some(target) = search_property_transition(&agent.heap, split_map, key, kind, attributes)
    {
        target.deprecate_transition_tree(agent);
        transition_target_deprecated = true;
    }
    // Don't overwrite the empty descriptor array.
    if split_map.number_of_own_descriptors(agent) == 0 {
        return transition_target_deprecated;
    }
    let to_replace = split_map.descriptors(agent);
    let mut current = split_map;
    while current.descriptors(agent) == to_replace {
        current.set_enum_length(&mut agent.heap, None);
        agent.heap[current].descriptors = new_descriptors;
        match current.back_pointer(agent) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    split_map.set_flag(&mut agent.heap, MapFlags::OWNS_DESCRIPTORS, false);
    agent.caches.clear_descriptor_lookup();
    transition_target_deprecated
}

/// The Map to store `value` into descriptor `descriptor` of `map`,
/// generalizing the field if it cannot hold the value.
pub fn prepare_for_data_property(agent: &mut Agent, map: Map, descriptor: usize, value: Value) -> Map {
    // Dictionaries can store any property value.
    if map.is_dictionary_map(agent) {
        return map;
    }
    // Migrate to the newest Map before storing the property.
    let map = update(agent, map);
    let descriptors = map.descriptors(agent);
    if can_hold_value(agent, descriptors, descriptor, value) {
        return map;
    }
    let attributes = descriptors.get_details(&agent.heap, descriptor).attributes();
    let representation = Representation::for_value(value);
    let field_type = FieldType::optimal_for(agent, value, representation);
    reconfigure_property(
        agent,
        map,
        Some(descriptor),
        PropertyKind::Data,
        attributes,
        representation,
        field_type,
        StoreMode::ForceField,
    )
}

/// Returns true if `value` fits a field of the given representation.
pub(crate) fn fits_representation(value: Value, representation: Representation) -> bool {
    match representation {
        Representation::None => false,
        Representation::Smi => value.is_smi(),
        Representation::Double => value.is_number(),
        Representation::HeapObject => !value.is_smi(),
        Representation::Tagged => true,
    }
}

/// Returns true if descriptor `index` can store `value` without changing
/// the Map.
pub(crate) fn can_hold_value(
    agent: &Agent,
    descriptors: DescriptorArray,
    index: usize,
    value: Value,
) -> bool {
    let descriptor = descriptors.get(&agent.heap, index);
    match (descriptor.details.kind(), descriptor.value) {
        (PropertyKind::Data, DescriptorValue::Field(field_type)) => {
            fits_representation(value, descriptor.details.representation())
                && field_type.now_contains(agent, value)
        }
        (PropertyKind::Data, DescriptorValue::Constant(constant)) => constant == value,
        _ => false,
    }
}

/// The Map after changing the kind or attributes of existing property
/// `descriptor` to a data field with `attributes`.
pub fn reconfigure_existing_property(
    agent: &mut Agent,
    map: Map,
    descriptor: usize,
    kind: PropertyKind,
    attributes: PropertyAttributes,
) -> Map {
    // Dictionaries have to be reconfigured in place.
    debug_assert!(!map.is_dictionary_map(agent));
    if map.back_pointer(agent).is_none() {
        // Rebuilding the transition tree of a Map without back pointer
        // gains nothing.
        return copy_generalize_all_representations(
            agent,
            map,
            Some(descriptor),
            StoreMode::ForceField,
            kind,
            attributes,
            "GenAll_AttributesMismatchProtoMap",
        );
    }
    reconfigure_property(
        agent,
        map,
        Some(descriptor),
        kind,
        attributes,
        Representation::None,
        FieldType::None,
        StoreMode::ForceField,
    )
}

/// Generalize the representation and type of field `key` of `map` in
/// place, for embedders that know a field will hold other values.
pub fn generalize_field_representation(
    agent: &mut Agent,
    map: Map,
    key: PropertyKey,
    representation: Representation,
    field_type: FieldType,
) -> Map {
    let Some(index) = search_with_cache(agent, map, key) else {
        return map;
    };
    let details = map.descriptors(agent).get_details(&agent.heap, index);
    if details.kind() != PropertyKind::Data || details.location() != PropertyLocation::Field {
        return map;
    }
    reconfigure_property(
        agent,
        map,
        Some(index),
        PropertyKind::Data,
        details.attributes(),
        representation,
        field_type,
        StoreMode::ForceField,
    )
}

/// Transition key of descriptor `index` in `descriptors`.
pub(crate) fn transition_key_of(agent: &Agent, descriptors: DescriptorArray, index: usize) -> TransitionKey {
    let descriptor = descriptors.get(&agent.heap, index);
    TransitionKey::property(
        descriptor.key,
        descriptor.details.kind(),
        descriptor.details.attributes(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::{
        builtins::ordinary::{
            elements_kind::INITIAL_OBJECT_ELEMENTS_KIND,
            map::InstanceType,
            map_transitions::{StoreOrigin, copy, copy_with_field, transition_to_data_property},
        },
        execution::Options,
    };

    fn root(agent: &mut Agent) -> Map {
        Map::create_root(
            agent,
            InstanceType::Object,
            None,
            4,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        )
    }

    fn add(agent: &mut Agent, map: Map, name: &str, value: Value) -> Map {
        let key = PropertyKey::from_str(agent, name);
        transition_to_data_property(
            agent,
            map,
            key,
            value,
            PropertyAttributes::NONE,
            StoreOrigin::Named,
        )
    }

    #[test]
    fn storing_a_double_into_a_smi_field_deprecates_the_branch() {
        let mut agent = Agent::new(Options::default());
        let root = root(&mut agent);
        let with_x = add(&mut agent, root, "x", Value::Integer(1));
        let with_y = add(&mut agent, with_x, "y", Value::Integer(2));
        let generalized = prepare_for_data_property(&mut agent, with_y, 0, Value::Number(1.5));
        assert_ne!(generalized, with_y);
        assert!(with_x.is_deprecated(&agent));
        assert!(with_y.is_deprecated(&agent));
        let details = generalized.descriptors(&agent).get_details(&agent.heap, 0);
        assert_eq!(details.representation(), Representation::Double);
        assert_eq!(update(&mut agent, with_y), generalized);
        assert_eq!(try_update(&agent, with_y), Some(generalized));
        assert_eq!(generalized.find_root_map(&agent.heap), root);
    }

    #[test]
    fn none_fields_are_generalized_in_place() {
        let mut agent = Agent::new(Options::default());
        let root = root(&mut agent);
        let key = PropertyKey::from_str(&mut agent, "x");
        let with_x = copy_with_field(
            &mut agent,
            root,
            key,
            FieldType::None,
            PropertyAttributes::NONE,
            Representation::None,
            TransitionFlag::Insert,
        )
        .unwrap();
        let map = prepare_for_data_property(&mut agent, with_x, 0, Value::Integer(3));
        assert_eq!(map, with_x);
        assert!(!with_x.is_deprecated(&agent));
        let details = map.descriptors(&agent).get_details(&agent.heap, 0);
        assert_eq!(details.representation(), Representation::Smi);
    }

    #[test]
    fn compatible_siblings_are_reused() {
        let mut agent = Agent::new(Options::default());
        let root = root(&mut agent);
        let a = add(&mut agent, root, "x", Value::Integer(1));
        let generalized = prepare_for_data_property(&mut agent, a, 0, Value::Null);
        let again = prepare_for_data_property(&mut agent, a, 0, Value::Null);
        assert_eq!(update(&mut agent, again), update(&mut agent, generalized));
        assert_eq!(
            generalized
                .descriptors(&agent)
                .get_details(&agent.heap, 0)
                .representation(),
            Representation::Tagged
        );
    }

    #[test]
    fn attribute_change_on_root_without_back_pointer_generalizes_all() {
        let mut agent = Agent::new(Options::default());
        let root = root(&mut agent);
        let with_x = add(&mut agent, root, "x", Value::Integer(1));
        let free = copy(&mut agent, with_x, "test");
        let result = reconfigure_existing_property(
            &mut agent,
            free,
            0,
            PropertyKind::Data,
            PropertyAttributes::READ_ONLY,
        );
        assert!(result.back_pointer(&agent).is_none());
        let details = result.descriptors(&agent).get_details(&agent.heap, 0);
        assert!(details.is_read_only());
        assert_eq!(details.representation(), Representation::Tagged);
    }
}
