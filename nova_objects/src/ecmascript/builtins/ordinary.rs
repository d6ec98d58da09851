// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [10.1 Ordinary Object Internal Methods and Internal Slots](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots)
//!
//! Ordinary objects describe their shape with a [`Map`](map::Map) and store
//! named properties either in fields laid out by the Map's descriptors
//! ("fast mode") or in a dictionary. Every internal method here runs through
//! a [`LookupIterator`], which hides that distinction along with elements,
//! global property cells, interceptors and access checks.

pub mod caches;
pub mod dependent_code;
pub mod descriptor_array;
pub mod dictionary;
pub mod elements;
pub mod elements_kind;
pub mod global_dictionary;
pub mod integrity;
pub mod map;
pub mod map_transitions;
pub mod map_updater;
pub mod migration;
pub mod property_details;
pub mod prototype;
pub mod transitions;

use descriptor_array::{Accessor, Descriptor, DescriptorArray};
use dictionary::NameDictionary;
use elements::{ElementsStorage, element_keys};
use elements_kind::INITIAL_OBJECT_ELEMENTS_KIND;
use global_dictionary::{GlobalDictionary, global_iteration_order};
use map::{InstanceType, Map};
use map_transitions::{StoreOrigin, transition_to_prototype};
use property_details::PropertyAttributes;

use super::{
    array::array_define_own_property,
    typed_array::{typed_array_define_own_property, typed_array_length},
};
use crate::ecmascript::{
    abstract_operations::{
        lookup_iterator::{Configuration, LookupIterator, LookupState},
        operations_on_objects::{
            define_own_property_ignore_attributes, delete_property, get_property,
            get_property_attributes, has_property_via_iterator, report_failed_access_check,
            set_property,
        },
        testing_and_comparison::same_value,
    },
    execution::{
        Agent, JsResult, LanguageMode, ShouldThrow,
        embedder::{AccessType, ObjectTemplate, PropertyCallbackInfo},
    },
    types::{
        FieldValue, InternalMethods, Object, ObjectHeapData, ObjectKind, OrdinaryObject,
        PropertyDescriptor, PropertyKey, PropertyStorage, Value,
    },
};

/// Allocate an object of `kind` with `map`. In-object fields start out
/// uninitialized; the backing stores match the Map's mode and elements kind.
pub fn ordinary_object_create_from_map(agent: &mut Agent, map: Map, kind: ObjectKind) -> OrdinaryObject {
    let in_object = vec![FieldValue::Uninitialized; map.in_object_properties(agent) as usize];
    let properties = if matches!(kind, ObjectKind::Global) {
        PropertyStorage::Global(GlobalDictionary::default())
    } else if map.is_dictionary_map(agent) {
        PropertyStorage::Dictionary(NameDictionary::with_capacity(0))
    } else {
        PropertyStorage::Fast(Vec::new())
    };
    let elements = ElementsStorage::for_kind(map.elements_kind(agent));
    OrdinaryObject::create(
        agent,
        ObjectHeapData {
            map,
            in_object,
            properties,
            elements,
            kind,
        },
    )
}

/// ### [10.1.12 OrdinaryObjectCreate ( proto \[ , additionalInternalSlotsList \] )](https://tc39.es/ecma262/#sec-ordinaryobjectcreate)
///
/// Objects with the same prototype share a Map: the initial object Map is
/// reached from %Object.prototype% and anything else goes through the
/// prototype transition cache.
pub fn object_create(agent: &mut Agent, proto: Option<Object>) -> OrdinaryObject {
    let intrinsics = agent.intrinsics();
    let object_prototype = intrinsics.object_prototype.into_object();
    let map = match proto {
        None => intrinsics.null_prototype_map,
        Some(proto) if proto == object_prototype => intrinsics.object_map,
        Some(proto) => {
            let object_map = intrinsics.object_map;
            transition_to_prototype(agent, object_map, Some(proto))
        }
    };
    ordinary_object_create_from_map(agent, map, ObjectKind::Ordinary)
}

/// An empty object inheriting from %Object.prototype%.
pub fn ordinary_object_create_with_intrinsics(agent: &mut Agent) -> OrdinaryObject {
    let map = agent.intrinsics().object_map;
    ordinary_object_create_from_map(agent, map, ObjectKind::Ordinary)
}

/// Instantiate `template`. Instances share one root Map that carries the
/// template's interceptors, access check and native accessors.
pub fn ordinary_object_create_from_template(
    agent: &mut Agent,
    template: ObjectTemplate,
) -> OrdinaryObject {
    let map = match agent[template].initial_map {
        Some(map) => map,
        None => {
            let map = create_template_map(agent, template);
            agent[template].initial_map = Some(map);
            map
        }
    };
    ordinary_object_create_from_map(agent, map, ObjectKind::Ordinary)
}

fn create_template_map(agent: &mut Agent, template: ObjectTemplate) -> Map {
    let prototype = Some(agent.intrinsics().object_prototype.into_object());
    let in_object = agent.options().initial_in_object_properties;
    let map = Map::create_root(
        agent,
        InstanceType::ApiObject,
        prototype,
        in_object,
        INITIAL_OBJECT_ELEMENTS_KIND,
        Some(template),
    );
    let descriptors: Vec<Descriptor> = agent[template]
        .accessors
        .iter()
        .map(|&(accessor, attributes)| {
            Descriptor::accessor_constant(agent[accessor].name, Accessor::Native(accessor), attributes)
        })
        .collect();
    if !descriptors.is_empty() {
        let descriptors = DescriptorArray::allocate(&mut agent.heap, descriptors);
        map.initialize_descriptors(&mut agent.heap, descriptors);
    }
    map
}

/// Add the data property `key` to a freshly created `object`. The property
/// must not exist yet, and the object must be extensible.
pub(crate) fn add_property(
    agent: &mut Agent,
    object: OrdinaryObject,
    key: PropertyKey,
    value: Value,
    attributes: PropertyAttributes,
) {
    let mut it = LookupIterator::new(
        agent,
        object.into_value(),
        key,
        Configuration::OwnSkipInterceptor,
    );
    if it.is_found() {
        it.reconfigure_data_property(agent, value, attributes);
        return;
    }
    it.prepare_transition_to_data_property(agent, value, attributes, StoreOrigin::Named);
    it.apply_transition_to_data_property(agent, value, attributes);
}

/// Ask the embedder whether `object` may be accessed by the current caller.
pub(crate) fn is_access_allowed(agent: &mut Agent, object: OrdinaryObject) -> bool {
    let map = object.map(agent);
    if !map.is_access_check_needed(agent) {
        return true;
    }
    let Some(access_check) = map
        .constructor(agent)
        .and_then(|template| template.access_check(agent))
    else {
        return true;
    };
    let callback = access_check.callback.clone();
    let data = access_check.data;
    callback(agent, object, data)
}

impl OrdinaryObject {
    /// Value of the own data property `key`, without running accessors or
    /// interceptors.
    pub fn get_own_data_value(self, agent: &mut Agent, key: PropertyKey) -> Option<Value> {
        let it = LookupIterator::new(
            agent,
            self.into_value(),
            key,
            Configuration::OwnSkipInterceptor,
        );
        (it.state() == LookupState::Data).then(|| it.get_data_value(agent))
    }
}

/// Build the property descriptor of the property `it` points at. Native
/// accessors and interceptors report data properties.
fn get_own_property_via_iterator(
    agent: &mut Agent,
    it: &mut LookupIterator,
) -> JsResult<Option<PropertyDescriptor>> {
    let Some(attributes) = get_property_attributes(agent, it)? else {
        return Ok(None);
    };
    let value = match it.state() {
        LookupState::Accessor => match it.get_accessors(agent) {
            Accessor::Pair(pair) => {
                return Ok(Some(PropertyDescriptor::accessor_with_attributes(
                    pair.getter,
                    pair.setter,
                    attributes,
                )));
            }
            Accessor::Native(_) => get_property(agent, it)?,
        },
        LookupState::Data => it.get_data_value(agent),
        _ => get_property(agent, it)?,
    };
    Ok(Some(PropertyDescriptor::data_with_attributes(value, attributes)))
}

/// ### [10.1.5.1 OrdinaryGetOwnProperty ( O, P )](https://tc39.es/ecma262/#sec-ordinarygetownproperty)
pub fn ordinary_get_own_property(
    agent: &mut Agent,
    o: OrdinaryObject,
    property_key: PropertyKey,
) -> JsResult<Option<PropertyDescriptor>> {
    // 1. If O does not have an own property with key P, return undefined.
    // 2.-9. Build the descriptor from the property's value and attributes.
    let mut it = LookupIterator::new(agent, o.into_value(), property_key, Configuration::Own);
    get_own_property_via_iterator(agent, &mut it)
}

/// ### [10.1.6.1 OrdinaryDefineOwnProperty ( O, P, Desc )](https://tc39.es/ecma262/#sec-ordinarydefineownproperty)
///
/// Interceptors are not consulted.
pub fn ordinary_define_own_property(
    agent: &mut Agent,
    o: OrdinaryObject,
    property_key: PropertyKey,
    descriptor: PropertyDescriptor,
) -> JsResult<bool> {
    let mut it = LookupIterator::new(
        agent,
        o.into_value(),
        property_key,
        Configuration::OwnSkipInterceptor,
    );
    if it.state() == LookupState::AccessCheck {
        if !it.has_access(agent) {
            report_failed_access_check(agent, o, AccessType::Set)?;
            return Ok(false);
        }
        it.next(agent);
    }

    // 1. Let current be ? O.[[GetOwnProperty]](P).
    let current = get_own_property_via_iterator(agent, &mut it)?;

    // 2. Let extensible be ? IsExtensible(O).
    let extensible = o.map(agent).is_extensible(agent);

    // Getters may have changed the holder's Map.
    it.restart(agent);
    if it.state() == LookupState::AccessCheck {
        it.next(agent);
    }

    // 3. Return ValidateAndApplyPropertyDescriptor(O, P, extensible, Desc, current).
    validate_and_apply_property_descriptor(agent, &mut it, extensible, descriptor, current)
}

/// ### [10.1.6.3 ValidateAndApplyPropertyDescriptor ( O, P, extensible, Desc, current )](https://tc39.es/ecma262/#sec-validateandapplypropertydescriptor)
fn validate_and_apply_property_descriptor(
    agent: &mut Agent,
    it: &mut LookupIterator,
    extensible: bool,
    descriptor: PropertyDescriptor,
    current: Option<PropertyDescriptor>,
) -> JsResult<bool> {
    // 1. Assert: IsPropertyKey(P) is true.

    // 2. If current is undefined, then
    let Some(current) = current else {
        // a. If extensible is false, return false.
        if !extensible {
            return Ok(false);
        }

        // c. If IsAccessorDescriptor(Desc) is true, then
        if descriptor.is_accessor_descriptor() {
            // i. Create an own accessor property named P of object O whose [[Get]], [[Set]],
            //    [[Enumerable]], and [[Configurable]] attributes are set to the value of the
            //    corresponding field in Desc if Desc has that field, or to the attribute's default
            //    value otherwise.
            it.transition_to_accessor_property(
                agent,
                Some(descriptor.get.unwrap_or(None)),
                Some(descriptor.set.unwrap_or(None)),
                descriptor.attributes(),
            );
        }
        // d. Else,
        else {
            // i. Create an own data property named P of object O whose [[Value]], [[Writable]],
            //    [[Enumerable]], and [[Configurable]] attributes are set to the value of the
            //    corresponding field in Desc if Desc has that field, or to the attribute's default
            //    value otherwise.
            let value = descriptor.value.unwrap_or(Value::Undefined);
            if !define_own_property_ignore_attributes(agent, it, value, descriptor.attributes())? {
                return Ok(false);
            }
        }

        // e. Return true.
        return Ok(true);
    };

    // 3. Assert: current is a fully populated Property Descriptor.
    debug_assert!(current.is_fully_populated());

    // 4. If Desc does not have any fields, return true.
    if !descriptor.has_fields() {
        return Ok(true);
    }

    // 5. If current.[[Configurable]] is false, then
    if current.configurable == Some(false) {
        // a. If Desc has a [[Configurable]] field and Desc.[[Configurable]] is true, return false.
        if descriptor.configurable == Some(true) {
            return Ok(false);
        }

        // b. If Desc has an [[Enumerable]] field and SameValue(Desc.[[Enumerable]], current.[[Enumerable]])
        //    is false, return false.
        if descriptor.enumerable.is_some() && descriptor.enumerable != current.enumerable {
            return Ok(false);
        }

        // c. If IsGenericDescriptor(Desc) is false and SameValue(IsAccessorDescriptor(Desc), IsAccessorDescriptor(current))
        //    is false, return false.
        if !descriptor.is_generic_descriptor()
            && descriptor.is_accessor_descriptor() != current.is_accessor_descriptor()
        {
            return Ok(false);
        }

        // d. If IsAccessorDescriptor(current) is true, then
        if current.is_accessor_descriptor() {
            // i. If Desc has a [[Get]] field and SameValue(Desc.[[Get]], current.[[Get]]) is false,
            //    return false.
            if descriptor.get.is_some() && descriptor.get != current.get {
                return Ok(false);
            }

            // ii. If Desc has a [[Set]] field and SameValue(Desc.[[Set]], current.[[Set]]) is
            //     false, return false.
            if descriptor.set.is_some() && descriptor.set != current.set {
                return Ok(false);
            }
        }
        // e. Else if current.[[Writable]] is false, then
        else if current.writable == Some(false) {
            // i. If Desc has a [[Writable]] field and Desc.[[Writable]] is true, return false.
            if descriptor.writable == Some(true) {
                return Ok(false);
            }

            // ii. If Desc has a [[Value]] field and SameValue(Desc.[[Value]], current.[[Value]])
            //     is false, return false.
            if let (Some(desc_value), Some(cur_value)) = (descriptor.value, current.value)
                && !same_value(agent, desc_value, cur_value)
            {
                return Ok(false);
            }
            // A non-writable, non-configurable property cannot change.
            return Ok(true);
        }
    }

    let current_attributes = PropertyAttributes::NONE
        .union(if current.writable == Some(false) {
            PropertyAttributes::READ_ONLY
        } else {
            PropertyAttributes::NONE
        })
        .union(if current.enumerable == Some(false) {
            PropertyAttributes::DONT_ENUM
        } else {
            PropertyAttributes::NONE
        })
        .union(if current.configurable == Some(false) {
            PropertyAttributes::DONT_DELETE
        } else {
            PropertyAttributes::NONE
        });

    // 6. If O is not undefined, then
    // a. If IsDataDescriptor(current) is true and IsAccessorDescriptor(Desc) is true, then
    if current.is_data_descriptor() && descriptor.is_accessor_descriptor() {
        // i. If Desc has a [[Configurable]] field, let configurable be Desc.[[Configurable]];
        //    else let configurable be current.[[Configurable]].
        // ii. If Desc has a [[Enumerable]] field, let enumerable be Desc.[[Enumerable]]; else
        //     let enumerable be current.[[Enumerable]].
        let attributes = descriptor
            .attributes_over(current_attributes)
            .difference(PropertyAttributes::READ_ONLY);

        // iii. Replace the property named P of object O with an accessor property whose
        //      [[Configurable]] and [[Enumerable]] attributes are set to configurable and
        //      enumerable, respectively, and whose [[Get]] and [[Set]] attributes are set to
        //      the value of the corresponding field in Desc if Desc has that field, or to the
        //      attribute's default value otherwise.
        it.transition_to_accessor_property(
            agent,
            Some(descriptor.get.unwrap_or(None)),
            Some(descriptor.set.unwrap_or(None)),
            attributes,
        );
    }
    // b. Else if IsAccessorDescriptor(current) is true and IsDataDescriptor(Desc) is true, then
    else if current.is_accessor_descriptor() && descriptor.is_data_descriptor() {
        // i.-ii. Carry configurable and enumerable over from current.
        let attributes = descriptor.attributes_over(
            current_attributes.union(PropertyAttributes::READ_ONLY),
        );

        // iii. Replace the property named P of object O with a data property whose
        //      [[Configurable]] and [[Enumerable]] attributes are set to configurable and
        //      enumerable, respectively, and whose [[Value]] and [[Writable]] attributes are
        //      set to the value of the corresponding field in Desc if Desc has that field, or
        //      to the attribute's default value otherwise.
        let value = descriptor.value.unwrap_or(Value::Undefined);
        return define_own_property_ignore_attributes(agent, it, value, attributes);
    }
    // c. Else,
    else {
        // i. For each field of Desc, set the corresponding attribute of the property named P
        //    of object O to the value of the field.
        let attributes = descriptor.attributes_over(current_attributes);
        if current.is_accessor_descriptor() {
            it.transition_to_accessor_property(
                agent,
                Some(descriptor.get.unwrap_or(current.get.flatten())),
                Some(descriptor.set.unwrap_or(current.set.flatten())),
                attributes,
            );
        } else {
            let value = descriptor
                .value
                .or(current.value)
                .unwrap_or(Value::Undefined);
            return define_own_property_ignore_attributes(agent, it, value, attributes);
        }
    }

    // 7. Return true.
    Ok(true)
}

/// Keys an interceptor of `object` reports through its enumerator.
fn interceptor_keys(
    agent: &mut Agent,
    object: OrdinaryObject,
    indexed: bool,
) -> JsResult<Vec<PropertyKey>> {
    let map = object.map(agent);
    let has_interceptor = if indexed {
        map.has_indexed_interceptor(agent)
    } else {
        map.has_named_interceptor(agent)
    };
    if !has_interceptor {
        return Ok(Vec::new());
    }
    let Some(template) = map.constructor(agent) else {
        return Ok(Vec::new());
    };
    let interceptor = if indexed {
        template.indexed_interceptor(agent)
    } else {
        template.named_interceptor(agent)
    };
    let Some((enumerator, data)) = interceptor
        .and_then(|interceptor| Some((interceptor.enumerator.clone()?, interceptor.data)))
    else {
        return Ok(Vec::new());
    };
    let info = PropertyCallbackInfo {
        receiver: object.into_value(),
        holder: object,
        data,
    };
    agent.with_stack_guard(|agent| enumerator(agent, &info))
}

/// ### [10.1.11.1 OrdinaryOwnPropertyKeys ( O )](https://tc39.es/ecma262/#sec-ordinaryownpropertykeys)
///
/// Keys reported by interceptors follow the object's own keys of the same
/// kind.
pub fn ordinary_own_property_keys(
    agent: &mut Agent,
    o: OrdinaryObject,
) -> JsResult<Vec<PropertyKey>> {
    if !is_access_allowed(agent, o) {
        report_failed_access_check(agent, o, AccessType::Keys)?;
        return Ok(Vec::new());
    }

    // 1. Let keys be a new empty List.
    // 2. For each own property key P of O such that P is an array index, in ascending numeric
    //    index order, do
    //    a. Append P to keys.
    let mut indices = if o.is_typed_array(agent) {
        let length = typed_array_length(agent, o).unwrap_or(0) as u32;
        (0..length).collect()
    } else {
        element_keys(agent, o)
    };
    let intercepted = interceptor_keys(agent, o, true)?;
    if !intercepted.is_empty() {
        indices.extend(intercepted.iter().filter_map(|key| key.as_array_index()));
        indices.sort_unstable();
        indices.dedup();
    }
    let mut keys: Vec<PropertyKey> = indices.into_iter().map(PropertyKey::Integer).collect();

    // 3. For each own property key P of O such that P is a String and P is not an array index,
    //    in ascending chronological order of property creation, do
    //    a. Append P to keys.
    // 4. For each own property key P of O such that P is a Symbol, in ascending chronological
    //    order of property creation, do
    //    a. Append P to keys.
    let mut named = named_keys_in_creation_order(agent, o);
    for key in interceptor_keys(agent, o, false)? {
        if key.as_array_index().is_none() && !named.contains(&key) {
            named.push(key);
        }
    }
    let (symbols, strings): (Vec<_>, Vec<_>) = named
        .into_iter()
        .filter(|key| !key.is_private(agent))
        .partition(|key| key.is_symbol());
    keys.extend(strings);
    keys.extend(symbols);

    // 5. Return keys.
    Ok(keys)
}

fn named_keys_in_creation_order(agent: &Agent, o: OrdinaryObject) -> Vec<PropertyKey> {
    match &agent[o].properties {
        PropertyStorage::Fast(_) => {
            let map = o.map(agent);
            let descriptors = map.descriptors(agent);
            (0..map.number_of_own_descriptors(agent))
                .map(|index| descriptors.get_key(&agent.heap, index))
                .collect()
        }
        PropertyStorage::Dictionary(dictionary) => dictionary.iteration_order(),
        PropertyStorage::Global(_) => global_iteration_order(agent, o)
            .into_iter()
            .map(|cell| cell.key(agent))
            .collect(),
    }
}

/// Enumerable own string keys of `o`, as `for-in` and `Object.keys` see
/// them. Fast objects without elements answer from the enum cache shared
/// through their descriptor array.
pub fn enumerable_own_keys(agent: &mut Agent, o: OrdinaryObject) -> JsResult<Vec<PropertyKey>> {
    if let Some(keys) = enum_cache_keys(agent, o) {
        return Ok(keys);
    }
    let mut enumerable = Vec::new();
    for key in ordinary_own_property_keys(agent, o)? {
        if key.is_symbol() {
            continue;
        }
        if let Some(desc) = ordinary_get_own_property(agent, o, key)?
            && desc.enumerable == Some(true)
        {
            enumerable.push(key);
        }
    }
    Ok(enumerable)
}

fn enum_cache_keys(agent: &mut Agent, o: OrdinaryObject) -> Option<Vec<PropertyKey>> {
    let map = o.map(agent);
    if !o.has_fast_properties(agent)
        || map.has_named_interceptor(agent)
        || map.has_indexed_interceptor(agent)
        || map.is_access_check_needed(agent)
        || o.is_typed_array(agent)
        || !agent[o].elements.is_empty()
    {
        return None;
    }
    let descriptors = map.descriptors(agent);
    if let Some(length) = map.enum_length(agent) {
        let cache = descriptors.enum_cache(&agent.heap);
        if cache.len() >= length as usize {
            return Some(cache[..length as usize].to_vec());
        }
    }
    let keys: Vec<PropertyKey> = (0..map.number_of_own_descriptors(agent))
        .map(|index| descriptors.get(&agent.heap, index))
        .filter(|descriptor| !descriptor.details.is_dont_enum() && !descriptor.key.is_symbol())
        .map(|descriptor| descriptor.key)
        .collect();
    // Maps sharing the array see a prefix of the longest cache.
    if keys.len() >= descriptors.enum_cache(&agent.heap).len() {
        descriptors.set_enum_cache(&mut agent.heap, keys.clone());
    }
    map.set_enum_length(&mut agent.heap, Some(keys.len() as u32));
    log::trace!("[enum cache of {map:?} holds {} keys]", keys.len());
    Some(keys)
}

impl InternalMethods for OrdinaryObject {
    /// ### [10.1.1 \[\[GetPrototypeOf\]\] ( )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-getprototypeof)
    fn internal_get_prototype_of(self, agent: &mut Agent) -> JsResult<Option<Object>> {
        // Objects failing their access check present a null prototype.
        if !is_access_allowed(agent, self) {
            return Ok(None);
        }
        // 1. Return O.[[Prototype]].
        Ok(self.prototype(agent))
    }

    /// ### [10.1.2 \[\[SetPrototypeOf\]\] ( V )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-setprototypeof-v)
    fn internal_set_prototype_of(
        self,
        agent: &mut Agent,
        prototype: Option<Object>,
    ) -> JsResult<bool> {
        prototype::set_prototype_of(agent, self, prototype, ShouldThrow::DontThrow)
    }

    /// ### [10.1.3 \[\[IsExtensible\]\] ( )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-isextensible)
    fn internal_is_extensible(self, agent: &mut Agent) -> JsResult<bool> {
        Ok(integrity::is_extensible(agent, self))
    }

    /// ### [10.1.4 \[\[PreventExtensions\]\] ( )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-preventextensions)
    fn internal_prevent_extensions(self, agent: &mut Agent) -> JsResult<bool> {
        integrity::prevent_extensions(agent, self, ShouldThrow::DontThrow)
    }

    /// ### [10.1.5 \[\[GetOwnProperty\]\] ( P )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-getownproperty-p)
    fn internal_get_own_property(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        // 1. Return OrdinaryGetOwnProperty(O, P).
        ordinary_get_own_property(agent, self, property_key)
    }

    /// ### [10.1.6 \[\[DefineOwnProperty\]\] ( P, Desc )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-defineownproperty-p-desc)
    fn internal_define_own_property(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        property_descriptor: PropertyDescriptor,
    ) -> JsResult<bool> {
        if self.is_array(agent) {
            return array_define_own_property(agent, self, property_key, property_descriptor);
        }
        if self.is_typed_array(agent) {
            return typed_array_define_own_property(agent, self, property_key, property_descriptor);
        }
        // 1. Return ? OrdinaryDefineOwnProperty(O, P, Desc).
        ordinary_define_own_property(agent, self, property_key, property_descriptor)
    }

    /// ### [10.1.7 \[\[HasProperty\]\] ( P )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-hasproperty-p)
    fn internal_has_property(self, agent: &mut Agent, property_key: PropertyKey) -> JsResult<bool> {
        // 1. Return ? OrdinaryHasProperty(O, P).
        let mut it = LookupIterator::new(
            agent,
            self.into_value(),
            property_key,
            Configuration::PrototypeChain,
        );
        has_property_via_iterator(agent, &mut it)
    }

    /// ### [10.1.8 \[\[Get\]\] ( P, Receiver )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-get-p-receiver)
    fn internal_get(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        receiver: Value,
    ) -> JsResult<Value> {
        // 1. Return ? OrdinaryGet(O, P, Receiver).
        let mut it = LookupIterator::new_with_holder(
            agent,
            receiver,
            property_key,
            self.into_object(),
            Configuration::PrototypeChain,
        );
        get_property(agent, &mut it)
    }

    /// ### [10.1.9 \[\[Set\]\] ( P, V, Receiver )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-set-p-v-receiver)
    fn internal_set(
        self,
        agent: &mut Agent,
        property_key: PropertyKey,
        value: Value,
        receiver: Value,
    ) -> JsResult<bool> {
        // 1. Return ? OrdinarySet(O, P, V, Receiver).
        let mut it = LookupIterator::new_with_holder(
            agent,
            receiver,
            property_key,
            self.into_object(),
            Configuration::PrototypeChain,
        );
        set_property(agent, &mut it, value, LanguageMode::Sloppy, StoreOrigin::MaybeKeyed)
    }

    /// ### [10.1.10 \[\[Delete\]\] ( P )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-delete-p)
    fn internal_delete(self, agent: &mut Agent, property_key: PropertyKey) -> JsResult<bool> {
        // 1. Return ? OrdinaryDelete(O, P).
        let mut it = LookupIterator::new(agent, self.into_value(), property_key, Configuration::Own);
        delete_property(agent, &mut it, LanguageMode::Sloppy)
    }

    /// ### [10.1.11 \[\[OwnPropertyKeys\]\] ( )](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots-ownpropertykeys)
    fn internal_own_property_keys(self, agent: &mut Agent) -> JsResult<Vec<PropertyKey>> {
        // 1. Return OrdinaryOwnPropertyKeys(O).
        ordinary_own_property_keys(agent, self)
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;
    use crate::ecmascript::{
        abstract_operations::operations_on_objects::{
            create_data_property_or_throw, define_property_or_throw, get, set,
        },
        builtins::{array::create_array_from_list, builtin_function::create_builtin_function},
        execution::{
            Options,
            embedder::{AccessorInfo, InterceptorInfo, NativeAccessor, ObjectTemplateRecord},
        },
        types::Symbol,
    };

    fn key(agent: &mut Agent, name: &str) -> PropertyKey {
        PropertyKey::from_str(agent, name)
    }

    #[test]
    fn non_configurable_properties_reject_changes() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent);
        let x = key(&mut agent, "x");
        let frozen = PropertyDescriptor::data_with_attributes(
            Value::Integer(1),
            PropertyAttributes::FROZEN,
        );
        assert!(ordinary_define_own_property(&mut agent, object, x, frozen).unwrap());
        let change = PropertyDescriptor {
            value: Some(Value::Integer(2)),
            ..Default::default()
        };
        assert!(!ordinary_define_own_property(&mut agent, object, x, change).unwrap());
        let same = PropertyDescriptor {
            value: Some(Value::Integer(1)),
            ..Default::default()
        };
        assert!(ordinary_define_own_property(&mut agent, object, x, same).unwrap());
        let reconfigure = PropertyDescriptor {
            enumerable: Some(false),
            ..Default::default()
        };
        assert!(!ordinary_define_own_property(&mut agent, object, x, reconfigure).unwrap());
    }

    #[test]
    fn data_properties_become_accessors_and_back() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent);
        let x = key(&mut agent, "x");
        create_data_property_or_throw(&mut agent, object.into_object(), x, Value::Integer(1))
            .unwrap();
        let getter = create_builtin_function(&mut agent, |_, _, _| Ok(Value::Integer(7)), "get", 0);
        let accessor = PropertyDescriptor {
            get: Some(Some(getter.into_object())),
            ..Default::default()
        };
        assert!(ordinary_define_own_property(&mut agent, object, x, accessor).unwrap());
        let desc = ordinary_get_own_property(&mut agent, object, x).unwrap().unwrap();
        assert!(desc.is_accessor_descriptor());
        assert_eq!(desc.get, Some(Some(getter.into_object())));
        assert_eq!(desc.set, Some(None));
        assert_eq!(desc.enumerable, Some(true));
        assert_eq!(get(&mut agent, object.into_object(), x).unwrap(), Value::Integer(7));

        let data = PropertyDescriptor {
            value: Some(Value::Integer(3)),
            ..Default::default()
        };
        assert!(ordinary_define_own_property(&mut agent, object, x, data).unwrap());
        let desc = ordinary_get_own_property(&mut agent, object, x).unwrap().unwrap();
        assert_eq!(desc.value, Some(Value::Integer(3)));
        assert_eq!(desc.writable, Some(false));
        assert_eq!(desc.configurable, Some(true));
    }

    #[test]
    fn accessor_halves_merge() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent);
        let x = key(&mut agent, "x");
        let getter = create_builtin_function(&mut agent, |_, _, _| Ok(Value::Undefined), "get", 0);
        let setter = create_builtin_function(&mut agent, |_, _, _| Ok(Value::Undefined), "set", 1);
        let get_half = PropertyDescriptor {
            get: Some(Some(getter.into_object())),
            configurable: Some(true),
            ..Default::default()
        };
        define_property_or_throw(&mut agent, object.into_object(), x, get_half).unwrap();
        let set_half = PropertyDescriptor {
            set: Some(Some(setter.into_object())),
            ..Default::default()
        };
        define_property_or_throw(&mut agent, object.into_object(), x, set_half).unwrap();
        let desc = ordinary_get_own_property(&mut agent, object, x).unwrap().unwrap();
        assert_eq!(desc.get, Some(Some(getter.into_object())));
        assert_eq!(desc.set, Some(Some(setter.into_object())));
    }

    #[test]
    fn own_keys_order_indices_strings_then_symbols() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent).into_object();
        let b = key(&mut agent, "b");
        let a = key(&mut agent, "a");
        let symbol = PropertyKey::from(Symbol::new(&mut agent, Some("s")));
        for (key, value) in [
            (b, 1),
            (symbol, 2),
            (PropertyKey::Integer(2), 3),
            (a, 4),
            (PropertyKey::Integer(0), 5),
        ] {
            create_data_property_or_throw(&mut agent, object, key, Value::Integer(value)).unwrap();
        }
        let keys = object.internal_own_property_keys(&mut agent).unwrap();
        assert_eq!(
            keys,
            vec![PropertyKey::Integer(0), PropertyKey::Integer(2), b, a, symbol]
        );
    }

    #[test]
    fn private_symbols_are_not_own_keys() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent);
        let private = PropertyKey::from(Symbol::new_private(&mut agent, "p"));
        add_property(&mut agent, object, private, Value::Integer(1), PropertyAttributes::NONE);
        assert!(ordinary_own_property_keys(&mut agent, object).unwrap().is_empty());
        assert_eq!(object.get_own_data_value(&mut agent, private), Some(Value::Integer(1)));
    }

    #[test]
    fn enum_cache_is_shared_along_the_transition_tree() {
        let mut agent = Agent::new(Options::default());
        let a = key(&mut agent, "a");
        let b = key(&mut agent, "b");
        let c = key(&mut agent, "c");
        let long = ordinary_object_create_with_intrinsics(&mut agent);
        add_property(&mut agent, long, a, Value::Integer(1), PropertyAttributes::NONE);
        add_property(&mut agent, long, b, Value::Integer(2), PropertyAttributes::DONT_ENUM);
        add_property(&mut agent, long, c, Value::Integer(3), PropertyAttributes::NONE);
        assert_eq!(enumerable_own_keys(&mut agent, long).unwrap(), vec![a, c]);
        let map = long.map(&agent);
        assert_eq!(map.enum_length(&agent), Some(2));
        assert_eq!(map.descriptors(&agent).enum_cache(&agent.heap), &[a, c]);

        let short = ordinary_object_create_with_intrinsics(&mut agent);
        add_property(&mut agent, short, a, Value::Integer(1), PropertyAttributes::NONE);
        assert_eq!(enumerable_own_keys(&mut agent, short).unwrap(), vec![a]);
        assert_eq!(short.map(&agent).descriptors(&agent), map.descriptors(&agent));
        assert_eq!(map.descriptors(&agent).enum_cache(&agent.heap), &[a, c]);
    }

    #[test]
    fn enumerable_keys_include_elements() {
        let mut agent = Agent::new(Options::default());
        let array = create_array_from_list(&mut agent, &[Value::Integer(1), Value::Integer(2)]);
        let keys = enumerable_own_keys(&mut agent, array).unwrap();
        assert_eq!(keys, vec![PropertyKey::Integer(0), PropertyKey::Integer(1)]);
    }

    #[test]
    fn template_instances_share_a_map_with_native_accessors() {
        let mut agent = Agent::new(Options::default());
        let name = key(&mut agent, "answer");
        let accessor = NativeAccessor::new(
            &mut agent,
            AccessorInfo {
                name,
                getter: Some(Rc::new(|_, _, _| Ok(Value::Integer(42)))),
                setter: None,
                data: Value::Undefined,
                all_can_read: false,
                all_can_write: false,
                is_special_data_property: true,
            },
        );
        let template = ObjectTemplate::new(
            &mut agent,
            ObjectTemplateRecord {
                accessors: vec![(accessor, PropertyAttributes::DONT_ENUM)],
                ..Default::default()
            },
        );
        let first = ordinary_object_create_from_template(&mut agent, template);
        let second = ordinary_object_create_from_template(&mut agent, template);
        assert_eq!(first.map(&agent), second.map(&agent));
        assert_eq!(first.map(&agent).instance_type(&agent), InstanceType::ApiObject);
        assert_eq!(get(&mut agent, first.into_object(), name).unwrap(), Value::Integer(42));
        let desc = ordinary_get_own_property(&mut agent, first, name).unwrap().unwrap();
        assert!(desc.is_data_descriptor());
        assert_eq!(desc.value, Some(Value::Integer(42)));
        assert_eq!(desc.enumerable, Some(false));
    }

    #[test]
    fn interceptor_enumerators_extend_own_keys() {
        let mut agent = Agent::new(Options::default());
        let virtual_key = key(&mut agent, "virtual");
        let real = key(&mut agent, "real");
        let template = ObjectTemplate::new(
            &mut agent,
            ObjectTemplateRecord {
                named_interceptor: Some(InterceptorInfo {
                    enumerator: Some(Rc::new(move |_, _| Ok(vec![virtual_key]))),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let object = ordinary_object_create_from_template(&mut agent, template);
        add_property(&mut agent, object, real, Value::Integer(1), PropertyAttributes::NONE);
        assert_eq!(
            ordinary_own_property_keys(&mut agent, object).unwrap(),
            vec![real, virtual_key]
        );
    }

    #[test]
    fn set_with_foreign_receiver_defines_on_receiver() {
        let mut agent = Agent::new(Options::default());
        let x = key(&mut agent, "x");
        let target = ordinary_object_create_with_intrinsics(&mut agent);
        let receiver = ordinary_object_create_with_intrinsics(&mut agent);
        assert!(
            target
                .internal_set(&mut agent, x, Value::Integer(5), receiver.into_value())
                .unwrap()
        );
        assert_eq!(ordinary_get_own_property(&mut agent, target, x).unwrap(), None);
        assert_eq!(receiver.get_own_data_value(&mut agent, x), Some(Value::Integer(5)));
        set(&mut agent, target.into_object(), x, Value::Integer(6), true).unwrap();
        assert_eq!(target.get_own_data_value(&mut agent, x), Some(Value::Integer(6)));
    }

    #[test]
    fn object_create_shares_maps_per_prototype() {
        let mut agent = Agent::new(Options::default());
        let prototype = ordinary_object_create_with_intrinsics(&mut agent).into_object();
        let first = object_create(&mut agent, Some(prototype));
        let second = object_create(&mut agent, Some(prototype));
        assert_eq!(first.map(&agent), second.map(&agent));
        assert_eq!(first.prototype(&agent), Some(prototype));
        let orphan = object_create(&mut agent, None);
        assert_eq!(orphan.internal_get_prototype_of(&mut agent).unwrap(), None);
    }
}
