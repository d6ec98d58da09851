// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Property lookup
//!
//! A [`LookupIterator`] walks the prototype chain of a receiver looking for
//! one property key. Each call to [`LookupIterator::next`] stops at the next
//! place the property operation has to act on:
//!
//! ```text
//!   NotFound -> AccessCheck -> Interceptor -> Proxy | IntegerIndexedExotic
//!            -> Accessor | Data
//! ```
//!
//! Property protocols drive the iterator in a loop, handling each state and
//! moving on with `next` when a step did not settle the operation. Once the
//! walk ends without a match, a store may turn the iterator into the
//! `Transition` state, describing the Map or global cell that adding the
//! property will use.
//!
//! Interceptors marked non-masking are skipped on the first walk. If the
//! property is not found anywhere, the walk restarts and visits only those
//! interceptors.

use crate::ecmascript::{
    abstract_operations::type_conversion::canonical_numeric_index_string,
    builtins::{
        ordinary::{
            caches::search_with_cache,
            descriptor_array::{Accessor, DescriptorValue},
            dictionary::DictionaryValue,
            elements::{self, get_own_element},
            global_dictionary::{
                PropertyCell, add_cell, delete_cell, ensure_property_cell, find_cell,
                update_cell,
            },
            map::Map,
            map_transitions::{
                NormalizationMode, StoreOrigin, transition_to_accessor_property,
                transition_to_data_property,
            },
            map_updater::{prepare_for_data_property, reconfigure_existing_property},
            migration::{migrate_instance, migrate_to_map, normalize_properties, publish_map},
            property_details::{PropertyAttributes, PropertyDetails, PropertyKind, PropertyLocation},
            prototype::reoptimize_if_prototype,
        },
        proxy::Proxy,
        typed_array::{is_valid_integer_index, typed_array_get_element, typed_array_set_element},
    },
    execution::{
        Agent,
        embedder::{InterceptorInfo, PropertyCallbackInfo},
    },
    types::{Object, OrdinaryObject, PropertyKey, PropertyStorage, Value},
};
use crate::heap::heap_observer::WriteLocation;

/// Which holders a lookup visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Configuration {
    /// Only the receiver itself, including its interceptors.
    Own,
    OwnSkipInterceptor,
    /// The receiver and its prototype chain.
    PrototypeChain,
    PrototypeChainSkipInterceptor,
}

impl Configuration {
    fn is_own(self) -> bool {
        matches!(self, Configuration::Own | Configuration::OwnSkipInterceptor)
    }

    fn skips_interceptors(self) -> bool {
        matches!(
            self,
            Configuration::OwnSkipInterceptor | Configuration::PrototypeChainSkipInterceptor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupState {
    /// The holder requires an access check before it may be inspected.
    AccessCheck,
    /// The holder has an interceptor for the key.
    Interceptor,
    /// The holder is a proxy; the operation goes through its handler.
    Proxy,
    /// A numeric key of a typed array that is not a valid element. Such
    /// properties never exist and never fall through to the prototype.
    IntegerIndexedExotic,
    Accessor,
    Data,
    /// Not found, and a store will add the property as described by the
    /// prepared transition.
    Transition,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterceptorState {
    Uninitialized,
    SkipNonMasking,
    ProcessNonMasking,
}

/// Where the current property was found on the holder.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Found {
    Nothing,
    Descriptor(usize),
    Dictionary,
    Cell(PropertyCell),
    Element,
    TypedElement,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TransitionTarget {
    /// Indexed properties are added to the elements, never through a Map.
    Element,
    Map(Map),
    Cell(PropertyCell),
}

#[derive(Debug, Clone)]
pub struct LookupIterator {
    configuration: Configuration,
    state: LookupState,
    interceptor_state: InterceptorState,
    has_property: bool,
    details: PropertyDetails,
    key: PropertyKey,
    receiver: Value,
    initial_holder: Object,
    holder: Object,
    found: Found,
    transition: Option<TransitionTarget>,
}

fn empty_details() -> PropertyDetails {
    PropertyDetails::new_dictionary(PropertyKind::Data, PropertyAttributes::NONE, 0)
}

/// The object a lookup starts at for `receiver`. Primitive receivers look
/// up properties on %Object.prototype%.
pub(crate) fn lookup_root(agent: &Agent, receiver: Value) -> Object {
    match receiver {
        Value::Object(object) => object,
        _ => agent.intrinsics().object_prototype.into_object(),
    }
}

impl LookupIterator {
    /// Start a lookup of `key` on `receiver`.
    pub fn new(
        agent: &mut Agent,
        receiver: Value,
        key: PropertyKey,
        configuration: Configuration,
    ) -> Self {
        let holder = lookup_root(agent, receiver);
        Self::new_with_holder(agent, receiver, key, holder, configuration)
    }

    /// Start a lookup of `key` at `holder`, with `receiver` as the `this`
    /// value of any accessor or trap called.
    pub fn new_with_holder(
        agent: &mut Agent,
        receiver: Value,
        key: PropertyKey,
        holder: Object,
        configuration: Configuration,
    ) -> Self {
        // Private symbols are never inherited nor intercepted.
        let configuration = if key.is_private(agent) {
            Configuration::OwnSkipInterceptor
        } else {
            configuration
        };
        let mut iterator = Self {
            configuration,
            state: LookupState::NotFound,
            interceptor_state: InterceptorState::Uninitialized,
            has_property: false,
            details: empty_details(),
            key,
            receiver,
            initial_holder: holder,
            holder,
            found: Found::Nothing,
            transition: None,
        };
        iterator.next(agent);
        iterator
    }

    pub fn state(&self) -> LookupState {
        self.state
    }

    pub fn key(&self) -> PropertyKey {
        self.key
    }

    pub fn receiver(&self) -> Value {
        self.receiver
    }

    pub fn holder(&self) -> Object {
        self.holder
    }

    /// The object the walk started at.
    pub fn initial_holder(&self) -> Object {
        self.initial_holder
    }

    pub fn is_found(&self) -> bool {
        self.state != LookupState::NotFound
    }

    /// Returns true if the current property is an element of a typed array.
    pub(crate) fn is_typed_element(&self) -> bool {
        self.found == Found::TypedElement
    }

    pub fn is_element(&self) -> bool {
        matches!(self.key, PropertyKey::Integer(_))
    }

    pub fn index(&self) -> Option<u32> {
        self.key.as_array_index()
    }

    /// The holder as a Map-backed object. Only valid in states other than
    /// `Proxy`.
    pub(crate) fn holder_object(&self) -> OrdinaryObject {
        match self.holder {
            Object::Object(object) => object,
            Object::Proxy(_) => unreachable!("ordinary holder expected, found a proxy"),
        }
    }

    pub(crate) fn holder_proxy(&self) -> Proxy {
        match self.holder {
            Object::Proxy(proxy) => proxy,
            Object::Object(_) => unreachable!("proxy holder expected"),
        }
    }

    pub fn property_details(&self) -> PropertyDetails {
        debug_assert!(self.has_property);
        self.details
    }

    pub fn property_attributes(&self) -> PropertyAttributes {
        self.property_details().attributes()
    }

    pub fn is_read_only(&self) -> bool {
        self.property_details().is_read_only()
    }

    pub fn is_configurable(&self) -> bool {
        self.property_details().is_configurable()
    }

    /// Returns true if the current holder is the receiver itself.
    pub fn holder_is_receiver(&self) -> bool {
        self.receiver == Value::Object(self.holder)
    }

    /// The object a store adds new properties to, if the receiver is a
    /// Map-backed object.
    pub(crate) fn store_target(&self) -> Option<OrdinaryObject> {
        match self.receiver {
            Value::Object(Object::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// The prepared transition Map, if adding the property goes through
    /// one.
    pub fn transition_map(&self) -> Option<Map> {
        match self.transition {
            Some(TransitionTarget::Map(map)) => Some(map),
            _ => None,
        }
    }

    /// Advance to the next place the property may be found.
    pub fn next(&mut self, agent: &mut Agent) {
        debug_assert_ne!(self.state, LookupState::Transition);
        self.has_property = false;
        let mut holder = self.holder;
        self.state = self.lookup_in_holder(agent, holder);
        if self.is_found() {
            return;
        }
        loop {
            let Some(next) = self.next_holder(agent, holder) else {
                if self.interceptor_state == InterceptorState::SkipNonMasking {
                    self.restart_for_non_masking_interceptors(agent);
                    return;
                }
                break;
            };
            holder = next;
            self.state = self.lookup_in_holder(agent, holder);
            if self.is_found() {
                break;
            }
        }
        self.holder = holder;
    }

    /// Start the walk over from the initial holder.
    pub fn restart(&mut self, agent: &mut Agent) {
        self.interceptor_state = InterceptorState::Uninitialized;
        self.restart_internal(agent);
    }

    fn restart_for_non_masking_interceptors(&mut self, agent: &mut Agent) {
        self.interceptor_state = InterceptorState::ProcessNonMasking;
        self.restart_internal(agent);
    }

    fn restart_internal(&mut self, agent: &mut Agent) {
        self.state = LookupState::NotFound;
        self.details = empty_details();
        self.found = Found::Nothing;
        self.transition = None;
        self.holder = self.initial_holder;
        self.next(agent);
    }

    fn next_holder(&self, agent: &Agent, holder: Object) -> Option<Object> {
        if self.configuration.is_own() {
            return None;
        }
        match holder {
            Object::Object(object) => object.prototype(agent),
            // A proxy is always a stop of the walk.
            Object::Proxy(_) => None,
        }
    }

    fn lookup_in_holder(&mut self, agent: &mut Agent, holder: Object) -> LookupState {
        if self.interceptor_state == InterceptorState::ProcessNonMasking {
            return self.lookup_non_masking_interceptor_in_holder(agent, holder);
        }
        let object = match holder {
            Object::Proxy(_) if self.state == LookupState::NotFound => return LookupState::Proxy,
            Object::Proxy(_) => return LookupState::NotFound,
            Object::Object(object) => object,
        };
        if self.state == LookupState::NotFound && object.map(agent).is_deprecated(agent) {
            // Instances still on a deprecated Map move to its replacement
            // before anything reads their storage.
            migrate_instance(agent, object);
        }
        let map = object.map(agent);
        match self.state {
            LookupState::NotFound => {
                if map.is_access_check_needed(agent) && !self.key.is_private(agent) {
                    return LookupState::AccessCheck;
                }
                self.lookup_after_access_check(agent, object, map)
            }
            LookupState::AccessCheck => self.lookup_after_access_check(agent, object, map),
            LookupState::Interceptor => self.lookup_own_property(agent, object, map),
            LookupState::Accessor | LookupState::Data | LookupState::Proxy => LookupState::NotFound,
            LookupState::IntegerIndexedExotic | LookupState::Transition => {
                unreachable!("lookup continued past a terminal state")
            }
        }
    }

    fn lookup_after_access_check(
        &mut self,
        agent: &mut Agent,
        object: OrdinaryObject,
        map: Map,
    ) -> LookupState {
        if object.is_typed_array(agent) {
            match self.key {
                PropertyKey::Integer(index) => {
                    if !is_valid_integer_index(agent, object, index) {
                        return LookupState::IntegerIndexedExotic;
                    }
                    self.found = Found::TypedElement;
                    self.details = PropertyDetails::new_dictionary(
                        PropertyKind::Data,
                        PropertyAttributes::NONE,
                        0,
                    );
                    self.has_property = true;
                    return LookupState::Data;
                }
                PropertyKey::String(string)
                    if canonical_numeric_index_string(agent, string).is_some() =>
                {
                    return LookupState::IntegerIndexedExotic;
                }
                _ => {}
            }
        }
        if !self.configuration.skips_interceptors()
            && self.has_interceptor(agent, map)
            && !self.skip_interceptor(agent, map)
        {
            return LookupState::Interceptor;
        }
        self.lookup_own_property(agent, object, map)
    }

    fn lookup_non_masking_interceptor_in_holder(
        &mut self,
        agent: &mut Agent,
        holder: Object,
    ) -> LookupState {
        let Object::Object(object) = holder else {
            return LookupState::NotFound;
        };
        if self.state != LookupState::NotFound {
            return LookupState::NotFound;
        }
        let map = object.map(agent);
        if !self.configuration.skips_interceptors()
            && self.has_interceptor(agent, map)
            && !self.skip_interceptor(agent, map)
        {
            return LookupState::Interceptor;
        }
        LookupState::NotFound
    }

    fn lookup_own_property(
        &mut self,
        agent: &mut Agent,
        object: OrdinaryObject,
        map: Map,
    ) -> LookupState {
        let details = if let PropertyKey::Integer(index) = self.key {
            let Some((value, attributes)) = get_own_element(agent, object, index) else {
                return LookupState::NotFound;
            };
            self.found = Found::Element;
            let kind = match value {
                DictionaryValue::Data(_) => PropertyKind::Data,
                DictionaryValue::Accessor(_) => PropertyKind::Accessor,
            };
            PropertyDetails::new_dictionary(kind, attributes, 0)
        } else if object.is_global(agent) {
            let Some(cell) = find_cell(agent, object, self.key) else {
                return LookupState::NotFound;
            };
            if cell.is_the_hole(agent) {
                return LookupState::NotFound;
            }
            self.found = Found::Cell(cell);
            cell.details(agent)
        } else if map.is_dictionary_map(agent) {
            let PropertyStorage::Dictionary(dictionary) = &agent[object].properties else {
                unreachable!("dictionary Map without a property dictionary")
            };
            let Some(entry) = dictionary.find(self.key) else {
                return LookupState::NotFound;
            };
            self.found = Found::Dictionary;
            entry.details
        } else {
            let Some(descriptor) = search_with_cache(agent, map, self.key) else {
                return LookupState::NotFound;
            };
            self.found = Found::Descriptor(descriptor);
            map.descriptors(agent).get_details(&agent.heap, descriptor)
        };
        self.details = details;
        self.has_property = true;
        match details.kind() {
            PropertyKind::Data => LookupState::Data,
            PropertyKind::Accessor => LookupState::Accessor,
        }
    }

    fn interceptor_of(&self, agent: &Agent, map: Map) -> Option<InterceptorInfo> {
        let template = map.constructor(agent)?;
        if self.is_element() {
            template.indexed_interceptor(agent).cloned()
        } else {
            template.named_interceptor(agent).cloned()
        }
    }

    fn has_interceptor(&self, agent: &Agent, map: Map) -> bool {
        let has = if self.is_element() {
            map.has_indexed_interceptor(agent)
        } else {
            map.has_named_interceptor(agent)
        };
        if !has {
            return false;
        }
        // Interceptors only see symbols when they ask to.
        !self.key.is_symbol()
            || self
                .interceptor_of(agent, map)
                .is_some_and(|interceptor| interceptor.can_intercept_symbols)
    }

    fn skip_interceptor(&mut self, agent: &Agent, map: Map) -> bool {
        let non_masking = self
            .interceptor_of(agent, map)
            .is_some_and(|interceptor| interceptor.non_masking);
        if non_masking {
            match self.interceptor_state {
                InterceptorState::Uninitialized => {
                    self.interceptor_state = InterceptorState::SkipNonMasking;
                    true
                }
                InterceptorState::SkipNonMasking => true,
                InterceptorState::ProcessNonMasking => false,
            }
        } else {
            self.interceptor_state == InterceptorState::ProcessNonMasking
        }
    }

    /// The interceptor of the current holder. Only valid in the
    /// `Interceptor` state.
    pub(crate) fn get_interceptor(&self, agent: &Agent) -> InterceptorInfo {
        let map = self.holder_object().map(agent);
        self.interceptor_of(agent, map)
            .expect("interceptor state without an interceptor")
    }

    /// Arguments for a callback invoked on the current holder.
    pub(crate) fn callback_info(&self, data: Value) -> PropertyCallbackInfo {
        PropertyCallbackInfo {
            receiver: self.receiver,
            holder: self.holder_object(),
            data,
        }
    }

    /// Ask the embedder whether the current holder may be accessed. Only
    /// valid in the `AccessCheck` state.
    pub(crate) fn has_access(&self, agent: &mut Agent) -> bool {
        let holder = self.holder_object();
        let map = holder.map(agent);
        let Some(template) = map.constructor(agent) else {
            return true;
        };
        let Some(access_check) = template.access_check(agent) else {
            return true;
        };
        let callback = access_check.callback.clone();
        let data = access_check.data;
        callback(agent, holder, data)
    }

    /// Value of the current data property.
    pub fn get_data_value(&self, agent: &Agent) -> Value {
        debug_assert_eq!(self.state, LookupState::Data);
        let holder = self.holder_object();
        let value = match self.found {
            Found::Element => get_own_element(agent, holder, self.element_index())
                .and_then(|(value, _)| value.as_data()),
            Found::TypedElement => Some(typed_array_get_element(agent, holder, self.element_index())),
            Found::Cell(cell) => cell.value(agent).and_then(DictionaryValue::as_data),
            Found::Dictionary => self.dictionary_entry_value(agent).and_then(DictionaryValue::as_data),
            Found::Descriptor(descriptor) => {
                let map = holder.map(agent);
                match self.details.location() {
                    PropertyLocation::Field => {
                        let index = map.field_index(&agent.heap, descriptor);
                        Some(holder.raw_fast_property_at(agent, index))
                    }
                    PropertyLocation::Descriptor => {
                        map.descriptors(agent).get(&agent.heap, descriptor).constant()
                    }
                }
            }
            Found::Nothing => None,
        };
        value.unwrap_or(Value::Undefined)
    }

    /// Accessor of the current accessor property.
    pub fn get_accessors(&self, agent: &Agent) -> Accessor {
        debug_assert_eq!(self.state, LookupState::Accessor);
        let holder = self.holder_object();
        let value = match self.found {
            Found::Element => get_own_element(agent, holder, self.element_index())
                .and_then(|(value, _)| value.as_accessor()),
            Found::Cell(cell) => cell.value(agent).and_then(DictionaryValue::as_accessor),
            Found::Dictionary => self
                .dictionary_entry_value(agent)
                .and_then(DictionaryValue::as_accessor),
            Found::Descriptor(descriptor) => {
                match holder.map(agent).descriptors(agent).get_value(&agent.heap, descriptor) {
                    DescriptorValue::Accessor(accessor) => Some(accessor),
                    _ => None,
                }
            }
            Found::TypedElement | Found::Nothing => None,
        };
        value.expect("accessor state without an accessor")
    }

    fn dictionary_entry_value(&self, agent: &Agent) -> Option<DictionaryValue> {
        let PropertyStorage::Dictionary(dictionary) = &agent[self.holder_object()].properties else {
            return None;
        };
        dictionary.find(self.key).map(|entry| entry.value)
    }

    fn element_index(&self) -> u32 {
        self.index().expect("element lookup without an index")
    }

    /// Re-read the details of the property on the current holder after its
    /// storage changed.
    fn reload_property_information(&mut self, agent: &mut Agent) {
        self.state = LookupState::Interceptor;
        self.interceptor_state = InterceptorState::Uninitialized;
        self.has_property = false;
        let holder = self.holder;
        self.state = self.lookup_in_holder(agent, holder);
    }

    /// Make sure the current data property can hold `value` without
    /// changing its Map on write.
    pub(crate) fn prepare_for_data_property(&mut self, agent: &mut Agent, value: Value) {
        debug_assert!(matches!(self.state, LookupState::Data | LookupState::Accessor));
        let Found::Descriptor(descriptor) = self.found else {
            // Elements, cells and dictionaries take any value.
            return;
        };
        let holder = self.holder_object();
        let old_map = holder.map(agent);
        let new_map = prepare_for_data_property(agent, old_map, descriptor, value);
        if new_map == old_map {
            return;
        }
        migrate_to_map(agent, holder, new_map, 0);
        self.reload_property_information(agent);
    }

    /// Turn the current own property into a data property holding `value`
    /// with `attributes`.
    pub(crate) fn reconfigure_data_property(
        &mut self,
        agent: &mut Agent,
        value: Value,
        attributes: PropertyAttributes,
    ) {
        debug_assert!(matches!(self.state, LookupState::Data | LookupState::Accessor));
        debug_assert!(self.holder_is_receiver() || self.configuration.is_own());
        let holder = self.holder_object();
        match self.found {
            Found::Element => {
                elements::reconfigure_element(
                    agent,
                    holder,
                    self.element_index(),
                    DictionaryValue::Data(value),
                    attributes,
                );
                self.reload_property_information(agent);
                return;
            }
            Found::Descriptor(descriptor) => {
                let old_map = holder.map(agent);
                let new_map = reconfigure_existing_property(
                    agent,
                    old_map,
                    descriptor,
                    PropertyKind::Data,
                    attributes,
                );
                let new_map = if new_map.is_dictionary_map(agent) {
                    new_map
                } else {
                    prepare_for_data_property(agent, new_map, descriptor, value)
                };
                migrate_to_map(agent, holder, new_map, 0);
                self.reload_property_information(agent);
                if let Found::Dictionary = self.found {
                    // Normalized on the way: set the attributes in place.
                    self.set_dictionary_entry(agent, value, attributes);
                } else {
                    self.write_data_value(agent, value);
                }
            }
            Found::Dictionary => self.set_dictionary_entry(agent, value, attributes),
            Found::Cell(_) => {
                let details = PropertyDetails::new_dictionary(PropertyKind::Data, attributes, 0);
                let cell = update_cell(agent, holder, self.key, DictionaryValue::Data(value), details);
                self.found = Found::Cell(cell);
                self.details = cell.details(agent);
                self.state = LookupState::Data;
            }
            Found::TypedElement | Found::Nothing => {
                unreachable!("reconfiguring a property that cannot be reconfigured")
            }
        }
    }

    fn set_dictionary_entry(&mut self, agent: &mut Agent, value: Value, attributes: PropertyAttributes) {
        let holder = self.holder_object();
        let PropertyStorage::Dictionary(dictionary) = &mut agent[holder].properties else {
            unreachable!("dictionary property without a property dictionary")
        };
        let index = dictionary
            .find(self.key)
            .map_or(0, |entry| entry.details.dictionary_index());
        let details = PropertyDetails::new_dictionary(PropertyKind::Data, attributes, index);
        dictionary.set_entry(self.key, DictionaryValue::Data(value), details);
        agent.heap.record_write(WriteLocation::Properties(holder));
        self.details = details;
        self.state = LookupState::Data;
    }

    /// Find the Map or cell that adding the property to the receiver will
    /// use. Leaves the state unchanged if the receiver is not extensible.
    pub(crate) fn prepare_transition_to_data_property(
        &mut self,
        agent: &mut Agent,
        value: Value,
        attributes: PropertyAttributes,
        origin: StoreOrigin,
    ) {
        if self.state == LookupState::Transition {
            return;
        }
        let Some(receiver) = self.store_target() else {
            return;
        };
        if !self.key.is_private(agent) && !receiver.map(agent).is_extensible(agent) {
            return;
        }
        self.state = LookupState::Transition;
        if self.is_element() {
            self.transition = Some(TransitionTarget::Element);
            return;
        }
        if receiver.is_global(agent) {
            let cell = ensure_property_cell(agent, receiver, self.key);
            self.transition = Some(TransitionTarget::Cell(cell));
            return;
        }
        let map = receiver.map(agent);
        let new_map = transition_to_data_property(agent, map, self.key, value, attributes, origin);
        self.transition = Some(TransitionTarget::Map(new_map));
        if !new_map.is_dictionary_map(agent)
            && let Some(last) = new_map.last_added(&agent.heap)
        {
            self.details = new_map.descriptors(agent).get_details(&agent.heap, last);
            self.has_property = true;
        }
    }

    /// Add the prepared property to the receiver, holding `value`.
    pub(crate) fn apply_transition_to_data_property(
        &mut self,
        agent: &mut Agent,
        value: Value,
        attributes: PropertyAttributes,
    ) {
        debug_assert_eq!(self.state, LookupState::Transition);
        let Some(receiver) = self.store_target() else {
            unreachable!("transition prepared without an object receiver")
        };
        self.holder = receiver.into_object();
        match self.transition {
            Some(TransitionTarget::Element) => {
                elements::add_element(
                    agent,
                    receiver,
                    self.element_index(),
                    DictionaryValue::Data(value),
                    attributes,
                );
                self.reload_property_information(agent);
            }
            Some(TransitionTarget::Cell(_)) => {
                let details = PropertyDetails::new_dictionary(PropertyKind::Data, attributes, 0);
                let cell = add_cell(agent, receiver, self.key, DictionaryValue::Data(value), details);
                self.found = Found::Cell(cell);
                self.details = cell.details(agent);
                self.has_property = true;
                self.state = LookupState::Data;
            }
            Some(TransitionTarget::Map(new_map)) => {
                migrate_to_map(agent, receiver, new_map, 1);
                if new_map.is_dictionary_map(agent) {
                    let PropertyStorage::Dictionary(dictionary) = &mut agent[receiver].properties
                    else {
                        unreachable!("dictionary Map without a property dictionary")
                    };
                    let details = PropertyDetails::new_dictionary(PropertyKind::Data, attributes, 0);
                    dictionary.add(self.key, DictionaryValue::Data(value), details);
                    agent
                        .heap
                        .record_write(WriteLocation::Properties(receiver));
                    self.reload_property_information(agent);
                } else {
                    self.reload_property_information(agent);
                    self.write_data_value(agent, value);
                }
            }
            None => unreachable!("transition state without a target"),
        }
        self.transition = None;
    }

    /// Store `value` into the current data property.
    pub(crate) fn write_data_value(&mut self, agent: &mut Agent, value: Value) {
        debug_assert_eq!(self.state, LookupState::Data);
        let holder = self.holder_object();
        match self.found {
            Found::Element => elements::set_element(agent, holder, self.element_index(), value),
            Found::TypedElement => {
                let number = value.as_number().unwrap_or(f64::NAN);
                typed_array_set_element(agent, holder, self.element_index(), number);
            }
            Found::Cell(_) => {
                let cell = update_cell(
                    agent,
                    holder,
                    self.key,
                    DictionaryValue::Data(value),
                    self.details,
                );
                self.found = Found::Cell(cell);
                self.details = cell.details(agent);
            }
            Found::Dictionary => {
                let PropertyStorage::Dictionary(dictionary) = &mut agent[holder].properties else {
                    unreachable!("dictionary property without a property dictionary")
                };
                if let Some(entry) = dictionary.find_mut(self.key) {
                    entry.value = DictionaryValue::Data(value);
                }
                agent
                    .heap
                    .record_write(WriteLocation::Properties(holder));
            }
            Found::Descriptor(descriptor) => {
                if self.details.location() == PropertyLocation::Field {
                    let index = holder.map(agent).field_index(&agent.heap, descriptor);
                    holder.fast_property_at_put(agent, index, value);
                }
                // Constants were checked to equal `value` when preparing.
            }
            Found::Nothing => unreachable!("writing a property that was not found"),
        }
    }

    /// Remove the current own property from the holder.
    pub(crate) fn delete(&mut self, agent: &mut Agent) {
        let holder = self.holder_object();
        if self.is_element() {
            elements::delete_element(agent, holder, self.element_index());
        } else if holder.is_global(agent) {
            delete_cell(agent, holder, self.key);
        } else {
            if holder.has_fast_properties(agent) && !self.try_delete_last_added(agent, holder) {
                let mode = if holder.map(agent).is_prototype_map(agent) {
                    NormalizationMode::KeepInObjectProperties
                } else {
                    NormalizationMode::ClearInObjectProperties
                };
                normalize_properties(agent, holder, mode, 0, "DeletingProperty");
            }
            if let PropertyStorage::Dictionary(dictionary) = &mut agent[holder].properties {
                dictionary.delete(self.key);
                agent
                    .heap
                    .record_write(WriteLocation::Properties(holder));
            }
            reoptimize_if_prototype(agent, holder);
        }
        self.state = LookupState::NotFound;
        self.has_property = false;
        self.found = Found::Nothing;
    }

    /// Delete the most recently added property of a fast object by going
    /// back to the Map it was added from.
    fn try_delete_last_added(&mut self, agent: &mut Agent, holder: OrdinaryObject) -> bool {
        let Found::Descriptor(descriptor) = self.found else {
            return false;
        };
        let map = holder.map(agent);
        if map.last_added(&agent.heap) != Some(descriptor) || !self.details.is_configurable() {
            return false;
        }
        let Some(parent) = map.back_pointer(agent) else {
            return false;
        };
        if parent.is_deprecated(agent)
            || parent.number_of_own_descriptors(agent) + 1 != map.number_of_own_descriptors(agent)
            || parent.elements_kind(agent) != map.elements_kind(agent)
        {
            return false;
        }
        if self.details.location() == PropertyLocation::Field {
            let index = map.field_index(&agent.heap, descriptor);
            holder.set_field_slot(agent, index, Default::default());
            // The last field out of the backing store releases it.
            if !index.is_in_object()
                && index.out_of_object_index() == 0
                && let PropertyStorage::Fast(fields) = &mut agent[holder].properties
            {
                let words = fields.len() as isize;
                fields.clear();
                agent.heap.adjust_live_words(-words);
            }
        }
        map.notify_leaf_map_layout_change(agent);
        publish_map(agent, holder, parent);
        log::trace!("[fast delete of last property on {holder:?}]");
        true
    }

    /// Install getter and/or setter for the property on the receiver,
    /// merging with an existing accessor pair.
    pub(crate) fn transition_to_accessor_property(
        &mut self,
        agent: &mut Agent,
        getter: Option<Option<Object>>,
        setter: Option<Option<Object>>,
        attributes: PropertyAttributes,
    ) {
        let Some(receiver) = self.store_target() else {
            unreachable!("accessor definition without an object receiver")
        };
        let mut pair = match self.state {
            LookupState::Accessor if self.holder == receiver.into_object() => {
                match self.get_accessors(agent) {
                    Accessor::Pair(pair) => pair,
                    Accessor::Native(_) => Default::default(),
                }
            }
            _ => Default::default(),
        };
        if let Some(getter) = getter {
            pair.getter = getter;
        }
        if let Some(setter) = setter {
            pair.setter = setter;
        }
        self.holder = receiver.into_object();
        if !self.is_element() && !receiver.map(agent).is_dictionary_map(agent) {
            let map = receiver.map(agent);
            let new_map = transition_to_accessor_property(agent, map, self.key, pair, attributes);
            migrate_to_map(agent, receiver, new_map, 0);
            self.reload_property_information(agent);
            if !new_map.is_dictionary_map(agent) {
                return;
            }
        }
        self.transition_to_accessor(agent, Accessor::Pair(pair), attributes);
    }

    /// Install `accessor` as the property on the receiver, in dictionary
    /// mode.
    pub(crate) fn transition_to_accessor(
        &mut self,
        agent: &mut Agent,
        accessor: Accessor,
        attributes: PropertyAttributes,
    ) {
        let Some(receiver) = self.store_target() else {
            unreachable!("accessor definition without an object receiver")
        };
        self.holder = receiver.into_object();
        let details = PropertyDetails::new_dictionary(PropertyKind::Accessor, attributes, 0);
        let value = DictionaryValue::Accessor(accessor);
        if let Some(index) = self.index() {
            if receiver.is_typed_array(agent) {
                return;
            }
            let exists = get_own_element(agent, receiver, index).is_some();
            if exists {
                elements::reconfigure_element(agent, receiver, index, value, attributes);
            } else {
                elements::add_element(agent, receiver, index, value, attributes);
            }
        } else if receiver.is_global(agent) {
            add_cell(agent, receiver, self.key, value, details);
        } else {
            if receiver.has_fast_properties(agent) {
                let mode = if receiver.map(agent).is_prototype_map(agent) {
                    NormalizationMode::KeepInObjectProperties
                } else {
                    NormalizationMode::ClearInObjectProperties
                };
                normalize_properties(agent, receiver, mode, 0, "TransitionToAccessorPair");
            }
            let PropertyStorage::Dictionary(dictionary) = &mut agent[receiver].properties else {
                unreachable!("normalized object without a property dictionary")
            };
            match dictionary.find(self.key).map(|entry| entry.details.dictionary_index()) {
                Some(index) => {
                    dictionary.set_entry(self.key, value, details.set_dictionary_index(index))
                }
                None => dictionary.add(self.key, value, details),
            }
            agent
                .heap
                .record_write(WriteLocation::Properties(receiver));
            reoptimize_if_prototype(agent, receiver);
        }
        self.reload_property_information(agent);
    }
}
