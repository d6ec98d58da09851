// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod internal_methods;
mod property_key;

use std::ops::{Index, IndexMut};

pub use internal_methods::InternalMethods;
pub use property_key::{MAX_ARRAY_INDEX, PropertyKey};
pub(crate) use property_key::parse_array_index;

use super::{HeapNumber, Value};
use crate::{
    ecmascript::{
        builtins::{
            builtin_function::FunctionData,
            ordinary::{
                dictionary::NameDictionary, elements::ElementsStorage,
                global_dictionary::GlobalDictionary, map::Map,
                property_details::Representation,
            },
            proxy::Proxy,
            typed_array::TypedArrayData,
        },
        execution::{Agent, ExceptionType},
    },
    heap::{
        CreateHeapData, Heap,
        heap_observer::{StorageLayout, WriteLocation},
        indexes::ObjectIndex,
    },
};

/// ### [6.1.7 The Object Type](https://tc39.es/ecma262/#sec-object-type)
///
/// Every object is either backed by a Map describing its layout, or is a
/// proxy dispatching its internal methods to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Object {
    Object(OrdinaryObject),
    Proxy(Proxy),
}

impl Object {
    pub fn as_ordinary(self) -> Option<OrdinaryObject> {
        match self {
            Object::Object(object) => Some(object),
            Object::Proxy(_) => None,
        }
    }

    pub fn is_proxy(self) -> bool {
        matches!(self, Object::Proxy(_))
    }

    pub fn is_callable(self, agent: &Agent) -> bool {
        match self {
            Object::Object(object) => object.is_callable(agent),
            Object::Proxy(_) => false,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self)
    }
}

impl From<OrdinaryObject> for Object {
    fn from(value: OrdinaryObject) -> Self {
        Object::Object(value)
    }
}

impl From<Proxy> for Object {
    fn from(value: Proxy) -> Self {
        Object::Proxy(value)
    }
}

/// Handle to a Map-backed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrdinaryObject(pub(crate) ObjectIndex);

/// Contents of a single property slot of a fast-mode object.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FieldValue {
    /// Slot reserved by the Map but not yet written.
    #[default]
    Uninitialized,
    Tagged(Value),
    /// Field with `Double` representation, boxed in a mutable number owned by
    /// this slot.
    MutableDouble(HeapNumber),
}

/// Named property storage of an object.
#[derive(Debug)]
pub enum PropertyStorage {
    /// Out-of-object backing store of a fast-mode object. In-object fields
    /// live in [`ObjectHeapData::in_object`].
    Fast(Vec<FieldValue>),
    Dictionary(NameDictionary),
    /// Property cells of a global object.
    Global(GlobalDictionary),
}

impl PropertyStorage {
    pub(crate) fn backing_store_len(&self) -> usize {
        match self {
            PropertyStorage::Fast(fields) => fields.len(),
            _ => 0,
        }
    }
}

/// Exotic behaviour of an object beyond what its Map describes.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Ordinary,
    /// ### [10.4.2 Array Exotic Objects](https://tc39.es/ecma262/#sec-array-exotic-objects)
    Array {
        length: u32,
    },
    Function(FunctionData),
    Error(ExceptionType),
    /// ### [25.1 ArrayBuffer Objects](https://tc39.es/ecma262/#sec-arraybuffer-objects)
    ///
    /// A `None` buffer is detached.
    ArrayBuffer {
        data: Option<Vec<u8>>,
    },
    /// ### [10.4.5 Integer-Indexed Exotic Objects](https://tc39.es/ecma262/#sec-integer-indexed-exotic-objects)
    TypedArray(TypedArrayData),
    Global,
}

#[derive(Debug)]
pub struct ObjectHeapData {
    pub(crate) map: Map,
    /// In-object property slots; always `map.in_object_properties` long.
    pub(crate) in_object: Vec<FieldValue>,
    pub(crate) properties: PropertyStorage,
    pub(crate) elements: ElementsStorage,
    pub(crate) kind: ObjectKind,
}

impl ObjectHeapData {
    pub(crate) fn storage_layout(&self) -> StorageLayout {
        StorageLayout {
            dictionary: !matches!(self.properties, PropertyStorage::Fast(_)),
            in_object_slots: self.in_object.len() as u32,
            backing_store_slots: self.properties.backing_store_len() as u32,
        }
    }
}

/// Location of a fast-mode field, computed from the Map's in-object count
/// and a descriptor's field index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIndex {
    pub(crate) property_index: u32,
    pub(crate) in_object_properties: u32,
    pub(crate) representation: Representation,
}

impl FieldIndex {
    pub(crate) fn new(
        property_index: u32,
        in_object_properties: u32,
        representation: Representation,
    ) -> Self {
        Self {
            property_index,
            in_object_properties,
            representation,
        }
    }

    pub fn is_in_object(self) -> bool {
        self.property_index < self.in_object_properties
    }

    pub fn is_double(self) -> bool {
        self.representation == Representation::Double
    }

    /// Index into the out-of-object backing store.
    pub fn out_of_object_index(self) -> usize {
        debug_assert!(!self.is_in_object());
        (self.property_index - self.in_object_properties) as usize
    }
}

impl OrdinaryObject {
    pub(crate) fn get_index(self) -> usize {
        self.0.into_index()
    }

    pub fn map(self, agent: &Agent) -> Map {
        agent[self].map
    }

    pub(crate) fn heap_map(self, heap: &Heap) -> Map {
        heap.objects[self.get_index()]
            .as_ref()
            .expect("Object slot empty")
            .map
    }

    pub fn kind(self, agent: &Agent) -> &ObjectKind {
        &agent[self].kind
    }

    pub fn is_callable(self, agent: &Agent) -> bool {
        matches!(agent[self].kind, ObjectKind::Function(_))
    }

    pub fn is_array(self, agent: &Agent) -> bool {
        matches!(agent[self].kind, ObjectKind::Array { .. })
    }

    pub fn is_typed_array(self, agent: &Agent) -> bool {
        matches!(agent[self].kind, ObjectKind::TypedArray(_))
    }

    pub fn is_global(self, agent: &Agent) -> bool {
        matches!(agent[self].kind, ObjectKind::Global)
    }

    pub fn has_fast_properties(self, agent: &Agent) -> bool {
        matches!(agent[self].properties, PropertyStorage::Fast(_))
    }

    pub fn is_dictionary_mode(self, agent: &Agent) -> bool {
        !self.has_fast_properties(agent)
    }

    pub fn prototype(self, agent: &Agent) -> Option<Object> {
        self.map(agent).prototype(agent)
    }

    pub fn into_value(self) -> Value {
        Value::Object(Object::Object(self))
    }

    pub fn into_object(self) -> Object {
        Object::Object(self)
    }

    /// Read a fast-mode field. Double fields are read out of their box.
    pub(crate) fn raw_fast_property_at(self, agent: &Agent, index: FieldIndex) -> Value {
        let data = &agent[self];
        let slot = if index.is_in_object() {
            data.in_object[index.property_index as usize]
        } else {
            let PropertyStorage::Fast(fields) = &data.properties else {
                unreachable!("fast property read on a dictionary-mode object")
            };
            fields[index.out_of_object_index()]
        };
        match slot {
            FieldValue::Uninitialized => Value::Undefined,
            FieldValue::Tagged(value) => value,
            FieldValue::MutableDouble(number) => Value::from_f64(agent[number]),
        }
    }

    /// Write a fast-mode field. Writing a double into a `Double` field
    /// overwrites the existing box in place.
    pub(crate) fn fast_property_at_put(self, agent: &mut Agent, index: FieldIndex, value: Value) {
        let slot = self.field_slot(agent, index);
        let new_slot = if index.is_double() {
            let number = value.as_number().unwrap_or(f64::NAN);
            match slot {
                FieldValue::MutableDouble(heap_number) => {
                    agent[heap_number] = number;
                    return;
                }
                _ => FieldValue::MutableDouble(HeapNumber::new(&mut agent.heap, number)),
            }
        } else {
            FieldValue::Tagged(value)
        };
        self.set_field_slot(agent, index, new_slot);
    }

    pub(crate) fn field_slot(self, agent: &Agent, index: FieldIndex) -> FieldValue {
        let data = &agent[self];
        if index.is_in_object() {
            data.in_object[index.property_index as usize]
        } else {
            let PropertyStorage::Fast(fields) = &data.properties else {
                unreachable!("fast property read on a dictionary-mode object")
            };
            fields[index.out_of_object_index()]
        }
    }

    pub(crate) fn set_field_slot(self, agent: &mut Agent, index: FieldIndex, slot: FieldValue) {
        let data = &mut agent[self];
        if index.is_in_object() {
            data.in_object[index.property_index as usize] = slot;
        } else {
            let PropertyStorage::Fast(fields) = &mut data.properties else {
                unreachable!("fast property write on a dictionary-mode object")
            };
            fields[index.out_of_object_index()] = slot;
        }
        agent.heap.record_write(WriteLocation::Properties(self));
    }

    /// Allocate a new object with the given Map and storage.
    pub(crate) fn create(agent: &mut Agent, data: ObjectHeapData) -> Self {
        agent.heap.create(data)
    }
}

impl CreateHeapData<ObjectHeapData, OrdinaryObject> for Heap {
    fn create(&mut self, data: ObjectHeapData) -> OrdinaryObject {
        // Header: map, properties and elements pointers.
        let words = 3 + data.in_object.len() + data.properties.backing_store_len();
        self.allocate(words, "JSObject");
        Heap::reserve(&mut self.objects, 1, "JSObject");
        self.objects.push(Some(data));
        OrdinaryObject(ObjectIndex::last(&self.objects))
    }
}

impl Index<OrdinaryObject> for Agent {
    type Output = ObjectHeapData;

    fn index(&self, index: OrdinaryObject) -> &Self::Output {
        self.heap
            .objects
            .get(index.get_index())
            .expect("Object out of bounds")
            .as_ref()
            .expect("Object slot empty")
    }
}

impl IndexMut<OrdinaryObject> for Agent {
    fn index_mut(&mut self, index: OrdinaryObject) -> &mut Self::Output {
        self.heap
            .objects
            .get_mut(index.get_index())
            .expect("Object out of bounds")
            .as_mut()
            .expect("Object slot empty")
    }
}
