// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Global property cells
//!
//! The global object stores every property in its own [`PropertyCell`], so
//! that compiled code can embed the cell and depend on its contents. A cell
//! tracks how its value has evolved in its
//! [`PropertyCellType`]: code may assume a `Constant` cell never changes,
//! and is deoptimized when the type moves on.
//!
//! Deleting a global property does not remove its entry: the cell is
//! swapped for a fresh one holding the hole, and the old cell is
//! invalidated.

use std::ops::{Index, IndexMut};

use hashbrown::HashMap;

use super::{
    dependent_code::{CodeId, DependencyGroup, DependentCode, mark_code_for_deoptimization},
    dictionary::DictionaryValue,
    property_details::{
        MAX_ENUMERATION_INDEX, PropertyAttributes, PropertyCellType, PropertyDetails,
        PropertyKind,
    },
};
use crate::{
    ecmascript::{
        execution::Agent,
        types::{Object, OrdinaryObject, PropertyKey, PropertyStorage, Value},
    },
    heap::{CreateHeapData, Heap, heap_observer::WriteLocation, indexes::PropertyCellIndex},
};

#[derive(Debug, Clone)]
pub struct PropertyCellRecord {
    pub(crate) key: PropertyKey,
    /// `None` is the hole: the property does not currently exist.
    pub(crate) value: Option<DictionaryValue>,
    pub(crate) details: PropertyDetails,
    pub(crate) dependent_code: DependentCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyCell(pub(crate) PropertyCellIndex);

impl PropertyCell {
    pub(crate) fn get_index(self) -> usize {
        self.0.into_index()
    }

    fn new(agent: &mut Agent, key: PropertyKey, value: Option<DictionaryValue>, details: PropertyDetails) -> Self {
        agent.heap.create(PropertyCellRecord {
            key,
            value,
            details,
            dependent_code: DependentCode::default(),
        })
    }

    pub fn key(self, agent: &Agent) -> PropertyKey {
        agent[self].key
    }

    pub fn value(self, agent: &Agent) -> Option<DictionaryValue> {
        agent[self].value
    }

    pub fn details(self, agent: &Agent) -> PropertyDetails {
        agent[self].details
    }

    pub fn cell_type(self, agent: &Agent) -> PropertyCellType {
        agent[self].details.cell_type()
    }

    pub fn is_the_hole(self, agent: &Agent) -> bool {
        agent[self].value.is_none()
    }

    pub fn add_dependent_code(self, agent: &mut Agent, code: CodeId) {
        agent[self]
            .dependent_code
            .insert(DependencyGroup::PropertyCell, code);
    }

    pub(crate) fn set_value(self, agent: &mut Agent, value: Option<DictionaryValue>) {
        agent[self].value = value;
        agent.heap.record_write(WriteLocation::PropertyCell(self));
    }

    pub(crate) fn set_details(self, agent: &mut Agent, details: PropertyDetails) {
        agent[self].details = details;
        agent.heap.record_write(WriteLocation::PropertyCell(self));
    }

    fn deoptimize_dependent_code(self, agent: &mut Agent) {
        let codes = agent[self]
            .dependent_code
            .take_group(DependencyGroup::PropertyCell);
        mark_code_for_deoptimization(agent, DependencyGroup::PropertyCell, codes);
    }

    /// The cell type after storing `value` into a data cell currently
    /// described by `details`.
    pub(crate) fn updated_type(self, agent: &Agent, value: Value, details: PropertyDetails) -> PropertyCellType {
        let Some(current) = agent[self].value else {
            // A deleted or never-initialized cell may become constant once.
            return match details.cell_type() {
                PropertyCellType::Invalidated => PropertyCellType::Mutable,
                _ if value.is_undefined() => PropertyCellType::Undefined,
                _ => PropertyCellType::Constant,
            };
        };
        let DictionaryValue::Data(current) = current else {
            return PropertyCellType::Mutable;
        };
        match details.cell_type() {
            PropertyCellType::Undefined => PropertyCellType::Constant,
            PropertyCellType::Constant if current == value => PropertyCellType::Constant,
            PropertyCellType::Constant | PropertyCellType::ConstantType
                if remains_constant_type(agent, current, value) =>
            {
                PropertyCellType::ConstantType
            }
            _ => PropertyCellType::Mutable,
        }
    }
}

/// Whether `new` has the same type as `old` for the purposes of a
/// `ConstantType` cell.
fn remains_constant_type(agent: &Agent, old: Value, new: Value) -> bool {
    match (old, new) {
        (Value::Integer(_), Value::Integer(_))
        | (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_))
        | (Value::Boolean(_), Value::Boolean(_))
        | (Value::Symbol(_), Value::Symbol(_)) => true,
        (Value::Object(Object::Object(a)), Value::Object(Object::Object(b))) => {
            let map = b.map(agent);
            a.map(agent) == map && map.is_stable(agent)
        }
        _ => false,
    }
}

/// Property cells of a global object.
#[derive(Debug, Clone)]
pub struct GlobalDictionary {
    cells: HashMap<PropertyKey, PropertyCell>,
    next_enumeration_index: u32,
}

impl Default for GlobalDictionary {
    fn default() -> Self {
        Self {
            cells: HashMap::new(),
            next_enumeration_index: 1,
        }
    }
}

impl GlobalDictionary {
    pub fn find(&self, key: PropertyKey) -> Option<PropertyCell> {
        self.cells.get(&key).copied()
    }

    /// Number of entries, including deleted (hole) cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn take_enumeration_index(&mut self, heap: &mut Heap) -> u32 {
        if self.next_enumeration_index > MAX_ENUMERATION_INDEX {
            let order = self.iteration_order(heap);
            for (i, cell) in order.iter().enumerate() {
                let record = &mut heap[*cell];
                record.details = record.details.set_dictionary_index(i as u32 + 1);
            }
            self.next_enumeration_index = order.len() as u32 + 1;
        }
        let index = self.next_enumeration_index;
        self.next_enumeration_index += 1;
        index
    }

    /// Live cells sorted by enumeration index.
    pub fn iteration_order(&self, heap: &Heap) -> Vec<PropertyCell> {
        let mut cells: Vec<(u32, PropertyCell)> = self
            .cells
            .values()
            .filter(|cell| heap[**cell].value.is_some())
            .map(|cell| (heap[*cell].details.dictionary_index(), *cell))
            .collect();
        cells.sort_unstable_by_key(|(index, _)| *index);
        cells.into_iter().map(|(_, cell)| cell).collect()
    }
}

fn global_dictionary(agent: &Agent, global: OrdinaryObject) -> &GlobalDictionary {
    match &agent[global].properties {
        PropertyStorage::Global(dictionary) => dictionary,
        _ => unreachable!("global object without a global dictionary"),
    }
}

fn global_dictionary_mut(agent: &mut Agent, global: OrdinaryObject) -> &mut GlobalDictionary {
    match &mut agent[global].properties {
        PropertyStorage::Global(dictionary) => dictionary,
        _ => unreachable!("global object without a global dictionary"),
    }
}

/// Take the next enumeration index of the global dictionary of `global`.
fn next_enumeration_index(agent: &mut Agent, global: OrdinaryObject) -> u32 {
    let mut dictionary = std::mem::take(global_dictionary_mut(agent, global));
    let index = dictionary.take_enumeration_index(&mut agent.heap);
    *global_dictionary_mut(agent, global) = dictionary;
    index
}

/// Find the cell of `key` on `global`, live or not.
pub fn find_cell(agent: &Agent, global: OrdinaryObject, key: PropertyKey) -> Option<PropertyCell> {
    global_dictionary(agent, global).find(key)
}

/// Live cells of `global` in enumeration order.
pub fn global_iteration_order(agent: &Agent, global: OrdinaryObject) -> Vec<PropertyCell> {
    global_dictionary(agent, global).iteration_order(&agent.heap)
}

/// The cell for `key`, creating an uninitialized (hole) cell if needed.
pub(crate) fn ensure_property_cell(agent: &mut Agent, global: OrdinaryObject, key: PropertyKey) -> PropertyCell {
    if let Some(cell) = find_cell(agent, global, key) {
        debug_assert!(cell.is_the_hole(agent));
        return cell;
    }
    let details = PropertyDetails::new_cell(
        PropertyKind::Data,
        PropertyAttributes::NONE,
        0,
        PropertyCellType::Undefined,
    );
    let cell = PropertyCell::new(agent, key, None, details);
    global_dictionary_mut(agent, global).cells.insert(key, cell);
    agent.heap.record_write(WriteLocation::Properties(global));
    cell
}

/// Add a property that has no entry yet.
pub(crate) fn add_cell(
    agent: &mut Agent,
    global: OrdinaryObject,
    key: PropertyKey,
    value: DictionaryValue,
    details: PropertyDetails,
) -> PropertyCell {
    if find_cell(agent, global, key).is_some() {
        return update_cell(agent, global, key, value, details);
    }
    let index = next_enumeration_index(agent, global);
    let cell_type = match value {
        DictionaryValue::Data(Value::Undefined) => PropertyCellType::Undefined,
        DictionaryValue::Data(_) => PropertyCellType::Constant,
        DictionaryValue::Accessor(_) => PropertyCellType::Mutable,
    };
    let details = details.set_dictionary_index(index).set_cell_type(cell_type);
    let cell = PropertyCell::new(agent, key, Some(value), details);
    global_dictionary_mut(agent, global).cells.insert(key, cell);
    agent.heap.record_write(WriteLocation::Properties(global));
    cell
}

/// Swap the cell of `key` for a fresh copy and invalidate the old one,
/// deoptimizing code that embedded it.
pub(crate) fn invalidate_entry(agent: &mut Agent, global: OrdinaryObject, key: PropertyKey) -> PropertyCell {
    let Some(old_cell) = find_cell(agent, global, key) else {
        unreachable!("invalidating a missing global property cell")
    };
    let old = agent[old_cell].clone();
    let is_the_hole = old.value.is_none();
    let new_type = if is_the_hole {
        PropertyCellType::Invalidated
    } else {
        PropertyCellType::Mutable
    };
    let new_cell = PropertyCell::new(agent, key, old.value, old.details.set_cell_type(new_type));
    global_dictionary_mut(agent, global).cells.insert(key, new_cell);
    agent.heap.record_write(WriteLocation::Properties(global));
    // The old cell must read as stale to anything still holding it.
    old_cell.set_value(
        agent,
        if is_the_hole {
            Some(DictionaryValue::Data(Value::Undefined))
        } else {
            None
        },
    );
    old_cell.set_details(agent, old.details.set_cell_type(PropertyCellType::Invalidated));
    old_cell.deoptimize_dependent_code(agent);
    log::debug!("Invalidated global property cell {:?}", old_cell.0);
    new_cell
}

/// Store `value` with `details` into the existing entry for `key`, updating
/// the cell type and deoptimizing dependents as needed.
pub(crate) fn update_cell(
    agent: &mut Agent,
    global: OrdinaryObject,
    key: PropertyKey,
    value: DictionaryValue,
    details: PropertyDetails,
) -> PropertyCell {
    let Some(mut cell) = find_cell(agent, global, key) else {
        unreachable!("updating a missing global property cell")
    };
    let original = cell.details(agent);
    let mut invalidate =
        original.kind() == PropertyKind::Data && details.kind() == PropertyKind::Accessor;
    let mut index = original.dictionary_index();
    let old_type = original.cell_type();
    // Keep the enumeration index unless the property was deleted or never
    // initialized.
    if cell.is_the_hole(agent) {
        index = next_enumeration_index(agent, global);
        invalidate = true;
    }
    let new_type = match value {
        DictionaryValue::Data(value) => cell.updated_type(agent, value, original),
        DictionaryValue::Accessor(_) => PropertyCellType::Mutable,
    };
    if invalidate {
        cell = invalidate_entry(agent, global, key);
    }
    let details = details.set_dictionary_index(index).set_cell_type(new_type);
    cell.set_details(agent, details);
    cell.set_value(agent, Some(value));
    if !invalidate && (old_type != new_type || original.is_read_only() != details.is_read_only()) {
        cell.deoptimize_dependent_code(agent);
    }
    cell
}

/// Delete the property `key` of `global`: the entry stays, holding the hole.
pub(crate) fn delete_cell(agent: &mut Agent, global: OrdinaryObject, key: PropertyKey) {
    let cell = invalidate_entry(agent, global, key);
    cell.set_value(agent, None);
    let details = cell.details(agent).set_cell_type(PropertyCellType::Invalidated);
    cell.set_details(agent, details);
}

impl CreateHeapData<PropertyCellRecord, PropertyCell> for Heap {
    fn create(&mut self, data: PropertyCellRecord) -> PropertyCell {
        self.allocate(4, "PropertyCell");
        Heap::reserve(&mut self.property_cells, 1, "PropertyCell");
        self.property_cells.push(Some(data));
        PropertyCell(PropertyCellIndex::last(&self.property_cells))
    }
}

impl Index<PropertyCell> for Heap {
    type Output = PropertyCellRecord;

    fn index(&self, index: PropertyCell) -> &Self::Output {
        self.property_cells
            .get(index.get_index())
            .expect("PropertyCell out of bounds")
            .as_ref()
            .expect("PropertyCell slot empty")
    }
}

impl IndexMut<PropertyCell> for Heap {
    fn index_mut(&mut self, index: PropertyCell) -> &mut Self::Output {
        self.property_cells
            .get_mut(index.get_index())
            .expect("PropertyCell out of bounds")
            .as_mut()
            .expect("PropertyCell slot empty")
    }
}

impl Index<PropertyCell> for Agent {
    type Output = PropertyCellRecord;

    fn index(&self, index: PropertyCell) -> &Self::Output {
        &self.heap[index]
    }
}

impl IndexMut<PropertyCell> for Agent {
    fn index_mut(&mut self, index: PropertyCell) -> &mut Self::Output {
        &mut self.heap[index]
    }
}
