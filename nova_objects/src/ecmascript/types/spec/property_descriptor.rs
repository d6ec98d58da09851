// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::ecmascript::{
    abstract_operations::{
        operations_on_objects::{create_data_property_or_throw, get, has_property},
        type_conversion::to_boolean,
    },
    builtins::ordinary::{ordinary_object_create_with_intrinsics, property_details::PropertyAttributes},
    execution::{Agent, ExceptionType, JsResult},
    types::{Object, PropertyKey, String, Value},
};

/// ### [6.2.6 The Property Descriptor Specification Type](https://tc39.es/ecma262/#sec-property-descriptor-specification-type)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PropertyDescriptor {
    /// \[\[Value]]
    pub value: Option<Value>,

    /// \[\[Writable]]
    pub writable: Option<bool>,

    /// \[\[Get]]
    ///
    /// Note: double-Option because these fields can be set explicitly undefined
    /// to unset them.
    pub get: Option<Option<Object>>,

    /// \[\[Set]]
    ///
    /// Note: double-Option because these fields can be set explicitly undefined
    /// to unset them.
    pub set: Option<Option<Object>>,

    /// \[\[Enumerable]]
    pub enumerable: Option<bool>,

    /// \[\[Configurable]]
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// A writable, enumerable and configurable data descriptor.
    pub fn new_data_descriptor(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            writable: Some(true),
            enumerable: Some(true),
            configurable: Some(true),
            ..Default::default()
        }
    }

    /// A fully populated data descriptor with the given attributes.
    pub fn data_with_attributes(value: Value, attributes: PropertyAttributes) -> Self {
        Self {
            value: Some(value),
            writable: Some(!attributes.is_read_only()),
            enumerable: Some(!attributes.is_dont_enum()),
            configurable: Some(!attributes.is_dont_delete()),
            ..Default::default()
        }
    }

    /// A fully populated accessor descriptor with the given attributes.
    pub fn accessor_with_attributes(
        getter: Option<Object>,
        setter: Option<Object>,
        attributes: PropertyAttributes,
    ) -> Self {
        Self {
            get: Some(getter),
            set: Some(setter),
            enumerable: Some(!attributes.is_dont_enum()),
            configurable: Some(!attributes.is_dont_delete()),
            ..Default::default()
        }
    }

    /// ### [6.2.6.1 IsAccessorDescriptor ( Desc )](https://tc39.es/ecma262/#sec-isaccessordescriptor)
    pub fn is_accessor_descriptor(&self) -> bool {
        // 1. If Desc is undefined, return false.
        match (self.get, self.set) {
            // 2. If Desc has a [[Get]] field, return true.
            (Some(_), _) => true,
            // 3. If Desc has a [[Set]] field, return true.
            (_, Some(_)) => true,
            // 4. Return false.
            _ => false,
        }
    }

    /// ### [6.2.6.2 IsDataDescriptor ( Desc )](https://tc39.es/ecma262/#sec-isdatadescriptor)
    pub fn is_data_descriptor(&self) -> bool {
        // 1. If Desc is undefined, return false.
        match (self.value, self.writable) {
            // 2. If Desc has a [[Value]] field, return true.
            (Some(_), _) => true,
            // 3. If Desc has a [[Writable]] field, return true.
            (_, Some(_)) => true,
            // 4. Return false.
            _ => false,
        }
    }

    /// ### [6.2.6.3 IsGenericDescriptor ( Desc )](https://tc39.es/ecma262/#sec-isgenericdescriptor)
    pub fn is_generic_descriptor(&self) -> bool {
        // 1. If Desc is undefined, return false.
        // 2. If IsAccessorDescriptor(Desc) is true, return false.
        // 3. If IsDataDescriptor(Desc) is true, return false.
        // 4. Return true.
        !self.is_accessor_descriptor() && !self.is_data_descriptor()
    }

    /// Attributes the descriptor requests, with absent fields taken from
    /// `current`.
    pub fn attributes_over(&self, current: PropertyAttributes) -> PropertyAttributes {
        let mut attributes = PropertyAttributes::NONE;
        let read_only = match self.writable {
            Some(writable) => !writable,
            None => current.is_read_only(),
        };
        if read_only && !self.is_accessor_descriptor() {
            attributes = attributes.union(PropertyAttributes::READ_ONLY);
        }
        if !self.enumerable.unwrap_or(!current.is_dont_enum()) {
            attributes = attributes.union(PropertyAttributes::DONT_ENUM);
        }
        if !self.configurable.unwrap_or(!current.is_dont_delete()) {
            attributes = attributes.union(PropertyAttributes::DONT_DELETE);
        }
        attributes
    }

    /// Attributes of a property created from this descriptor; absent fields
    /// default to false.
    pub fn attributes(&self) -> PropertyAttributes {
        self.attributes_over(PropertyAttributes::ALL)
    }

    /// ### [6.2.6.4 FromPropertyDescriptor ( Desc )](https://tc39.es/ecma262/#sec-frompropertydescriptor)
    pub fn from_property_descriptor(
        desc: Option<Self>,
        agent: &mut Agent,
    ) -> JsResult<Option<Object>> {
        // 1. If Desc is undefined, return undefined.
        let Some(desc) = desc else {
            return Ok(None);
        };
        // 2. Let obj be OrdinaryObjectCreate(%Object.prototype%).
        let obj = ordinary_object_create_with_intrinsics(agent).into_object();
        // 3. Assert: obj is an extensible ordinary object with no own properties.
        // 4. If Desc has a [[Value]] field, then
        if let Some(value) = desc.value {
            // a. Perform ! CreateDataPropertyOrThrow(obj, "value", Desc.[[Value]]).
            let key = PropertyKey::from_str(agent, "value");
            create_data_property_or_throw(agent, obj, key, value)?;
        }
        // 5. If Desc has a [[Writable]] field, then
        if let Some(writable) = desc.writable {
            let key = PropertyKey::from_str(agent, "writable");
            create_data_property_or_throw(agent, obj, key, Value::Boolean(writable))?;
        }
        // 6. If Desc has a [[Get]] field, then
        if let Some(getter) = desc.get {
            let key = PropertyKey::from_str(agent, "get");
            let value = getter.map_or(Value::Undefined, Value::Object);
            create_data_property_or_throw(agent, obj, key, value)?;
        }
        // 7. If Desc has a [[Set]] field, then
        if let Some(setter) = desc.set {
            let key = PropertyKey::from_str(agent, "set");
            let value = setter.map_or(Value::Undefined, Value::Object);
            create_data_property_or_throw(agent, obj, key, value)?;
        }
        // 8. If Desc has an [[Enumerable]] field, then
        if let Some(enumerable) = desc.enumerable {
            let key = PropertyKey::from_str(agent, "enumerable");
            create_data_property_or_throw(agent, obj, key, Value::Boolean(enumerable))?;
        }
        // 9. If Desc has a [[Configurable]] field, then
        if let Some(configurable) = desc.configurable {
            let key = PropertyKey::from_str(agent, "configurable");
            create_data_property_or_throw(agent, obj, key, Value::Boolean(configurable))?;
        }
        // 10. Return obj.
        Ok(Some(obj))
    }

    /// ### [6.2.6.5 ToPropertyDescriptor ( Obj )](https://tc39.es/ecma262/#sec-topropertydescriptor)
    pub fn to_property_descriptor(agent: &mut Agent, obj: Value) -> JsResult<Self> {
        // 1. If Obj is not an Object, throw a TypeError exception.
        let Value::Object(obj) = obj else {
            return Err(agent.throw_exception_with_static_message(
                ExceptionType::TypeError,
                "Property description must be an object",
            ));
        };
        // 2. Let desc be a new Property Descriptor that initially has no
        // fields.
        let mut desc = PropertyDescriptor::default();
        let field = |agent: &mut Agent, name: &str| -> JsResult<Option<Value>> {
            let key = PropertyKey::String(String::from_str(agent, name));
            if has_property(agent, obj, key)? {
                Ok(Some(get(agent, obj, key)?))
            } else {
                Ok(None)
            }
        };
        // 3.-4. hasEnumerable / enumerable
        if let Some(enumerable) = field(agent, "enumerable")? {
            desc.enumerable = Some(to_boolean(agent, enumerable));
        }
        // 5.-6. hasConfigurable / configurable
        if let Some(configurable) = field(agent, "configurable")? {
            desc.configurable = Some(to_boolean(agent, configurable));
        }
        // 7.-8. hasValue / value
        if let Some(value) = field(agent, "value")? {
            desc.value = Some(value);
        }
        // 9.-10. hasWritable / writable
        if let Some(writable) = field(agent, "writable")? {
            desc.writable = Some(to_boolean(agent, writable));
        }
        // 11.-12. hasGet / getter
        if let Some(getter) = field(agent, "get")? {
            // b. If IsCallable(getter) is false and getter is not undefined,
            // throw a TypeError exception.
            desc.get = Some(match getter {
                Value::Undefined => None,
                Value::Object(getter) if getter.is_callable(agent) => Some(getter),
                _ => {
                    return Err(agent.throw_exception_with_static_message(
                        ExceptionType::TypeError,
                        "Getter must be a function",
                    ));
                }
            });
        }
        // 13.-14. hasSet / setter
        if let Some(setter) = field(agent, "set")? {
            desc.set = Some(match setter {
                Value::Undefined => None,
                Value::Object(setter) if setter.is_callable(agent) => Some(setter),
                _ => {
                    return Err(agent.throw_exception_with_static_message(
                        ExceptionType::TypeError,
                        "Setter must be a function",
                    ));
                }
            });
        }
        // 15. If desc has a [[Get]] field or desc has a [[Set]] field, then
        // a. If desc has a [[Value]] field or desc has a [[Writable]] field,
        // throw a TypeError exception.
        if desc.is_accessor_descriptor() && desc.is_data_descriptor() {
            return Err(agent.throw_exception_with_static_message(
                ExceptionType::TypeError,
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        // 16. Return desc.
        Ok(desc)
    }

    /// ### [6.2.6.6 CompletePropertyDescriptor ( Desc )](https://tc39.es/ecma262/#sec-completepropertydescriptor)
    pub fn complete_property_descriptor(&mut self) {
        // 1. Let like be the Record { [[Value]]: undefined, [[Writable]]:
        // false, [[Get]]: undefined, [[Set]]: undefined, [[Enumerable]]:
        // false, [[Configurable]]: false }.
        // 2. If IsGenericDescriptor(Desc) is true or IsDataDescriptor(Desc)
        // is true, then
        if self.is_generic_descriptor() || self.is_data_descriptor() {
            // a. If Desc does not have a [[Value]] field, set Desc.[[Value]]
            // to like.[[Value]].
            self.value.get_or_insert(Value::Undefined);
            // b. If Desc does not have a [[Writable]] field, set
            // Desc.[[Writable]] to like.[[Writable]].
            self.writable.get_or_insert(false);
        } else {
            // 3. Else,
            // a. If Desc does not have a [[Get]] field, set Desc.[[Get]] to
            // like.[[Get]].
            self.get.get_or_insert(None);
            // b. If Desc does not have a [[Set]] field, set Desc.[[Set]] to
            // like.[[Set]].
            self.set.get_or_insert(None);
        }
        // 4. If Desc does not have an [[Enumerable]] field, set
        // Desc.[[Enumerable]] to like.[[Enumerable]].
        self.enumerable.get_or_insert(false);
        // 5. If Desc does not have a [[Configurable]] field, set
        // Desc.[[Configurable]] to like.[[Configurable]].
        self.configurable.get_or_insert(false);
        // 6. Return unused.
    }

    /// Returns true if all the fields have been set (if the descriptor is
    /// a data descriptor, then get and set are not required).
    pub fn is_fully_populated(&self) -> bool {
        ((self.value.is_some() && self.writable.is_some())
            || (self.get.is_some() && self.set.is_some()))
            && self.enumerable.is_some()
            && self.configurable.is_some()
    }

    /// Returns true if any field has been set.
    pub fn has_fields(&self) -> bool {
        self.value.is_some()
            || self.writable.is_some()
            || self.get.is_some()
            || self.set.is_some()
            || self.enumerable.is_some()
            || self.configurable.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn descriptor_classification() {
        let data = PropertyDescriptor::new_data_descriptor(Value::Integer(1));
        assert!(data.is_data_descriptor());
        assert!(!data.is_accessor_descriptor());
        assert!(data.is_fully_populated());

        let accessor = PropertyDescriptor {
            get: Some(None),
            ..Default::default()
        };
        assert!(accessor.is_accessor_descriptor());
        assert!(!accessor.is_fully_populated());

        let generic = PropertyDescriptor {
            enumerable: Some(false),
            ..Default::default()
        };
        assert!(generic.is_generic_descriptor());
        assert!(generic.has_fields());
    }

    #[test]
    fn completing_a_generic_descriptor_makes_it_data() {
        let mut desc = PropertyDescriptor {
            configurable: Some(true),
            ..Default::default()
        };
        desc.complete_property_descriptor();
        assert_eq!(desc.value, Some(Value::Undefined));
        assert_eq!(desc.writable, Some(false));
        assert_eq!(desc.enumerable, Some(false));
        assert_eq!(desc.configurable, Some(true));
    }

    #[test]
    fn attributes_default_missing_fields() {
        let desc = PropertyDescriptor {
            value: Some(Value::Null),
            writable: Some(true),
            ..Default::default()
        };
        let attributes = desc.attributes();
        assert!(!attributes.is_read_only());
        assert!(attributes.is_dont_enum());
        assert!(attributes.is_dont_delete());
        let over = desc.attributes_over(PropertyAttributes::NONE);
        assert_eq!(over, PropertyAttributes::NONE);
    }
}
