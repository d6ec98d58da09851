// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{Object, OrdinaryObject, String, Symbol};
use crate::ecmascript::{builtins::proxy::Proxy, execution::Agent};

/// ### [6.1 ECMAScript Language Types](https://tc39.es/ecma262/#sec-ecmascript-language-types)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Value {
    /// ### [6.1.1 The Undefined Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-undefined-type)
    #[default]
    Undefined,

    /// ### [6.1.2 The Null Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-null-type)
    Null,

    /// ### [6.1.3 The Boolean Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-boolean-type)
    Boolean(bool),

    /// ### [6.1.4 The String Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-string-type)
    String(String),

    /// ### [6.1.5 The Symbol Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-symbol-type)
    Symbol(Symbol),

    /// ### [6.1.6.1 The Number Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-number-type)
    ///
    /// Integral numbers that fit in 32 bits (and are not -0) are always
    /// stored as small integers; see [`Value::from_f64`].
    Integer(i32),
    Number(f64),

    /// ### [6.1.7 The Object Type](https://tc39.es/ecma262/#sec-object-type)
    Object(Object),
}

impl Value {
    /// Create a Number value, normalizing small integral values to
    /// [`Value::Integer`].
    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0
            && value >= i32::MIN as f64
            && value <= i32::MAX as f64
            && !(value == 0.0 && value.is_sign_negative())
        {
            Value::Integer(value as i32)
        } else {
            Value::Number(value)
        }
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_nullish(self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    pub fn is_string(self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_symbol(self) -> bool {
        matches!(self, Value::Symbol(_))
    }

    pub fn is_number(self) -> bool {
        matches!(self, Value::Integer(_) | Value::Number(_))
    }

    pub fn is_object(self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Returns true for the small integer representation.
    pub fn is_smi(self) -> bool {
        matches!(self, Value::Integer(_))
    }

    pub fn as_object(self) -> Option<Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_number(self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(value as f64),
            Value::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_callable(self, agent: &Agent) -> bool {
        match self {
            Value::Object(object) => object.is_callable(agent),
            _ => false,
        }
    }

    /// ### [13.5.3 The typeof Operator](https://tc39.es/ecma262/#sec-typeof-operator)
    pub fn type_of(self, agent: &Agent) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Integer(_) | Value::Number(_) => "number",
            Value::Object(object) => {
                if object.is_callable(agent) {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::from_f64(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::from_f64(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl From<OrdinaryObject> for Value {
    fn from(value: OrdinaryObject) -> Self {
        Value::Object(Object::Object(value))
    }
}

impl From<Proxy> for Value {
    fn from(value: Proxy) -> Self {
        Value::Object(Object::Proxy(value))
    }
}

impl From<Option<Object>> for Value {
    fn from(value: Option<Object>) -> Self {
        value.map_or(Value::Null, Value::Object)
    }
}
