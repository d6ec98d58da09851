// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [7.1 Type Conversion](https://tc39.es/ecma262/#sec-type-conversion)
//!
//! The ECMAScript language implicitly performs automatic type conversion as
//! needed. Conversions of objects call back into script through
//! `@@toPrimitive`, `valueOf` and `toString`, and may throw.

use super::operations_on_objects::{get, get_method};
use crate::ecmascript::{
    builtins::builtin_function::call_function,
    execution::{Agent, ExceptionType, JsResult},
    types::{Object, PropertyKey, String, Value, number_to_string, string_to_number},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    String = 1,
    Number,
}

/// ### [7.1.1 ToPrimitive ( input \[ , preferredType \] )](https://tc39.es/ecma262/#sec-toprimitive)
///
/// Converts its input argument to a non-Object type. If an object is capable
/// of converting to more than one primitive type, it may use the optional
/// hint preferredType to favour that type.
pub fn to_primitive(
    agent: &mut Agent,
    input: Value,
    preferred_type: Option<PreferredType>,
) -> JsResult<Value> {
    // 1. If input is an Object, then
    let Value::Object(input) = input else {
        // 2. Return input.
        return Ok(input);
    };
    // a. Let exoticToPrim be ? GetMethod(input, @@toPrimitive).
    let to_primitive_key = PropertyKey::Symbol(agent.intrinsics().to_primitive);
    let exotic_to_prim = get_method(agent, input.into_value(), to_primitive_key)?;
    // b. If exoticToPrim is not undefined, then
    if let Some(exotic_to_prim) = exotic_to_prim {
        let hint = match preferred_type {
            // i. If preferredType is not present, then
            // 1. Let hint be "default".
            None => "default",
            // ii. Else if preferredType is STRING, then
            // 1. Let hint be "string".
            Some(PreferredType::String) => "string",
            // iii. Else,
            // 1. Assert: preferredType is NUMBER.
            // 2. Let hint be "number".
            Some(PreferredType::Number) => "number",
        };
        let hint = Value::String(String::from_str(agent, hint));
        // iv. Let result be ? Call(exoticToPrim, input, « hint »).
        let result = call_function(agent, exotic_to_prim, input.into_value(), &[hint])?;
        // v. If result is not an Object, return result.
        if !result.is_object() {
            return Ok(result);
        }
        // vi. Throw a TypeError exception.
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            "Cannot convert object to primitive value",
        ));
    }
    // c. If preferredType is not present, let preferredType be NUMBER.
    // d. Return ? OrdinaryToPrimitive(input, preferredType).
    ordinary_to_primitive(agent, input, preferred_type.unwrap_or(PreferredType::Number))
}

/// #### [7.1.1.1 OrdinaryToPrimitive ( O, hint )](https://tc39.es/ecma262/#sec-ordinarytoprimitive)
pub fn ordinary_to_primitive(agent: &mut Agent, o: Object, hint: PreferredType) -> JsResult<Value> {
    let to_string_key = PropertyKey::from_str(agent, "toString");
    let value_of_key = PropertyKey::from_str(agent, "valueOf");
    let method_names = match hint {
        // 1. If hint is STRING, then
        // a. Let methodNames be « "toString", "valueOf" ».
        PreferredType::String => [to_string_key, value_of_key],
        // 2. Else,
        // a. Let methodNames be « "valueOf", "toString" ».
        PreferredType::Number => [value_of_key, to_string_key],
    };
    // 3. For each element name of methodNames, do
    for name in method_names {
        // a. Let method be ? Get(O, name).
        let method = get(agent, o, name)?;
        // b. If IsCallable(method) is true, then
        if method.is_callable(agent) {
            // i. Let result be ? Call(method, O).
            let result = call_function(agent, method, o.into_value(), &[])?;
            // ii. If result is not an Object, return result.
            if !result.is_object() {
                return Ok(result);
            }
        }
    }
    // 4. Throw a TypeError exception.
    Err(agent.throw_exception_with_static_message(
        ExceptionType::TypeError,
        "Cannot convert object to primitive value",
    ))
}

/// ### [7.1.2 ToBoolean ( argument )](https://tc39.es/ecma262/#sec-toboolean)
pub fn to_boolean(agent: &Agent, argument: Value) -> bool {
    match argument {
        // 1. If argument is a Boolean, return argument.
        Value::Boolean(value) => value,
        // 2. If argument is one of undefined, null, +0𝔽, -0𝔽, NaN, 0ℤ, or the
        //    empty String, return false.
        Value::Undefined | Value::Null => false,
        Value::Integer(value) => value != 0,
        Value::Number(value) => !(value == 0.0 || value.is_nan()),
        Value::String(string) => !string.is_empty(agent),
        // 4. Return true.
        Value::Symbol(_) | Value::Object(_) => true,
    }
}

/// ### [7.1.4 ToNumber ( argument )](https://tc39.es/ecma262/#sec-tonumber)
pub fn to_number(agent: &mut Agent, argument: Value) -> JsResult<f64> {
    match argument {
        // 1. If argument is a Number, return argument.
        Value::Integer(value) => Ok(value as f64),
        Value::Number(value) => Ok(value),
        // 2. If argument is either a Symbol or a BigInt, throw a TypeError
        //    exception.
        Value::Symbol(_) => Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            "Cannot convert a Symbol value to a number",
        )),
        // 3. If argument is undefined, return NaN.
        Value::Undefined => Ok(f64::NAN),
        // 4. If argument is either null or false, return +0𝔽.
        // 5. If argument is true, return 1𝔽.
        Value::Null => Ok(0.0),
        Value::Boolean(value) => Ok(if value { 1.0 } else { 0.0 }),
        // 6. If argument is a String, return StringToNumber(argument).
        Value::String(string) => Ok(string_to_number(string.as_str(agent))),
        // 7. Assert: argument is an Object.
        Value::Object(_) => {
            // 8. Let primValue be ? ToPrimitive(argument, NUMBER).
            let prim_value = to_primitive(agent, argument, Some(PreferredType::Number))?;
            // 9. Assert: primValue is not an Object.
            debug_assert!(!prim_value.is_object());
            // 10. Return ? ToNumber(primValue).
            to_number(agent, prim_value)
        }
    }
}

/// ### [7.1.5 ToIntegerOrInfinity ( argument )](https://tc39.es/ecma262/#sec-tointegerorinfinity)
pub fn to_integer_or_infinity(agent: &mut Agent, argument: Value) -> JsResult<f64> {
    // 1. Let number be ? ToNumber(argument).
    let number = to_number(agent, argument)?;
    // 2. If number is one of NaN, +0𝔽, or -0𝔽, return 0.
    if number.is_nan() || number == 0.0 {
        return Ok(0.0);
    }
    // 3. If number is +∞𝔽, return +∞.
    // 4. If number is -∞𝔽, return -∞.
    // 5. Return truncate(ℝ(number)).
    Ok(number.trunc())
}

/// ### [7.1.7 ToUint32 ( argument )](https://tc39.es/ecma262/#sec-touint32)
pub fn to_uint32(agent: &mut Agent, argument: Value) -> JsResult<u32> {
    if let Value::Integer(value) = argument {
        return Ok(value as u32);
    }
    // 1. Let number be ? ToNumber(argument).
    let number = to_number(agent, argument)?;
    Ok(number_to_uint32(number))
}

pub(crate) fn number_to_uint32(number: f64) -> u32 {
    // 2. If number is not finite or number is either +0𝔽 or -0𝔽, return +0𝔽.
    if !number.is_finite() || number == 0.0 {
        return 0;
    }
    // 3. Let int be truncate(ℝ(number)).
    // 4. Let int32bit be int modulo 2**32.
    // 5. Return 𝔽(int32bit).
    number.trunc().rem_euclid(4294967296.0) as u32
}

/// ### [7.1.6 ToInt32 ( argument )](https://tc39.es/ecma262/#sec-toint32)
pub fn to_int32(agent: &mut Agent, argument: Value) -> JsResult<i32> {
    Ok(to_uint32(agent, argument)? as i32)
}

/// ### [7.1.17 ToString ( argument )](https://tc39.es/ecma262/#sec-tostring)
pub fn to_string(agent: &mut Agent, argument: Value) -> JsResult<String> {
    match argument {
        // 1. If argument is a String, return argument.
        Value::String(string) => Ok(string),
        // 2. If argument is a Symbol, throw a TypeError exception.
        Value::Symbol(_) => Err(agent.throw_exception_with_static_message(
            ExceptionType::TypeError,
            "Cannot convert a Symbol value to a string",
        )),
        // 3. If argument is undefined, return "undefined".
        Value::Undefined => Ok(String::from_str(agent, "undefined")),
        // 4. If argument is null, return "null".
        Value::Null => Ok(String::from_str(agent, "null")),
        // 5. If argument is true, return "true".
        // 6. If argument is false, return "false".
        Value::Boolean(value) => Ok(String::from_str(agent, if value { "true" } else { "false" })),
        // 7. If argument is a Number, return Number::toString(argument, 10).
        Value::Integer(value) => Ok(String::from_string(agent, value.to_string())),
        Value::Number(value) => Ok(String::from_string(agent, number_to_string(value))),
        // 9. Assert: argument is an Object.
        Value::Object(_) => {
            // 10. Let primValue be ? ToPrimitive(argument, STRING).
            let prim_value = to_primitive(agent, argument, Some(PreferredType::String))?;
            // 11. Assert: primValue is not an Object.
            debug_assert!(!prim_value.is_object());
            // 12. Return ? ToString(primValue).
            to_string(agent, prim_value)
        }
    }
}

/// ### [7.1.19 ToPropertyKey ( argument )](https://tc39.es/ecma262/#sec-topropertykey)
pub fn to_property_key(agent: &mut Agent, argument: Value) -> JsResult<PropertyKey> {
    match argument {
        Value::Integer(value) if value >= 0 => return Ok(PropertyKey::from(value as u32)),
        Value::String(string) => return Ok(PropertyKey::from_string(agent, string)),
        Value::Symbol(symbol) => return Ok(PropertyKey::Symbol(symbol)),
        _ => {}
    }
    // 1. Let key be ? ToPrimitive(argument, STRING).
    let key = to_primitive(agent, argument, Some(PreferredType::String))?;
    // 2. If key is a Symbol, then
    if let Value::Symbol(symbol) = key {
        // a. Return key.
        return Ok(PropertyKey::Symbol(symbol));
    }
    // 3. Return ! ToString(key).
    let string = to_string(agent, key)?;
    Ok(PropertyKey::from_string(agent, string))
}

/// ### [7.1.22 ToIndex ( value )](https://tc39.es/ecma262/#sec-toindex)
pub fn to_index(agent: &mut Agent, value: Value) -> JsResult<u64> {
    // 1. Let integer be ? ToIntegerOrInfinity(value).
    let integer = to_integer_or_infinity(agent, value)?;
    // 2. If integer is not in the inclusive interval from 0 to 2**53 - 1,
    //    throw a RangeError exception.
    if !(0.0..=9007199254740991.0).contains(&integer) {
        return Err(agent.throw_exception_with_static_message(
            ExceptionType::RangeError,
            "Invalid index",
        ));
    }
    // 3. Return integer.
    Ok(integer as u64)
}

/// ### [7.1.21 CanonicalNumericIndexString ( argument )](https://tc39.es/ecma262/#sec-canonicalnumericindexstring)
///
/// Returns the Number `argument` is the canonical representation of, if any.
pub fn canonical_numeric_index_string(agent: &Agent, argument: String) -> Option<f64> {
    let argument = argument.as_str(agent);
    // 1. If argument is "-0", return -0𝔽.
    if argument == "-0" {
        return Some(-0.0);
    }
    // 2. Let n be ! ToNumber(argument).
    let n = string_to_number(argument);
    // 3. If ! ToString(n) is argument, return n.
    // 4. Return undefined.
    (number_to_string(n) == argument).then_some(n)
}
