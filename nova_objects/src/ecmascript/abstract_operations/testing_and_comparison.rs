// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [7.2 Testing and Comparison Operations](https://tc39.es/ecma262/#sec-testing-and-comparison-operations)

use std::cmp::Ordering;

use super::type_conversion::{PreferredType, to_number, to_primitive};
use crate::ecmascript::{
    execution::{Agent, ExceptionType, JsResult},
    types::{Value, string_to_number},
};

/// ### [7.2.1 RequireObjectCoercible ( argument )](https://tc39.es/ecma262/#sec-requireobjectcoercible)
///
/// The abstract operation RequireObjectCoercible takes argument argument (an
/// ECMAScript language value) and returns either a normal completion
/// containing an ECMAScript language value or a throw completion. It throws
/// an error if argument is a value that cannot be converted to an Object
/// using ToObject.
pub fn require_object_coercible(agent: &mut Agent, argument: Value) -> JsResult<Value> {
    if argument.is_nullish() {
        let message = format!("Cannot convert {} to object", argument.type_of(agent));
        Err(agent.throw_exception(ExceptionType::TypeError, message))
    } else {
        Ok(argument)
    }
}

/// ### [7.2.3 IsCallable ( argument )](https://tc39.es/ecma262/#sec-iscallable)
pub fn is_callable(agent: &Agent, argument: Value) -> bool {
    argument.is_callable(agent)
}

/// ### [7.2.9 SameValue ( x, y )](https://tc39.es/ecma262/#sec-samevalue)
///
/// The abstract operation SameValue takes arguments x (an ECMAScript language
/// value) and y (an ECMAScript language value) and returns a Boolean. It
/// determines whether or not the two arguments are the same value.
pub fn same_value(agent: &Agent, x: Value, y: Value) -> bool {
    // 1. If Type(x) is not Type(y), return false.
    // 2. If x is a Number, then
    if let (Some(x), Some(y)) = (x.as_number(), y.as_number()) {
        // a. Return Number::sameValue(x, y).
        return (x.is_nan() && y.is_nan())
            || (x == y && x.is_sign_negative() == y.is_sign_negative());
    }
    // 3. Return SameValueNonNumber(x, y).
    same_value_non_number(agent, x, y)
}

/// ### [7.2.10 SameValueZero ( x, y )](https://tc39.es/ecma262/#sec-samevaluezero)
///
/// Differs from SameValue only in its treatment of +0𝔽 and -0𝔽.
pub fn same_value_zero(agent: &Agent, x: Value, y: Value) -> bool {
    // 1. If Type(x) is not Type(y), return false.
    // 2. If x is a Number, then
    if let (Some(x), Some(y)) = (x.as_number(), y.as_number()) {
        // a. Return Number::sameValueZero(x, y).
        return (x.is_nan() && y.is_nan()) || x == y;
    }
    // 3. Return SameValueNonNumber(x, y).
    same_value_non_number(agent, x, y)
}

/// ### [7.2.11 SameValueNonNumber ( x, y )](https://tc39.es/ecma262/#sec-samevaluenonnumber)
pub fn same_value_non_number(agent: &Agent, x: Value, y: Value) -> bool {
    match (x, y) {
        // 2. If x is either null or undefined, return true.
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        // 4. If x is a String, then
        // a. If x and y have the same length and the same code units in the
        //    same positions, return true; otherwise, return false.
        (Value::String(x), Value::String(y)) => x == y || x.as_str(agent) == y.as_str(agent),
        // 5. If x is a Boolean, then
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        // 6. NOTE: All other ECMAScript language values are compared by identity.
        // 7. If x is y, return true; otherwise, return false.
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => x == y,
        _ => false,
    }
}

/// ### [7.2.14 IsStrictlyEqual ( x, y )](https://tc39.es/ecma262/#sec-isstrictlyequal)
pub fn is_strictly_equal(agent: &Agent, x: Value, y: Value) -> bool {
    // 1. If Type(x) is not Type(y), return false.
    // 2. If x is a Number, then
    if let (Some(x), Some(y)) = (x.as_number(), y.as_number()) {
        // a. Return Number::equal(x, y).
        return x == y;
    }
    // 3. Return SameValueNonNumber(x, y).
    same_value_non_number(agent, x, y)
}

/// ### [7.2.13 IsLooselyEqual ( x, y )](https://tc39.es/ecma262/#sec-islooselyequal)
///
/// Each round either decides the result or coerces one operand toward the
/// type of the other. Coercing an object runs user code and may throw.
pub fn is_loosely_equal(agent: &mut Agent, mut x: Value, mut y: Value) -> JsResult<bool> {
    loop {
        // 1. If Type(x) is Type(y), then
        // a. Return IsStrictlyEqual(x, y).
        if same_type(x, y) {
            return Ok(is_strictly_equal(agent, x, y));
        }
        match (x, y) {
            // 2. If x is null and y is undefined, return true.
            // 3. If x is undefined and y is null, return true.
            (Value::Null, Value::Undefined) | (Value::Undefined, Value::Null) => return Ok(true),
            // 5. If x is a Number and y is a String, return ! IsLooselyEqual(x, ! ToNumber(y)).
            (Value::Integer(_) | Value::Number(_), Value::String(string)) => {
                y = Value::Number(string_to_number(string.as_str(agent)));
            }
            // 6. If x is a String and y is a Number, return ! IsLooselyEqual(! ToNumber(x), y).
            (Value::String(string), Value::Integer(_) | Value::Number(_)) => {
                x = Value::Number(string_to_number(string.as_str(agent)));
            }
            // 9. If x is a Boolean, return ! IsLooselyEqual(! ToNumber(x), y).
            (Value::Boolean(b), _) => x = Value::Integer(b as i32),
            // 10. If y is a Boolean, return ! IsLooselyEqual(x, ! ToNumber(y)).
            (_, Value::Boolean(b)) => y = Value::Integer(b as i32),
            // 11. If x is either a String, a Number, a BigInt, or a Symbol and
            //     y is an Object, return ! IsLooselyEqual(x, ? ToPrimitive(y)).
            (
                Value::String(_) | Value::Integer(_) | Value::Number(_) | Value::Symbol(_),
                Value::Object(_),
            ) => y = to_primitive(agent, y, None)?,
            // 12. If x is an Object and y is either a String, a Number, a
            //     BigInt, or a Symbol, return ! IsLooselyEqual(? ToPrimitive(x), y).
            (
                Value::Object(_),
                Value::String(_) | Value::Integer(_) | Value::Number(_) | Value::Symbol(_),
            ) => x = to_primitive(agent, x, None)?,
            // 14. Return false.
            _ => return Ok(false),
        }
    }
}

fn same_type(x: Value, y: Value) -> bool {
    match (x, y) {
        (Value::Integer(_) | Value::Number(_), Value::Integer(_) | Value::Number(_)) => true,
        _ => std::mem::discriminant(&x) == std::mem::discriminant(&y),
    }
}

/// Outcome of a relational comparison. `Undefined` is produced when either
/// side converts to NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonResult {
    LessThan,
    Equal,
    GreaterThan,
    Undefined,
}

impl ComparisonResult {
    fn from_ordering(ordering: Option<Ordering>) -> Self {
        match ordering {
            Some(Ordering::Less) => ComparisonResult::LessThan,
            Some(Ordering::Equal) => ComparisonResult::Equal,
            Some(Ordering::Greater) => ComparisonResult::GreaterThan,
            None => ComparisonResult::Undefined,
        }
    }
}

/// Three-way relational comparison of two values. Both sides are converted
/// to primitives with a Number hint, left side first. Two strings compare by
/// code units, anything else compares numerically.
pub fn compare(agent: &mut Agent, x: Value, y: Value) -> JsResult<ComparisonResult> {
    let px = to_primitive(agent, x, Some(PreferredType::Number))?;
    let py = to_primitive(agent, y, Some(PreferredType::Number))?;
    if let (Value::String(sx), Value::String(sy)) = (px, py) {
        let ordering = sx
            .as_str(agent)
            .encode_utf16()
            .cmp(sy.as_str(agent).encode_utf16());
        return Ok(ComparisonResult::from_ordering(Some(ordering)));
    }
    let nx = to_number(agent, px)?;
    let ny = to_number(agent, py)?;
    Ok(ComparisonResult::from_ordering(nx.partial_cmp(&ny)))
}

/// ### [7.2.12 IsLessThan ( x, y, LeftFirst )](https://tc39.es/ecma262/#sec-islessthan)
///
/// Returns `None` when either side converts to NaN.
pub fn is_less_than<const LEFT_FIRST: bool>(
    agent: &mut Agent,
    x: Value,
    y: Value,
) -> JsResult<Option<bool>> {
    // 1. If LeftFirst is true, then
    let (px, py) = if LEFT_FIRST {
        // a. Let px be ? ToPrimitive(x, NUMBER).
        // b. Let py be ? ToPrimitive(y, NUMBER).
        let px = to_primitive(agent, x, Some(PreferredType::Number))?;
        let py = to_primitive(agent, y, Some(PreferredType::Number))?;
        (px, py)
    } else {
        // 2. Else,
        // a. NOTE: The order of evaluation needs to be reversed to preserve
        //    left to right evaluation.
        // b. Let py be ? ToPrimitive(y, NUMBER).
        // c. Let px be ? ToPrimitive(x, NUMBER).
        let py = to_primitive(agent, y, Some(PreferredType::Number))?;
        let px = to_primitive(agent, x, Some(PreferredType::Number))?;
        (px, py)
    };
    // 3. If px is a String and py is a String, then
    if let (Value::String(sx), Value::String(sy)) = (px, py) {
        let less = sx
            .as_str(agent)
            .encode_utf16()
            .lt(sy.as_str(agent).encode_utf16());
        return Ok(Some(less));
    }
    // 4. Else,
    // c. NOTE: Because px and py are primitive values, evaluation order is not important.
    // d. Let nx be ? ToNumeric(px).
    // e. Let ny be ? ToNumeric(py).
    let nx = to_number(agent, px)?;
    let ny = to_number(agent, py)?;
    // h. If nx or ny is NaN, return undefined.
    if nx.is_nan() || ny.is_nan() {
        return Ok(None);
    }
    Ok(Some(nx < ny))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::{
        abstract_operations::operations_on_objects::create_data_property_or_throw,
        builtins::{
            builtin_function::create_builtin_function, ordinary::ordinary_object_create_with_intrinsics,
        },
        execution::Options,
        types::{PropertyKey, String},
    };

    #[test]
    fn zeros_and_nan() {
        let agent = Agent::new(Options::default());
        let nan = Value::Number(f64::NAN);
        let neg_zero = Value::Number(-0.0);
        let zero = Value::Integer(0);
        assert!(same_value(&agent, nan, nan));
        assert!(!is_strictly_equal(&agent, nan, nan));
        assert!(!same_value(&agent, zero, neg_zero));
        assert!(same_value_zero(&agent, zero, neg_zero));
        assert!(is_strictly_equal(&agent, zero, neg_zero));
    }

    #[test]
    fn loose_equality_coerces() {
        let mut agent = Agent::new(Options::default());
        let one = String::from_str(&mut agent, "1");
        assert!(is_loosely_equal(&mut agent, Value::String(one), Value::Integer(1)).unwrap());
        assert!(is_loosely_equal(&mut agent, Value::Boolean(true), Value::String(one)).unwrap());
        assert!(is_loosely_equal(&mut agent, Value::Null, Value::Undefined).unwrap());
        assert!(!is_loosely_equal(&mut agent, Value::Null, Value::Integer(0)).unwrap());
    }

    #[test]
    fn loose_equality_propagates_conversion_errors() {
        let mut agent = Agent::new(Options::default());
        let object = ordinary_object_create_with_intrinsics(&mut agent).into_object();
        let value_of = create_builtin_function(
            &mut agent,
            |agent, _, _| {
                Err(agent.throw_exception_with_static_message(ExceptionType::RangeError, "boom"))
            },
            "valueOf",
            0,
        );
        let key = PropertyKey::from_str(&mut agent, "valueOf");
        create_data_property_or_throw(&mut agent, object, key, value_of.into_value()).unwrap();
        let error = is_loosely_equal(&mut agent, object.into_value(), Value::Integer(1)).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::RangeError));
    }

    #[test]
    fn relational_comparison() {
        let mut agent = Agent::new(Options::default());
        let a = Value::String(String::from_str(&mut agent, "a"));
        let b = Value::String(String::from_str(&mut agent, "b"));
        assert_eq!(compare(&mut agent, a, b).unwrap(), ComparisonResult::LessThan);
        assert_eq!(
            compare(&mut agent, Value::Integer(2), Value::Number(1.5)).unwrap(),
            ComparisonResult::GreaterThan
        );
        assert_eq!(
            compare(&mut agent, Value::Undefined, Value::Integer(0)).unwrap(),
            ComparisonResult::Undefined
        );
        assert_eq!(is_less_than::<true>(&mut agent, a, b).unwrap(), Some(true));
        assert_eq!(
            is_less_than::<false>(&mut agent, Value::Number(f64::NAN), Value::Integer(1)).unwrap(),
            None
        );
    }

    #[test]
    fn nullish_values_are_not_object_coercible() {
        let mut agent = Agent::new(Options::default());
        assert!(require_object_coercible(&mut agent, Value::Undefined).is_err());
        assert!(require_object_coercible(&mut agent, Value::Integer(3)).is_ok());
    }
}
