// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{ops::Deref, rc::Rc};

use super::ordinary::ordinary_object_create_from_map;
use crate::ecmascript::{
    execution::{Agent, ExceptionType, JsResult},
    types::{Object, ObjectKind, OrdinaryObject, String, Value},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentsList<'a>(pub(crate) &'a [Value]);

impl<'a> Deref for ArgumentsList<'a> {
    type Target = &'a [Value];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ArgumentsList<'_> {
    #[inline]
    pub fn get(&self, index: usize) -> Value {
        *self.0.get(index).unwrap_or(&Value::Undefined)
    }
}

/// Native behaviour of a function object: `(agent, this, arguments)`.
pub type RegularFn = Rc<dyn Fn(&mut Agent, Value, ArgumentsList<'_>) -> JsResult<Value>>;

#[derive(Clone)]
pub struct FunctionData {
    pub(crate) behaviour: RegularFn,
    pub(crate) name: Option<String>,
    pub(crate) length: u32,
}

impl core::fmt::Debug for FunctionData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FunctionData")
            .field("name", &self.name)
            .field("length", &self.length)
            .finish()
    }
}

impl FunctionData {
    /// Behaviour of %Function.prototype%: accepts any arguments and returns
    /// undefined.
    pub(crate) fn empty() -> Self {
        Self {
            behaviour: Rc::new(|_, _, _| Ok(Value::Undefined)),
            name: None,
            length: 0,
        }
    }
}

/// Create a function object running `behaviour` when called.
pub fn create_builtin_function(
    agent: &mut Agent,
    behaviour: impl Fn(&mut Agent, Value, ArgumentsList<'_>) -> JsResult<Value> + 'static,
    name: &str,
    length: u32,
) -> OrdinaryObject {
    let name = String::from_str(agent, name);
    let map = agent.intrinsics().function_map;
    ordinary_object_create_from_map(
        agent,
        map,
        ObjectKind::Function(FunctionData {
            behaviour: Rc::new(behaviour),
            name: Some(name),
            length,
        }),
    )
}

/// ### [7.3.14 Call ( F, V \[ , argumentsList \] )](https://tc39.es/ecma262/#sec-call)
pub fn call_function(
    agent: &mut Agent,
    f: Value,
    this_value: Value,
    arguments: &[Value],
) -> JsResult<Value> {
    // 1. If argumentsList is not present, set argumentsList to a new empty List.
    // 2. If IsCallable(F) is false, throw a TypeError exception.
    let behaviour = match f {
        Value::Object(Object::Object(function)) => match function.kind(agent) {
            ObjectKind::Function(data) => Some(data.behaviour.clone()),
            _ => None,
        },
        _ => None,
    };
    let Some(behaviour) = behaviour else {
        let message = format!("{} is not a function", f.type_of(agent));
        return Err(agent.throw_exception(ExceptionType::TypeError, message));
    };
    // 3. Return ? F.[[Call]](V, argumentsList).
    agent.with_stack_guard(|agent| behaviour(agent, this_value, ArgumentsList(arguments)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::execution::Options;

    #[test]
    fn calling_a_non_callable_throws_type_error() {
        let mut agent = Agent::new(Options::default());
        let error = call_function(&mut agent, Value::Integer(1), Value::Undefined, &[]).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::TypeError));
    }

    #[test]
    fn builtin_functions_receive_their_arguments() {
        let mut agent = Agent::new(Options::default());
        let add = create_builtin_function(
            &mut agent,
            |_, _, args| {
                let a = args.get(0).as_number().unwrap_or(f64::NAN);
                let b = args.get(1).as_number().unwrap_or(f64::NAN);
                Ok(Value::from_f64(a + b))
            },
            "add",
            2,
        );
        assert!(add.is_callable(&agent));
        let result = call_function(
            &mut agent,
            add.into_value(),
            Value::Undefined,
            &[Value::Integer(2), Value::Number(0.5)],
        )
        .unwrap();
        assert_eq!(result, Value::Number(2.5));
    }
}
