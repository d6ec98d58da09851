// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{
    embedder::FailedAccessCheckCallback,
    intrinsics::Intrinsics,
};
use crate::{
    ecmascript::{
        builtins::{
            error::create_error_object,
            ordinary::{
                caches::Caches, dependent_code::CodeId, descriptor_array::DescriptorArray,
            },
        },
        types::{Object, ObjectKind, OrdinaryObject, PropertyKey, String, Value},
    },
    heap::{
        Heap,
        heap_observer::{HeapObserver, NoopObserver},
    },
};

/// Engine configuration. Every threshold of the object model is a field so
/// that embedders and tests can tune them.
#[derive(Debug, Clone)]
pub struct Options {
    /// Descriptor ceiling of a fast-mode Map.
    pub max_number_of_descriptors: usize,
    /// Fan-out bound of a transition array.
    pub max_number_of_transitions: usize,
    /// Out-of-object fields tolerated before adding a named property
    /// normalizes the object.
    pub fast_properties_soft_limit: u32,
    /// Hard out-of-object field ceiling for stores through named keys.
    pub max_fast_properties: u32,
    /// Dictionaries larger than this stay in dictionary mode.
    pub max_slow_to_fast_properties: usize,
    /// In-object slots reserved by the root Map of plain objects.
    pub initial_in_object_properties: u32,
    /// Out-of-object slots added each time the backing store grows.
    pub field_slack: u32,
    /// Nesting limit for accessors, proxy traps and interceptors.
    pub max_stack_depth: usize,
    /// Optional allocation budget in words.
    pub heap_limit: Option<usize>,
    pub track_field_types: bool,
    pub trace_maps: bool,
    /// Largest gap past the end of fast elements a store may open before the
    /// elements are normalized.
    pub max_elements_gap: u32,
    /// Fast elements at most this long are never checked for sparseness.
    pub max_unchecked_fast_elements_length: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_number_of_descriptors: 1020,
            max_number_of_transitions: 1536,
            fast_properties_soft_limit: 12,
            max_fast_properties: 128,
            max_slow_to_fast_properties: 1020,
            initial_in_object_properties: 4,
            field_slack: 3,
            max_stack_depth: 512,
            heap_limit: None,
            track_field_types: true,
            trace_maps: false,
            max_elements_gap: 1024,
            max_unchecked_fast_elements_length: 500,
        }
    }
}

pub type JsResult<T> = std::result::Result<T, JsError>;

/// A thrown value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsError(pub(crate) Value);

impl JsError {
    pub(crate) fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(self) -> Value {
        self.0
    }

    /// The type of the thrown Error object, if an Error object was thrown.
    pub fn exception_type(self, agent: &Agent) -> Option<ExceptionType> {
        match self.0 {
            Value::Object(Object::Object(object)) => match object.kind(agent) {
                ObjectKind::Error(kind) => Some(*kind),
                _ => None,
            },
            _ => None,
        }
    }

    /// The `message` own property of a thrown Error object.
    pub fn message(self, agent: &mut Agent) -> Option<std::string::String> {
        let Value::Object(Object::Object(object)) = self.0 else {
            return None;
        };
        let key = PropertyKey::from_str(agent, "message");
        match object.get_own_data_value(agent, key) {
            Some(Value::String(message)) => Some(message.to_string_lossy(agent)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionType {
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
}

impl ExceptionType {
    pub const ALL: [ExceptionType; 7] = [
        ExceptionType::Error,
        ExceptionType::EvalError,
        ExceptionType::RangeError,
        ExceptionType::ReferenceError,
        ExceptionType::SyntaxError,
        ExceptionType::TypeError,
        ExceptionType::UriError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExceptionType::Error => "Error",
            ExceptionType::EvalError => "EvalError",
            ExceptionType::RangeError => "RangeError",
            ExceptionType::ReferenceError => "ReferenceError",
            ExceptionType::SyntaxError => "SyntaxError",
            ExceptionType::TypeError => "TypeError",
            ExceptionType::UriError => "URIError",
        }
    }
}

/// Language mode of the code performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageMode {
    #[default]
    Sloppy,
    Strict,
}

impl LanguageMode {
    pub fn is_strict(self) -> bool {
        self == LanguageMode::Strict
    }
}

/// Whether a failed operation throws or reports `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShouldThrow {
    ThrowOnError,
    DontThrow,
}

impl From<LanguageMode> for ShouldThrow {
    fn from(value: LanguageMode) -> Self {
        match value {
            LanguageMode::Sloppy => ShouldThrow::DontThrow,
            LanguageMode::Strict => ShouldThrow::ThrowOnError,
        }
    }
}

/// ### [9.7 Agents](https://tc39.es/ecma262/#sec-agents)
///
/// The runtime handle threaded through every operation: the heap, the
/// configuration, the lookup caches and the intrinsic objects.
pub struct Agent {
    pub(crate) heap: Heap,
    pub(crate) options: Options,
    pub(crate) caches: Caches,
    /// Descriptor array shared by every root Map.
    pub(crate) empty_descriptor_array: DescriptorArray,
    pub(crate) intrinsics: Option<Intrinsics>,
    pub(crate) stack_depth: usize,
    /// Code invalidated by a broken dependency, oldest first.
    pub(crate) deoptimized: Vec<CodeId>,
    next_code_id: u32,
    pub(crate) failed_access_check_callback: Option<FailedAccessCheckCallback>,
}

impl core::fmt::Debug for Agent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Agent")
            .field("heap", &self.heap)
            .field("options", &self.options)
            .field("stack_depth", &self.stack_depth)
            .field("deoptimized", &self.deoptimized.len())
            .finish()
    }
}

impl Agent {
    pub fn new(options: Options) -> Self {
        let mut heap = Heap::new(options.heap_limit);
        let empty_descriptor_array = DescriptorArray::allocate(&mut heap, Vec::new());
        let mut agent = Self {
            heap,
            options,
            caches: Caches::default(),
            empty_descriptor_array,
            intrinsics: None,
            stack_depth: 0,
            deoptimized: Vec::new(),
            next_code_id: 0,
            failed_access_check_callback: None,
        };
        Intrinsics::initialize(&mut agent);
        agent
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub(crate) fn intrinsics(&self) -> &Intrinsics {
        self.intrinsics
            .as_ref()
            .expect("intrinsics are created in Agent::new")
    }

    pub fn global_object(&self) -> OrdinaryObject {
        self.intrinsics().global_object
    }

    /// ### [5.2.3.2 Throw an Exception](https://tc39.es/ecma262/#sec-throw-an-exception)
    pub fn throw_exception(&mut self, kind: ExceptionType, message: std::string::String) -> JsError {
        let message = String::from_string(self, message);
        let error = create_error_object(self, kind, message);
        JsError(error.into_value())
    }

    pub fn throw_exception_with_static_message(
        &mut self,
        kind: ExceptionType,
        message: &'static str,
    ) -> JsError {
        let message = String::from_str(self, message);
        let error = create_error_object(self, kind, message);
        JsError(error.into_value())
    }

    /// Run `f` one level deeper into user code, throwing a RangeError once
    /// the nesting limit is reached.
    pub(crate) fn with_stack_guard<R>(
        &mut self,
        f: impl FnOnce(&mut Agent) -> JsResult<R>,
    ) -> JsResult<R> {
        if self.stack_depth >= self.options.max_stack_depth {
            return Err(self.throw_exception_with_static_message(
                ExceptionType::RangeError,
                "Maximum call stack size exceeded",
            ));
        }
        self.stack_depth += 1;
        let result = f(self);
        self.stack_depth -= 1;
        result
    }

    /// Install the observer notified of writes, fillers and Map publications.
    pub fn set_heap_observer(&mut self, observer: Box<dyn HeapObserver>) {
        self.heap.observer = observer;
    }

    /// Remove the current observer, restoring the no-op observer.
    pub fn take_heap_observer(&mut self) -> Box<dyn HeapObserver> {
        std::mem::replace(
            &mut self.heap.observer,
            Box::new(NoopObserver),
        )
    }

    pub fn set_failed_access_check_callback(&mut self, callback: FailedAccessCheckCallback) {
        self.failed_access_check_callback = Some(callback);
    }

    /// Allocate an identifier for a piece of compiled code that will depend
    /// on Maps or property cells.
    pub fn register_code(&mut self) -> CodeId {
        self.next_code_id += 1;
        CodeId(self.next_code_id)
    }

    /// Code invalidated so far, in invalidation order.
    pub fn deoptimized_code(&self) -> &[CodeId] {
        &self.deoptimized
    }

    pub fn take_deoptimized_code(&mut self) -> Vec<CodeId> {
        std::mem::take(&mut self.deoptimized)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stack_guard_throws_range_error() {
        let mut agent = Agent::new(Options {
            max_stack_depth: 2,
            ..Default::default()
        });
        fn recurse(agent: &mut Agent) -> JsResult<()> {
            agent.with_stack_guard(recurse)
        }
        let error = recurse(&mut agent).unwrap_err();
        assert_eq!(error.exception_type(&agent), Some(ExceptionType::RangeError));
        assert_eq!(
            error.message(&mut agent).as_deref(),
            Some("Maximum call stack size exceeded")
        );
        assert_eq!(agent.stack_depth, 0);
    }

    #[test]
    fn code_ids_are_unique() {
        let mut agent = Agent::new(Options::default());
        let a = agent.register_code();
        let b = agent.register_code();
        assert_ne!(a, b);
        assert!(agent.deoptimized_code().is_empty());
    }
}
