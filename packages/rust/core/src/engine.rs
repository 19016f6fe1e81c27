//! Pipeline capability and the reusable execution engine.
//!
//! [`PipelineEngine`] owns the Idle/Busy/Success/Error state machine and the
//! last outcome. A [`Pipeline`] implementation supplies its filters and
//! input/output types and gets execution, reset, and the accessors for free.
//!
//! The `Busy` state is a reentrancy guard: a filter that calls back into the
//! pipeline executing it is rejected with an illegal-state error. State lives
//! in a [`Cell`], so an engine is `!Sync` and cannot be shared across threads
//! without external synchronization.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{debug, instrument, trace, warn};

use filterchain_shared::{FilterChainError, PipelineState, Result, TypeDescriptor, Value};

use crate::filter::{Filter, SharedFilter};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Result of the last completed execution. Output and error are exclusive.
#[derive(Debug, Default)]
enum Outcome {
    #[default]
    Pending,
    Output(Rc<Value>),
    Error(Rc<FilterChainError>),
}

/// State machine and result storage shared by all pipeline implementations.
#[derive(Debug, Default)]
pub struct PipelineEngine {
    state: Cell<PipelineState>,
    outcome: RefCell<Outcome>,
}

impl PipelineEngine {
    /// Create an engine in the `Idle` state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    /// Output of the last execution. Only available in `Success`.
    pub fn output(&self) -> Result<Rc<Value>> {
        match (self.state(), &*self.outcome.borrow()) {
            (PipelineState::Success, Outcome::Output(value)) => Ok(Rc::clone(value)),
            (PipelineState::Busy, _) => Err(FilterChainError::busy()),
            (state, _) => Err(FilterChainError::illegal_state(
                state,
                "no output: the last execution did not succeed",
            )),
        }
    }

    /// Error of the last execution. Only available in `Error`.
    pub fn error(&self) -> Result<Rc<FilterChainError>> {
        match (self.state(), &*self.outcome.borrow()) {
            (PipelineState::Error, Outcome::Error(err)) => Ok(Rc::clone(err)),
            (PipelineState::Busy, _) => Err(FilterChainError::busy()),
            (state, _) => Err(FilterChainError::illegal_state(
                state,
                "no error: the last execution did not fail",
            )),
        }
    }

    /// Discard the last outcome and return to `Idle`.
    ///
    /// No-op when `Idle`; fails when `Busy`.
    pub fn reset(&self) -> Result<()> {
        match self.state() {
            PipelineState::Idle => Ok(()),
            PipelineState::Busy => Err(FilterChainError::busy()),
            PipelineState::Success | PipelineState::Error => {
                *self.outcome.borrow_mut() = Outcome::Pending;
                self.transition(PipelineState::Idle);
                Ok(())
            }
        }
    }

    /// Fold `input` through `filters` in order.
    ///
    /// Returns `Ok(true)` on success and `Ok(false)` when a filter failed; the
    /// failure is kept and readable through [`error`](Self::error). The first
    /// failing filter stops the fold. A panicking filter counts as a failure
    /// and is captured as [`FilterChainError::FilterExecution`]. Only
    /// illegal-state errors are returned as `Err`.
    #[instrument(skip_all)]
    pub fn execute<'a, I>(&self, filters: I, input: Value) -> Result<bool>
    where
        I: IntoIterator<Item = &'a dyn Filter>,
    {
        if self.state() == PipelineState::Busy {
            return Err(FilterChainError::busy());
        }
        self.reset()?;
        self.transition(PipelineState::Busy);

        let current: Cell<Option<&'a dyn Filter>> = Cell::new(None);
        let folded = panic::catch_unwind(AssertUnwindSafe(|| {
            filters
                .into_iter()
                .enumerate()
                .try_fold(input, |value, (position, filter)| {
                    current.set(Some(filter));
                    trace!(position, filter = filter.name(), input = value.type_name(), "executing filter");
                    filter.execute(value)
                })
        }))
        .unwrap_or_else(|payload| {
            let name = current.get().map_or("<unknown>", |f| f.name());
            let message = panic_message(payload.as_ref());
            warn!(filter = name, %message, "filter panicked");
            Err(FilterChainError::filter(name, format!("panicked: {message}")))
        });

        match folded {
            Ok(output) => {
                *self.outcome.borrow_mut() = Outcome::Output(Rc::new(output));
                self.transition(PipelineState::Success);
                Ok(true)
            }
            Err(err) => {
                debug!(error = %err, "filter failed, capturing error");
                *self.outcome.borrow_mut() = Outcome::Error(Rc::new(err));
                self.transition(PipelineState::Error);
                Ok(false)
            }
        }
    }

    fn transition(&self, next: PipelineState) {
        let previous = self.state.replace(next);
        debug!(%previous, %next, "pipeline state transition");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

// ---------------------------------------------------------------------------
// Pipeline capability
// ---------------------------------------------------------------------------

/// An ordered collection of filters executed as a unit.
///
/// Implementors provide the filters, the aggregate types and an engine; the
/// lifecycle methods are provided.
pub trait Pipeline {
    /// Type of the values the pipeline accepts.
    fn input_type(&self) -> TypeDescriptor;

    /// Type of the values the pipeline produces.
    fn output_type(&self) -> TypeDescriptor;

    /// Filters in execution order.
    fn filters(&self) -> &[SharedFilter];

    /// The engine holding this pipeline's state.
    fn engine(&self) -> &PipelineEngine;

    fn state(&self) -> PipelineState {
        self.engine().state()
    }

    /// Output of the last execution. Fails unless the state is `Success`.
    fn output(&self) -> Result<Rc<Value>> {
        self.engine().output()
    }

    /// Error of the last execution. Fails unless the state is `Error`.
    fn error(&self) -> Result<Rc<FilterChainError>> {
        self.engine().error()
    }

    /// Execute the pipeline, see [`PipelineEngine::execute`].
    fn execute(&self, input: Value) -> Result<bool> {
        let filters = self.filters().iter().map(|f| -> &dyn Filter { &**f });
        self.engine().execute(filters, input)
    }

    /// Reset to `Idle`, see [`PipelineEngine::reset`].
    fn reset(&self) -> Result<()> {
        self.engine().reset()
    }

    fn len(&self) -> usize {
        self.filters().len()
    }

    fn is_empty(&self) -> bool {
        self.filters().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Weak;

    use super::*;

    /// Single-filter pipeline whose filter calls back into the pipeline while it runs.
    struct ReentrantPipeline {
        filters: Vec<SharedFilter>,
        engine: PipelineEngine,
    }

    impl ReentrantPipeline {
        fn new() -> Rc<Self> {
            Rc::new_cyclic(|pipeline| Self {
                filters: vec![Rc::new(Reenter {
                    pipeline: pipeline.clone(),
                    calls: Cell::new(0),
                })],
                engine: PipelineEngine::new(),
            })
        }
    }

    impl Pipeline for ReentrantPipeline {
        fn input_type(&self) -> TypeDescriptor {
            TypeDescriptor::any()
        }

        fn output_type(&self) -> TypeDescriptor {
            TypeDescriptor::any()
        }

        fn filters(&self) -> &[SharedFilter] {
            &self.filters
        }

        fn engine(&self) -> &PipelineEngine {
            &self.engine
        }
    }

    struct Reenter {
        pipeline: Weak<ReentrantPipeline>,
        calls: Cell<usize>,
    }

    impl Filter for Reenter {
        fn input_type(&self) -> TypeDescriptor {
            TypeDescriptor::any()
        }

        fn output_type(&self) -> TypeDescriptor {
            TypeDescriptor::any()
        }

        fn execute(&self, input: Value) -> Result<Value> {
            self.calls.set(self.calls.get() + 1);
            if input.is_null() {
                return Err(FilterChainError::invalid_argument("input", "absent"));
            }

            let pipeline = self.pipeline.upgrade().expect("pipeline alive");
            assert_eq!(pipeline.state(), PipelineState::Busy);
            assert!(pipeline.reset().unwrap_err().is_illegal_state());
            assert!(pipeline.execute(Value::new(0_i32)).unwrap_err().is_illegal_state());
            assert!(pipeline.output().unwrap_err().is_illegal_state());
            assert!(pipeline.error().unwrap_err().is_illegal_state());
            Ok(input)
        }
    }

    #[test]
    fn new_pipeline_is_idle() {
        let pipeline = ReentrantPipeline::new();
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(pipeline.output().unwrap_err().is_illegal_state());
        assert!(pipeline.error().unwrap_err().is_illegal_state());
        assert_eq!(pipeline.len(), 1);
    }

    #[test]
    fn successful_execution() {
        let pipeline = ReentrantPipeline::new();
        assert!(pipeline.execute(Value::new(0_i32)).expect("execute"));
        assert_eq!(pipeline.state(), PipelineState::Success);
        assert_eq!(pipeline.output().expect("output").downcast_ref::<i32>(), Some(&0));
        assert!(pipeline.error().unwrap_err().is_illegal_state());

        pipeline.reset().expect("reset");
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(pipeline.output().unwrap_err().is_illegal_state());
        assert!(pipeline.error().unwrap_err().is_illegal_state());
    }

    #[test]
    fn failed_execution() {
        let pipeline = ReentrantPipeline::new();
        assert!(!pipeline.execute(Value::null()).expect("execute"));
        assert_eq!(pipeline.state(), PipelineState::Error);
        assert!(matches!(
            *pipeline.error().expect("error"),
            FilterChainError::InvalidArgument { name: "input", .. }
        ));
        assert!(pipeline.output().unwrap_err().is_illegal_state());

        pipeline.reset().expect("reset");
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(pipeline.output().unwrap_err().is_illegal_state());
        assert!(pipeline.error().unwrap_err().is_illegal_state());
    }

    #[test]
    fn reset_when_idle_is_noop() {
        let pipeline = ReentrantPipeline::new();
        pipeline.reset().expect("reset");
        pipeline.reset().expect("reset again");
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn execute_discards_previous_outcome() {
        let pipeline = ReentrantPipeline::new();
        assert!(!pipeline.execute(Value::null()).expect("execute"));
        assert!(pipeline.execute(Value::new("x")).expect("execute"));
        assert_eq!(pipeline.state(), PipelineState::Success);
        assert!(pipeline.error().unwrap_err().is_illegal_state());
    }

    /// Panics on negative input, otherwise passes it through.
    struct Fragile;

    impl Filter for Fragile {
        fn input_type(&self) -> TypeDescriptor {
            TypeDescriptor::any()
        }

        fn output_type(&self) -> TypeDescriptor {
            TypeDescriptor::any()
        }

        fn name(&self) -> &str {
            "fragile"
        }

        fn execute(&self, input: Value) -> Result<Value> {
            if input.downcast_ref::<i32>().is_some_and(|n| *n < 0) {
                panic!("negative input");
            }
            Ok(input)
        }
    }

    #[test]
    fn panicking_filter_is_captured_as_error() {
        let engine = PipelineEngine::new();
        let filters: [&dyn Filter; 1] = [&Fragile];

        assert!(!engine.execute(filters, Value::new(-1_i32)).expect("execute"));
        assert_eq!(engine.state(), PipelineState::Error);
        let err = engine.error().expect("error");
        match &*err {
            FilterChainError::FilterExecution { filter, source } => {
                assert_eq!(filter, "fragile");
                assert_eq!(source.to_string(), "panicked: negative input");
            }
            other => panic!("unexpected error: {other}"),
        }

        engine.reset().expect("reset after panic");
        assert_eq!(engine.state(), PipelineState::Idle);
        assert!(engine.execute(filters, Value::new(1_i32)).expect("execute after panic"));
        assert_eq!(engine.output().expect("output").downcast_ref::<i32>(), Some(&1));
    }

    #[test]
    fn panic_message_formats() {
        let formatted = panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(formatted.as_ref()), "code 7");
        let custom = panic::catch_unwind(|| panic::panic_any(3_u8)).unwrap_err();
        assert_eq!(panic_message(custom.as_ref()), "non-string panic payload");
    }

    #[test]
    fn engine_over_no_filters_is_identity() {
        let engine = PipelineEngine::new();
        assert!(engine.execute(std::iter::empty(), Value::new(5_u8)).expect("execute"));
        assert_eq!(engine.output().expect("output").downcast_ref::<u8>(), Some(&5));
    }
}
