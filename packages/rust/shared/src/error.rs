//! Error types for filterchain.
//!
//! Library crates use [`FilterChainError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::{PipelineState, TypeDescriptor};

/// Boxed error returned by a filter's own logic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all filterchain operations.
#[derive(Debug, thiserror::Error)]
pub enum FilterChainError {
    /// A required argument was absent.
    #[error("invalid argument `{name}`: {message}")]
    InvalidArgument { name: &'static str, message: String },

    /// A filter with a non-nullable input type received an absent value.
    #[error("input can't be absent since the input type ({input_type}) is a value type")]
    NullInput { input_type: TypeDescriptor },

    /// A filter received a present value of the wrong type.
    #[error("input is not an instance of {expected} (got {actual})")]
    TypeMismatch {
        expected: TypeDescriptor,
        actual: &'static str,
    },

    /// Pipeline assembly found an absent element or an incompatible pair.
    #[error("illegal chain: {message}")]
    IllegalChain { message: String },

    /// An operation was invoked in a state that forbids it.
    #[error("illegal state ({state}): {message}")]
    IllegalState {
        state: PipelineState,
        message: String,
    },

    /// A filter's own logic failed during execution.
    #[error("filter `{filter}` failed: {source}")]
    FilterExecution {
        filter: String,
        #[source]
        source: BoxError,
    },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FilterChainError>;

impl FilterChainError {
    /// Create an invalid-argument error for the named argument.
    pub fn invalid_argument(name: &'static str, msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            message: msg.into(),
        }
    }

    /// Create an illegal-chain error from any displayable message.
    pub fn illegal_chain(msg: impl Into<String>) -> Self {
        Self::IllegalChain {
            message: msg.into(),
        }
    }

    /// Create an illegal-state error observed in `state`.
    pub fn illegal_state(state: PipelineState, msg: impl Into<String>) -> Self {
        Self::IllegalState {
            state,
            message: msg.into(),
        }
    }

    /// The error raised by any call made while a pipeline is executing.
    pub fn busy() -> Self {
        Self::illegal_state(PipelineState::Busy, "pipeline is busy")
    }

    /// Wrap a failure raised by the named filter's own logic.
    pub fn filter(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::FilterExecution {
            filter: name.into(),
            source: source.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is an [`IllegalState`](Self::IllegalState) error.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalState { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FilterChainError::busy();
        assert_eq!(err.to_string(), "illegal state (busy): pipeline is busy");
        assert!(err.is_illegal_state());

        let err = FilterChainError::NullInput {
            input_type: TypeDescriptor::of::<i32>(),
        };
        assert!(err.to_string().contains("(i32) is a value type"));

        let err = FilterChainError::config("unknown chain `nope`");
        assert_eq!(err.to_string(), "config error: unknown chain `nope`");
    }

    #[test]
    fn filter_failure_keeps_its_source() {
        let err = FilterChainError::filter("to-string", "cannot render an absent value");
        assert_eq!(
            err.to_string(),
            "filter `to-string` failed: cannot render an absent value"
        );
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "cannot render an absent value");
    }
}
