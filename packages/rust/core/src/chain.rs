//! Linear chain assembly.
//!
//! [`LinearPipeline`] validates a filter sequence once, at construction, and
//! keeps it fixed for its lifetime.

use std::fmt;
use std::slice;

use tracing::debug;

use filterchain_shared::{FilterChainError, Result, TypeDescriptor};

use crate::engine::{Pipeline, PipelineEngine};
use crate::filter::{Filter, SharedFilter};

/// An immutable, type-checked sequence of filters.
pub struct LinearPipeline {
    filters: Vec<SharedFilter>,
    input_type: TypeDescriptor,
    output_type: TypeDescriptor,
    engine: PipelineEngine,
}

impl LinearPipeline {
    /// Assemble a pipeline from `filters`.
    ///
    /// Fails with [`FilterChainError::IllegalChain`] when a filter's input type
    /// does not accept the previous filter's output type. An empty sequence is
    /// the identity pipeline over the universal type.
    pub fn new<I>(filters: I) -> Result<Self>
    where
        I: IntoIterator<Item = SharedFilter>,
    {
        Self::assemble(filters.into_iter().map(Some))
    }

    /// Assemble a pipeline from a possibly absent sequence of possibly absent
    /// filters.
    ///
    /// An absent sequence fails with [`FilterChainError::InvalidArgument`]; an
    /// absent element fails with [`FilterChainError::IllegalChain`] naming its
    /// position.
    pub fn from_slots<I>(slots: Option<I>) -> Result<Self>
    where
        I: IntoIterator<Item = Option<SharedFilter>>,
    {
        let slots = slots.ok_or_else(|| {
            FilterChainError::invalid_argument("filters", "the filter sequence is absent")
        })?;
        Self::assemble(slots)
    }

    fn assemble<I>(slots: I) -> Result<Self>
    where
        I: IntoIterator<Item = Option<SharedFilter>>,
    {
        let filters = slots
            .into_iter()
            .enumerate()
            .map(|(position, slot)| {
                slot.ok_or_else(|| {
                    FilterChainError::illegal_chain(format!(
                        "the sequence contains an absent filter at position {position}"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for (position, pair) in filters.windows(2).enumerate() {
            let (previous, next) = (&pair[0], &pair[1]);
            if !next.input_type().accepts(&previous.output_type()) {
                return Err(FilterChainError::illegal_chain(format!(
                    "{} in `{}` (position {}) is not assignable from {} in `{}` (position {position})",
                    next.input_type(),
                    next.name(),
                    position + 1,
                    previous.output_type(),
                    previous.name(),
                )));
            }
        }

        let input_type = filters
            .first()
            .map_or_else(TypeDescriptor::any, |f| f.input_type());
        let output_type = filters
            .last()
            .map_or_else(TypeDescriptor::any, |f| f.output_type());

        debug!(
            len = filters.len(),
            %input_type,
            %output_type,
            "assembled pipeline"
        );

        Ok(Self {
            filters,
            input_type,
            output_type,
            engine: PipelineEngine::new(),
        })
    }

    /// Iterate over the filters in execution order.
    pub fn iter(&self) -> slice::Iter<'_, SharedFilter> {
        self.filters.iter()
    }
}

impl Pipeline for LinearPipeline {
    fn input_type(&self) -> TypeDescriptor {
        self.input_type
    }

    fn output_type(&self) -> TypeDescriptor {
        self.output_type
    }

    fn filters(&self) -> &[SharedFilter] {
        &self.filters
    }

    fn engine(&self) -> &PipelineEngine {
        &self.engine
    }
}

impl<'a> IntoIterator for &'a LinearPipeline {
    type Item = &'a SharedFilter;
    type IntoIter = slice::Iter<'a, SharedFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for LinearPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearPipeline")
            .field("filters", &self.filters)
            .field("input_type", &self.input_type.name())
            .field("output_type", &self.output_type.name())
            .field("state", &self.engine.state())
            .finish()
    }
}
