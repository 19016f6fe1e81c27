//! Typed filters and linear pipelines for filterchain.
//!
//! This crate holds the filter contract ([`Filter`], [`TypedFilter`]), the
//! pipeline contract with its reusable execution engine ([`Pipeline`],
//! [`PipelineEngine`]), and chain assembly ([`LinearPipeline`]).
//!
//! ```
//! use std::rc::Rc;
//!
//! use filterchain_core::{LinearPipeline, Pipeline, SharedFilter, from_fn};
//! use filterchain_shared::{PipelineState, Value};
//!
//! let filters: Vec<SharedFilter> = vec![
//!     Rc::new(from_fn("render", |n: i64| Ok(n.to_string()))),
//!     Rc::new(from_fn("length", |s: String| Ok(s.len()))),
//! ];
//! let pipeline = LinearPipeline::new(filters).unwrap();
//!
//! assert!(pipeline.execute(Value::new(123_i64)).unwrap());
//! assert_eq!(pipeline.state(), PipelineState::Success);
//! assert_eq!(pipeline.output().unwrap().downcast_ref::<usize>(), Some(&3));
//! ```

pub mod chain;
pub mod engine;
pub mod filter;

pub use chain::LinearPipeline;
pub use engine::{Pipeline, PipelineEngine};
pub use filter::{Filter, FnFilter, SharedFilter, TypedFilter, from_fn};
