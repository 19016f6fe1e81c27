//! Shared types, error model, and configuration for filterchain.
//!
//! This crate is the foundation depended on by all other filterchain crates.
//! It provides:
//! - [`FilterChainError`]: the unified error type
//! - Runtime typing ([`TypeDescriptor`], [`Value`], [`FilterType`], [`can_accept`]) and [`PipelineState`]
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_PATH_ENV, ChainEntry, DefaultsConfig, config_file_path, init_config,
    init_config_at, load_config, load_config_from, render_config,
};
pub use error::{BoxError, FilterChainError, Result};
pub use types::{
    ANY_TYPE_NAME, FilterType, PipelineState, TypeDescriptor, Value, ValueType, can_accept,
};
