//! Built-in filters and a name → filter registry.
//!
//! This crate provides:
//! - [`text`]: text rendering and string transforms (`to-string`, `length`, ...)
//! - [`FilterRegistry`]: looks filters up by name so chains can be described
//!   as lists of names (CLI flags, config files)

pub mod text;

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use filterchain_core::SharedFilter;
use filterchain_shared::{FilterChainError, Result};

pub use text::{
    Identity, Length, Lowercase, ParseInt, TextError, ToText, Trim, Uppercase, render,
};

/// Builds a fresh filter instance.
pub type FilterFactory = fn() -> SharedFilter;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds named filter factories, ordered by name.
pub struct FilterRegistry {
    factories: BTreeMap<String, FilterFactory>,
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Create a registry with all built-in filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("to-string", || Rc::new(ToText));
        registry.register("length", || Rc::new(Length));
        registry.register("parse-int", || Rc::new(ParseInt));
        registry.register("uppercase", || Rc::new(Uppercase));
        registry.register("lowercase", || Rc::new(Lowercase));
        registry.register("trim", || Rc::new(Trim));
        registry.register("identity", || Rc::new(Identity));
        registry
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: FilterFactory) {
        let name = name.into();
        debug!(%name, "registering filter");
        self.factories.insert(name, factory);
    }

    /// Build the filter registered under `name`.
    pub fn get(&self, name: &str) -> Option<SharedFilter> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build filters for `names`, in order.
    ///
    /// Fails with [`FilterChainError::InvalidArgument`] on the first unknown name.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<SharedFilter>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name).ok_or_else(|| {
                    FilterChainError::invalid_argument("filters", format!("unknown filter `{name}`"))
                })
            })
            .collect()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
