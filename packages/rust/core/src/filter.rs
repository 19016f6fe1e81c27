//! Filter capability and the typed filter adapter.
//!
//! [`Filter`] is the untyped contract the engine invokes. Most filters are
//! written against [`TypedFilter`] instead; a blanket impl derives the type
//! descriptors and validates every untyped input before calling
//! [`TypedFilter::apply`].

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use filterchain_shared::{BoxError, FilterChainError, FilterType, Result, TypeDescriptor, Value};

/// A filter shared between pipelines.
pub type SharedFilter = Rc<dyn Filter>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A single unit transformation with declared input and output types.
pub trait Filter {
    /// Type of the values this filter accepts.
    fn input_type(&self) -> TypeDescriptor;

    /// Type of the values this filter produces.
    fn output_type(&self) -> TypeDescriptor;

    /// Name used in diagnostics and logs.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Execute the filter on an untyped value.
    fn execute(&self, input: Value) -> Result<Value>;
}

/// A filter written against concrete Rust types.
///
/// `Input = Value` declares the universal input type, and `Input = Option<T>`
/// a nullable one; both accept the absent value. Any other input type rejects
/// absent values with [`FilterChainError::NullInput`].
pub trait TypedFilter {
    type Input: FilterType;
    type Output: FilterType;

    /// Name used in diagnostics and logs.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// The filter's own logic.
    fn apply(&self, input: Self::Input) -> std::result::Result<Self::Output, BoxError>;
}

impl<F: TypedFilter> Filter for F {
    fn input_type(&self) -> TypeDescriptor {
        F::Input::descriptor()
    }

    fn output_type(&self) -> TypeDescriptor {
        F::Output::descriptor()
    }

    fn name(&self) -> &str {
        TypedFilter::name(self)
    }

    fn execute(&self, input: Value) -> Result<Value> {
        let input = F::Input::from_value(input)?;
        let output = self
            .apply(input)
            .map_err(|source| FilterChainError::filter(TypedFilter::name(self), source))?;
        Ok(output.into_value())
    }
}

impl fmt::Debug for dyn Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {})",
            self.name(),
            self.input_type(),
            self.output_type()
        )
    }
}

// ---------------------------------------------------------------------------
// Closure filters
// ---------------------------------------------------------------------------

/// A typed filter backed by a closure. Built with [`from_fn`].
pub struct FnFilter<I, O, F> {
    name: String,
    func: F,
    _types: PhantomData<fn(I) -> O>,
}

/// Build a typed filter from a closure.
///
/// ```
/// use filterchain_core::{Filter, from_fn};
/// use filterchain_shared::Value;
///
/// let double = from_fn("double", |n: i64| Ok(n * 2));
/// let out = double.execute(Value::new(21_i64)).unwrap();
/// assert_eq!(out.downcast_ref::<i64>(), Some(&42));
/// ```
pub fn from_fn<I, O, F>(name: impl Into<String>, func: F) -> FnFilter<I, O, F>
where
    I: FilterType,
    O: FilterType,
    F: Fn(I) -> std::result::Result<O, BoxError>,
{
    FnFilter {
        name: name.into(),
        func,
        _types: PhantomData,
    }
}

impl<I, O, F> TypedFilter for FnFilter<I, O, F>
where
    I: FilterType,
    O: FilterType,
    F: Fn(I) -> std::result::Result<O, BoxError>,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: I) -> std::result::Result<O, BoxError> {
        (self.func)(input)
    }
}
