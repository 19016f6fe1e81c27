//! Runtime type descriptors, the untyped [`Value`], and [`PipelineState`].
//!
//! [`FilterType`] maps the Rust types a typed filter declares onto
//! descriptors and converts untyped values to and from them.

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{FilterChainError, Result};

// ---------------------------------------------------------------------------
// TypeDescriptor
// ---------------------------------------------------------------------------

/// Name reported for the universal type.
pub const ANY_TYPE_NAME: &str = "any";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeKind {
    Any,
    Concrete,
    /// `Option<T>`: absent, or a `T`.
    Nullable { inner: TypeId },
}

/// Semantic identity of a logical type, used for assignability checks.
///
/// Equality and hashing only consider the underlying [`TypeId`]; the name is
/// carried for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
    kind: TypeKind,
}

impl TypeDescriptor {
    /// Descriptor for the Rust type `T`.
    ///
    /// [`Value`] maps to the universal type, see [`TypeDescriptor::any`].
    pub fn of<T: Any>() -> Self {
        if TypeId::of::<T>() == TypeId::of::<Value>() {
            return Self::any();
        }
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: TypeKind::Concrete,
        }
    }

    /// The universal type: accepts every value, absent included.
    pub fn any() -> Self {
        Self {
            id: TypeId::of::<Value>(),
            name: ANY_TYPE_NAME,
            kind: TypeKind::Any,
        }
    }

    /// Descriptor for `Option<T>`: accepts `T` and the absent value.
    pub fn nullable<T: Any>() -> Self {
        if TypeId::of::<T>() == TypeId::of::<Value>() {
            return Self::any();
        }
        Self {
            id: TypeId::of::<Option<T>>(),
            name: type_name::<Option<T>>(),
            kind: TypeKind::Nullable {
                inner: TypeId::of::<T>(),
            },
        }
    }

    /// Underlying Rust type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is the universal type.
    pub fn is_any(&self) -> bool {
        self.kind == TypeKind::Any
    }

    /// Whether an absent value is representable: the universal type and
    /// `Option<T>` descriptors.
    pub fn is_nullable(&self) -> bool {
        matches!(self.kind, TypeKind::Any | TypeKind::Nullable { .. })
    }

    /// Whether values of `producer` can always be used where `self` is expected.
    pub fn accepts(&self, producer: &TypeDescriptor) -> bool {
        can_accept(producer, self)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The assignability predicate shared by chain assembly and per-call validation.
///
/// A producer type satisfies a consumer type when the consumer is the
/// universal type, both name the same Rust type, or the consumer is
/// `Option<T>` and the producer is `T`.
pub fn can_accept(producer: &TypeDescriptor, consumer: &TypeDescriptor) -> bool {
    match consumer.kind {
        TypeKind::Any => true,
        TypeKind::Concrete => producer == consumer,
        TypeKind::Nullable { inner } => producer == consumer || producer.id == inner,
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

struct Payload {
    data: Box<dyn Any>,
    type_name: &'static str,
}

/// An untyped value passed between filters: absent, or an owned payload of
/// some `'static` type.
#[derive(Default)]
pub struct Value {
    payload: Option<Payload>,
}

impl Value {
    /// Wrap `value`. Wrapping a `Value` returns it unchanged instead of nesting.
    pub fn new<T: Any>(value: T) -> Self {
        let data: Box<dyn Any> = Box::new(value);
        match data.downcast::<Value>() {
            Ok(inner) => *inner,
            Err(data) => Self {
                payload: Some(Payload {
                    data,
                    type_name: type_name::<T>(),
                }),
            },
        }
    }

    /// The absent value.
    pub fn null() -> Self {
        Self { payload: None }
    }

    /// `Some(v)` becomes a present value, `None` the absent one.
    pub fn from_option<T: Any>(value: Option<T>) -> Self {
        value.map(Self::new).unwrap_or_default()
    }

    pub fn is_null(&self) -> bool {
        self.payload.is_none()
    }

    /// Runtime type name of the payload, or `"null"`.
    pub fn type_name(&self) -> &'static str {
        self.payload.as_ref().map_or("null", |p| p.type_name)
    }

    /// Descriptor of the payload's runtime type; `None` when absent.
    pub fn descriptor(&self) -> Option<TypeDescriptor> {
        self.payload.as_ref().map(|p| TypeDescriptor {
            id: Any::type_id(&*p.data),
            name: p.type_name,
            kind: TypeKind::Concrete,
        })
    }

    /// Whether this value may be handed to something expecting `expected`.
    pub fn satisfies(&self, expected: &TypeDescriptor) -> bool {
        match self.descriptor() {
            Some(actual) => can_accept(&actual, expected),
            None => expected.is_nullable(),
        }
    }

    pub fn is<T: Any>(&self) -> bool {
        self.payload.as_ref().is_some_and(|p| p.data.is::<T>())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.data.downcast_ref::<T>())
    }

    /// Validate against `T` and extract the payload.
    ///
    /// Fails with [`FilterChainError::NullInput`] when absent and `T` is not
    /// nullable, and with [`FilterChainError::TypeMismatch`] when the payload
    /// is of another type. Casting to `Value` always succeeds.
    pub fn cast<T: Any>(self) -> Result<T> {
        let expected = TypeDescriptor::of::<T>();
        let actual = self.type_name();

        if !self.satisfies(&expected) {
            return Err(if self.is_null() {
                FilterChainError::NullInput {
                    input_type: expected,
                }
            } else {
                FilterChainError::TypeMismatch { expected, actual }
            });
        }

        if expected.is_any() {
            let whole: Box<dyn Any> = Box::new(self);
            return whole
                .downcast::<T>()
                .map(|v| *v)
                .map_err(|_| FilterChainError::TypeMismatch { expected, actual });
        }

        match self.payload {
            Some(payload) => payload
                .data
                .downcast::<T>()
                .map(|v| *v)
                .map_err(|_| FilterChainError::TypeMismatch { expected, actual }),
            None => Err(FilterChainError::NullInput {
                input_type: expected,
            }),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.type_name())
    }
}

// ---------------------------------------------------------------------------
// Filter types
// ---------------------------------------------------------------------------

/// Concrete payload types: never absent, matched by exact type.
///
/// Implement it for your own types to use them as typed filter inputs and
/// outputs.
pub trait ValueType: Any {}

macro_rules! value_types {
    ($($ty:ty),* $(,)?) => {
        $(impl ValueType for $ty {})*
    };
}

value_types!(
    (), bool, char, String, &'static str,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
);

impl<T: Any> ValueType for Vec<T> {}
impl<K: Any, V: Any> ValueType for BTreeMap<K, V> {}
impl<K: Any, V: Any, S: Any> ValueType for HashMap<K, V, S> {}

/// A Rust type a typed filter can declare as its input or output.
///
/// Implemented for [`Value`] (the universal type), for every [`ValueType`],
/// and for `Option<T>` of a value type. `Option<T>` is nullable: the absent
/// value maps to `None` and a present `T` to `Some`.
pub trait FilterType: Sized + 'static {
    /// Descriptor used for chain assembly.
    fn descriptor() -> TypeDescriptor;

    /// Validate an untyped value and convert it.
    fn from_value(value: Value) -> Result<Self>;

    fn into_value(self) -> Value;
}

impl FilterType for Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::any()
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }

    fn into_value(self) -> Value {
        self
    }
}

impl<T: ValueType> FilterType for T {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<T>()
    }

    fn from_value(value: Value) -> Result<Self> {
        value.cast()
    }

    fn into_value(self) -> Value {
        Value::new(self)
    }
}

impl<T: ValueType> FilterType for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::nullable::<T>()
    }

    fn from_value(value: Value) -> Result<Self> {
        if value.is::<Option<T>>() {
            return value.cast();
        }
        let expected = Self::descriptor();
        let actual = value.type_name();
        match value.payload {
            Some(payload) => payload
                .data
                .downcast::<T>()
                .map(|v| Some(*v))
                .map_err(|_| FilterChainError::TypeMismatch { expected, actual }),
            None => Ok(None),
        }
    }

    fn into_value(self) -> Value {
        Value::from_option(self)
    }
}

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// Lifecycle state of a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    /// Not executed yet, or reset since the last execution.
    #[default]
    Idle,
    /// Currently executing.
    Busy,
    /// The last execution completed; its output is available.
    Success,
    /// The last execution failed; its error is available.
    Error,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}
