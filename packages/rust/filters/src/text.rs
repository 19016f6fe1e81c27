//! Text filters: rendering values to strings and transforming strings.

use filterchain_core::TypedFilter;
use filterchain_shared::{BoxError, Value};

/// Failures raised by the text filters.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// `to-string` was given the absent value.
    #[error("cannot convert an absent value to a string")]
    Absent,

    /// `to-string` has no rendering for the payload type.
    #[error("no string conversion for values of type {type_name}")]
    Unsupported { type_name: &'static str },

    /// `parse-int` was given text that is not a decimal integer.
    #[error("'{input}' is not an integer: {source}")]
    NotAnInteger {
        input: String,
        source: std::num::ParseIntError,
    },
}

/// Render a value as text, when its payload type has a textual form.
///
/// Strings, characters, booleans, integers and floats are supported.
pub fn render(value: &Value) -> Option<String> {
    macro_rules! try_render {
        ($($ty:ty),* $(,)?) => {
            $(
                if let Some(v) = value.downcast_ref::<$ty>() {
                    return Some(v.to_string());
                }
            )*
        };
    }

    try_render!(
        String, &'static str, char, bool,
        i8, i16, i32, i64, i128, isize,
        u8, u16, u32, u64, u128, usize,
        f32, f64,
    );
    None
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// `to-string`: any value → its text form. Fails on absent input.
pub struct ToText;

impl TypedFilter for ToText {
    type Input = Value;
    type Output = String;

    fn name(&self) -> &str {
        "to-string"
    }

    fn apply(&self, input: Value) -> Result<String, BoxError> {
        if input.is_null() {
            return Err(TextError::Absent.into());
        }
        render(&input).ok_or_else(|| {
            TextError::Unsupported {
                type_name: input.type_name(),
            }
            .into()
        })
    }
}

/// `length`: number of characters in a string.
pub struct Length;

impl TypedFilter for Length {
    type Input = String;
    type Output = usize;

    fn name(&self) -> &str {
        "length"
    }

    fn apply(&self, input: String) -> Result<usize, BoxError> {
        Ok(input.chars().count())
    }
}

/// `parse-int`: decimal integer parsed from trimmed text.
pub struct ParseInt;

impl TypedFilter for ParseInt {
    type Input = String;
    type Output = i64;

    fn name(&self) -> &str {
        "parse-int"
    }

    fn apply(&self, input: String) -> Result<i64, BoxError> {
        input.trim().parse::<i64>().map_err(|source| {
            TextError::NotAnInteger {
                input: input.clone(),
                source,
            }
            .into()
        })
    }
}

/// `uppercase`
pub struct Uppercase;

impl TypedFilter for Uppercase {
    type Input = String;
    type Output = String;

    fn name(&self) -> &str {
        "uppercase"
    }

    fn apply(&self, input: String) -> Result<String, BoxError> {
        Ok(input.to_uppercase())
    }
}

/// `lowercase`
pub struct Lowercase;

impl TypedFilter for Lowercase {
    type Input = String;
    type Output = String;

    fn name(&self) -> &str {
        "lowercase"
    }

    fn apply(&self, input: String) -> Result<String, BoxError> {
        Ok(input.to_lowercase())
    }
}

/// `trim`: strip leading and trailing whitespace.
pub struct Trim;

impl TypedFilter for Trim {
    type Input = String;
    type Output = String;

    fn name(&self) -> &str {
        "trim"
    }

    fn apply(&self, input: String) -> Result<String, BoxError> {
        Ok(input.trim().to_string())
    }
}

/// `identity`: returns its input unchanged, absent included.
pub struct Identity;

impl TypedFilter for Identity {
    type Input = Value;
    type Output = Value;

    fn name(&self) -> &str {
        "identity"
    }

    fn apply(&self, input: Value) -> Result<Value, BoxError> {
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use filterchain_core::Filter;
    use filterchain_shared::FilterChainError;

    use super::*;

    #[test]
    fn render_known_types() {
        assert_eq!(render(&Value::new(123_i32)).as_deref(), Some("123"));
        assert_eq!(render(&Value::new("abc")).as_deref(), Some("abc"));
        assert_eq!(render(&Value::new(true)).as_deref(), Some("true"));
        assert_eq!(render(&Value::new(1.5_f64)).as_deref(), Some("1.5"));
        assert_eq!(render(&Value::new(vec![1_u8])), None);
        assert_eq!(render(&Value::null()), None);
    }

    #[test]
    fn to_text_rejects_absent_and_unsupported() {
        let err = ToText.execute(Value::null()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "filter `to-string` failed: cannot convert an absent value to a string"
        );

        let err = ToText.execute(Value::new(vec![1_u8])).unwrap_err();
        assert!(err.to_string().contains("no string conversion"), "{err}");
    }

    #[test]
    fn length_counts_chars() {
        assert_eq!(Length.apply("héllo".to_string()).expect("apply"), 5);
    }

    #[test]
    fn parse_int_trims_and_reports() {
        assert_eq!(ParseInt.apply(" 42 ".to_string()).expect("apply"), 42);

        let err = ParseInt.execute(Value::new("4x".to_string())).unwrap_err();
        match err {
            FilterChainError::FilterExecution { filter, source } => {
                assert_eq!(filter, "parse-int");
                assert!(source.downcast_ref::<TextError>().is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn string_filters_reject_wrong_type() {
        let err = Uppercase.execute(Value::new(3_i64)).unwrap_err();
        assert!(matches!(err, FilterChainError::TypeMismatch { .. }));

        let err = Trim.execute(Value::null()).unwrap_err();
        assert!(matches!(err, FilterChainError::NullInput { .. }));
    }

    #[test]
    fn case_and_trim() {
        assert_eq!(Uppercase.apply("abc".into()).expect("apply"), "ABC");
        assert_eq!(Lowercase.apply("AbC".into()).expect("apply"), "abc");
        assert_eq!(Trim.apply("  x \n".into()).expect("apply"), "x");
    }

    #[test]
    fn identity_passes_null() {
        assert!(Identity.execute(Value::null()).expect("execute").is_null());
    }
}
