//! Turning command-line literals into pipeline input values.

use std::str::FromStr;

use color_eyre::eyre::{Result, eyre};
use filterchain_shared::Value;

/// How an input literal is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum InputKind {
    /// Integer, then float, then bool, else string.
    Auto,
    Int,
    Float,
    Bool,
    String,
    /// Ignore the literal and feed the absent value.
    Null,
}

impl FromStr for InputKind {
    type Err = color_eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        <Self as clap::ValueEnum>::from_str(s, true)
            .map_err(|_| eyre!("unknown input kind '{s}': expected auto, int, float, bool, string or null"))
    }
}

/// Build the input value for `literal` (absent when `None`).
pub(crate) fn parse_input(literal: Option<&str>, kind: InputKind) -> Result<Value> {
    let Some(literal) = literal else {
        return Ok(Value::null());
    };

    let value = match kind {
        InputKind::Null => Value::null(),
        InputKind::String => Value::new(literal.to_string()),
        InputKind::Int => Value::new(
            literal
                .parse::<i64>()
                .map_err(|e| eyre!("'{literal}' is not an integer: {e}"))?,
        ),
        InputKind::Float => Value::new(
            literal
                .parse::<f64>()
                .map_err(|e| eyre!("'{literal}' is not a float: {e}"))?,
        ),
        InputKind::Bool => Value::new(
            literal
                .parse::<bool>()
                .map_err(|e| eyre!("'{literal}' is not a bool: {e}"))?,
        ),
        InputKind::Auto => {
            if let Ok(n) = literal.parse::<i64>() {
                Value::new(n)
            } else if let Ok(x) = literal.parse::<f64>() {
                Value::new(x)
            } else if let Ok(b) = literal.parse::<bool>() {
                Value::new(b)
            } else {
                Value::new(literal.to_string())
            }
        }
    };

    Ok(value)
}
