//! Typed runtime values.
//!
//! A script value is one of four kinds. The kind fully determines the payload,
//! so dispatch is a `match` on the variant rather than a comparison of type
//! names.

use std::fmt;

use serde::Serialize;

use crate::error::ScriptError;

/// The kind of a [`Value`], also used as a parameter type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ValueKind {
    Bool,
    Int,
    Double,
    String,
}

impl ValueKind {
    pub const ALL: [ValueKind; 4] = [
        ValueKind::Bool,
        ValueKind::Int,
        ValueKind::Double,
        ValueKind::String,
    ];

    /// Script-facing type name, as written in `declare:` lines.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "Bool",
            ValueKind::Int => "Int",
            ValueKind::Double => "Double",
            ValueKind::String => "String",
        }
    }

    /// Case-insensitive lookup by type name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Double)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A script runtime value. Values are immutable; operations build new ones.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
        }
    }

    /// The zero value of a kind, used as a type prototype.
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int => Value::Int(0),
            ValueKind::Double => Value::Double(0.0),
            ValueKind::String => Value::String(String::new()),
        }
    }

    /// Build a value of `kind` from raw literal text.
    ///
    /// Bools accept `true`/`false` in any case. Strings may be given with or
    /// without surrounding quotes.
    pub fn create(kind: ValueKind, raw: &str) -> Result<Self, ScriptError> {
        let text = raw.trim();
        let invalid = || ScriptError::InvalidLiteral {
            kind,
            text: text.to_string(),
        };
        match kind {
            ValueKind::Bool => parse_bool(text).map(Value::Bool).ok_or_else(invalid),
            ValueKind::Int => text.parse().map(Value::Int).map_err(|_| invalid()),
            ValueKind::Double => text.parse().map(Value::Double).map_err(|_| invalid()),
            ValueKind::String => {
                let unquoted = text
                    .strip_prefix('"')
                    .and_then(|t| t.strip_suffix('"'))
                    .unwrap_or(text);
                Ok(Value::String(unquoted.to_string()))
            }
        }
    }

    /// Text that reads back as this value when substituted into an
    /// expression. Strings are re-wrapped in quotes and a finite Double
    /// always carries a decimal point, so `3.0` stays a Double.
    pub fn render_literal(&self) -> String {
        match self {
            Value::String(s) => format!("\"{s}\""),
            Value::Double(x) => {
                let text = x.to_string();
                if x.is_finite() && !text.contains('.') {
                    format!("{text}.0")
                } else {
                    text
                }
            }
            other => other.to_string(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view with Int widened to Double.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Double(x) => Some(*x),
            _ => None,
        }
    }

    /// Coarse numeric truthiness: anything below 1 is false.
    pub fn truthiness(number: f64) -> bool {
        number >= 1.0
    }
}

/// `true`/`false` in any letter case.
pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}
