use std::fmt;

use crate::error::{Result, TableError};

/// A single typed cell. Absent values are modelled as `None` in a [`Cell`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
}

/// A table cell: `None` is the null/absent value.
pub type Cell = Option<Value>;

/// Target of [`Table::cast_column`](crate::table::Table::cast_column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericType {
    Integer,
    Float,
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericType::Integer => f.write_str("integer"),
            NumericType::Float => f.write_str("float"),
        }
    }
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the value; strings are trimmed and parsed.
    /// Non-finite results are not considered numbers.
    pub fn as_number(&self) -> Option<f64> {
        let parsed = match self {
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
        };
        parsed.is_finite().then_some(parsed)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// True for null cells and empty strings.
pub fn is_blank(cell: Option<&Value>) -> bool {
    match cell {
        None => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

pub fn as_number(cell: Option<&Value>) -> Option<f64> {
    cell.and_then(Value::as_number)
}

pub fn is_valid_number(cell: Option<&Value>) -> bool {
    as_number(cell).is_some()
}

/// Renders a cell for CSV output; null becomes the empty string.
pub fn display_cell(cell: Option<&Value>) -> String {
    cell.map(Value::as_display).unwrap_or_default()
}

/// A digit string with exactly the shape `\d*\.\d*` (dots allowed anywhere,
/// at least one digit) is read as a float before narrowing.
fn looks_like_decimal(value: &str) -> bool {
    value.contains('.')
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().all(|c| c == '.' || c.is_ascii_digit())
}

/// Converts a cell to `target`. Empty and absent cells become null.
pub fn cast_value(column: &str, cell: Option<&Value>, target: NumericType) -> Result<Cell> {
    let cast_error = || TableError::Cast {
        column: column.to_string(),
        value: display_cell(cell),
    };
    let Some(value) = cell else {
        return Ok(None);
    };
    let converted = match (value, target) {
        (Value::String(s), _) if s.is_empty() => return Ok(None),
        (Value::Integer(i), NumericType::Integer) => Value::Integer(*i),
        (Value::Integer(i), NumericType::Float) => Value::Float(*i as f64),
        (Value::Float(f), NumericType::Float) => Value::Float(*f),
        (Value::Float(f), NumericType::Integer) => {
            if !f.is_finite() {
                return Err(cast_error());
            }
            Value::Integer(f.trunc() as i64)
        }
        (Value::String(s), NumericType::Integer) => {
            let trimmed = s.trim();
            if looks_like_decimal(trimmed) {
                let parsed: f64 = trimmed.parse().map_err(|_| cast_error())?;
                Value::Integer(parsed.trunc() as i64)
            } else {
                Value::Integer(trimmed.parse().map_err(|_| cast_error())?)
            }
        }
        (Value::String(s), NumericType::Float) => {
            let parsed: f64 = s.trim().parse().map_err(|_| cast_error())?;
            if !parsed.is_finite() {
                return Err(cast_error());
            }
            Value::Float(parsed)
        }
    };
    Ok(Some(converted))
}
