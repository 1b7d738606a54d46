use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of a feature table.
///
/// Spreadsheet parsers hand over either text or numbers; a blank cell is
/// [`CellValue::Null`]. Numeric meaning is always recovered through
/// [`CellValue::as_number`], so `"12.5"` and `12.5` behave the same in every
/// transform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Absent value
    #[default]
    Null,
    /// Numeric value
    Number(f64),
    /// Free text
    Text(String),
}

impl CellValue {
    /// True for `Null` and for text that is blank after trimming.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Parse the value as a finite number.
    ///
    /// Text is trimmed before parsing. `NaN` and infinities count as unparseable.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Null => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Trimmed textual form used for exact-key joins, `None` when empty.
    pub fn as_key(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            CellValue::Number(_) => Some(self.to_string()),
        }
    }

    /// Borrow the text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            // Integral values print like the spreadsheet shows them ("12", not "12.0")
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}
