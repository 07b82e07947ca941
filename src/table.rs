use std::fmt;

use crate::error::{PipelineError, Result};

/// A single cell of a reference sheet or an output row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Missing => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric when the text reads as a number, text otherwise.
    pub fn infer(s: Option<&str>) -> Self {
        match s {
            Some(s) => s.trim().parse().map(Value::Number).unwrap_or_else(|_| Value::Text(s.to_owned())),
            None => Value::Missing,
        }
    }

    pub fn from_text(s: Option<&str>) -> Self {
        match s {
            Some(s) => Value::Text(s.to_owned()),
            None => Value::Missing,
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map(Value::Number).unwrap_or(Value::Missing)
    }
}

impl From<Option<bool>> for Value {
    fn from(v: Option<bool>) -> Self {
        v.map(Value::Bool).unwrap_or(Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => f.write_str(s),
            Value::Missing => Ok(()),
        }
    }
}

/// Header row plus cells, as read from a workbook sheet or a small CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Sheet {
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| PipelineError::missing_column(&self.source, name))
    }

    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Value::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_numbers() {
        assert_eq!(Value::Number(2000.0).to_string(), "2000");
        assert_eq!(Value::Number(0.45).to_string(), "0.45");
        assert_eq!(Value::Missing.to_string(), "");
        assert_eq!(Value::Text(" 1.5 ".into()).as_f64(), Some(1.5));
        assert_eq!(Value::Bool(true).as_f64(), Some(1.0));
        assert_eq!(Value::infer(Some(" 12 ")), Value::Number(12.0));
        assert_eq!(Value::infer(Some("high")), Value::Text("high".into()));
        assert_eq!(Value::infer(None), Value::Missing);
    }

    #[test]
    fn short_rows_read_as_missing() {
        let sheet = Sheet {
            source: "test".into(),
            headers: vec!["a".into(), "b".into()],
            rows: vec![vec![Value::Number(1.0)]],
        };
        assert_eq!(sheet.cell(0, 1), &Value::Missing);
        assert!(sheet.column("c").is_err());
        assert_eq!(sheet.column("b").unwrap(), 1);
    }
}
