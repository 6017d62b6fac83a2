//! Runtime values of the template notation
//!
//! Data handed to the renderer is opaque: it is carried as a
//! [`serde_json::Value`] and only inspected by field access, truth tests and
//! iteration inside templates. Trusted markup (the output of `yield`, `block`
//! or `html`) is a separate variant that is written without escaping.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde::Serialize;

use crate::renderer::ExecError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Opaque data
    Data(serde_json::Value),
    /// Markup trusted to be safe HTML
    Html(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Data(serde_json::Value::Null)
    }
}

impl Value {
    /// The nil value
    pub fn nil() -> Self {
        Self::default()
    }

    /// Wrap a string as trusted markup
    pub fn html(s: impl Into<String>) -> Self {
        Value::Html(s.into())
    }

    /// Convert any serializable value into template data
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(data).map(Value::Data)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Data(serde_json::Value::Null))
    }

    /// The underlying data, if this is not markup
    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Data(d) => Some(d),
            Value::Html(_) => None,
        }
    }

    /// String contents of a string or markup value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Data(serde_json::Value::String(s)) | Value::Html(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Data(serde_json::Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Data(serde_json::Value::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Data(serde_json::Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Name of the value's kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Html(_) => "html",
            Value::Data(d) => match d {
                serde_json::Value::Null => "nil",
                serde_json::Value::Bool(_) => "bool",
                serde_json::Value::Number(_) => "number",
                serde_json::Value::String(_) => "string",
                serde_json::Value::Array(_) => "array",
                serde_json::Value::Object(_) => "object",
            },
        }
    }

    /// Truth of a value: false, 0, nil and empty values are false
    pub fn is_true(&self) -> bool {
        match self {
            Value::Html(s) => !s.is_empty(),
            Value::Data(d) => match d {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                serde_json::Value::String(s) => !s.is_empty(),
                serde_json::Value::Array(a) => !a.is_empty(),
                serde_json::Value::Object(o) => !o.is_empty(),
            },
        }
    }

    /// Number of elements, bytes or entries
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Html(s) => Some(s.len()),
            Value::Data(serde_json::Value::String(s)) => Some(s.len()),
            Value::Data(serde_json::Value::Array(a)) => Some(a.len()),
            Value::Data(serde_json::Value::Object(o)) => Some(o.len()),
            _ => None,
        }
    }

    /// Look up one field
    ///
    /// A missing key of an object is nil; a field of nil or of a non-object
    /// is an error.
    pub fn field(&self, name: &str) -> Result<Value, ExecError> {
        match self {
            Value::Data(serde_json::Value::Object(map)) => Ok(map
                .get(name)
                .cloned()
                .map(Value::Data)
                .unwrap_or_default()),
            Value::Data(serde_json::Value::Null) => Err(ExecError::NilField {
                field: name.to_string(),
            }),
            other => Err(ExecError::NoField {
                field: name.to_string(),
                kind: other.kind(),
            }),
        }
    }

    /// Follow a chain of fields
    pub fn lookup(&self, path: &[String]) -> Result<Value, ExecError> {
        let mut current = self.clone();
        for name in path {
            current = current.field(name)?;
        }
        Ok(current)
    }

    /// Plain text form, without escaping
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Html(s) => Cow::Borrowed(s),
            Value::Data(d) => match d {
                serde_json::Value::Null => Cow::Borrowed(""),
                serde_json::Value::String(s) => Cow::Borrowed(s),
                serde_json::Value::Bool(b) => Cow::Owned(b.to_string()),
                serde_json::Value::Number(n) => Cow::Owned(n.to_string()),
                other => Cow::Owned(other.to_string()),
            },
        }
    }

    /// Form written into HTML output: markup verbatim, everything else escaped
    pub fn to_html(&self) -> Cow<'_, str> {
        match self {
            Value::Html(s) => Cow::Borrowed(s),
            Value::Data(_) => match self.to_text() {
                Cow::Borrowed(s) => html_escape::encode_quoted_attribute(s),
                Cow::Owned(s) => Cow::Owned(html_escape::encode_quoted_attribute(&s).into_owned()),
            },
        }
    }

    /// Equality used by `eq`/`ne`: numbers compare by value, markup compares
    /// as its string contents
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => match (self.as_str(), other.as_str()) {
                (Some(a), Some(b)) => a == b,
                _ => self == other,
            },
        }
    }

    /// Ordering used by `lt`/`le`/`gt`/`ge`; only numbers and strings compare
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => match (self.as_str(), other.as_str()) {
                (Some(a), Some(b)) => Some(a.cmp(b)),
                _ => None,
            },
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Data(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Data(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Data(serde_json::Value::String(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Data(serde_json::Value::Bool(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Data(serde_json::Value::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Data(serde_json::Value::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truth() {
        assert!(!Value::nil().is_true());
        assert!(!Value::from(json!(0)).is_true());
        assert!(!Value::from("").is_true());
        assert!(!Value::from(json!([])).is_true());
        assert!(!Value::from(json!({})).is_true());
        assert!(Value::from(json!(0.5)).is_true());
        assert!(Value::from("x").is_true());
        assert!(Value::from(json!({"a": 1})).is_true());
    }

    #[test]
    fn test_missing_key_is_nil() {
        let data = Value::from(json!({"user": {"name": "ann"}}));
        assert!(data.field("missing").unwrap().is_nil());
        let name = data
            .lookup(&["user".to_string(), "name".to_string()])
            .unwrap();
        assert_eq!(name, Value::from("ann"));
    }

    #[test]
    fn test_field_of_nil_fails() {
        let err = Value::nil().field("name").unwrap_err();
        assert!(matches!(err, ExecError::NilField { .. }));
    }

    #[test]
    fn test_field_of_string_fails() {
        let err = Value::from("text").field("len").unwrap_err();
        assert!(matches!(err, ExecError::NoField { kind: "string", .. }));
    }

    #[test]
    fn test_html_output_escapes_data_only() {
        assert_eq!(Value::from("<b>").to_html(), "&lt;b&gt;");
        assert_eq!(Value::html("<b>").to_html(), "<b>");
        assert_eq!(Value::nil().to_html(), "");
        assert_eq!(Value::from(json!(3)).to_html(), "3");
    }

    #[test]
    fn test_html_output_escapes_both_quotes() {
        assert_eq!(Value::from("a' & \"b\"").to_html(), "a&#x27; &amp; &quot;b&quot;");
        assert_eq!(Value::from("/path").to_html(), "/path");
    }

    #[test]
    fn test_loose_comparisons() {
        assert!(Value::from(json!(1)).loose_eq(&Value::from(json!(1.0))));
        assert!(Value::html("a").loose_eq(&Value::from("a")));
        assert_eq!(
            Value::from("a").loose_cmp(&Value::from("b")),
            Some(Ordering::Less)
        );
        assert_eq!(Value::from("a").loose_cmp(&Value::from(json!(1))), None);
    }
}
