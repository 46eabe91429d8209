//! Values stored in a session.
//!
//! Sessions hold a closed set of value shapes so the cookie payload has a
//! fixed, testable encoding. Anything richer can be carried as a
//! [`SessionValue::Map`] or serialized by the caller into a string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

/// Session key/value data. Ordered so the serialized form is canonical.
pub type SessionData = BTreeMap<String, SessionValue>;

/// A single session value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Must be finite: JSON has no encoding for NaN or infinities.
    Float(#[serde(serialize_with = "serialize_finite")] f64),
    String(String),
    List(Vec<SessionValue>),
    Map(BTreeMap<String, SessionValue>),
}

fn serialize_finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !value.is_finite() {
        return Err(serde::ser::Error::custom(format!(
            "non-finite float {value} cannot be stored in a session"
        )));
    }
    serializer.serialize_f64(*value)
}

impl SessionValue {
    /// Returns the string slice if this is a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SessionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SessionValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SessionValue::Float(n) => Some(*n),
            SessionValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SessionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SessionValue::Null)
    }
}

impl From<&str> for SessionValue {
    fn from(s: &str) -> Self {
        SessionValue::String(s.to_owned())
    }
}

impl From<String> for SessionValue {
    fn from(s: String) -> Self {
        SessionValue::String(s)
    }
}

impl From<bool> for SessionValue {
    fn from(b: bool) -> Self {
        SessionValue::Bool(b)
    }
}

impl From<i64> for SessionValue {
    fn from(n: i64) -> Self {
        SessionValue::Int(n)
    }
}

impl From<i32> for SessionValue {
    fn from(n: i32) -> Self {
        SessionValue::Int(i64::from(n))
    }
}

impl From<f64> for SessionValue {
    fn from(n: f64) -> Self {
        SessionValue::Float(n)
    }
}

impl<T: Into<SessionValue>> From<Vec<T>> for SessionValue {
    fn from(items: Vec<T>) -> Self {
        SessionValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, SessionValue>> for SessionValue {
    fn from(map: BTreeMap<String, SessionValue>) -> Self {
        SessionValue::Map(map)
    }
}

impl<T: Into<SessionValue>> From<Option<T>> for SessionValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SessionValue::Null, Into::into)
    }
}
