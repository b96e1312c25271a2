use crate::entity::Entity;
use chrono::{DateTime, Utc};
use cirrus_types::{GeoPoint, ObjectRef};
use serde_json::Number;
use std::collections::BTreeMap;

/// A field value as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Integer or float, as decoded from JSON.
    Number(Number),
    String(String),
    /// A UTC instant, sent as a typed date.
    Date(DateTime<Utc>),
    GeoPoint(GeoPoint),
    Array(Vec<Value>),
    /// A nested JSON object without a type tag.
    Map(BTreeMap<String, Value>),
    /// A reference to another object. Decoded references hold only
    /// identity until fetched.
    Object(Box<Entity>),
    /// Marker for a relation field pointing at objects of `class_name`.
    Relation { class_name: String },
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Entity> {
        match self {
            Value::Object(e) => Some(e),
            _ => None,
        }
    }

    /// Equality used for array membership: objects compare by identity
    /// when both sides have one.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => match (a.to_ref(), b.to_ref()) {
                (Some(a), Some(b)) => a == b,
                _ => a == b,
            },
            _ => self == other,
        }
    }

    /// Adds two numbers, staying integral while the sum fits in an `i64`.
    pub(crate) fn add_numbers(a: &Number, b: &Number) -> Number {
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            if let Some(sum) = x.checked_add(y) {
                return Number::from(sum);
            }
        }
        let sum = a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0);
        Number::from_f64(sum).unwrap_or_else(|| Number::from(0))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<GeoPoint> for Value {
    fn from(p: GeoPoint) -> Self {
        Value::GeoPoint(p)
    }
}

impl From<Entity> for Value {
    fn from(e: Entity) -> Self {
        Value::Object(Box::new(e))
    }
}

impl From<ObjectRef> for Value {
    fn from(r: ObjectRef) -> Self {
        Value::Object(Box::new(Entity::from_ref(&r)))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

/// Structural conversion; wire markers are not interpreted here.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_addition_stays_integral() {
        let sum = Value::add_numbers(&Number::from(10), &Number::from(5));
        assert_eq!(sum.as_i64(), Some(15));
    }

    #[test]
    fn mixed_addition_goes_float() {
        let sum = Value::add_numbers(&Number::from(1), &Number::from_f64(0.5).unwrap());
        assert_eq!(sum.as_f64(), Some(1.5));
    }

    #[test]
    fn overflow_falls_back_to_float() {
        let sum = Value::add_numbers(&Number::from(i64::MAX), &Number::from(1));
        assert!(sum.as_i64().is_none());
        assert!(sum.as_f64().unwrap() > 9.2e18);
    }

    #[test]
    fn nan_becomes_null() {
        assert_eq!(Value::from(f64::NAN), Value::Null);
    }

    #[test]
    fn objects_with_same_identity_are_same() {
        let a = Value::from(ObjectRef::new("Item", "x"));
        let mut e = Entity::from_ref(&ObjectRef::new("Item", "x"));
        e.set("name", "full").unwrap();
        let b = Value::from(e);
        assert_ne!(a, b);
        assert!(a.same_as(&b));
    }
}
