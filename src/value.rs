//! Plain value model for state fragments.
//!
//! A [`Value`] is the inert (non-reactive) representation of application
//! state: scalars, sequences, and string-keyed maps with insertion-ordered
//! fields. Fragments are built as `Value`s, tagged via
//! [`create_sub_state`](crate::sub_state::create_sub_state), and wrapped
//! into the observable mirror at store construction.
//!
//! # Example
//!
//! ```
//! use spark_store::Value;
//!
//! let fragment = Value::map([
//!     ("count", Value::from(1)),
//!     ("name", Value::from("test")),
//!     ("items", Value::list([Value::from(1), Value::from(2)])),
//! ]);
//!
//! assert_eq!(fragment.get("count"), Some(&Value::Int(1)));
//! ```

// =============================================================================
// Value
// =============================================================================

/// A plain structured value.
///
/// Map fields keep their insertion order, so a fragment's original field
/// enumeration survives tagging and wrapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent/empty value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered sequence of values.
    List(Vec<Value>),
    /// String-keyed mapping with insertion-ordered fields.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Build a map value from `(key, value)` pairs, preserving order.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    /// Check if this is a map.
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Check if this is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Check if this is a scalar (neither map nor list).
    pub fn is_scalar(&self) -> bool {
        !self.is_map() && !self.is_list()
    }

    /// Look up a map field by key.
    ///
    /// Returns `None` for non-map values and missing keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Check whether a map field exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace a map field.
    ///
    /// Replacing keeps the field's original position; inserting appends.
    /// No-op on non-map values.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        if let Value::Map(entries) = self {
            let key = key.into();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key, value)),
            }
        }
    }

    /// Map field names in insertion order (empty for non-map values).
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Value::Map(entries) => entries.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Extract a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract a float (integers widen).
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Extract a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Extract the list items.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Extract the map entries.
    pub fn as_entries(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Check if this is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

// =============================================================================
// From implementations for ergonomic construction
// =============================================================================

/// `()` is null.
impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// `None` is null, `Some` converts the payload.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            None => Value::Null,
            Some(v) => v.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_preserves_insertion_order() {
        let value = Value::map([
            ("z", Value::from(1)),
            ("a", Value::from(2)),
            ("m", Value::from(3)),
        ]);
        assert_eq!(value.keys(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_get_and_contains_key() {
        let value = Value::map([("count", Value::from(1))]);
        assert_eq!(value.get("count"), Some(&Value::Int(1)));
        assert_eq!(value.get("missing"), None);
        assert!(value.contains_key("count"));
        assert!(!value.contains_key("missing"));

        // Non-map values have no fields
        assert_eq!(Value::Int(1).get("count"), None);
        assert!(Value::Null.keys().is_empty());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut value = Value::map([("a", Value::from(1)), ("b", Value::from(2))]);
        value.insert("a", Value::from(10));
        assert_eq!(value.keys(), vec!["a", "b"]);
        assert_eq!(value.get("a"), Some(&Value::Int(10)));

        value.insert("c", Value::from(3));
        assert_eq!(value.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_scalar_predicates() {
        assert!(Value::Null.is_scalar());
        assert!(Value::from(1).is_scalar());
        assert!(!Value::map([("a", Value::Null)]).is_scalar());
        assert!(!Value::list([]).is_scalar());
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(()), Value::Null);
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(5), Value::Int(5));
        assert_eq!(Value::from(5i64), Value::Int(5));
        assert_eq!(Value::from(1.5), Value::Float(1.5));
        assert_eq!(Value::from("test"), Value::Str("test".to_string()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(2)), Value::Int(2));
    }

    #[test]
    fn test_extractors() {
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(2).as_int(), Some(2));
        assert_eq!(Value::from(2).as_float(), Some(2.0));
        assert_eq!(Value::from(2.5).as_float(), Some(2.5));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(2).as_str(), None);

        let list = Value::list([Value::from(1)]);
        assert_eq!(list.as_list().map(<[Value]>::len), Some(1));
        let map = Value::map([("a", Value::from(1))]);
        assert_eq!(map.as_entries().map(<[(String, Value)]>::len), Some(1));
    }
}
