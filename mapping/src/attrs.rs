use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A single named attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            AttrValue::Float(value) => *value,
            _ => panic!("Attribute is not a float"),
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            AttrValue::Int(value) => *value,
            _ => panic!("Attribute is not an int"),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            AttrValue::Bool(value) => *value,
            _ => panic!("Attribute is not a bool"),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AttrValue::String(value) => value,
            _ => panic!("Attribute is not a string"),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

/// A shared store of named configuration attributes.
///
/// Clones share state: setting an attribute through one handle is visible
/// through every other, mirroring the shared-reference model of compound
/// mapping children. The composition engine itself never interprets these
/// values.
#[derive(Clone, Debug, Default)]
pub struct AttrStore(Arc<Mutex<HashMap<String, AttrValue>>>);

impl AttrStore {
    pub fn new() -> Self {
        AttrStore::default()
    }

    pub fn set<V: Into<AttrValue>>(&self, name: &str, value: V) {
        self.0.lock().insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<AttrValue> {
        self.0.lock().get(name).cloned()
    }

    /// Has this attribute been explicitly set (and not subsequently cleared)?
    pub fn test(&self, name: &str) -> bool {
        self.0.lock().contains_key(name)
    }

    /// Cancels any value previously set for the attribute.
    pub fn clear(&self, name: &str) {
        self.0.lock().remove(name);
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_test_clear_cycle() {
        let attrs = AttrStore::new();

        assert!(!attrs.test("Report"));
        attrs.set("Report", false);
        assert!(attrs.test("Report"));
        assert!(!attrs.get("Report").unwrap().as_bool());

        attrs.set("Report", true);
        assert!(attrs.get("Report").unwrap().as_bool());

        attrs.clear("Report");
        assert!(!attrs.test("Report"));
        assert!(attrs.get("Report").is_none());
    }

    #[test]
    fn clones_share_state() {
        let attrs = AttrStore::new();
        let alias = attrs.clone();

        alias.set("Tolerance", 1e-8);
        assert_eq!(attrs.get("Tolerance"), Some(AttrValue::Float(1e-8)));

        attrs.clear("Tolerance");
        assert!(!alias.test("Tolerance"));
    }

    #[test]
    fn value_kinds() {
        let attrs = AttrStore::new();
        attrs.set("Ident", "focal plane");
        attrs.set("MaxDepth", 16i64);

        assert_eq!(attrs.get("Ident").unwrap().as_str(), "focal plane");
        assert_eq!(attrs.get("MaxDepth").unwrap().as_i64(), 16);
        assert_eq!(attrs.len(), 2);
    }
}
