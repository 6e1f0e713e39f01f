use super::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Ordered field-name → value map used for patches, snapshots and rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap {
    fields: BTreeMap<String, Value>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Overlays `other` on top of `self`, field by field. Later values win.
    pub fn merge(&mut self, other: &FieldMap) {
        for (field, value) in &other.fields {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    pub fn merged(mut self, other: &FieldMap) -> Self {
        self.merge(other);
        self
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.fields.retain(|field, value| keep(field, value));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        }
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Builds a [`FieldMap`] from `field => value` pairs.
#[macro_export]
macro_rules! fields {
    () => {
        $crate::core::FieldMap::new()
    };
    ($($field:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::core::FieldMap::new();
        $(map.insert($field, $value);)+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_right_biased_per_field() {
        let mut base = crate::fields! { "x" => 1i64, "y" => 1i64 };
        base.merge(&crate::fields! { "x" => 2i64 });

        assert_eq!(base.get("x"), Some(&Value::Integer(2)));
        assert_eq!(base.get("y"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_json_shape_is_a_plain_object() {
        let map = crate::fields! { "name" => "Ada", "age" => 36i64 };
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"age": 36, "name": "Ada"}));

        let back: FieldMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }
}
