//! Table: associative container with two disjoint key spaces
//!
//! Integer keys and string keys live in separate ordered maps, so `t[1]` and
//! `t["1"]` are unrelated entries. Iteration (and therefore pushing and
//! printing) follows key order within each space, integers first.

use crate::value::{SeenPairs, Value};
use std::collections::BTreeMap;

/// Key into a [`Table`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i as i64)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Int(i as i64)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Str(s.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    int_map: BTreeMap<i64, Value>,
    str_map: BTreeMap<String, Value>,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.eq_at(other, &mut SeenPairs::new())
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a pre-built integer-keyed map
    pub fn from_int_map(int_map: BTreeMap<i64, Value>) -> Self {
        Table {
            int_map,
            str_map: BTreeMap::new(),
        }
    }

    /// Adopt a pre-built string-keyed map
    pub fn from_str_map(str_map: BTreeMap<String, Value>) -> Self {
        Table {
            int_map: BTreeMap::new(),
            str_map,
        }
    }

    pub fn int_map(&self) -> &BTreeMap<i64, Value> {
        &self.int_map
    }

    pub fn str_map(&self) -> &BTreeMap<String, Value> {
        &self.str_map
    }

    pub fn int_map_mut(&mut self) -> &mut BTreeMap<i64, Value> {
        &mut self.int_map
    }

    pub fn str_map_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.str_map
    }

    /// Entry for `key`, inserting nil when it is missing
    pub fn index(&mut self, key: impl Into<Key>) -> Value {
        match key.into() {
            Key::Int(i) => self.int_map.entry(i).or_default().clone(),
            Key::Str(s) => self.str_map.entry(s).or_default().clone(),
        }
    }

    /// Entry for `key` without inserting
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        match key.into() {
            Key::Int(i) => self.int_map.get(&i).cloned(),
            Key::Str(s) => self.str_map.get(&s).cloned(),
        }
    }

    /// Store `value` under `key`, replacing any previous entry. A nil value is
    /// stored as an explicit nil entry.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        let value = value.into();
        match key.into() {
            Key::Int(i) => {
                self.int_map.insert(i, value);
            }
            Key::Str(s) => {
                self.str_map.insert(s, value);
            }
        }
    }

    pub fn remove(&mut self, key: impl Into<Key>) -> Option<Value> {
        match key.into() {
            Key::Int(i) => self.int_map.remove(&i),
            Key::Str(s) => self.str_map.remove(&s),
        }
    }

    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        match key.into() {
            Key::Int(i) => self.int_map.contains_key(&i),
            Key::Str(s) => self.str_map.contains_key(&s),
        }
    }

    /// Number of entries across both key spaces (nil entries included)
    pub fn len(&self) -> usize {
        self.int_map.len() + self.str_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.int_map.is_empty() && self.str_map.is_empty()
    }

    pub(crate) fn eq_at(&self, other: &Table, seen: &mut SeenPairs) -> bool {
        self.int_map.len() == other.int_map.len()
            && self.str_map.len() == other.str_map.len()
            && self
                .int_map
                .iter()
                .zip(&other.int_map)
                .all(|((ka, va), (kb, vb))| ka == kb && va.eq_at(vb, seen))
            && self
                .str_map
                .iter()
                .zip(&other.str_map)
                .all(|((ka, va), (kb, vb))| ka == kb && va.eq_at(vb, seen))
    }

    /// Iterate every entry, integer keys first, each space in key order
    pub fn iter(&self) -> impl Iterator<Item = (Key, &Value)> {
        self.int_map
            .iter()
            .map(|(k, v)| (Key::Int(*k), v))
            .chain(self.str_map.iter().map(|(k, v)| (Key::Str(k.clone()), v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_spaces_are_disjoint() {
        let mut t = Table::new();
        t.set(1i64, "int");
        t.set("1", "str");
        assert_eq!(t.len(), 2);
        assert_eq!(t.index(1i64).string_value(), "int");
        assert_eq!(t.index("1").string_value(), "str");
    }

    #[test]
    fn test_adopt_maps() {
        let t = Table::from_int_map(BTreeMap::from([(2, Value::from(true))]));
        assert!(t.str_map().is_empty());
        assert!(t.get(2i64).is_some_and(|v| v.bool_value()));

        let t = Table::from_str_map(BTreeMap::from([("k".to_string(), Value::from(1i32))]));
        assert!(t.int_map().is_empty());
        assert!(t.contains_key("k"));
    }

    #[test]
    fn test_index_inserts_missing() {
        let mut t = Table::new();
        assert!(t.index("absent").is_nil());
        assert!(t.contains_key("absent"));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut t = Table::new();
        t.set(5usize, 1.5);
        assert_eq!(t.remove(5i64).map(|v| v.double_value()), Some(1.5));
        assert!(t.is_empty());
    }

    #[test]
    fn test_iter_order() {
        let mut t = Table::new();
        t.set("b", 2i32);
        t.set(10i64, 1i32);
        t.set("a", 3i32);
        t.set(-1i64, 4i32);

        let keys: Vec<Key> = t.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                Key::Int(-1),
                Key::Int(10),
                Key::Str("a".to_string()),
                Key::Str("b".to_string()),
            ]
        );
    }
}
