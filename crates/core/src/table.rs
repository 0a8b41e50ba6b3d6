//! Runtime tables
//!
//! A runtime table has the classic two-part layout:
//!
//! - an array part holding keys `1..=n` contiguously, and
//! - an ordered hash part for every other key.
//!
//! Keys move from the hash part into the array part when the array grows into
//! them, so `next` always walks the array part in index order first and then
//! the hash part in key order. Nil values are never stored in the hash part;
//! assigning nil removes the key.
//!
//! Tables are shared by reference ([`TableRef`]) the same way the runtime
//! shares them between stack slots and other tables. Cycles are possible and
//! are not collected.

use crate::slot::Slot;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::rc::Rc;

/// Shared handle to a runtime table
pub type TableRef = Rc<RefCell<RtTable>>;

/// A valid table key: any slot except nil and NaN
///
/// Floats with an exact integer value are normalized to integer keys so that
/// `t[1]` and `t[1.0]` address the same entry.
#[derive(Debug, Clone)]
pub struct TableKey(Slot);

impl TableKey {
    /// Normalize a slot into a key, or `None` if the slot cannot index a table
    pub fn new(slot: Slot) -> Option<Self> {
        match slot {
            Slot::Nil => None,
            Slot::Number(f) if f.is_nan() => None,
            Slot::Number(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Some(TableKey(Slot::Integer(f as i64)))
            }
            other => Some(TableKey(other)),
        }
    }

    /// The key as a slot (to push back onto the stack)
    pub fn slot(&self) -> &Slot {
        &self.0
    }

    fn rank(&self) -> u8 {
        match self.0 {
            Slot::Boolean(_) => 0,
            Slot::Integer(_) => 1,
            Slot::Number(_) => 2,
            Slot::String(_) => 3,
            Slot::Table(_) => 4,
            Slot::LightUserdata(_) => 5,
            Slot::Nil => 6,
        }
    }
}

impl PartialEq for TableKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TableKey {}

impl PartialOrd for TableKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TableKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (Slot::Boolean(a), Slot::Boolean(b)) => a.cmp(b),
            (Slot::Integer(a), Slot::Integer(b)) => a.cmp(b),
            (Slot::Number(a), Slot::Number(b)) => a.total_cmp(b),
            (Slot::String(a), Slot::String(b)) => a.cmp(b),
            (Slot::Table(a), Slot::Table(b)) => Rc::as_ptr(a).cmp(&Rc::as_ptr(b)),
            (Slot::LightUserdata(a), Slot::LightUserdata(b)) => a.addr.cmp(&b.addr),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Table storage
#[derive(Default)]
pub struct RtTable {
    array: Vec<Slot>,
    hash: BTreeMap<TableKey, Slot>,
    metatable: Option<Rc<str>>,
}

impl RtTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with room for `narr` array entries. The hash part is an
    /// ordered map and takes no capacity hint.
    pub fn with_capacity(narr: usize, _nrec: usize) -> Self {
        RtTable {
            array: Vec::with_capacity(narr),
            hash: BTreeMap::new(),
            metatable: None,
        }
    }

    /// Wrap into a shared handle
    pub fn into_ref(self) -> TableRef {
        Rc::new(RefCell::new(self))
    }

    /// Raw read of an integer key
    pub fn get_int(&self, key: i64) -> Slot {
        match self.array_index(key) {
            Some(i) => self.array[i].clone(),
            None => self
                .hash
                .get(&TableKey(Slot::Integer(key)))
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Raw read of a string key
    pub fn get_str(&self, key: &[u8]) -> Slot {
        self.hash
            .get(&TableKey(Slot::bytes(key)))
            .cloned()
            .unwrap_or_default()
    }

    /// Raw read of any key; invalid keys read as nil
    pub fn get(&self, key: &Slot) -> Slot {
        match TableKey::new(key.clone()) {
            Some(TableKey(Slot::Integer(i))) => self.get_int(i),
            Some(key) => self.hash.get(&key).cloned().unwrap_or_default(),
            None => Slot::Nil,
        }
    }

    /// Raw write of an integer key; nil removes the entry
    pub fn set_int(&mut self, key: i64, value: Slot) {
        if let Some(i) = self.array_index(key) {
            self.array[i] = value;
            if i + 1 == self.array.len() {
                self.trim_array();
            }
            return;
        }

        if key >= 1 && key as usize == self.array.len() + 1 && !value.is_nil() {
            self.array.push(value);
            self.hash.remove(&TableKey(Slot::Integer(key)));
            self.migrate_into_array();
            return;
        }

        let key = TableKey(Slot::Integer(key));
        if value.is_nil() {
            self.hash.remove(&key);
        } else {
            self.hash.insert(key, value);
        }
    }

    /// Raw write of any key. Returns false (and stores nothing) when the key
    /// is nil or NaN.
    pub fn set(&mut self, key: Slot, value: Slot) -> bool {
        match TableKey::new(key) {
            Some(TableKey(Slot::Integer(i))) => {
                self.set_int(i, value);
                true
            }
            Some(key) => {
                if value.is_nil() {
                    self.hash.remove(&key);
                } else {
                    self.hash.insert(key, value);
                }
                true
            }
            None => false,
        }
    }

    /// Traversal step: the entry following `key` (nil starts the traversal).
    /// Returns `None` at the end, or when `key` is not present in the table.
    pub fn next(&self, key: &Slot) -> Option<(Slot, Slot)> {
        let start = match key {
            Slot::Nil => 0,
            _ => {
                let key = TableKey::new(key.clone())?;
                match key.slot() {
                    Slot::Integer(i) if self.array_index(*i).is_some() => *i as usize,
                    _ => {
                        if !self.hash.contains_key(&key) {
                            return None;
                        }
                        return self
                            .hash
                            .range((Bound::Excluded(&key), Bound::Unbounded))
                            .next()
                            .map(|(k, v)| (k.slot().clone(), v.clone()));
                    }
                }
            }
        };

        for (i, value) in self.array.iter().enumerate().skip(start) {
            if !value.is_nil() {
                return Some((Slot::Integer(i as i64 + 1), value.clone()));
            }
        }
        self.hash
            .iter()
            .next()
            .map(|(k, v)| (k.slot().clone(), v.clone()))
    }

    /// Border of the array part (the `#` length)
    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.hash.is_empty()
    }

    /// Number of non-nil entries across both parts
    pub fn entry_count(&self) -> usize {
        self.array.iter().filter(|v| !v.is_nil()).count() + self.hash.len()
    }

    pub fn metatable(&self) -> Option<&Rc<str>> {
        self.metatable.as_ref()
    }

    pub fn set_metatable(&mut self, name: Option<Rc<str>>) {
        self.metatable = name;
    }

    fn array_index(&self, key: i64) -> Option<usize> {
        if key >= 1 && (key as u64) <= self.array.len() as u64 {
            Some(key as usize - 1)
        } else {
            None
        }
    }

    fn trim_array(&mut self) {
        while matches!(self.array.last(), Some(Slot::Nil)) {
            self.array.pop();
        }
    }

    fn migrate_into_array(&mut self) {
        loop {
            let next_key = TableKey(Slot::Integer(self.array.len() as i64 + 1));
            match self.hash.remove(&next_key) {
                Some(value) => self.array.push(value),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Slot {
        Slot::bytes(text.as_bytes())
    }

    fn collect(table: &RtTable) -> Vec<(Slot, Slot)> {
        let mut out = Vec::new();
        let mut key = Slot::Nil;
        while let Some((k, v)) = table.next(&key) {
            out.push((k.clone(), v));
            key = k;
        }
        out
    }

    #[test]
    fn test_array_part_grows_in_order() {
        let mut t = RtTable::new();
        t.set_int(1, s("a"));
        t.set_int(2, s("b"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.get_int(2), s("b"));
        assert_eq!(t.get_int(3), Slot::Nil);
    }

    #[test]
    fn test_out_of_order_keys_migrate() {
        let mut t = RtTable::new();
        t.set_int(3, s("c"));
        t.set_int(2, s("b"));
        assert_eq!(t.len(), 0);
        t.set_int(1, s("a"));
        assert_eq!(t.len(), 3);
        assert_eq!(t.get_int(3), s("c"));
    }

    #[test]
    fn test_nil_assignment_removes() {
        let mut t = RtTable::new();
        t.set(s("k"), Slot::Integer(1));
        t.set_int(1, Slot::Integer(10));
        t.set(s("k"), Slot::Nil);
        t.set_int(1, Slot::Nil);
        assert!(t.is_empty());
        assert_eq!(t.entry_count(), 0);
    }

    #[test]
    fn test_float_keys_normalize() {
        let mut t = RtTable::new();
        t.set(Slot::Number(1.0), s("one"));
        assert_eq!(t.get_int(1), s("one"));
        assert_eq!(t.get(&Slot::Number(1.0)), s("one"));
        t.set(Slot::Number(1.5), s("half"));
        assert_eq!(t.get(&Slot::Number(1.5)), s("half"));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let mut t = RtTable::new();
        assert!(!t.set(Slot::Nil, Slot::Integer(1)));
        assert!(!t.set(Slot::Number(f64::NAN), Slot::Integer(1)));
        assert!(t.is_empty());
    }

    #[test]
    fn test_next_visits_array_then_hash() {
        let mut t = RtTable::new();
        t.set(s("b"), Slot::Integer(2));
        t.set_int(1, s("x"));
        t.set(s("a"), Slot::Integer(1));
        t.set_int(2, s("y"));

        let entries = collect(&t);
        assert_eq!(
            entries,
            vec![
                (Slot::Integer(1), s("x")),
                (Slot::Integer(2), s("y")),
                (s("a"), Slot::Integer(1)),
                (s("b"), Slot::Integer(2)),
            ]
        );
    }

    #[test]
    fn test_next_skips_array_holes() {
        let mut t = RtTable::new();
        t.set_int(1, Slot::Integer(1));
        t.set_int(2, Slot::Integer(2));
        t.set_int(3, Slot::Integer(3));
        t.set_int(2, Slot::Nil);

        let keys: Vec<Slot> = collect(&t).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![Slot::Integer(1), Slot::Integer(3)]);
    }

    #[test]
    fn test_next_unknown_key_ends() {
        let mut t = RtTable::new();
        t.set(s("a"), Slot::Integer(1));
        assert!(t.next(&s("zzz")).is_none());
    }
}
