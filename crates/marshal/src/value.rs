//! Value: the dynamic value host code builds and consumes
//!
//! A `Value` is a shared handle to a boxed, tagged payload. The tag is fixed
//! when the value is constructed; cloning a `Value` aliases the same box, so a
//! table mutated through one handle is seen through every other handle.
//!
//! Every accessor is total. Asking a value for a payload its tag does not
//! carry returns a fixed default instead of failing:
//!
//! | accessor         | default | also answered by            |
//! |------------------|---------|-----------------------------|
//! | `bool_value`     | `false` |                             |
//! | `char_value`     | `'\0'`  | String (first character)    |
//! | `int_value`      | `0`     | Double (truncated)          |
//! | `wide_int_value` | `0`     | Double (truncated)          |
//! | `double_value`   | `0.0`   |                             |
//! | `string_value`   | `""`    |                             |
//! | `table_value`    | `{}`    |                             |
//!
//! Integer and WideInteger do not answer each other's accessor.

use crate::table::{Key, Table};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashSet};
use std::ffi::CStr;
use std::fmt;
use std::rc::Rc;
use tracing::{trace, warn};

/// Tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Boolean,
    Character,
    Integer,
    WideInteger,
    Double,
    String,
    Table,
}

/// Boxed payload, one variant per tag
enum ValueBox {
    Nil,
    Boolean(bool),
    Character(char),
    Integer(i32),
    WideInteger(i64),
    Double(f64),
    String(String),
    Table(RefCell<Table>),
}

/// Shared, tagged dynamic value
#[derive(Clone)]
pub struct Value(Rc<ValueBox>);

/// Pairs of table boxes already assumed equal during one comparison
pub(crate) type SeenPairs = HashSet<(usize, usize)>;

thread_local! {
    /// Nil handed out when a non-table value is indexed
    static NIL_SENTINEL: Value = Value(Rc::new(ValueBox::Nil));
}

fn nil_sentinel() -> Value {
    NIL_SENTINEL.with(Value::clone)
}

impl Value {
    fn boxed(payload: ValueBox) -> Self {
        Value(Rc::new(payload))
    }

    /// A fresh nil value
    pub fn nil() -> Self {
        Self::boxed(ValueBox::Nil)
    }

    pub fn kind(&self) -> ValueKind {
        match &*self.0 {
            ValueBox::Nil => ValueKind::Nil,
            ValueBox::Boolean(_) => ValueKind::Boolean,
            ValueBox::Character(_) => ValueKind::Character,
            ValueBox::Integer(_) => ValueKind::Integer,
            ValueBox::WideInteger(_) => ValueKind::WideInteger,
            ValueBox::Double(_) => ValueKind::Double,
            ValueBox::String(_) => ValueKind::String,
            ValueBox::Table(_) => ValueKind::Table,
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.kind() == ValueKind::Nil
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        self.kind() == ValueKind::Boolean
    }

    #[inline]
    pub fn is_char(&self) -> bool {
        self.kind() == ValueKind::Character
    }

    #[inline]
    pub fn is_int(&self) -> bool {
        self.kind() == ValueKind::Integer
    }

    #[inline]
    pub fn is_wide_int(&self) -> bool {
        self.kind() == ValueKind::WideInteger
    }

    #[inline]
    pub fn is_double(&self) -> bool {
        self.kind() == ValueKind::Double
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        self.kind() == ValueKind::String
    }

    #[inline]
    pub fn is_table(&self) -> bool {
        self.kind() == ValueKind::Table
    }

    pub fn bool_value(&self) -> bool {
        match &*self.0 {
            ValueBox::Boolean(b) => *b,
            _ => false,
        }
    }

    pub fn char_value(&self) -> char {
        match &*self.0 {
            ValueBox::Character(c) => *c,
            ValueBox::String(s) => s.chars().next().unwrap_or('\0'),
            _ => '\0',
        }
    }

    pub fn int_value(&self) -> i32 {
        match &*self.0 {
            ValueBox::Integer(i) => *i,
            ValueBox::Double(d) => *d as i32,
            _ => 0,
        }
    }

    pub fn wide_int_value(&self) -> i64 {
        match &*self.0 {
            ValueBox::WideInteger(i) => *i,
            ValueBox::Double(d) => *d as i64,
            _ => 0,
        }
    }

    pub fn double_value(&self) -> f64 {
        match &*self.0 {
            ValueBox::Double(d) => *d,
            _ => 0.0,
        }
    }

    pub fn string_value(&self) -> &str {
        match &*self.0 {
            ValueBox::String(s) => s,
            _ => "",
        }
    }

    /// Shallow copy of the table payload (entries still alias their values)
    pub fn table_value(&self) -> Table {
        self.table_ref()
            .map(|table| table.clone())
            .unwrap_or_default()
    }

    /// Borrow the table payload in place, `None` for non-tables
    ///
    /// # Panics
    ///
    /// Panics if the table is currently borrowed mutably (e.g. from inside a
    /// closure passed to [`Value::table_mut`] on an alias).
    pub fn table_ref(&self) -> Option<Ref<'_, Table>> {
        match &*self.0 {
            ValueBox::Table(table) => Some(table.borrow()),
            _ => None,
        }
    }

    /// Mutably borrow the table payload in place, `None` for non-tables
    ///
    /// # Panics
    ///
    /// Panics if the table is currently borrowed (a live [`Value::table_ref`]
    /// or `table_mut` guard on any alias).
    pub fn table_mut(&self) -> Option<RefMut<'_, Table>> {
        match &*self.0 {
            ValueBox::Table(table) => Some(table.borrow_mut()),
            _ => None,
        }
    }

    /// Subscript read.
    ///
    /// On a table this returns the entry for `key`, inserting a nil entry when
    /// it is missing. On any other value it returns the shared nil sentinel.
    /// While the table is borrowed elsewhere nothing is inserted; an existing
    /// entry is still returned when the table can be read.
    pub fn index(&self, key: impl Into<Key>) -> Value {
        let ValueBox::Table(cell) = &*self.0 else {
            return nil_sentinel();
        };
        match cell.try_borrow_mut() {
            Ok(mut table) => table.index(key),
            Err(_) => {
                trace!("table busy, subscript read without insertion");
                cell.try_borrow()
                    .ok()
                    .and_then(|table| table.get(key))
                    .unwrap_or_else(nil_sentinel)
            }
        }
    }

    /// Non-inserting read, `None` when the key is absent, this is not a table,
    /// or the table is mutably borrowed
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        match &*self.0 {
            ValueBox::Table(cell) => cell.try_borrow().ok().and_then(|table| table.get(key)),
            _ => None,
        }
    }

    /// Subscript write. Discarded when this is not a table or the table is
    /// borrowed elsewhere.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) {
        let ValueBox::Table(cell) = &*self.0 else {
            trace!(kind = ?self.kind(), "assignment through a non-table value discarded");
            return;
        };
        match cell.try_borrow_mut() {
            Ok(mut table) => table.set(key, value),
            Err(_) => warn!("assignment into a borrowed table discarded"),
        }
    }

    /// True when both handles share the same box
    pub fn ptr_eq(a: &Value, b: &Value) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::nil()
    }
}

impl Value {
    /// Structural equality that assumes a pair of tables already under
    /// comparison is equal, so cyclic tables terminate
    pub(crate) fn eq_at(&self, other: &Value, seen: &mut SeenPairs) -> bool {
        match (&*self.0, &*other.0) {
            (ValueBox::Nil, ValueBox::Nil) => true,
            (ValueBox::Boolean(a), ValueBox::Boolean(b)) => a == b,
            (ValueBox::Character(a), ValueBox::Character(b)) => a == b,
            (ValueBox::Integer(a), ValueBox::Integer(b)) => a == b,
            (ValueBox::WideInteger(a), ValueBox::WideInteger(b)) => a == b,
            (ValueBox::Double(a), ValueBox::Double(b)) => a == b,
            (ValueBox::String(a), ValueBox::String(b)) => a == b,
            (ValueBox::Table(a), ValueBox::Table(b)) => {
                if Value::ptr_eq(self, other) {
                    return true;
                }
                let pair = (
                    Rc::as_ptr(&self.0) as usize,
                    Rc::as_ptr(&other.0) as usize,
                );
                if !seen.insert(pair) {
                    return true;
                }
                match (a.try_borrow(), b.try_borrow()) {
                    (Ok(a), Ok(b)) => a.eq_at(&b, seen),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_at(other, &mut SeenPairs::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind(), self)
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::boxed(ValueBox::Boolean(b))
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::boxed(ValueBox::Character(c))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::boxed(ValueBox::Integer(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::boxed(ValueBox::WideInteger(i))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::boxed(ValueBox::Double(d))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::boxed(ValueBox::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::boxed(ValueBox::String(s))
    }
}

impl From<&CStr> for Value {
    fn from(s: &CStr) -> Self {
        Value::boxed(ValueBox::String(s.to_string_lossy().into_owned()))
    }
}

impl From<Table> for Value {
    fn from(table: Table) -> Self {
        Value::boxed(ValueBox::Table(RefCell::new(table)))
    }
}

impl From<BTreeMap<i64, Value>> for Value {
    fn from(map: BTreeMap<i64, Value>) -> Self {
        Value::from(Table::from_int_map(map))
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::from(Table::from_str_map(map))
    }
}

// ============================================================================
// Conversions out (delegate to the accessors)
// ============================================================================

impl From<&Value> for bool {
    fn from(v: &Value) -> Self {
        v.bool_value()
    }
}

impl From<&Value> for char {
    fn from(v: &Value) -> Self {
        v.char_value()
    }
}

impl From<&Value> for i32 {
    fn from(v: &Value) -> Self {
        v.int_value()
    }
}

impl From<&Value> for i64 {
    fn from(v: &Value) -> Self {
        v.wide_int_value()
    }
}

impl From<&Value> for f64 {
    fn from(v: &Value) -> Self {
        v.double_value()
    }
}

impl From<&Value> for String {
    fn from(v: &Value) -> Self {
        v.string_value().to_string()
    }
}

impl From<&Value> for Table {
    fn from(v: &Value) -> Self {
        v.table_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_fixed_at_construction() {
        assert_eq!(Value::default().kind(), ValueKind::Nil);
        assert_eq!(Value::from(true).kind(), ValueKind::Boolean);
        assert_eq!(Value::from('x').kind(), ValueKind::Character);
        assert_eq!(Value::from(1i32).kind(), ValueKind::Integer);
        assert_eq!(Value::from(1i64).kind(), ValueKind::WideInteger);
        assert_eq!(Value::from(1.0).kind(), ValueKind::Double);
        assert_eq!(Value::from("s").kind(), ValueKind::String);
        assert_eq!(Value::from(Table::new()).kind(), ValueKind::Table);
        assert_eq!(Value::from(c"cstr").string_value(), "cstr");
    }

    #[test]
    fn test_predicates_are_tag_equality() {
        let v = Value::from(7i32);
        assert!(v.is_int());
        assert!(!v.is_wide_int());
        assert!(!v.is_double());
        assert!(!v.is_nil());
    }

    #[test]
    fn test_double_accessors() {
        let v = Value::from(3.7);
        assert_eq!(v.int_value(), 3);
        assert_eq!(v.wide_int_value(), 3);
        assert_eq!(v.double_value(), 3.7);
        assert!(!v.bool_value());
        assert_eq!(v.string_value(), "");
    }

    #[test]
    fn test_string_answers_char() {
        assert_eq!(Value::from("hello").char_value(), 'h');
        assert_eq!(Value::from("").char_value(), '\0');
        assert_eq!(Value::from('z').string_value(), "");
    }

    #[test]
    fn test_integer_widths_do_not_cross() {
        assert_eq!(Value::from(5i32).wide_int_value(), 0);
        assert_eq!(Value::from(5i64).int_value(), 0);
        assert_eq!(Value::from(5i32).double_value(), 0.0);
    }

    #[test]
    fn test_mismatch_defaults() {
        let nil = Value::nil();
        assert!(!nil.bool_value());
        assert_eq!(nil.char_value(), '\0');
        assert_eq!(nil.int_value(), 0);
        assert_eq!(nil.wide_int_value(), 0);
        assert_eq!(nil.double_value(), 0.0);
        assert_eq!(nil.string_value(), "");
        assert!(nil.table_value().is_empty());
        assert!(Value::from(1.5).table_ref().is_none());
    }

    #[test]
    fn test_accessors_total_for_every_tag() {
        let table = Value::from(Table::new());
        table.set("k", 1i32);
        let values = [
            Value::nil(),
            Value::from(true),
            Value::from('c'),
            Value::from(7i32),
            Value::from(7i64),
            Value::from(2.5),
            Value::from("text"),
            table,
        ];

        for v in &values {
            let kind = v.kind();
            if kind != ValueKind::Boolean {
                assert!(!v.bool_value(), "{kind:?} answered bool_value");
            }
            if kind != ValueKind::Character && kind != ValueKind::String {
                assert_eq!(v.char_value(), '\0', "{kind:?} answered char_value");
            }
            if kind != ValueKind::Integer && kind != ValueKind::Double {
                assert_eq!(v.int_value(), 0, "{kind:?} answered int_value");
            }
            if kind != ValueKind::WideInteger && kind != ValueKind::Double {
                assert_eq!(v.wide_int_value(), 0, "{kind:?} answered wide_int_value");
            }
            if kind != ValueKind::Double {
                assert_eq!(v.double_value(), 0.0, "{kind:?} answered double_value");
            }
            if kind != ValueKind::String {
                assert_eq!(v.string_value(), "", "{kind:?} answered string_value");
            }
            if kind != ValueKind::Table {
                assert!(v.table_value().is_empty(), "{kind:?} answered table_value");
                assert!(v.table_ref().is_none());
            }
        }

        // The answers each tag does give
        assert!(values[1].bool_value());
        assert_eq!(values[2].char_value(), 'c');
        assert_eq!(values[3].int_value(), 7);
        assert_eq!(values[4].wide_int_value(), 7);
        assert_eq!(values[5].int_value(), 2);
        assert_eq!(values[5].wide_int_value(), 2);
        assert_eq!(values[6].char_value(), 't');
        assert_eq!(values[7].table_value().len(), 1);
    }

    #[test]
    fn test_conversions_delegate_to_accessors() {
        let v = Value::from(9.9);
        assert_eq!(i32::from(&v), 9);
        assert_eq!(i64::from(&v), 9);
        assert_eq!(f64::from(&v), 9.9);
        assert!(!bool::from(&v));
        assert_eq!(String::from(&Value::from("s")), "s");
        assert_eq!(char::from(&Value::from("q")), 'q');
        assert!(Table::from(&v).is_empty());
    }

    #[test]
    fn test_clone_aliases_table() {
        let a = Value::from(Table::new());
        let b = a.clone();
        b.set("k", 1i32);
        assert!(Value::ptr_eq(&a, &b));
        assert_eq!(a.index("k").int_value(), 1);
    }

    #[test]
    fn test_index_inserts_nil_entry() {
        let t = Value::from(Table::new());
        assert!(t.get(3i64).is_none());
        assert!(t.index(3i64).is_nil());
        assert!(t.get(3i64).is_some());
    }

    #[test]
    fn test_non_table_index_returns_sentinel() {
        let v = Value::from(42i32);
        let first = v.index(1i64);
        let second = Value::from("other").index("key");
        assert!(first.is_nil());
        assert!(Value::ptr_eq(&first, &second));
        assert!(v.get(1i64).is_none());
    }

    #[test]
    fn test_set_on_non_table_is_discarded() {
        let v = Value::from(false);
        v.set("k", 1i32);
        assert!(v.index("k").is_nil());
        assert!(!v.is_table());
    }

    #[test]
    fn test_subscript_while_borrowed_does_not_panic() {
        let t = Value::from(Table::new());
        t.set("k", 1i32);
        let alias = t.clone();

        let guard = t.table_ref();
        assert_eq!(alias.index("k").int_value(), 1);
        assert!(alias.index("missing").is_nil());
        alias.set("k", 2i32);
        drop(guard);

        assert_eq!(t.index("k").int_value(), 1);
        assert!(t.get("missing").is_none());

        let guard = t.table_mut();
        assert!(alias.index("k").is_nil());
        assert!(alias.get("k").is_none());
        drop(guard);
    }

    #[test]
    fn test_nested_mutation_visible_through_parent() {
        let outer = Value::from(Table::new());
        outer.set("inner", Table::new());
        outer.index("inner").set(1i64, "x");
        assert_eq!(outer.index("inner").index(1i64).string_value(), "x");
    }

    #[test]
    fn test_structural_equality() {
        let a = Value::from(BTreeMap::from([(1i64, Value::from("a"))]));
        let b = Value::from(BTreeMap::from([(1i64, Value::from("a"))]));
        assert_eq!(a, b);
        assert_ne!(Value::from(1i32), Value::from(1i64));
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn test_cyclic_equality_terminates() {
        let a = Value::from(Table::new());
        a.set("self", a.clone());
        let b = Value::from(Table::new());
        b.set("self", b.clone());
        assert_eq!(a, b);

        b.set("extra", 1i32);
        assert_ne!(a, b);

        let c = Value::from(Table::new());
        c.set("a", c.clone());
        c.set("b", c.clone());
        let d = Value::from(Table::new());
        d.set("a", d.clone());
        d.set("b", d.clone());
        assert_eq!(c, d);
        assert_eq!(c.table_value(), d.table_value());
    }
}
