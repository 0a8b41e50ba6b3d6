//! Single-value retrieval
//!
//! Two families of conversions from a stack position to a host type, chosen
//! per type at compile time:
//!
//! - [`Get`] never fails. Mismatching slots read as the type's zero value.
//! - [`CheckGet`] runs numbers and strings through the stack's validating
//!   readers and returns [`StackError::BadArgument`] on mismatch. Booleans,
//!   pointers and [`Value`] are read the same way as [`Get`].
//!
//! # Value materialization
//!
//! `Value` is the one conversion that looks at the runtime type:
//!
//! ```text
//! nil      -> Nil
//! boolean  -> Boolean
//! number   -> Integer (fits in 32 bits) | WideInteger | Double (float subtype)
//! string   -> String
//! table    -> Table (walked with `next`; number keys truncated into the
//!             integer space, string keys into the string space, other
//!             keys skipped)
//! other    -> Nil
//! ```
//!
//! A table already being materialized further up the same path (a cycle
//! such as a global table holding itself) materializes as nil, as do tables
//! nested deeper than the stack's `max_table_depth`.

use crate::registry::Userdata;
use crate::table::Table;
use crate::value::Value;
use sel_core::{
    Stack, StackError, StackResult, TYPE_BOOLEAN, TYPE_LIGHTUSERDATA, TYPE_NIL, TYPE_NUMBER,
    TYPE_STRING, TYPE_TABLE,
};
use tracing::{debug, trace, warn};

/// Best-effort conversion from a stack position
pub trait Get: Sized {
    fn get(stack: &mut Stack, index: i32) -> Self;
}

/// Validating conversion from a stack position
pub trait CheckGet: Sized {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self>;
}

/// Read the slot at `index` as `T`, falling back to `T`'s zero value
pub fn get<T: Get>(stack: &mut Stack, index: i32) -> T {
    T::get(stack, index)
}

/// Read the slot at `index` as `T`, failing when the slot cannot be one
pub fn check_get<T: CheckGet>(stack: &mut Stack, index: i32) -> StackResult<T> {
    T::check_get(stack, index)
}

/// Reinterpret the light userdata at `index` as a mutable reference.
///
/// Fails when the slot is not a light userdata or holds a null address.
///
/// # Safety
///
/// The address must have been pushed from a live `T` (for instance with
/// [`push`](fn@crate::push) of a `&mut T`) that outlives `'a`, and no other
/// reference to it may be in use while the returned one is.
pub unsafe fn check_get_ref<'a, T: Userdata>(
    stack: &mut Stack,
    index: i32,
) -> StackResult<&'a mut T> {
    stack.check_type(index, TYPE_LIGHTUSERDATA)?;
    let ptr = stack.to_pointer(index) as *mut T;
    // SAFETY: non-null checked by as_mut; validity is the caller's contract
    match unsafe { ptr.as_mut() } {
        Some(r) => Ok(r),
        None => Err(StackError::BadArgument {
            position: stack.abs_index(index),
            expected: "userdata",
            got: "null userdata",
        }),
    }
}

fn first_char(bytes: &[u8]) -> char {
    String::from_utf8_lossy(bytes).chars().next().unwrap_or('\0')
}

// ============================================================================
// Unchecked
// ============================================================================

impl Get for bool {
    fn get(stack: &mut Stack, index: i32) -> Self {
        stack.to_boolean(index)
    }
}

impl Get for char {
    fn get(stack: &mut Stack, index: i32) -> Self {
        stack
            .to_bytes(index)
            .map_or('\0', |bytes| first_char(&bytes))
    }
}

impl Get for i32 {
    fn get(stack: &mut Stack, index: i32) -> Self {
        stack.to_integer(index) as i32
    }
}

impl Get for u32 {
    fn get(stack: &mut Stack, index: i32) -> Self {
        stack.to_integer(index) as u32
    }
}

impl Get for i64 {
    fn get(stack: &mut Stack, index: i32) -> Self {
        stack.to_integer(index)
    }
}

impl Get for u64 {
    fn get(stack: &mut Stack, index: i32) -> Self {
        stack.to_integer(index) as u64
    }
}

impl Get for f64 {
    fn get(stack: &mut Stack, index: i32) -> Self {
        stack.to_number(index)
    }
}

impl Get for String {
    fn get(stack: &mut Stack, index: i32) -> Self {
        stack
            .to_bytes(index)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

impl<T> Get for *const T {
    fn get(stack: &mut Stack, index: i32) -> Self {
        stack.to_pointer(index) as *const T
    }
}

impl<T> Get for *mut T {
    fn get(stack: &mut Stack, index: i32) -> Self {
        stack.to_pointer(index) as *mut T
    }
}

impl Get for Value {
    fn get(stack: &mut Stack, index: i32) -> Self {
        materialize(stack, index, &mut Vec::new())
    }
}

impl Get for Table {
    fn get(stack: &mut Stack, index: i32) -> Self {
        materialize(stack, index, &mut Vec::new()).table_value()
    }
}

// ============================================================================
// Checked
// ============================================================================

impl CheckGet for bool {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        Ok(stack.to_boolean(index))
    }
}

impl CheckGet for char {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        Ok(first_char(&stack.check_bytes(index)?))
    }
}

impl CheckGet for i32 {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        Ok(stack.check_integer(index)? as i32)
    }
}

impl CheckGet for u32 {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        Ok(stack.check_integer(index)? as u32)
    }
}

impl CheckGet for i64 {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        stack.check_integer(index)
    }
}

impl CheckGet for u64 {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        Ok(stack.check_integer(index)? as u64)
    }
}

impl CheckGet for f64 {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        stack.check_number(index)
    }
}

impl CheckGet for String {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        let bytes = stack.check_bytes(index)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl<T> CheckGet for *const T {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        Ok(<*const T>::get(stack, index))
    }
}

impl<T> CheckGet for *mut T {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        Ok(<*mut T>::get(stack, index))
    }
}

impl CheckGet for Value {
    fn check_get(stack: &mut Stack, index: i32) -> StackResult<Self> {
        Ok(<Value as Get>::get(stack, index))
    }
}

// ============================================================================
// Materialization
// ============================================================================

fn materialize(stack: &mut Stack, index: i32, path: &mut Vec<usize>) -> Value {
    match stack.type_of(index) {
        TYPE_NIL => Value::nil(),
        TYPE_BOOLEAN => Value::from(stack.to_boolean(index)),
        TYPE_NUMBER => materialize_number(stack, index),
        TYPE_STRING => Value::from(<String as Get>::get(stack, index)),
        TYPE_TABLE => materialize_table(stack, index, path),
        _ => Value::nil(),
    }
}

fn materialize_number(stack: &Stack, index: i32) -> Value {
    if stack.is_integer(index) {
        let n = stack.to_integer(index);
        match i32::try_from(n) {
            Ok(small) => Value::from(small),
            Err(_) => Value::from(n),
        }
    } else {
        Value::from(stack.to_number(index))
    }
}

fn materialize_table(stack: &mut Stack, index: i32, path: &mut Vec<usize>) -> Value {
    let depth = path.len();
    let limit = stack.config().max_table_depth;
    if depth >= limit {
        warn!(depth, limit, "table nesting limit reached, materializing nil");
        return Value::nil();
    }
    let id = stack.to_pointer(index);
    if path.contains(&id) {
        debug!(depth, "table refers back to itself, materializing nil");
        return Value::nil();
    }
    path.push(id);

    // Traversal pushes above the table; pin its position first
    let table_index = stack.abs_index(index);
    let mut table = Table::new();

    stack.push_nil();
    while stack.next(table_index) {
        match stack.type_of(-2) {
            TYPE_NUMBER => {
                let key = stack.to_integer(-2);
                let value = materialize(stack, -1, path);
                table.set(key, value);
            }
            TYPE_STRING => {
                let key = <String as Get>::get(stack, -2);
                let value = materialize(stack, -1, path);
                table.set(key, value);
            }
            other => trace!(key_type = other, "skipping table key with no host key space"),
        }
        stack.pop(1);
    }
    path.pop();

    trace!(depth, entries = table.len(), "materialized table");
    Value::from(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sel_core::{Slot, StackConfig};

    #[test]
    fn test_get_primitives() {
        let mut stack = Stack::new();
        stack.push_boolean(true);
        stack.push_integer(-7);
        stack.push_number(2.75);
        stack.push_str("hello");

        assert!(get::<bool>(&mut stack, 1));
        assert_eq!(get::<i32>(&mut stack, 2), -7);
        assert_eq!(get::<i64>(&mut stack, 2), -7);
        assert_eq!(get::<f64>(&mut stack, 3), 2.75);
        assert_eq!(get::<i32>(&mut stack, 3), 2);
        assert_eq!(get::<String>(&mut stack, 4), "hello");
        assert_eq!(get::<char>(&mut stack, 4), 'h');
        assert_eq!(get::<String>(&mut stack, 2), "-7");
    }

    #[test]
    fn test_get_defaults_on_mismatch() {
        let mut stack = Stack::new();
        stack.push_boolean(true);

        assert_eq!(get::<i32>(&mut stack, 1), 0);
        assert_eq!(get::<f64>(&mut stack, 1), 0.0);
        assert_eq!(get::<String>(&mut stack, 1), "");
        assert_eq!(get::<char>(&mut stack, 1), '\0');
        assert!(get::<*const u8>(&mut stack, 1).is_null());
        assert!(!get::<bool>(&mut stack, 5));
    }

    #[test]
    fn test_get_numeric_string() {
        let mut stack = Stack::new();
        stack.push_str("42");
        assert_eq!(get::<u32>(&mut stack, -1), 42);
        assert_eq!(get::<f64>(&mut stack, -1), 42.0);
    }

    #[test]
    fn test_check_get_mismatch() {
        let mut stack = Stack::new();
        stack.push_boolean(false);

        let err = check_get::<i32>(&mut stack, 1).unwrap_err();
        assert_eq!(err.to_string(), "bad argument #1 (number expected, got boolean)");
        assert!(check_get::<String>(&mut stack, 1).is_err());
        assert!(check_get::<char>(&mut stack, 1).is_err());
        assert_eq!(check_get::<bool>(&mut stack, 1), Ok(false));
        assert!(check_get::<Value>(&mut stack, 1).is_ok());
    }

    #[test]
    fn test_check_get_converts_like_runtime() {
        let mut stack = Stack::new();
        stack.push_integer(5);
        stack.push_str("1.5");

        assert_eq!(check_get::<String>(&mut stack, 1), Ok("5".to_string()));
        assert_eq!(check_get::<f64>(&mut stack, 2), Ok(1.5));
        assert_eq!(check_get::<u64>(&mut stack, 1), Ok(5));
    }

    #[test]
    fn test_materialize_scalars() {
        let mut stack = Stack::new();
        stack.push_nil();
        stack.push_boolean(true);
        stack.push_integer(12);
        stack.push_integer(1 << 40);
        stack.push_number(0.5);
        stack.push_str("s");
        stack.push_light_userdata(0x10);

        assert!(get::<Value>(&mut stack, 1).is_nil());
        assert!(get::<Value>(&mut stack, 2).bool_value());
        assert_eq!(get::<Value>(&mut stack, 3), Value::from(12i32));
        assert_eq!(get::<Value>(&mut stack, 4), Value::from(1i64 << 40));
        assert_eq!(get::<Value>(&mut stack, 5), Value::from(0.5));
        assert_eq!(get::<Value>(&mut stack, 6), Value::from("s"));
        assert!(get::<Value>(&mut stack, 7).is_nil());
        assert!(get::<Value>(&mut stack, 8).is_nil());
    }

    #[test]
    fn test_materialize_table_routes_keys() {
        let mut stack = Stack::new();
        stack.create_table(0, 0);
        stack.push_str("one");
        stack.raw_seti(-2, 1);
        stack.push_integer(2);
        stack.set_field(-2, "two");
        // boolean keys have no host key space
        if let Some(Slot::Table(table)) = stack.slot(-1) {
            table
                .borrow_mut()
                .set(Slot::Boolean(true), Slot::bytes(b"ignored"));
        }

        let top = stack.get_top();
        let v = get::<Value>(&mut stack, -1);
        assert_eq!(stack.get_top(), top);
        assert_eq!(v.index(1i64).string_value(), "one");
        assert_eq!(v.index("two").int_value(), 2);
        assert_eq!(v.table_value().len(), 2);
    }

    #[test]
    fn test_materialize_respects_depth_limit() {
        let mut stack = Stack::with_config(StackConfig::new().with_max_table_depth(1));
        stack.create_table(0, 0);
        stack.create_table(0, 0);
        stack.push_integer(1);
        stack.set_field(-2, "x");
        stack.set_field(-2, "inner");

        let v = get::<Value>(&mut stack, 1);
        assert!(v.is_table());
        assert!(v.get("inner").is_some_and(|inner| inner.is_nil()));
    }

    #[test]
    fn test_materialize_double_self_reference() {
        let mut stack = Stack::with_config(StackConfig::default());
        stack.create_table(0, 2);
        stack.push_value(1);
        stack.set_field(1, "a");
        stack.push_value(1);
        stack.set_field(1, "b");
        stack.push_str("leaf");
        stack.set_field(1, "name");

        let v = get::<Value>(&mut stack, 1);
        assert_eq!(stack.get_top(), 1);
        assert!(v.get("a").is_some_and(|a| a.is_nil()));
        assert!(v.get("b").is_some_and(|b| b.is_nil()));
        assert_eq!(v.index("name").string_value(), "leaf");
    }

    #[test]
    fn test_materialize_shared_subtable_twice() {
        let mut stack = Stack::new();
        stack.create_table(0, 2);
        stack.create_table(0, 1);
        stack.push_integer(3);
        stack.set_field(2, "x");
        stack.push_value(2);
        stack.set_field(1, "first");
        stack.set_field(1, "second");

        let v = get::<Value>(&mut stack, 1);
        assert_eq!(v.index("first").index("x").int_value(), 3);
        assert_eq!(v.index("second").index("x").int_value(), 3);
    }

    #[test]
    fn test_check_get_ref() {
        struct Counter {
            hits: u32,
        }
        impl Userdata for Counter {}

        let mut counter = Counter { hits: 0 };
        let mut stack = Stack::new();
        stack.push_light_userdata(&mut counter as *mut Counter as usize);
        stack.push_light_userdata(0);
        stack.push_integer(3);

        let r = unsafe { check_get_ref::<Counter>(&mut stack, 1) }.unwrap();
        r.hits += 1;
        assert_eq!(counter.hits, 1);

        assert!(unsafe { check_get_ref::<Counter>(&mut stack, 2) }.is_err());
        assert!(unsafe { check_get_ref::<Counter>(&mut stack, 3) }.is_err());
    }
}
