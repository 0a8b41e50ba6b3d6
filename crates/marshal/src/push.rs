//! Pushing host values
//!
//! [`Push`] is implemented per host type. Primitives map to one runtime push
//! each and never fail. Pointers and [`Userdata`] references become light
//! userdata; when a [`MetatableLookup`] is supplied and knows the pointee
//! type, its metatable name is attached to the pushed slot. A null pointer
//! pushes nil and is never tagged.
//!
//! A [`Value`] is re-dispatched on its tag. Tables become fresh runtime
//! tables pre-sized for both key spaces; nil entries are left out. A table
//! already being pushed further up the same path (a cycle) pushes as nil,
//! as do tables nested beyond the stack's `max_table_depth`.
//!
//! Tuples push their elements left to right.

use crate::registry::{MetatableLookup, Userdata};
use crate::table::Table;
use crate::value::{Value, ValueKind};
use sel_core::Stack;
use std::any::TypeId;
use tracing::{debug, trace, warn};

/// Host value that can be pushed onto the stack
pub trait Push {
    /// Push `self`, tagging pointers through `registry` when one is given
    fn push_with(self, stack: &mut Stack, registry: Option<&dyn MetatableLookup>);
}

/// Push `value` without metatable tagging
pub fn push<T: Push>(stack: &mut Stack, value: T) {
    value.push_with(stack, None);
}

/// Push `value`, attaching registered metatable names to pointers
pub fn push_tagged<T: Push>(stack: &mut Stack, registry: &dyn MetatableLookup, value: T) {
    value.push_with(stack, Some(registry));
}

/// Overwrite the slot at `index` with `value`
pub fn set<T: Push>(stack: &mut Stack, value: T, index: i32) {
    let index = stack.abs_index(index);
    push(stack, value);
    stack.replace(index);
}

fn push_address(
    stack: &mut Stack,
    addr: usize,
    type_id: TypeId,
    registry: Option<&dyn MetatableLookup>,
) {
    if addr == 0 {
        stack.push_nil();
        return;
    }
    stack.push_light_userdata(addr);
    if let Some(name) = registry.and_then(|r| r.find(type_id)) {
        trace!(addr, metatable = name, "tagging pushed pointer");
        stack.set_metatable(name);
    }
}

// ============================================================================
// Primitives
// ============================================================================

impl Push for bool {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        stack.push_boolean(self);
    }
}

impl Push for char {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        let mut buf = [0u8; 4];
        stack.push_str(self.encode_utf8(&mut buf));
    }
}

impl Push for i32 {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        stack.push_integer(self as i64);
    }
}

impl Push for u32 {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        stack.push_integer(self as i64);
    }
}

impl Push for i64 {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        stack.push_integer(self);
    }
}

impl Push for u64 {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        // Wraps into the runtime's signed integer
        stack.push_integer(self as i64);
    }
}

impl Push for f64 {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        stack.push_number(self);
    }
}

impl Push for String {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        stack.push_str(&self);
    }
}

impl Push for &str {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        stack.push_str(self);
    }
}

// ============================================================================
// Pointers and references
// ============================================================================

impl<T: 'static> Push for *const T {
    fn push_with(self, stack: &mut Stack, registry: Option<&dyn MetatableLookup>) {
        push_address(stack, self as usize, TypeId::of::<T>(), registry);
    }
}

impl<T: 'static> Push for *mut T {
    fn push_with(self, stack: &mut Stack, registry: Option<&dyn MetatableLookup>) {
        push_address(stack, self as usize, TypeId::of::<T>(), registry);
    }
}

impl<T: Userdata> Push for &T {
    fn push_with(self, stack: &mut Stack, registry: Option<&dyn MetatableLookup>) {
        push_address(stack, self as *const T as usize, TypeId::of::<T>(), registry);
    }
}

impl<T: Userdata> Push for &mut T {
    fn push_with(self, stack: &mut Stack, registry: Option<&dyn MetatableLookup>) {
        push_address(stack, self as *mut T as usize, TypeId::of::<T>(), registry);
    }
}

// ============================================================================
// Values
// ============================================================================

impl Push for &Value {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        push_value(stack, self, &mut Vec::new());
    }
}

impl Push for Value {
    fn push_with(self, stack: &mut Stack, registry: Option<&dyn MetatableLookup>) {
        (&self).push_with(stack, registry);
    }
}

impl Push for &Table {
    fn push_with(self, stack: &mut Stack, _: Option<&dyn MetatableLookup>) {
        push_table(stack, self, &mut Vec::new());
    }
}

impl Push for Table {
    fn push_with(self, stack: &mut Stack, registry: Option<&dyn MetatableLookup>) {
        (&self).push_with(stack, registry);
    }
}

fn push_value(stack: &mut Stack, value: &Value, path: &mut Vec<*const Table>) {
    match value.kind() {
        ValueKind::Nil => stack.push_nil(),
        ValueKind::Boolean => stack.push_boolean(value.bool_value()),
        ValueKind::Character => push(stack, value.char_value()),
        ValueKind::Integer => stack.push_integer(value.int_value() as i64),
        ValueKind::WideInteger => stack.push_integer(value.wide_int_value()),
        ValueKind::Double => stack.push_number(value.double_value()),
        ValueKind::String => stack.push_str(value.string_value()),
        ValueKind::Table => match value.table_ref() {
            Some(table) => push_table(stack, &table, path),
            None => stack.push_nil(),
        },
    }
}

fn push_table(stack: &mut Stack, table: &Table, path: &mut Vec<*const Table>) {
    let depth = path.len();
    let limit = stack.config().max_table_depth;
    if depth >= limit {
        warn!(depth, limit, "table nesting limit reached, pushing nil");
        stack.push_nil();
        return;
    }
    let id: *const Table = table;
    if path.contains(&id) {
        debug!(depth, "table refers back to itself, pushing nil");
        stack.push_nil();
        return;
    }
    path.push(id);

    stack.create_table(table.int_map().len(), table.str_map().len());
    for (key, value) in table.int_map() {
        if value.is_nil() {
            continue;
        }
        push_value(stack, value, path);
        stack.raw_seti(-2, *key);
    }
    for (key, value) in table.str_map() {
        if value.is_nil() {
            continue;
        }
        push_value(stack, value, path);
        stack.set_field(-2, key);
    }
    path.pop();
}

// ============================================================================
// Tuples
// ============================================================================

impl Push for () {
    fn push_with(self, _: &mut Stack, _: Option<&dyn MetatableLookup>) {}
}

macro_rules! impl_push_tuple {
    ($($name:ident),+) => {
        impl<$($name: Push),+> Push for ($($name,)+) {
            #[allow(non_snake_case)]
            fn push_with(self, stack: &mut Stack, registry: Option<&dyn MetatableLookup>) {
                let ($($name,)+) = self;
                $($name.push_with(stack, registry);)+
            }
        }
    };
}

impl_push_tuple!(A);
impl_push_tuple!(A, B);
impl_push_tuple!(A, B, C);
impl_push_tuple!(A, B, C, D);
impl_push_tuple!(A, B, C, D, E);
impl_push_tuple!(A, B, C, D, E, F);
impl_push_tuple!(A, B, C, D, E, F, G);
impl_push_tuple!(A, B, C, D, E, F, G, H);
impl_push_tuple!(A, B, C, D, E, F, G, H, I);
impl_push_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_push_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_push_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);
