//! Runtime Stack
//!
//! The value stack host code talks to. Positions follow the Lua convention:
//!
//! ```text
//!  index:   1      2      3      4          (absolute, from the bottom)
//!         ┌──────┬──────┬──────┬──────┐
//!         │  v1  │  v2  │  v3  │  v4  │
//!         └──────┴──────┴──────┴──────┘
//!  index:  -4     -3     -2     -1          (relative, from the top)
//! ```
//!
//! Index 0 and positions past the top are "none": predicates report false,
//! readers return their zero value, and `type_of` reports [`TYPE_NONE`].
//!
//! Readers come in two flavors:
//!
//! - `to_*` never fail and return a zero value on mismatch;
//! - `check_*` validate and return [`StackError::BadArgument`] on mismatch.
//!
//! Writers never fail. Table writers silently drop the value when the target
//! slot is not a table.

use crate::config::StackConfig;
use crate::error::{StackError, StackResult, clear_runtime_error, set_runtime_error};
use crate::slot::{
    LightUserdata, Slot, TYPE_BOOLEAN, TYPE_LIGHTUSERDATA, TYPE_NIL, TYPE_NONE, TYPE_NUMBER,
    TYPE_STRING, TYPE_TABLE, type_name,
};
use crate::table::{RtTable, TableRef};
use std::rc::Rc;
use tracing::{debug, trace};

/// A Lua-style value stack
pub struct Stack {
    values: Vec<Slot>,
    config: StackConfig,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    /// Create a stack with the default configuration
    pub fn new() -> Self {
        Self::with_config(StackConfig::default())
    }

    /// Create a stack with the given configuration
    pub fn with_config(config: StackConfig) -> Self {
        Stack {
            values: Vec::with_capacity(config.initial_capacity),
            config,
        }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    // ========================================================================
    // Stack shape
    // ========================================================================

    /// Number of values on the stack (also the index of the top value)
    #[inline]
    pub fn get_top(&self) -> i32 {
        self.values.len() as i32
    }

    /// Get the current stack depth
    #[inline]
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    /// Check if the stack is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check if the stack has room for `n` more values without growing
    #[inline]
    pub fn has_capacity(&self, n: usize) -> bool {
        self.values.len() + n <= self.values.capacity()
    }

    /// Reserve room for at least `n` more values
    pub fn grow(&mut self, n: usize) {
        if !self.has_capacity(n) {
            trace!(
                depth = self.values.len(),
                capacity = self.values.capacity(),
                additional = n,
                "growing stack"
            );
            self.values.reserve(n);
        }
    }

    /// Set the top. A non-negative index becomes the new depth (filling with
    /// nil when growing); a negative index is relative to the current top.
    pub fn set_top(&mut self, index: i32) {
        let new_len = if index >= 0 {
            index as usize
        } else {
            (self.get_top() + index + 1).max(0) as usize
        };
        self.values.resize(new_len, Slot::Nil);
    }

    /// Remove `n` values from the top (saturating at the bottom)
    pub fn pop(&mut self, n: usize) {
        let new_len = self.values.len().saturating_sub(n);
        self.values.truncate(new_len);
    }

    /// Convert a relative index into an absolute one
    #[inline]
    pub fn abs_index(&self, index: i32) -> i32 {
        if index > 0 {
            index
        } else if index == 0 {
            0
        } else {
            self.get_top() + index + 1
        }
    }

    /// Slot at a position, `None` for none positions
    pub fn slot(&self, index: i32) -> Option<&Slot> {
        let abs = self.abs_index(index);
        if abs >= 1 {
            self.values.get(abs as usize - 1)
        } else {
            None
        }
    }

    fn slot_mut(&mut self, index: i32) -> Option<&mut Slot> {
        let abs = self.abs_index(index);
        if abs >= 1 {
            self.values.get_mut(abs as usize - 1)
        } else {
            None
        }
    }

    fn table_at(&self, index: i32) -> Option<TableRef> {
        match self.slot(index) {
            Some(Slot::Table(table)) => Some(Rc::clone(table)),
            _ => None,
        }
    }

    // ========================================================================
    // Type queries
    // ========================================================================

    /// Type code at a position ([`TYPE_NONE`] when there is no value)
    pub fn type_of(&self, index: i32) -> i32 {
        self.slot(index).map_or(TYPE_NONE, Slot::type_code)
    }

    /// Type name at a position
    pub fn type_name(&self, index: i32) -> &'static str {
        type_name(self.type_of(index))
    }

    pub fn is_none(&self, index: i32) -> bool {
        self.type_of(index) == TYPE_NONE
    }

    pub fn is_nil(&self, index: i32) -> bool {
        self.type_of(index) == TYPE_NIL
    }

    pub fn is_boolean(&self, index: i32) -> bool {
        self.type_of(index) == TYPE_BOOLEAN
    }

    /// True for number slots only; numeric strings are strings
    pub fn is_number(&self, index: i32) -> bool {
        self.type_of(index) == TYPE_NUMBER
    }

    /// True for number slots holding the integer subtype
    pub fn is_integer(&self, index: i32) -> bool {
        matches!(self.slot(index), Some(Slot::Integer(_)))
    }

    pub fn is_string(&self, index: i32) -> bool {
        self.type_of(index) == TYPE_STRING
    }

    pub fn is_table(&self, index: i32) -> bool {
        self.type_of(index) == TYPE_TABLE
    }

    pub fn is_light_userdata(&self, index: i32) -> bool {
        self.type_of(index) == TYPE_LIGHTUSERDATA
    }

    // ========================================================================
    // Readers (never fail)
    // ========================================================================

    /// Truthiness of a slot; none and nil read as false
    pub fn to_boolean(&self, index: i32) -> bool {
        self.slot(index).is_some_and(Slot::truthy)
    }

    /// Integer form of a slot, 0 when it has none
    pub fn to_integer(&self, index: i32) -> i64 {
        self.slot(index).and_then(Slot::as_integer).unwrap_or(0)
    }

    /// Float form of a slot, 0.0 when it has none
    pub fn to_number(&self, index: i32) -> f64 {
        self.slot(index).and_then(Slot::as_number).unwrap_or(0.0)
    }

    /// Byte-string form of a slot (numbers convert), `None` otherwise
    pub fn to_bytes(&self, index: i32) -> Option<Vec<u8>> {
        self.slot(index).and_then(Slot::as_bytes)
    }

    /// Address behind a light userdata or table slot, 0 otherwise
    pub fn to_pointer(&self, index: i32) -> usize {
        self.slot(index).map_or(0, Slot::as_pointer)
    }

    // ========================================================================
    // Validating readers
    // ========================================================================

    fn bad_argument(&self, index: i32, expected: &'static str) -> StackError {
        StackError::BadArgument {
            position: self.abs_index(index),
            expected,
            got: self.type_name(index),
        }
    }

    /// Integer at a position, or an error naming the position and the type found
    pub fn check_integer(&self, index: i32) -> StackResult<i64> {
        self.slot(index)
            .and_then(Slot::as_integer)
            .ok_or_else(|| self.bad_argument(index, "number"))
    }

    /// Float at a position, or an error naming the position and the type found
    pub fn check_number(&self, index: i32) -> StackResult<f64> {
        self.slot(index)
            .and_then(Slot::as_number)
            .ok_or_else(|| self.bad_argument(index, "number"))
    }

    /// Byte string at a position (numbers convert), or an error
    pub fn check_bytes(&self, index: i32) -> StackResult<Vec<u8>> {
        self.to_bytes(index)
            .ok_or_else(|| self.bad_argument(index, "string"))
    }

    /// Require a specific type code at a position
    pub fn check_type(&self, index: i32, code: i32) -> StackResult<()> {
        if self.type_of(index) == code {
            Ok(())
        } else {
            Err(self.bad_argument(index, type_name(code)))
        }
    }

    // ========================================================================
    // Writers (never fail)
    // ========================================================================

    /// Push a raw slot
    #[inline]
    pub fn push_slot(&mut self, slot: Slot) {
        self.grow(1);
        self.values.push(slot);
    }

    pub fn push_nil(&mut self) {
        self.push_slot(Slot::Nil);
    }

    pub fn push_boolean(&mut self, b: bool) {
        self.push_slot(Slot::Boolean(b));
    }

    pub fn push_integer(&mut self, i: i64) {
        self.push_slot(Slot::Integer(i));
    }

    pub fn push_number(&mut self, n: f64) {
        self.push_slot(Slot::Number(n));
    }

    /// Push a counted byte string (embedded NUL bytes are kept)
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.push_slot(Slot::bytes(bytes));
    }

    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    /// Push a raw host address
    pub fn push_light_userdata(&mut self, addr: usize) {
        self.push_slot(Slot::LightUserdata(LightUserdata {
            addr,
            metatable: None,
        }));
    }

    /// Push a copy of the value at a position (nil for none positions)
    pub fn push_value(&mut self, index: i32) {
        let slot = self.slot(index).cloned().unwrap_or_default();
        self.push_slot(slot);
    }

    /// Pop the top value and store it at a position
    pub fn replace(&mut self, index: i32) {
        let abs = self.abs_index(index);
        let Some(top) = self.values.pop() else {
            return;
        };
        if let Some(slot) = self.slot_mut(abs) {
            *slot = top;
        }
    }

    /// Push a new empty table pre-sized for `narr` sequence entries and
    /// `nrec` other entries
    pub fn create_table(&mut self, narr: usize, nrec: usize) {
        let table = RtTable::with_capacity(narr, nrec).into_ref();
        self.push_slot(Slot::Table(table));
    }

    /// `t[n] = v` where `t` is at `index` and `v` is the top value, which is
    /// popped
    pub fn raw_seti(&mut self, index: i32, n: i64) {
        let table = self.table_at(index);
        let value = self.values.pop().unwrap_or_default();
        match table {
            Some(table) => table.borrow_mut().set_int(n, value),
            None => trace!(index, "raw_seti on a non-table slot, value dropped"),
        }
    }

    /// `t[key] = v` where `t` is at `index` and `v` is the top value, which is
    /// popped
    pub fn set_field(&mut self, index: i32, key: &str) {
        let table = self.table_at(index);
        let value = self.values.pop().unwrap_or_default();
        match table {
            Some(table) => {
                table.borrow_mut().set(Slot::bytes(key.as_bytes()), value);
            }
            None => trace!(index, key, "set_field on a non-table slot, value dropped"),
        }
    }

    /// Push `t[n]` for the table at `index` and return its type code
    pub fn raw_geti(&mut self, index: i32, n: i64) -> i32 {
        let value = self
            .table_at(index)
            .map(|table| table.borrow().get_int(n))
            .unwrap_or_default();
        let code = value.type_code();
        self.push_slot(value);
        code
    }

    /// Push `t[key]` for the table at `index` and return its type code
    pub fn get_field(&mut self, index: i32, key: &str) -> i32 {
        let value = self
            .table_at(index)
            .map(|table| table.borrow().get_str(key.as_bytes()))
            .unwrap_or_default();
        let code = value.type_code();
        self.push_slot(value);
        code
    }

    /// Sequence length of the table at `index` (0 for non-tables)
    pub fn raw_len(&self, index: i32) -> usize {
        self.table_at(index).map_or(0, |table| table.borrow().len())
    }

    /// Table traversal step.
    ///
    /// Pops a key from the top and pushes the next key/value pair of the table
    /// at `index`, returning true; returns false with nothing pushed once the
    /// traversal is complete. Start the traversal by pushing nil.
    pub fn next(&mut self, index: i32) -> bool {
        let table = self.table_at(index);
        let key = self.values.pop().unwrap_or_default();
        let Some(table) = table else {
            return false;
        };
        let entry = table.borrow().next(&key);
        match entry {
            Some((k, v)) => {
                self.push_slot(k);
                self.push_slot(v);
                true
            }
            None => false,
        }
    }

    /// Attach a metatable name to the light userdata or table on top
    pub fn set_metatable(&mut self, name: &str) {
        let name: Rc<str> = Rc::from(name);
        match self.values.last_mut() {
            Some(Slot::LightUserdata(ud)) => ud.metatable = Some(name),
            Some(Slot::Table(table)) => table.borrow_mut().set_metatable(Some(name)),
            _ => trace!(name = %name, "set_metatable on a slot without a metatable"),
        }
    }

    /// Metatable name of the light userdata or table at a position
    pub fn metatable_name(&self, index: i32) -> Option<Rc<str>> {
        match self.slot(index)? {
            Slot::LightUserdata(ud) => ud.metatable.clone(),
            Slot::Table(table) => table.borrow().metatable().cloned(),
            _ => None,
        }
    }

    // ========================================================================
    // Call boundary
    // ========================================================================

    /// Run host code against the stack as one protected call.
    ///
    /// When `f` fails the stack is cut back to the height it had on entry, the
    /// error message is recorded as the thread's last runtime error, and the
    /// error is returned. Values `f` left above the entry height on success are
    /// kept. A pending runtime error is cleared on entry.
    pub fn protected<R>(&mut self, f: impl FnOnce(&mut Stack) -> StackResult<R>) -> StackResult<R> {
        let entry_top = self.get_top();
        clear_runtime_error();
        match f(self) {
            Ok(result) => Ok(result),
            Err(err) => {
                debug!(error = %err, entry_top, top = self.get_top(), "protected call aborted");
                if self.get_top() > entry_top {
                    self.set_top(entry_top);
                }
                set_runtime_error(err.to_string());
                Err(err)
            }
        }
    }
}
