//! Sel Core: a Lua-style value stack for embedding a scripting runtime
//!
//! This crate provides the runtime side of the host/runtime boundary: the
//! stack host code pushes to and reads from, the tables that live on it, and
//! the protected-call boundary that turns validation failures into a clean
//! unwind.
//!
//! Key design principles:
//! - Slot: what the runtime talks about (nil, boolean, number, string, table,
//!   light userdata)
//! - RtTable: array part plus ordered hash part, shared by reference
//! - Stack: contiguous slots addressed with 1-based or top-relative indices
//!
//! # Modules
//!
//! - `error`: Bad-argument errors and the thread-local last-error slot
//! - `config`: Stack configuration (capacity, table nesting limit)
//! - `slot`: Slot kinds, type codes and runtime conversions
//! - `table`: Runtime table storage and `next` traversal
//! - `stack`: The stack API

pub mod config;
pub mod error;
pub mod slot;
pub mod stack;
pub mod table;

pub use config::{ConfigError, DEFAULT_MAX_TABLE_DEPTH, DEFAULT_STACK_CAPACITY, StackConfig};
pub use error::{
    StackError, StackResult, clear_runtime_error, has_runtime_error, set_runtime_error,
    take_runtime_error,
};
pub use slot::{
    LightUserdata, Slot, TYPE_BOOLEAN, TYPE_LIGHTUSERDATA, TYPE_NIL, TYPE_NONE, TYPE_NUMBER,
    TYPE_STRING, TYPE_TABLE, type_name,
};
pub use stack::Stack;
pub use table::{RtTable, TableKey, TableRef};
