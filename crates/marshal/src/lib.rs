//! Sel Marshal: typed conversions between Rust values and a Lua-style stack
//!
//! Host code talks to the runtime in two ways:
//!
//! - through [`Value`], a closed dynamic value (nil, boolean, character,
//!   integer, wide integer, double, string, table) that can be built, inspected
//!   and indexed without failing, and
//! - through the marshalling protocol, where the conversion for each host type
//!   is picked by trait resolution at compile time:
//!
//! ```text
//! get::<T>(stack, i)         best effort, never fails
//! check_get::<T>(stack, i)   validating, Err(StackError::BadArgument)
//! pop::<(A, B, ..)>(stack)   read a window of slots, remove N
//! pop_reset::<(A, ..)>(stack) read a window of slots, empty the stack
//! push(stack, v)             push a value or a tuple of values
//! push_tagged(stack, r, v)   same, tagging pointers with metatable names
//! set(stack, v, i)           overwrite slot i
//! ```
//!
//! # Example
//!
//! ```
//! use sel_core::Stack;
//! use sel_marshal::{Value, pop, push};
//!
//! let mut stack = Stack::new();
//! push(&mut stack, (1i32, "two", 3.0));
//! let (a, b, c) = pop::<(i32, String, f64)>(&mut stack);
//! assert_eq!((a, b.as_str(), c), (1, "two", 3.0));
//!
//! push(&mut stack, Value::from(3.7));
//! let v = pop::<(Value,)>(&mut stack);
//! assert_eq!(v.int_value(), 3);
//! ```
//!
//! # Modules
//!
//! - `value`: The `Value` handle and its accessors
//! - `table`: Two-key-space `Table`
//! - `get`: Single-value retrieval (`Get`, `CheckGet`)
//! - `pop`: Multi-value pop (`PopN`)
//! - `push`: Pushing host values (`Push`)
//! - `registry`: Host type to metatable name lookup
//! - `serialize`: bincode snapshots of Values
//! - `notation`: Literal formatting of Values

pub mod get;
pub mod notation;
pub mod pop;
pub mod push;
pub mod registry;
pub mod serialize;
pub mod table;
pub mod value;

pub use get::{CheckGet, Get, check_get, check_get_ref, get};
pub use notation::{NotationConfig, value_to_notation};
pub use pop::{PopN, pop, pop_reset};
pub use push::{Push, push, push_tagged, set};
pub use registry::{MetatableLookup, MetatableRegistry, Userdata};
pub use serialize::{SerializeError, TypedValue, ValueSerialize};
pub use table::{Key, Table};
pub use value::{Value, ValueKind};

// The stack types every entry point takes
pub use sel_core::{Stack, StackError, StackResult};
