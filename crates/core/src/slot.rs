//! Stack slot representation
//!
//! A [`Slot`] is one entry of the runtime stack. The set of kinds mirrors a
//! Lua-style runtime without functions or full userdata: nil, boolean, integer,
//! float, byte string, table and light userdata (a raw address).
//!
//! Type codes follow the usual Lua numbering so that diagnostics and
//! `type_of` results read the same way they would against a C runtime:
//!
//! ```text
//! -1 = none (invalid position)
//!  0 = nil
//!  1 = boolean
//!  2 = light userdata
//!  3 = number (integer or float)
//!  4 = string
//!  5 = table
//! ```

use crate::table::TableRef;
use std::fmt;
use std::rc::Rc;

/// Type code for a position with no value
pub const TYPE_NONE: i32 = -1;
pub const TYPE_NIL: i32 = 0;
pub const TYPE_BOOLEAN: i32 = 1;
pub const TYPE_LIGHTUSERDATA: i32 = 2;
pub const TYPE_NUMBER: i32 = 3;
pub const TYPE_STRING: i32 = 4;
pub const TYPE_TABLE: i32 = 5;

/// Name of a type code, as used in error messages
pub fn type_name(code: i32) -> &'static str {
    match code {
        TYPE_NIL => "nil",
        TYPE_BOOLEAN => "boolean",
        TYPE_LIGHTUSERDATA => "userdata",
        TYPE_NUMBER => "number",
        TYPE_STRING => "string",
        TYPE_TABLE => "table",
        _ => "no value",
    }
}

/// A raw host address pushed onto the stack, optionally tagged with the name
/// of the metatable that gives it methods on the runtime side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightUserdata {
    pub addr: usize,
    pub metatable: Option<Rc<str>>,
}

/// One runtime stack entry
///
/// Cloning is cheap: strings share their bytes and tables are shared by
/// reference, exactly as the runtime itself would alias them.
#[derive(Clone, Default)]
pub enum Slot {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(Rc<[u8]>),
    Table(TableRef),
    LightUserdata(LightUserdata),
}

impl Slot {
    /// Build a string slot from raw bytes
    pub fn bytes(bytes: &[u8]) -> Self {
        Slot::String(Rc::from(bytes))
    }

    /// Type code of this slot
    pub fn type_code(&self) -> i32 {
        match self {
            Slot::Nil => TYPE_NIL,
            Slot::Boolean(_) => TYPE_BOOLEAN,
            Slot::Integer(_) | Slot::Number(_) => TYPE_NUMBER,
            Slot::String(_) => TYPE_STRING,
            Slot::Table(_) => TYPE_TABLE,
            Slot::LightUserdata(_) => TYPE_LIGHTUSERDATA,
        }
    }

    /// Type name of this slot
    pub fn type_name(&self) -> &'static str {
        type_name(self.type_code())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Slot::Nil)
    }

    /// Truthiness: everything except nil and false
    pub fn truthy(&self) -> bool {
        !matches!(self, Slot::Nil | Slot::Boolean(false))
    }

    /// Integer conversion: floats truncate, numeric strings parse
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Slot::Integer(i) => Some(*i),
            Slot::Number(f) if f.is_finite() => Some(f.trunc() as i64),
            Slot::String(bytes) => parse_number(bytes).and_then(|n| match n {
                ParsedNumber::Integer(i) => Some(i),
                ParsedNumber::Float(f) if f.is_finite() => Some(f.trunc() as i64),
                ParsedNumber::Float(_) => None,
            }),
            _ => None,
        }
    }

    /// Float conversion: integers widen, numeric strings parse
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Slot::Integer(i) => Some(*i as f64),
            Slot::Number(f) => Some(*f),
            Slot::String(bytes) => parse_number(bytes).map(|n| match n {
                ParsedNumber::Integer(i) => i as f64,
                ParsedNumber::Float(f) => f,
            }),
            _ => None,
        }
    }

    /// String conversion: strings as-is, numbers in their printed form
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Slot::String(bytes) => Some(bytes.to_vec()),
            Slot::Integer(i) => Some(i.to_string().into_bytes()),
            Slot::Number(f) => Some(format_float(*f).into_bytes()),
            _ => None,
        }
    }

    /// Address of a reference-like slot, 0 otherwise
    pub fn as_pointer(&self) -> usize {
        match self {
            Slot::LightUserdata(ud) => ud.addr,
            Slot::Table(table) => Rc::as_ptr(table) as usize,
            _ => 0,
        }
    }
}

impl PartialEq for Slot {
    /// Raw equality: tables compare by identity, numbers across subtypes
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Slot::Nil, Slot::Nil) => true,
            (Slot::Boolean(a), Slot::Boolean(b)) => a == b,
            (Slot::Integer(a), Slot::Integer(b)) => a == b,
            (Slot::Number(a), Slot::Number(b)) => a == b,
            (Slot::Integer(a), Slot::Number(b)) | (Slot::Number(b), Slot::Integer(a)) => {
                *a as f64 == *b
            }
            (Slot::String(a), Slot::String(b)) => a == b,
            (Slot::Table(a), Slot::Table(b)) => Rc::ptr_eq(a, b),
            (Slot::LightUserdata(a), Slot::LightUserdata(b)) => a.addr == b.addr,
            _ => false,
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Nil => write!(f, "Nil"),
            Slot::Boolean(b) => write!(f, "Boolean({})", b),
            Slot::Integer(i) => write!(f, "Integer({})", i),
            Slot::Number(n) => write!(f, "Number({})", n),
            Slot::String(bytes) => write!(f, "String({:?})", String::from_utf8_lossy(bytes)),
            // Tables may be cyclic; print identity only
            Slot::Table(table) => write!(f, "Table({:p})", Rc::as_ptr(table)),
            Slot::LightUserdata(ud) => match &ud.metatable {
                Some(name) => write!(f, "LightUserdata(0x{:x}, {})", ud.addr, name),
                None => write!(f, "LightUserdata(0x{:x})", ud.addr),
            },
        }
    }
}

/// Result of reading a numeric string
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedNumber {
    Integer(i64),
    Float(f64),
}

/// Parse the numeric form of a string slot (surrounding whitespace allowed,
/// decimal or `0x` hexadecimal integers, decimal floats)
pub fn parse_number(bytes: &[u8]) -> Option<ParsedNumber> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    if text.is_empty() {
        return None;
    }

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        let value = u64::from_str_radix(hex, 16).ok()? as i64;
        return Some(ParsedNumber::Integer(if negative {
            value.wrapping_neg()
        } else {
            value
        }));
    }

    if let Ok(i) = text.parse::<i64>() {
        return Some(ParsedNumber::Integer(i));
    }
    // Reject the spellings Rust accepts but the runtime grammar does not
    let lowered = digits.to_ascii_lowercase();
    if lowered.starts_with("inf") || lowered.starts_with("nan") {
        return None;
    }
    text.parse::<f64>().ok().map(ParsedNumber::Float)
}

/// Print a float the way the runtime converts numbers to strings: integral
/// values keep a trailing `.0` so they stay distinguishable from integers
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return if f.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        assert_eq!(Slot::Nil.type_code(), TYPE_NIL);
        assert_eq!(Slot::Boolean(true).type_code(), TYPE_BOOLEAN);
        assert_eq!(Slot::Integer(1).type_code(), TYPE_NUMBER);
        assert_eq!(Slot::Number(1.5).type_code(), TYPE_NUMBER);
        assert_eq!(Slot::bytes(b"x").type_code(), TYPE_STRING);
        assert_eq!(type_name(TYPE_NONE), "no value");
        assert_eq!(Slot::bytes(b"x").type_name(), "string");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Slot::Nil.truthy());
        assert!(!Slot::Boolean(false).truthy());
        assert!(Slot::Boolean(true).truthy());
        assert!(Slot::Integer(0).truthy());
        assert!(Slot::bytes(b"").truthy());
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(Slot::Integer(7).as_integer(), Some(7));
        assert_eq!(Slot::Number(3.7).as_integer(), Some(3));
        assert_eq!(Slot::Number(-3.7).as_integer(), Some(-3));
        assert_eq!(Slot::bytes(b" 42 ").as_integer(), Some(42));
        assert_eq!(Slot::bytes(b"0x10").as_integer(), Some(16));
        assert_eq!(Slot::bytes(b"2.5").as_integer(), Some(2));
        assert_eq!(Slot::bytes(b"abc").as_integer(), None);
        assert_eq!(Slot::Boolean(true).as_integer(), None);
        assert_eq!(Slot::Number(f64::NAN).as_integer(), None);
    }

    #[test]
    fn test_number_conversion() {
        assert_eq!(Slot::Integer(2).as_number(), Some(2.0));
        assert_eq!(Slot::bytes(b"1e3").as_number(), Some(1000.0));
        assert_eq!(Slot::bytes(b"inf").as_number(), None);
        assert_eq!(Slot::Nil.as_number(), None);
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(Slot::Integer(-5).as_bytes(), Some(b"-5".to_vec()));
        assert_eq!(Slot::Number(2.0).as_bytes(), Some(b"2.0".to_vec()));
        assert_eq!(Slot::Number(0.25).as_bytes(), Some(b"0.25".to_vec()));
        assert_eq!(Slot::bytes(b"a\0b").as_bytes(), Some(b"a\0b".to_vec()));
        assert_eq!(Slot::Boolean(false).as_bytes(), None);
    }

    #[test]
    fn test_raw_equality() {
        assert_eq!(Slot::Integer(1), Slot::Number(1.0));
        assert_ne!(Slot::Integer(1), Slot::bytes(b"1"));
        assert_eq!(Slot::bytes(b"k"), Slot::bytes(b"k"));
    }
}
