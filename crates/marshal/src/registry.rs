//! Metatable registry
//!
//! Maps host types to the name of the runtime metatable that gives pushed
//! pointers of that type their methods. The marshalling layer only reads this
//! mapping when pushing a pointer or reference; registering and tearing down
//! the metatables themselves happens on the runtime side.

use std::any::TypeId;
use std::collections::HashMap;

/// Lookup from a host type to its runtime metatable name
pub trait MetatableLookup {
    fn find(&self, type_id: TypeId) -> Option<&str>;
}

/// Host types that may be handed to the runtime by reference.
///
/// Primitive types (numbers, booleans, strings) always cross the boundary by
/// value and do not implement this trait, so asking for one by reference does
/// not compile:
///
/// ```compile_fail
/// use sel_core::Stack;
/// use sel_marshal::check_get_ref;
///
/// let mut stack = Stack::new();
/// let n: &mut i32 = unsafe { check_get_ref::<i32>(&mut stack, 1) }.unwrap();
/// ```
pub trait Userdata: 'static {}

/// Plain map implementation of [`MetatableLookup`]
#[derive(Debug, Default)]
pub struct MetatableRegistry {
    names: HashMap<TypeId, String>,
}

impl MetatableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `T` with a metatable name, replacing any previous name
    pub fn register<T: 'static>(&mut self, name: impl Into<String>) {
        self.names.insert(TypeId::of::<T>(), name.into());
    }

    /// Forget the metatable name of `T`
    pub fn unregister<T: 'static>(&mut self) -> Option<String> {
        self.names.remove(&TypeId::of::<T>())
    }

    /// Metatable name registered for `T`
    pub fn find_for<T: 'static>(&self) -> Option<&str> {
        self.find(TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl MetatableLookup for MetatableRegistry {
    fn find(&self, type_id: TypeId) -> Option<&str> {
        self.names.get(&type_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point;
    struct Circle;

    #[test]
    fn test_register_and_find() {
        let mut registry = MetatableRegistry::new();
        assert!(registry.is_empty());

        registry.register::<Point>("Point");
        assert_eq!(registry.find_for::<Point>(), Some("Point"));
        assert_eq!(registry.find(TypeId::of::<Point>()), Some("Point"));
        assert!(registry.find_for::<Circle>().is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = MetatableRegistry::new();
        registry.register::<Point>("Point");
        registry.register::<Point>("Point2");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find_for::<Point>(), Some("Point2"));
    }

    #[test]
    fn test_unregister() {
        let mut registry = MetatableRegistry::new();
        registry.register::<Circle>("Circle");
        assert_eq!(registry.unregister::<Circle>().as_deref(), Some("Circle"));
        assert!(registry.find_for::<Circle>().is_none());
        assert!(registry.unregister::<Circle>().is_none());
    }
}
