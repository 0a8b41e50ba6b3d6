//! Multi-value pop
//!
//! [`PopN`] converts a window of stack slots into one host value, with the
//! shape decided by the arity of the requested tuple:
//!
//! ```text
//! ()          -> ()            reads nothing
//! (A,)        -> A             reads the top slot
//! (A, B, ...) -> (A, B, ...)   reads the N slots ending at the top, in order
//! ```
//!
//! When fewer than N slots exist the window starts at the bottom of the stack
//! and the missing positions read as "no value".
//!
//! [`pop`] then removes exactly N slots; [`pop_reset`] empties the stack.

use crate::get::Get;
use sel_core::Stack;
use tracing::debug;

/// Tuple of [`Get`] types readable as a window of stack slots
pub trait PopN {
    type Output;

    /// Number of slots in the window
    const ARITY: usize;

    /// Convert the window without changing the stack height
    fn read(stack: &mut Stack) -> Self::Output;
}

/// Read `T` off the top of the stack and remove its slots
pub fn pop<T: PopN>(stack: &mut Stack) -> T::Output {
    let out = T::read(stack);
    stack.pop(T::ARITY);
    out
}

/// Read `T` off the top of the stack and empty the stack
pub fn pop_reset<T: PopN>(stack: &mut Stack) -> T::Output {
    let out = T::read(stack);
    debug!(depth = stack.depth(), arity = T::ARITY, "resetting stack");
    stack.set_top(0);
    out
}

impl PopN for () {
    type Output = ();
    const ARITY: usize = 0;

    fn read(_: &mut Stack) -> Self::Output {}
}

impl<A: Get> PopN for (A,) {
    type Output = A;
    const ARITY: usize = 1;

    fn read(stack: &mut Stack) -> Self::Output {
        A::get(stack, -1)
    }
}

macro_rules! impl_pop_tuple {
    ($n:expr; $($name:ident),+) => {
        impl<$($name: Get),+> PopN for ($($name,)+) {
            type Output = ($($name,)+);
            const ARITY: usize = $n;

            fn read(stack: &mut Stack) -> Self::Output {
                let mut position = (stack.get_top() - $n).max(0);
                ($(
                    {
                        position += 1;
                        <$name as Get>::get(stack, position)
                    },
                )+)
            }
        }
    };
}

impl_pop_tuple!(2; A, B);
impl_pop_tuple!(3; A, B, C);
impl_pop_tuple!(4; A, B, C, D);
impl_pop_tuple!(5; A, B, C, D, E);
impl_pop_tuple!(6; A, B, C, D, E, F);
impl_pop_tuple!(7; A, B, C, D, E, F, G);
impl_pop_tuple!(8; A, B, C, D, E, F, G, H);
impl_pop_tuple!(9; A, B, C, D, E, F, G, H, I);
impl_pop_tuple!(10; A, B, C, D, E, F, G, H, I, J);
impl_pop_tuple!(11; A, B, C, D, E, F, G, H, I, J, K);
impl_pop_tuple!(12; A, B, C, D, E, F, G, H, I, J, K, L);
