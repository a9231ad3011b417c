//! Stack growth for the recursive parts of the front end and evaluator.
//!
//! Script recursion maps onto host recursion, so an evaluator running on a
//! small thread stack would overflow long before `max_call_depth` is
//! reached. Wrapping the recursive entry points grows the stack on demand.

/// Grow when less than this remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
