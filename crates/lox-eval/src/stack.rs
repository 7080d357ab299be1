//! Stack growth for deep recursion.
//!
//! Every Lox call re-enters the evaluator, so recursion in a script becomes
//! recursion on the native stack. Wrapping the evaluator in
//! [`ensure_sufficient_stack`] moves onto a freshly allocated segment
//! whenever the current one runs low.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
