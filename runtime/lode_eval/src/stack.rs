//! Host-stack headroom for deep recursion.
//!
//! Recursive programs (and deeply nested expressions) recurse through the
//! evaluator itself, so the evaluator grows the host stack instead of
//! overflowing it. On wasm32 `stacker` is unavailable and the engine's own
//! stack handling applies.

/// Run `f`, growing the host stack first if headroom is low.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Remaining-stack red zone that triggers growth.
    const RED_ZONE: usize = 64 * 1024;

    /// Size of each additionally allocated stack segment.
    const STACK_SEGMENT: usize = 2 * 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, f)
}

/// wasm32 variant: call through directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
