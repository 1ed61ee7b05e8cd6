//! Error types for generators
//!
//! Exhaustion is not an error: a finished generator answers every `send`
//! with `Ok(None)`. The types here cover the cases that are surfaced to the
//! direct caller instead.

use std::alloc::Layout;
use thiserror::Error;

/// Continuation storage could not be acquired from an allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("failed to allocate {size} bytes (align {align}) of continuation storage")]
pub struct AllocError {
    pub size: usize,
    pub align: usize,
}

impl AllocError {
    pub fn for_layout(layout: Layout) -> Self {
        Self {
            size: layout.size(),
            align: layout.align(),
        }
    }
}

/// A contract violation or failure reported by `send`/`next`.
///
/// After any of these is returned the generator is finished; later calls
/// return `Ok(None)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoroutineError {
    /// The body awaited `yield_` after `close()`.
    #[error("generator body yielded after it was closed")]
    YieldAfterClose,

    /// The body returned `Pending` from somewhere other than `yield_`.
    #[error("generator body suspended without yielding a value")]
    ForeignSuspension,

    /// `next()` was called on a generator with no default message.
    #[error("generator has no default message configured; use send() instead")]
    NoDefaultMessage,

    /// A body failed to allocate a child generator.
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// Result of driving a generator one step: `Some` value, or `None` once exhausted.
pub type CoroutineResult<T> = Result<T, CoroutineError>;
