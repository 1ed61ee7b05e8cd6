//! Builder for generator engines
//!
//! # Example
//!
//! ```rust
//! use std::pin::pin;
//! use refrain_core::{CoroutineBuilder, CountingAllocator, Generator};
//! use refrain_core::samples::{range, triangular};
//!
//! // Inline engine, advanced with `next()`
//! let mut evens = pin!(CoroutineBuilder::new().default_message(()).inline(|ctx| range(ctx, 0, 6, 2)));
//! assert_eq!(evens.next(), Ok(Some(0)));
//!
//! // Recursive engine backed by a counting allocator
//! let allocator = CountingAllocator::new();
//! let mut sums = CoroutineBuilder::new()
//!     .default_message(())
//!     .recursive(|ctx| triangular(ctx, 3, &allocator), &allocator)?;
//! assert_eq!(sums.iter().sum::<u64>(), 6);
//! # Ok::<(), refrain_core::AllocError>(())
//! ```

use std::future::Future;

use crate::allocator::ContinuationAllocator;
use crate::context::Context;
use crate::error::AllocError;
use crate::inline::InlineCoroutine;
use crate::recursive::RecursiveCoroutine;

/// Options shared by both engines.
#[derive(Debug, Clone)]
pub struct CoroutineOptions<S> {
    /// Message sent by `next()`. Without one, `next()` reports
    /// `NoDefaultMessage` and only `send` can drive the generator.
    pub default_message: Option<S>,
}

impl<S> Default for CoroutineOptions<S> {
    fn default() -> Self {
        Self {
            default_message: None,
        }
    }
}

/// Builder for [`InlineCoroutine`] and [`RecursiveCoroutine`].
pub struct CoroutineBuilder<S> {
    options: CoroutineOptions<S>,
}

impl<S> CoroutineBuilder<S> {
    /// Create a new builder with default options
    pub fn new() -> Self {
        Self {
            options: CoroutineOptions::default(),
        }
    }

    /// Set the message `next()` sends
    pub fn default_message(mut self, message: S) -> Self {
        self.options.default_message = Some(message);
        self
    }

    pub fn options(&self) -> &CoroutineOptions<S> {
        &self.options
    }

    /// Build an inline engine around `body`
    pub fn inline<Y, F, Fut>(self, body: F) -> InlineCoroutine<S, Y, F, Fut>
    where
        F: FnOnce(Context<S, Y>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let coroutine = InlineCoroutine::new(body);
        match self.options.default_message {
            Some(message) => coroutine.with_default_message(message),
            None => coroutine,
        }
    }

    /// Build a recursive engine around `body`, storing it with `allocator`
    pub fn recursive<'a, Y, F, Fut, A>(
        self,
        body: F,
        allocator: &'a A,
    ) -> Result<RecursiveCoroutine<'a, S, Y, A>, AllocError>
    where
        S: 'a,
        Y: 'a,
        F: FnOnce(Context<S, Y>) -> Fut + 'a,
        Fut: Future<Output = ()> + 'a,
        A: ContinuationAllocator + ?Sized,
    {
        let coroutine = RecursiveCoroutine::new(body, allocator)?;
        Ok(match self.options.default_message {
            Some(message) => coroutine.with_default_message(message),
            None => coroutine,
        })
    }
}

impl<S> Default for CoroutineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::CountingAllocator;
    use crate::error::CoroutineError;
    use crate::generator::Generator;
    use crate::samples::range;
    use std::pin::pin;

    #[test]
    fn test_builder_without_default_message() {
        let mut gen = pin!(CoroutineBuilder::new().inline(|ctx| range(ctx, 0, 2, 1)));

        assert_eq!(gen.next(), Err(CoroutineError::NoDefaultMessage));
        assert!(!gen.is_started());
        assert_eq!(gen.send(()), Ok(Some(0)));
    }

    #[test]
    fn test_builder_recursive_carries_default_message() {
        let allocator = CountingAllocator::new();
        let mut gen = CoroutineBuilder::new()
            .default_message(())
            .recursive(|ctx| range(ctx, 5, 7, 1), &allocator)
            .unwrap();

        assert_eq!(gen.iter().collect::<Vec<_>>(), vec![5, 6]);
        drop(gen);
        assert_eq!(allocator.live_bytes(), 0);
    }
}
