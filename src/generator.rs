//! Consumer-facing generator interface

use std::marker::PhantomData;

use tracing::warn;

use crate::driver::CoroutineState;
use crate::error::{CoroutineError, CoroutineResult};

/// A resumable body driven by the consumer.
///
/// Implemented by [`RecursiveCoroutine`](crate::RecursiveCoroutine) and by
/// pinned [`InlineCoroutine`](crate::InlineCoroutine)s.
pub trait Generator<S, Y> {
    /// Deliver `message` and run the body to its next yield.
    ///
    /// Returns `Ok(Some(value))` for a yielded value and `Ok(None)` once the
    /// body has finished, on this call and every later one. The message
    /// passed to the call that starts the body is discarded.
    fn send(&mut self, message: S) -> CoroutineResult<Option<Y>>;

    /// The message [`next`](Self::next) sends, if one was configured.
    fn default_message(&self) -> Option<&S>;

    fn state(&self) -> CoroutineState;

    /// Advance with the default message.
    fn next(&mut self) -> CoroutineResult<Option<Y>>
    where
        S: Clone,
    {
        if self.is_finished() {
            return Ok(None);
        }
        let message = self
            .default_message()
            .cloned()
            .ok_or(CoroutineError::NoDefaultMessage)?;
        self.send(message)
    }

    fn is_started(&self) -> bool {
        self.state() != CoroutineState::NotStarted
    }

    fn is_finished(&self) -> bool {
        self.state() == CoroutineState::Finished
    }

    /// Iterate over the remaining values using the default message.
    fn iter(&mut self) -> GeneratorIter<'_, S, Y, Self>
    where
        Self: Sized,
        S: Clone,
    {
        GeneratorIter::new(self)
    }
}

/* ===================== Iterator Adapter ===================== */

/// `Iterator` over a generator, advancing it with its default message.
///
/// Iteration stops at exhaustion or at the first error; the error is kept
/// and can be read back with [`error`](Self::error).
pub struct GeneratorIter<'g, S, Y, G: ?Sized> {
    generator: &'g mut G,
    error: Option<CoroutineError>,
    _marker: PhantomData<fn(S) -> Y>,
}

impl<'g, S, Y, G> GeneratorIter<'g, S, Y, G>
where
    G: Generator<S, Y> + ?Sized,
{
    pub fn new(generator: &'g mut G) -> Self {
        Self {
            generator,
            error: None,
            _marker: PhantomData,
        }
    }

    /// The error that ended iteration, if any.
    pub fn error(&self) -> Option<&CoroutineError> {
        self.error.as_ref()
    }
}

impl<S, Y, G> Iterator for GeneratorIter<'_, S, Y, G>
where
    G: Generator<S, Y> + ?Sized,
    S: Clone,
{
    type Item = Y;

    fn next(&mut self) -> Option<Y> {
        if self.error.is_some() {
            return None;
        }
        match Generator::next(&mut *self.generator) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "generator iteration stopped");
                self.error = Some(err);
                None
            }
        }
    }
}
