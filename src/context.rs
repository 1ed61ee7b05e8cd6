//! Body-facing generator handle
//!
//! Every generator body receives a [`Context`]. Awaiting
//! [`Context::yield_`] hands a value to the consumer and suspends the body
//! until the consumer's next `send`, whose message becomes the result of the
//! `await`.

use std::future::Future;
use std::pin::Pin;
use std::ptr::NonNull;
use std::task::{Context as TaskContext, Poll};

use crate::driver::Airlock;
use crate::error::{CoroutineError, CoroutineResult};
use crate::generator::Generator;

/// Suspension handle passed to a generator body.
///
/// `S` is the message type the consumer sends in, `Y` the type the body
/// yields out. Dropping the context closes the generator, so every exit
/// path of the body (return, early return, unwinding) closes it.
///
/// The context points into its engine's storage. It is meant to stay
/// inside the body; one that outlives its engine makes a recursive engine
/// leak its storage and an inline engine abort the process.
pub struct Context<S, Y> {
    airlock: NonNull<Airlock<S, Y>>,
}

impl<S, Y> Context<S, Y> {
    /// Attach a context to `airlock`.
    ///
    /// # Safety
    /// `airlock` must stay valid and in place until the context is dropped,
    /// or for as long as [`Airlock::is_attached`] reports it.
    pub(crate) unsafe fn new(airlock: NonNull<Airlock<S, Y>>) -> Self {
        airlock.as_ref().attach();
        Self { airlock }
    }

    fn airlock(&self) -> &Airlock<S, Y> {
        // SAFETY: guaranteed by the contract of `new`.
        unsafe { self.airlock.as_ref() }
    }

    /// Offer `value` to the consumer and suspend until resumed.
    ///
    /// Resolves to the message passed to the `send` that resumed the body.
    /// Awaiting this after [`close`](Self::close) is reported to the
    /// consumer as [`CoroutineError::YieldAfterClose`] and ends the generator.
    pub fn yield_(&mut self, value: Y) -> Yielded<'_, S, Y> {
        Yielded {
            context: self,
            value: Some(value),
        }
    }

    /// Mark the generator finished. Idempotent.
    pub fn close(&mut self) {
        self.airlock().finish();
    }

    pub fn is_closed(&self) -> bool {
        self.airlock().is_finished()
    }

    /// Close the generator and make the current `send` return `err`.
    pub fn fail(&mut self, err: impl Into<CoroutineError>) {
        self.airlock().report(err.into());
        self.close();
    }

    /// Drive `child` to exhaustion, re-yielding each of its values.
    ///
    /// Messages sent to this generator are forwarded to the child. The first
    /// `send` to the child uses the child's default message: it starts a
    /// fresh child (which discards it), and it resumes a child that was
    /// already driven part way. A finished child returns `Ok(())` at once.
    pub async fn yield_from<G>(&mut self, child: &mut G) -> CoroutineResult<()>
    where
        G: Generator<S, Y> + ?Sized,
        S: Clone,
    {
        if child.is_finished() {
            return Ok(());
        }

        let mut message = child
            .default_message()
            .cloned()
            .ok_or(CoroutineError::NoDefaultMessage)?;

        while let Some(value) = child.send(message)? {
            message = self.yield_(value).await;
        }

        Ok(())
    }
}

impl<S, Y> Drop for Context<S, Y> {
    fn drop(&mut self) {
        let airlock = self.airlock();
        airlock.finish();
        airlock.detach();
    }
}

impl<S, Y> std::fmt::Debug for Context<S, Y> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/* ===================== Yield Future ===================== */

/// Future returned by [`Context::yield_`].
///
/// The first poll parks the value and suspends; the poll that follows a
/// `send` resolves to that send's message.
#[must_use = "a value is only offered to the consumer when the yield is awaited"]
pub struct Yielded<'c, S, Y> {
    context: &'c mut Context<S, Y>,
    value: Option<Y>,
}

// Nothing inside is ever pinned in place.
impl<S, Y> Unpin for Yielded<'_, S, Y> {}

impl<S, Y> Future for Yielded<'_, S, Y> {
    type Output = S;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<S> {
        let this = &mut *self;
        let airlock = this.context.airlock();

        match this.value.take() {
            Some(value) => {
                if airlock.is_finished() {
                    drop(value);
                    airlock.report(CoroutineError::YieldAfterClose);
                } else {
                    airlock.offer(value);
                }
                Poll::Pending
            }
            None => match airlock.take_send() {
                Some(message) => Poll::Ready(message),
                None => Poll::Pending,
            },
        }
    }
}
