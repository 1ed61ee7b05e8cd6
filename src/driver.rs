//! Shared suspend/resume machinery
//!
//! A generator body is an `async` block. The engines drive it by polling it
//! once per `send` with a waker that never fires; the only thing allowed to
//! return `Pending` from inside the body is the [`Yielded`] future, which
//! parks its value in the [`Airlock`] on the way out.
//!
//! [`Yielded`]: crate::context::Yielded

use std::cell::Cell;
use std::future::Future;
use std::marker::PhantomPinned;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use tracing::trace;

use crate::error::CoroutineError;

/* ===================== Coroutine State ===================== */

/// Where a generator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoroutineState {
    /// Constructed; the body has not run yet.
    NotStarted,
    /// The body is parked at a `yield_`.
    Suspended,
    /// The body returned, closed, or faulted. Terminal.
    Finished,
}

/* ===================== Airlock ===================== */

/// The slots shared by one engine and the body it drives.
///
/// Lives inside the engine (inline) or inside the engine's continuation
/// block (recursive); the body's [`Context`] points at it, so it must not
/// move once a context is attached. Each slot is only touched by whichever
/// side currently holds control, so plain `Cell`s are enough.
///
/// [`Context`]: crate::context::Context
pub(crate) struct Airlock<S, Y> {
    /// Message delivered by the consumer; valid while the body runs.
    pending_send: Cell<Option<S>>,
    /// Value offered by the body; valid while it is suspended.
    pending_yield: Cell<Option<Y>>,
    /// Error raised from inside the body, reported by the current `send`.
    fault: Cell<Option<CoroutineError>>,
    /// Monotonic: never goes back to false.
    finished: Cell<bool>,
    /// Set while a `Context` points here.
    attached: Cell<bool>,
    _pinned: PhantomPinned,
}

impl<S, Y> Airlock<S, Y> {
    pub(crate) fn new() -> Self {
        Self {
            pending_send: Cell::new(None),
            pending_yield: Cell::new(None),
            fault: Cell::new(None),
            finished: Cell::new(false),
            attached: Cell::new(false),
            _pinned: PhantomPinned,
        }
    }

    pub(crate) fn attach(&self) {
        self.attached.set(true);
    }

    pub(crate) fn detach(&self) {
        self.attached.set(false);
    }

    /// Whether a `Context` still points at this airlock.
    pub(crate) fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.get()
    }

    pub(crate) fn finish(&self) {
        self.finished.set(true);
        self.pending_yield.take();
    }

    pub(crate) fn offer(&self, value: Y) {
        self.pending_yield.set(Some(value));
    }

    pub(crate) fn take_send(&self) -> Option<S> {
        self.pending_send.take()
    }

    /// Record a fault; the first one wins.
    pub(crate) fn report(&self, err: CoroutineError) {
        if let Some(first) = self.fault.take() {
            self.fault.set(Some(first));
        } else {
            self.fault.set(Some(err));
        }
    }
}

#[cfg(test)]
impl<S, Y> Airlock<S, Y> {
    pub(crate) fn pending_send_for_test(&self, message: S) {
        self.pending_send.set(Some(message));
    }
}

/* ===================== Step Result ===================== */

/// Outcome of resuming a body once.
#[derive(Debug)]
pub(crate) enum Step<Y> {
    /// The body suspended at a `yield_` with this value.
    Yielded(Y),
    /// The body ran to completion.
    Done,
    /// The body broke the generator contract or reported a failure.
    Faulted(CoroutineError),
}

/* ===================== Driver ===================== */

/// Deliver `message` and run the body until its next suspension or its end.
///
/// The caller has already checked that the generator is not finished. On
/// `Done` and `Faulted` the airlock is finished and the body must not be
/// polled again.
pub(crate) fn resume<S, Y, B>(airlock: &Airlock<S, Y>, body: Pin<&mut B>, message: S) -> Step<Y>
where
    B: Future<Output = ()> + ?Sized,
{
    airlock.pending_send.set(Some(message));

    let mut cx = TaskContext::from_waker(futures::task::noop_waker_ref());
    let poll = body.poll(&mut cx);

    // Unconsumed on the very first resume: the body had no yield to receive it.
    airlock.pending_send.take();

    if let Some(err) = airlock.fault.take() {
        trace!(error = %err, "generator body faulted");
        airlock.finish();
        return Step::Faulted(err);
    }

    match poll {
        Poll::Ready(()) => {
            trace!("generator body returned");
            airlock.finish();
            Step::Done
        }
        Poll::Pending => match airlock.pending_yield.take() {
            Some(value) => Step::Yielded(value),
            None => {
                airlock.finish();
                Step::Faulted(CoroutineError::ForeignSuspension)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future;

    #[test]
    fn test_resume_ready_body_finishes() {
        let airlock = Airlock::<(), i32>::new();
        let mut body = future::ready(());

        let step = resume(&airlock, Pin::new(&mut body), ());

        assert!(matches!(step, Step::Done));
        assert!(airlock.is_finished());
    }

    #[test]
    fn test_resume_foreign_pending_is_a_fault() {
        let airlock = Airlock::<(), i32>::new();
        let mut body = future::pending::<()>();

        let step = resume(&airlock, Pin::new(&mut body), ());

        assert!(matches!(
            step,
            Step::Faulted(CoroutineError::ForeignSuspension)
        ));
        assert!(airlock.is_finished());
    }

    #[test]
    fn test_first_reported_fault_wins() {
        let airlock = Airlock::<(), i32>::new();
        airlock.report(CoroutineError::YieldAfterClose);
        airlock.report(CoroutineError::ForeignSuspension);

        let mut body = future::ready(());
        let step = resume(&airlock, Pin::new(&mut body), ());

        assert!(matches!(step, Step::Faulted(CoroutineError::YieldAfterClose)));
    }

    #[test]
    fn test_finish_discards_pending_yield() {
        let airlock = Airlock::<(), i32>::new();
        airlock.offer(7);
        airlock.finish();

        assert_eq!(airlock.pending_yield.take(), None);
        assert!(airlock.is_finished());
    }
}
