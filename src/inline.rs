//! Inline generator engine
//!
//! Stores the suspended body directly inside the engine value: no heap
//! allocation and no release step, at the cost of the engine's type naming
//! the body's future. A body therefore cannot hold an `InlineCoroutine` of
//! its own kind; use [`RecursiveCoroutine`](crate::RecursiveCoroutine) for
//! that.
//!
//! The engine has to be pinned before it is driven:
//!
//! ```rust
//! use std::pin::pin;
//! use refrain_core::{Generator, InlineCoroutine};
//! use refrain_core::samples::range;
//!
//! let mut numbers = pin!(InlineCoroutine::new(|ctx| range(ctx, 0, 3, 1)).with_default_message(()));
//! assert_eq!(numbers.iter().collect::<Vec<_>>(), vec![0, 1, 2]);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::ptr::NonNull;

use pin_project_lite::pin_project;
use tracing::{error, trace};

use crate::context::Context;
use crate::driver::{self, Airlock, CoroutineState, Step};
use crate::error::CoroutineResult;
use crate::generator::Generator;

pin_project! {
    /// Generator engine holding its body future and the state it shares
    /// with the body inline.
    ///
    /// The body's context points at the `airlock` field, so the engine is
    /// `!Unpin`.
    pub struct InlineCoroutine<S, Y, F, Fut> {
        // Declared first: the frame holds the context and goes before the airlock.
        #[pin]
        frame: Option<Fut>,
        body: Option<F>,
        default_message: Option<S>,
        started: bool,
        #[pin]
        airlock: Airlock<S, Y>,
    }

    impl<S, Y, F, Fut> PinnedDrop for InlineCoroutine<S, Y, F, Fut> {
        fn drop(this: Pin<&mut Self>) {
            let mut this = this.project();
            this.frame.set(None);

            if this.airlock.as_ref().get_ref().is_attached() {
                // The airlock is about to be freed with a context still
                // pointing at it; nothing safe is left to do.
                error!("generator context escaped its inline engine");
                std::process::abort();
            }
        }
    }
}

impl<S, Y, F, Fut> InlineCoroutine<S, Y, F, Fut>
where
    F: FnOnce(Context<S, Y>) -> Fut,
    Fut: Future<Output = ()>,
{
    /// Wrap `body`; it does not run until the first `send`.
    pub fn new(body: F) -> Self {
        Self {
            frame: None,
            body: Some(body),
            default_message: None,
            started: false,
            airlock: Airlock::new(),
        }
    }

    /// Set the message [`Generator::next`] sends.
    pub fn with_default_message(mut self, message: S) -> Self {
        self.default_message = Some(message);
        self
    }

    /// Deliver `message` and run the body to its next yield.
    ///
    /// See [`Generator::send`]; this is the pinned form it forwards to.
    pub fn resume(self: Pin<&mut Self>, message: S) -> CoroutineResult<Option<Y>> {
        let mut this = self.project();
        let airlock: &Airlock<S, Y> = this.airlock.into_ref().get_ref();

        if airlock.is_finished() {
            return Ok(None);
        }

        if !*this.started {
            *this.started = true;
            if let Some(body) = this.body.take() {
                trace!("starting inline generator");
                // SAFETY: the engine is pinned, so the airlock stays in place
                // until drop, and drop outlives the context or aborts.
                let context = unsafe { Context::new(NonNull::from(airlock)) };
                this.frame.set(Some(body(context)));
            }
        }

        let step = match this.frame.as_mut().as_pin_mut() {
            Some(future) => driver::resume(airlock, future, message),
            None => {
                airlock.finish();
                return Ok(None);
            }
        };

        match step {
            Step::Yielded(value) => Ok(Some(value)),
            Step::Done => {
                this.frame.set(None);
                Ok(None)
            }
            Step::Faulted(err) => {
                this.frame.set(None);
                Err(err)
            }
        }
    }

    pub fn state(&self) -> CoroutineState {
        if self.airlock.is_finished() {
            CoroutineState::Finished
        } else if self.started {
            CoroutineState::Suspended
        } else {
            CoroutineState::NotStarted
        }
    }
}

impl<S, Y, F, Fut> Generator<S, Y> for Pin<&mut InlineCoroutine<S, Y, F, Fut>>
where
    F: FnOnce(Context<S, Y>) -> Fut,
    Fut: Future<Output = ()>,
{
    fn send(&mut self, message: S) -> CoroutineResult<Option<Y>> {
        self.as_mut().resume(message)
    }

    fn default_message(&self) -> Option<&S> {
        self.default_message.as_ref()
    }

    fn state(&self) -> CoroutineState {
        InlineCoroutine::state(self)
    }
}

impl<S, Y, F, Fut> Generator<S, Y> for Pin<Box<InlineCoroutine<S, Y, F, Fut>>>
where
    F: FnOnce(Context<S, Y>) -> Fut,
    Fut: Future<Output = ()>,
{
    fn send(&mut self, message: S) -> CoroutineResult<Option<Y>> {
        self.as_mut().resume(message)
    }

    fn default_message(&self) -> Option<&S> {
        self.default_message.as_ref()
    }

    fn state(&self) -> CoroutineState {
        InlineCoroutine::state(self)
    }
}
