//! Self-referential generator engine
//!
//! A body that builds a generator of its own kind would need a type that
//! contains itself if the engine stored the body inline. This engine keeps
//! the body future, together with the airlock it shares with the body, in
//! one block from a [`ContinuationAllocator`] and only holds type-erased
//! pointers into it, so `RecursiveCoroutine` names neither the body nor its
//! future and can appear inside that future.
//!
//! Storage is acquired by [`RecursiveCoroutine::new`] and released exactly
//! once by [`RecursiveCoroutine::dispose`] or by `Drop`, whether or not the
//! body ever ran or finished. Nothing else is allocated.

use std::alloc::Layout;
use std::future::Future;
use std::pin::Pin;
use std::ptr::{self, NonNull};

use tracing::{trace, warn};

use crate::allocator::{ContinuationAllocator, Global};
use crate::context::Context;
use crate::driver::{self, Airlock, CoroutineState, Step};
use crate::error::{AllocError, CoroutineResult};
use crate::generator::Generator;

type ErasedBody<'a> = dyn Future<Output = ()> + 'a;

/// Layout of a continuation block.
struct Frame<S, Y, B> {
    airlock: Airlock<S, Y>,
    body: B,
}

/// Generator engine holding its body future in allocator-owned storage.
///
/// Abandoning a suspended body (disposing before it finished) drops the
/// body's locals in place, which disposes any children it owns, but never
/// resumes it: code after the suspension point does not run.
pub struct RecursiveCoroutine<'a, S, Y, A: ContinuationAllocator + ?Sized = Global> {
    default_message: Option<S>,
    started: bool,
    /// Start of the block, as handed out by the allocator.
    block: NonNull<u8>,
    layout: Layout,
    /// Initialized for the lifetime of the block.
    airlock: NonNull<Airlock<S, Y>>,
    /// Points at an initialized, pinned body while `live`.
    body: NonNull<ErasedBody<'a>>,
    live: bool,
    allocator: &'a A,
}

impl<'a, S: 'a, Y: 'a, A> RecursiveCoroutine<'a, S, Y, A>
where
    A: ContinuationAllocator + ?Sized,
{
    /// Place `body` in a block from `allocator`; it does not run until the
    /// first `send`.
    ///
    /// On allocation failure `body` is dropped and nothing stays allocated.
    pub fn new<F, Fut>(body: F, allocator: &'a A) -> Result<Self, AllocError>
    where
        F: FnOnce(Context<S, Y>) -> Fut + 'a,
        Fut: Future<Output = ()> + 'a,
    {
        let launch = move |context: Context<S, Y>| async move { body(context).await };
        let (block, layout, airlock, body) = place(launch, allocator)?;

        trace!(size = layout.size(), "allocated recursive generator");

        Ok(Self {
            default_message: None,
            started: false,
            block,
            layout,
            airlock,
            body,
            live: true,
            allocator,
        })
    }

    /// Set the message [`Generator::next`] sends.
    pub fn with_default_message(mut self, message: S) -> Self {
        self.default_message = Some(message);
        self
    }
}

impl<S, Y, A> RecursiveCoroutine<'_, S, Y, A>
where
    A: ContinuationAllocator + ?Sized,
{
    /// Release the continuation storage.
    pub fn dispose(self) {
        drop(self);
    }

    /// Size of the heap block holding the body.
    pub fn storage_size(&self) -> usize {
        self.layout.size()
    }

    pub fn state(&self) -> CoroutineState {
        if self.airlock().is_finished() {
            CoroutineState::Finished
        } else if self.started {
            CoroutineState::Suspended
        } else {
            CoroutineState::NotStarted
        }
    }

    fn airlock(&self) -> &Airlock<S, Y> {
        // SAFETY: initialized by `place` and only torn down in `drop`.
        unsafe { self.airlock.as_ref() }
    }

    fn drop_body(&mut self) {
        if self.live {
            self.live = false;
            // SAFETY: `live` guarantees the body is initialized; it is never
            // touched again.
            unsafe { ptr::drop_in_place(self.body.as_ptr()) };
        }
    }
}

impl<'a, S: 'a, Y: 'a, A> Generator<S, Y> for RecursiveCoroutine<'a, S, Y, A>
where
    A: ContinuationAllocator + ?Sized,
{
    fn send(&mut self, message: S) -> CoroutineResult<Option<Y>> {
        if self.airlock().is_finished() || !self.live {
            return Ok(None);
        }

        if !self.started {
            self.started = true;
            trace!("starting recursive generator");
        }

        // SAFETY: the body is initialized while `live` and never moves
        // until it is dropped in place.
        let body = unsafe { Pin::new_unchecked(&mut *self.body.as_ptr()) };
        // SAFETY: see `airlock()`; taken through the raw pointer so it does
        // not borrow `self`.
        let airlock = unsafe { self.airlock.as_ref() };

        match driver::resume(airlock, body, message) {
            Step::Yielded(value) => Ok(Some(value)),
            Step::Done => {
                self.drop_body();
                Ok(None)
            }
            Step::Faulted(err) => {
                self.drop_body();
                Err(err)
            }
        }
    }

    fn default_message(&self) -> Option<&S> {
        self.default_message.as_ref()
    }

    fn state(&self) -> CoroutineState {
        RecursiveCoroutine::state(self)
    }
}

impl<S, Y, A> Drop for RecursiveCoroutine<'_, S, Y, A>
where
    A: ContinuationAllocator + ?Sized,
{
    fn drop(&mut self) {
        self.drop_body();

        if self.airlock().is_attached() {
            // A context escaped the body and still points into the block.
            warn!(
                size = self.layout.size(),
                "generator context outlived its body, leaking continuation storage"
            );
            return;
        }

        // SAFETY: no context is left, the body is gone, and the block was
        // allocated by `place` with this allocator and layout.
        unsafe {
            ptr::drop_in_place(self.airlock.as_ptr());
            self.allocator.deallocate(self.block, self.layout);
        }
        trace!(size = self.layout.size(), "released recursive generator");
    }
}

impl<S, Y, A> std::fmt::Debug for RecursiveCoroutine<'_, S, Y, A>
where
    A: ContinuationAllocator + ?Sized,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecursiveCoroutine")
            .field("state", &self.state())
            .field("storage_size", &self.layout.size())
            .finish()
    }
}

type Placed<'a, S, Y> = (NonNull<u8>, Layout, NonNull<Airlock<S, Y>>, NonNull<ErasedBody<'a>>);

/// Allocate a frame, attach a context to its airlock and move the body
/// `launch` builds from that context in next to it.
fn place<'a, S, Y, L, B, A>(launch: L, allocator: &A) -> Result<Placed<'a, S, Y>, AllocError>
where
    L: FnOnce(Context<S, Y>) -> B,
    B: Future<Output = ()> + 'a,
    A: ContinuationAllocator + ?Sized,
{
    // Never zero-sized: the airlock has state of its own.
    let layout = Layout::new::<Frame<S, Y, B>>();
    let block = allocator.allocate(layout)?;
    let frame = block.cast::<Frame<S, Y, B>>().as_ptr();

    // SAFETY: the block is sized and aligned for `Frame<S, Y, B>` and
    // uninitialized; each field is written exactly once before use, and the
    // airlock is not moved again until the block is released.
    unsafe {
        let airlock = ptr::addr_of_mut!((*frame).airlock);
        airlock.write(Airlock::new());
        let airlock = NonNull::new_unchecked(airlock);

        let body = ptr::addr_of_mut!((*frame).body);
        body.write(launch(Context::new(airlock)));
        let body: NonNull<ErasedBody<'a>> = NonNull::new_unchecked(body);

        Ok((block, layout, airlock, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::CountingAllocator;
    use std::cell::RefCell;

    #[test]
    fn test_new_allocates_one_block() {
        let allocator = CountingAllocator::new();
        let gen = RecursiveCoroutine::new(
            |mut ctx: Context<(), u8>| async move {
                ctx.yield_(1).await;
            },
            &allocator,
        )
        .unwrap();

        assert_eq!(allocator.live_blocks(), 1);
        assert_eq!(allocator.live_bytes(), gen.storage_size());
        assert_eq!(gen.state(), CoroutineState::NotStarted);

        gen.dispose();
        assert_eq!(allocator.live_bytes(), 0);
    }

    #[test]
    fn test_allocation_failure_leaves_nothing_behind() {
        let allocator = CountingAllocator::with_limit(0);
        let dropped = std::cell::Cell::new(false);

        struct Flag<'f>(&'f std::cell::Cell<bool>);
        impl Drop for Flag<'_> {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let flag = Flag(&dropped);
        let result = RecursiveCoroutine::new(
            move |mut ctx: Context<(), u8>| async move {
                let _flag = flag;
                ctx.yield_(1).await;
            },
            &allocator,
        );

        assert!(matches!(result, Err(AllocError { .. })));
        assert!(dropped.get());
        assert_eq!(allocator.live_blocks(), 0);
        assert_eq!(allocator.total_blocks(), 0);
    }

    #[test]
    fn test_escaped_context_leaks_storage() {
        let allocator = CountingAllocator::new();
        let slot: RefCell<Option<Context<(), u8>>> = RefCell::new(None);

        let mut gen = RecursiveCoroutine::new(
            |ctx: Context<(), u8>| {
                slot.borrow_mut().replace(ctx);
                async {}
            },
            &allocator,
        )
        .unwrap();

        assert_eq!(gen.send(()), Ok(None));
        gen.dispose();

        // The block outlives the engine for as long as the context does.
        assert_eq!(allocator.live_blocks(), 1);
        let escaped = slot.borrow_mut().take().unwrap();
        assert!(escaped.is_closed());
    }

    #[test]
    fn test_completion_drops_body_before_dispose() {
        let allocator = CountingAllocator::new();
        let mut gen = RecursiveCoroutine::new(
            |mut ctx: Context<(), u8>| async move {
                ctx.yield_(1).await;
            },
            &allocator,
        )
        .unwrap();

        assert_eq!(gen.send(()), Ok(Some(1)));
        assert_eq!(gen.send(()), Ok(None));
        assert!(!gen.live);
        assert_eq!(allocator.live_blocks(), 1);

        drop(gen);
        assert_eq!(allocator.live_blocks(), 0);
    }
}
