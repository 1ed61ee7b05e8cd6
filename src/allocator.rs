//! Allocators for recursive continuation storage
//!
//! A [`RecursiveCoroutine`](crate::RecursiveCoroutine) keeps its suspended
//! body in one block obtained from a caller-supplied allocator, so the
//! allocator decides where continuation storage lives and whether an
//! allocation may fail.

use std::alloc::{alloc, dealloc, Layout};
use std::cell::Cell;
use std::ptr::NonNull;

use tracing::debug;

use crate::error::AllocError;

/// Source of heap blocks for continuation storage.
///
/// # Safety
/// A block returned by `allocate` must be valid for reads and writes of
/// `layout.size()` bytes, aligned to `layout.align()`, and must stay valid
/// until it is passed back to `deallocate` with the same layout.
pub unsafe trait ContinuationAllocator {
    /// Allocate a block for `layout`. `layout` never has zero size.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Release a block.
    ///
    /// # Safety
    /// `ptr` must come from `allocate` on this allocator with the same
    /// `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/* ===================== Global ===================== */

/// The process-wide allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Global;

unsafe impl ContinuationAllocator for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError::for_layout(layout));
        }
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| AllocError::for_layout(layout))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        dealloc(ptr.as_ptr(), layout);
    }
}

/* ===================== Counting ===================== */

/// Global allocator with bookkeeping and an optional byte budget.
///
/// Allocations that would push live bytes past the budget fail with
/// [`AllocError`]. Single-threaded, like the generators it serves.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    limit: Option<usize>,
    live_bytes: Cell<usize>,
    live_blocks: Cell<usize>,
    peak_bytes: Cell<usize>,
    total_blocks: Cell<usize>,
}

impl CountingAllocator {
    /// An allocator without a budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// An allocator that refuses to hold more than `limit` live bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.get()
    }

    pub fn live_blocks(&self) -> usize {
        self.live_blocks.get()
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.get()
    }

    /// Blocks handed out over the allocator's lifetime.
    pub fn total_blocks(&self) -> usize {
        self.total_blocks.get()
    }
}

unsafe impl ContinuationAllocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let live = self
            .live_bytes
            .get()
            .checked_add(layout.size())
            .ok_or_else(|| AllocError::for_layout(layout))?;

        if let Some(limit) = self.limit {
            if live > limit {
                debug!(
                    requested = layout.size(),
                    live = self.live_bytes.get(),
                    limit,
                    "continuation budget exhausted"
                );
                return Err(AllocError::for_layout(layout));
            }
        }

        let ptr = Global.allocate(layout)?;

        self.live_bytes.set(live);
        self.live_blocks.set(self.live_blocks.get() + 1);
        self.total_blocks.set(self.total_blocks.get() + 1);
        self.peak_bytes.set(self.peak_bytes.get().max(live));

        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        Global.deallocate(ptr, layout);

        self.live_bytes.set(self.live_bytes.get() - layout.size());
        self.live_blocks.set(self.live_blocks.get() - 1);
    }
}
