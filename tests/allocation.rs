//! Heap usage of the generator engines
//!
//! Runs as its own test binary so the counting global allocator sees only
//! these tests. Counts are per thread, since the harness runs tests in
//! parallel.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::pin::pin;

use refrain_core::samples::{range, triangular};
use refrain_core::{CountingAllocator, Generator, InlineCoroutine, RecursiveCoroutine};

struct CountingGlobal;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingGlobal {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCATIONS.with(|count| count.set(count.get() + 1));
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: CountingGlobal = CountingGlobal;

fn allocations() -> usize {
    ALLOCATIONS.with(Cell::get)
}

#[test]
fn test_inline_engine_never_touches_the_heap() {
    let before = allocations();
    let mut total = 0;
    {
        let mut gen = pin!(InlineCoroutine::new(|ctx| range(ctx, 0, 5, 1)).with_default_message(()));
        while let Ok(Some(value)) = gen.next() {
            total += value;
        }
    }

    assert_eq!(allocations() - before, 0);
    assert_eq!(total, 10);
}

#[test]
fn test_recursive_engine_allocates_only_through_its_allocator() {
    let allocator = CountingAllocator::new();
    let before = allocations();
    let mut total = 0;
    {
        let mut gen = RecursiveCoroutine::new(|ctx| triangular(ctx, 8, &allocator), &allocator)
            .unwrap()
            .with_default_message(());
        while let Ok(Some(value)) = gen.next() {
            total += value;
        }
        gen.dispose();
    }

    // `CountingAllocator` forwards every block to the global allocator.
    assert_eq!(allocations() - before, allocator.total_blocks());
    assert_eq!(allocator.total_blocks(), 9);
    assert_eq!(allocator.live_bytes(), 0);
    assert_eq!(total, 36);
}
