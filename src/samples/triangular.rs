//! Self-recursive counting body

use crate::allocator::ContinuationAllocator;
use crate::context::Context;
use crate::recursive::RecursiveCoroutine;

/// Deepest chain the CLI will build.
///
/// Every level is resumed from inside its parent's poll, so the chain uses
/// native stack in proportion to `n`; well past this depth a debug build
/// overflows the main thread's stack.
pub const MAX_TRIANGULAR_SEED: u64 = 1000;

/// Yield `1, 2, ..., n` by recursion: each level runs a child generator for
/// `n - 1`, re-yields everything it produces, then yields `n`.
///
/// `n` levels of generators are live at the deepest point, so the values sum
/// to the `n`-th triangular number and exactly `n` values are produced.
/// A child that cannot be allocated fails the whole chain.
pub async fn triangular<A>(mut ctx: Context<(), u64>, n: u64, allocator: &A)
where
    A: ContinuationAllocator + ?Sized,
{
    if n == 0 {
        return;
    }

    let mut child = match RecursiveCoroutine::new(move |c| triangular(c, n - 1, allocator), allocator) {
        Ok(child) => child.with_default_message(()),
        Err(err) => return ctx.fail(err),
    };

    if let Err(err) = ctx.yield_from(&mut child).await {
        return ctx.fail(err);
    }
    child.dispose();

    ctx.yield_(n).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::CountingAllocator;
    use crate::error::CoroutineError;
    use crate::generator::Generator;

    #[test]
    fn test_small_seed() {
        let allocator = CountingAllocator::new();
        let mut gen = RecursiveCoroutine::new(|ctx| triangular(ctx, 4, &allocator), &allocator)
            .unwrap()
            .with_default_message(());

        assert_eq!(gen.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_child_allocation_failure_propagates() {
        let sizing = CountingAllocator::new();
        let one_level = RecursiveCoroutine::new(|ctx| triangular(ctx, 10, &sizing), &sizing)
            .unwrap()
            .storage_size();

        // Room for the root and one child only.
        let allocator = CountingAllocator::with_limit(one_level * 2);
        let mut gen = RecursiveCoroutine::new(|ctx| triangular(ctx, 10, &allocator), &allocator)
            .unwrap()
            .with_default_message(());

        assert!(matches!(gen.next(), Err(CoroutineError::Alloc(_))));
        assert_eq!(gen.next(), Ok(None));

        drop(gen);
        assert_eq!(allocator.live_bytes(), 0);
    }
}
