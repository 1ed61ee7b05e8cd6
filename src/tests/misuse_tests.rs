//! Tests for contract violations detected by the engines

use std::pin::pin;

use crate::allocator::CountingAllocator;
use crate::context::Context;
use crate::error::CoroutineError;
use crate::generator::Generator;
use crate::inline::InlineCoroutine;
use crate::recursive::RecursiveCoroutine;
use crate::samples::range;

#[test]
fn test_yield_after_close_is_reported() {
    let allocator = CountingAllocator::new();
    let mut gen = RecursiveCoroutine::new(
        |mut ctx: Context<(), i32>| async move {
            ctx.yield_(1).await;
            ctx.close();
            ctx.yield_(2).await;
        },
        &allocator,
    )
    .unwrap();

    assert_eq!(gen.send(()), Ok(Some(1)));
    assert_eq!(gen.send(()), Err(CoroutineError::YieldAfterClose));

    // The violation ends the generator and releases the body
    assert_eq!(gen.send(()), Ok(None));
    assert!(gen.is_finished());
    drop(gen);
    assert_eq!(allocator.live_bytes(), 0);
}

#[test]
fn test_foreign_suspension_is_reported() {
    let mut gen = pin!(InlineCoroutine::new(|mut ctx: Context<(), i32>| async move {
        ctx.yield_(1).await;
        std::future::pending::<()>().await;
        ctx.yield_(2).await;
    }));

    assert_eq!(gen.send(()), Ok(Some(1)));
    assert_eq!(gen.send(()), Err(CoroutineError::ForeignSuspension));
    assert_eq!(gen.send(()), Ok(None));
}

#[test]
fn test_foreign_suspension_before_first_yield() {
    let mut gen = pin!(InlineCoroutine::new(|_ctx: Context<(), i32>| async move {
        std::future::pending::<()>().await;
    }));

    assert_eq!(gen.send(()), Err(CoroutineError::ForeignSuspension));
    assert!(gen.is_finished());
}

#[test]
fn test_next_without_default_message() {
    let mut gen = pin!(InlineCoroutine::new(|ctx| range(ctx, 0, 3, 1)));

    assert_eq!(gen.next(), Err(CoroutineError::NoDefaultMessage));

    // Nothing ran; the generator can still be driven with `send`
    assert!(!gen.is_started());
    assert_eq!(gen.send(()), Ok(Some(0)));
}

#[test]
fn test_yield_from_child_without_default_message() {
    let mut gen = pin!(InlineCoroutine::new(|mut ctx: Context<(), i64>| async move {
        let mut child = pin!(InlineCoroutine::new(|c| range(c, 0, 3, 1)));
        if let Err(err) = ctx.yield_from(&mut child).await {
            ctx.fail(err);
        }
    }));

    assert_eq!(gen.send(()), Err(CoroutineError::NoDefaultMessage));
    assert_eq!(gen.send(()), Ok(None));
}
