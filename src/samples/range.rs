//! Flat sample bodies

use crate::context::Context;

/// Yield `start, start + step, ...` up to but excluding `end`.
///
/// A zero `step` yields nothing. The walk stops early rather than step
/// past the ends of `i64`.
pub async fn range(mut ctx: Context<(), i64>, start: i64, end: i64, step: i64) {
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        ctx.yield_(current).await;
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
}

/// Yield the sum of every message received so far, forever.
///
/// The first value is `0`; the message that starts the body is discarded
/// like any other first message.
pub async fn running_total(mut ctx: Context<i64, i64>) {
    let mut total = 0i64;
    loop {
        let message = ctx.yield_(total).await;
        total += message;
    }
}

/// A body that finishes without yielding.
pub async fn empty<S, Y>(mut ctx: Context<S, Y>) {
    ctx.close();
}
