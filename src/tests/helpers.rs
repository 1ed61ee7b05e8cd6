//! Test helpers shared by the scenario tests

use std::cell::Cell;

use crate::generator::Generator;

/// Advance `gen` with its default message until exhausted, failing the test
/// on any error.
pub fn drain<S: Clone, Y, G: Generator<S, Y>>(gen: &mut G) -> Vec<Y> {
    let mut values = Vec::new();
    while let Some(value) = gen.next().expect("generator failed while draining") {
        values.push(value);
    }
    values
}

/// Increments a shared counter when dropped.
///
/// Held across a yield to observe whether a suspended body's locals are
/// destroyed.
pub struct DropCounter<'c>(pub &'c Cell<usize>);

impl Drop for DropCounter<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}
