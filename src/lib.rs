//! # refrain
//!
//! Resumable generators for synchronous Rust: a body suspends at
//! [`Context::yield_`], hands a value to its consumer, and resumes with the
//! message the consumer passes to [`Generator::send`].
//!
//! Two engines drive bodies:
//! - [`InlineCoroutine`] stores the suspended body inline (pin it, no heap).
//! - [`RecursiveCoroutine`] stores it in a block from a
//!   [`ContinuationAllocator`], so a body can create and drive generators of
//!   its own kind.
//!
//! ```rust
//! use refrain_core::{CountingAllocator, Generator, RecursiveCoroutine, Tree};
//! use refrain_core::samples::inorder;
//!
//! let tree = Tree::parse("{2:[1,{4:[3,_]}]}")?;
//! let allocator = CountingAllocator::new();
//! let mut walk = RecursiveCoroutine::new(|ctx| inorder(ctx, &tree, &allocator), &allocator)?
//!     .with_default_message(());
//!
//! assert_eq!(walk.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod allocator;
pub mod builder;
pub mod cli;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod generator;
pub mod inline;
pub mod recursive;
pub mod samples;

#[cfg(test)]
mod tests;

// Re-export main types
pub use allocator::{ContinuationAllocator, CountingAllocator, Global};
pub use builder::{CoroutineBuilder, CoroutineOptions};
pub use context::{Context, Yielded};
pub use driver::CoroutineState;
pub use error::{AllocError, CoroutineError, CoroutineResult};
pub use generator::{Generator, GeneratorIter};
pub use inline::InlineCoroutine;
pub use recursive::RecursiveCoroutine;
pub use samples::Tree;
