//! Sample generator bodies
//!
//! Client code built on the public API: flat bodies for the inline engine
//! and self-recursive bodies for the recursive engine. The CLI and the
//! scenario tests drive these.

pub mod range;
pub mod tree;
pub mod triangular;

pub use range::{empty, range, running_total};
pub use tree::{inorder, ParseError, Tree};
pub use triangular::{triangular, MAX_TRIANGULAR_SEED};
