//! Scenario tests for the generator engines
//!
//! Organized by behavior area; unit tests live next to each module.

mod helpers;
mod misuse_tests;
