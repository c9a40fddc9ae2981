//! Common test utilities and helpers
//!
//! Shared helpers that build real git repositories and workspaces in
//! temporary directories.
#![allow(dead_code)]

#[macro_use]
pub mod assertion_helpers;
pub mod test_helpers;

pub use test_helpers::*;
