//! Command line interface and report rendering.
pub mod cli;
