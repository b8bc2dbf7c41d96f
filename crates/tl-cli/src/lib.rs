//! ttylog CLI
//!
//! Command implementations and terminal output helpers for the `ttylog`
//! binary.

pub mod commands;
pub mod output;
