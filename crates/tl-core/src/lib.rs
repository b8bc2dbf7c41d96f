//! tl-core: Core types and configuration for ttylog
//!
//! This crate provides the configuration structures, error types and
//! domain types shared by the streaming core, the storage consumers and
//! the CLI.

pub mod config;
pub mod error;
pub mod time;
pub mod types;

pub use error::ConfigError;
pub use types::{ConnectionState, LogLine};
