//! Subcommand implementations.

pub mod get;
pub mod keys;
pub mod ping;
pub mod push;
pub mod put;
