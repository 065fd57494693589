//! CLI command handlers
//!
//! Each subcommand is implemented in its own module.

pub mod edit;
pub mod serve;
