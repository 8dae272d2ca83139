//! Subcommand implementations, one module per command group.

pub mod account;
pub mod files;
pub mod privileges;
pub mod stats;
