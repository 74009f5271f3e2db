//! CLI subcommand implementations.

pub mod condense;
pub mod support;
