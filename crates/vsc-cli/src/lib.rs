//! Video stream condense CLI library.
//!
//! This crate provides the CLI interface over `vsc-core`.

mod cli;
pub mod commands;
mod config;
pub mod input;

pub use cli::{Cli, Commands};
pub use config::Config;
