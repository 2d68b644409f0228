//! Fleet ledger CLI library.
//!
//! This crate provides the CLI interface for the fleet ledger.

mod cli;
pub mod commands;
mod config;
mod source;

pub use cli::{Cli, Commands, PolicyArgs, SessionFilter};
pub use config::Config;
