//! CLI subcommand implementations.

pub mod costs;
mod format;
pub mod import;
pub mod policy;
pub mod sessions;
pub mod status;
pub mod summary;
