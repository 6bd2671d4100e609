//! CLI subcommand implementations

pub mod delete;
pub mod index;
pub mod search;
pub mod serve;
