//! CLI subcommand implementations.

pub mod evaluate;
pub mod init;
pub mod normalize;
