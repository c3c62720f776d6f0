//! Subcommand implementations for the wsterm binary.

pub mod shell;
pub mod stream;
