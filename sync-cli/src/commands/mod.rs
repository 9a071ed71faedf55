//! CLI command implementations.

pub mod add;
pub mod init;
pub mod list;
pub mod remove;
pub mod status;
pub mod update;
