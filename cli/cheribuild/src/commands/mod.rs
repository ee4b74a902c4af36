//! CLI command implementations.

pub mod build;
pub mod clean;
pub mod describe;
pub mod doctor;
pub mod init;
pub mod list;
