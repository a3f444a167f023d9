//! CLI command implementations for herakles-traffic.
//!
//! - `check`: System validation
//! - `config`: Configuration file generation

pub mod check;
pub mod config;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
