//! Argument processing and validation for the script-desk CLI.
//!
//! This module handles the different ways parameter values can be provided:
//! - **Named arguments**: Using `-p key=value` format
//! - **Positional arguments**: Provided as trailing arguments
//! - **Interactive prompts**: When no values are provided via CLI
//!
//! The module ensures argument styles cannot be mixed and turns the raw
//! strings into values for the engine to resolve.

pub mod processing;
pub mod style;
pub mod validation;

pub use processing::process_command_line;
pub use style::determine;
pub use style::Provider;
pub use style::Style;
