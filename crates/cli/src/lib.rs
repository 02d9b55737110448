//! Script Desk CLI Library
//!
//! This crate provides the terminal front end for script-desk. It picks a
//! script, gathers its parameter values from the command line, a saved preset
//! or an interactive form, and then runs it on the core engine while relaying
//! the script's output and questions.
//!
//! # Key Features
//!
//! - **Script Selection**: Numbered, colored list with index, ID and fuzzy lookup
//! - **Parameter Input**: Named or positional values, presets, or prompted forms
//! - **Presets**: Save, list, rename and delete named parameter sets
//! - **Interactive Sessions**: Answer a script's questions, or `:cancel` it
//!
//! # Architecture
//!
//! - [`cli_args`]: Command-line argument parsing
//! - [`arguments`]: Named and positional parameter values
//! - [`selection`]: Choosing a script
//! - [`prompting`]: Forms, confirmations and script questions
//! - [`session`]: Relaying a running session to the terminal
//! - [`app`]: The run flow tying it together
//!
//! # Examples
//!
//! ```bash
//! # Interactive mode - lists scripts and prompts for one
//! desk
//!
//! # Run a script by ID with named parameters
//! desk concat -p input=book.xlsx -p sheet=2
//!
//! # With positional values
//! desk concat book.xlsx 2
//!
//! # Run with a saved preset, skipping confirmation
//! desk concat --preset monthly -f
//!
//! # List presets, most used first
//! desk concat --list-presets --sort popular
//! ```

pub mod app;
pub mod arguments;
pub mod builtins;
pub mod cli_args;
pub mod colors;
pub mod prompting;
pub mod selection;
pub mod session;
