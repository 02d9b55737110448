//! Command-line argument parsing and validation.
//!
//! This module defines the command-line interface structure and provides
//! validation for CLI arguments using the `clap` crate.

use crate::arguments::{determine, Provider, Style};
use clap::Parser;
use script_desk_core::error::Result;
use script_desk_core::presets::PresetOrder;

/// Command-line arguments for the script-desk CLI tool.
///
/// This structure defines all available command-line options and arguments
/// that can be passed to the `desk` binary. It supports interactive script
/// selection, direct execution, and preset management.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use script_desk_cli::cli_args::Args;
///
/// let args = Args::parse_from(["desk", "greet", "-p", "who=alice"]);
/// assert_eq!(args.script_id_or_index.as_deref(), Some("greet"));
/// ```
#[derive(Parser, Debug)] // requires `derive` feature
#[command(term_width = 0)] // Just to make testing across clap features easier
#[allow(clippy::struct_excessive_bools)] // silence clippy's warning on this struct
pub struct Args {
    /// Path to the script descriptor file YAML.
    ///
    /// If not provided, defaults to `~/.script-desk/scripts.yml`.
    #[arg(long, short = 'c')]
    pub scripts_path: Option<String>,

    /// Path to the file that stores saved parameter presets.
    ///
    /// If not provided, defaults to `~/.script-desk/presets.yml`.
    #[arg(long)]
    pub presets_path: Option<String>,

    /// Path to the file that remembers confirmed folders.
    ///
    /// If not provided, defaults to `~/.script-desk/path_history.yml`.
    #[arg(long)]
    pub history_path: Option<String>,

    /// Perform a dry run, which resolves and prints the parameter values but
    /// does not run the script.
    #[arg(long, short = 'd', action)]
    pub dry_run: bool,

    /// Run the script without first confirming if it should be run.
    #[arg(long, short = 'f', action)]
    pub force: bool,

    /// Run with the values of a saved preset instead of prompting.
    #[arg(long, conflicts_with_all = ["parameters", "positional_arguments"])]
    pub preset: Option<String>,

    /// Save the values used for this run as a preset with the given name.
    #[arg(long)]
    pub save_preset: Option<String>,

    /// List the saved presets of the script and exit.
    #[arg(long, action)]
    pub list_presets: bool,

    /// Order of `--list-presets`: `recent` or `popular`.
    #[arg(long, default_value = "recent", value_parser = parse_order)]
    pub sort: PresetOrder,

    /// Rename a preset of the script and exit.
    #[arg(long, num_args = 2, value_names = ["OLD", "NEW"])]
    pub rename_preset: Option<Vec<String>>,

    /// Delete a preset of the script and exit.
    #[arg(long)]
    pub delete_preset: Option<String>,

    /// The script ID or index to run directly.
    ///
    /// If not provided, interactive mode is used. Can be either:
    /// - A script ID, or a fuzzy match of one
    /// - A numeric index (0-based position in the script list)
    #[arg(num_args(1))]
    pub script_id_or_index: Option<String>,

    /// Named parameters for the script in the format key=value.
    ///
    /// Multiple parameters can be provided with repeated `-p` flags.
    /// Cannot be mixed with positional arguments.
    ///
    /// # Examples
    /// ```bash
    /// desk concat -p input=book.xlsx -p sheet=2
    /// ```
    #[arg(long = "param", short = 'p', action = clap::ArgAction::Append)]
    pub parameters: Vec<String>,

    /// Positional values, matched to the script's parameters in order.
    ///
    /// Cannot be mixed with named parameters.
    ///
    /// # Examples
    /// ```bash
    /// desk concat book.xlsx 2
    /// ```
    #[arg(trailing_var_arg = true)]
    pub positional_arguments: Vec<String>,
}

fn parse_order(order: &str) -> std::result::Result<PresetOrder, String> {
    order.parse()
}

impl Args {
    /// Whether the invocation only manages presets and runs nothing.
    pub fn is_preset_command(&self) -> bool {
        self.list_presets || self.rename_preset.is_some() || self.delete_preset.is_some()
    }
}

impl Provider for Args {
    /// Determines the argument style based on the provided arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if both named and positional arguments are provided,
    /// as this is not allowed.
    fn get_style(&self) -> Result<Style> {
        determine(&self.parameters, &self.positional_arguments)
    }
}
