//! Configuration path utilities for script-desk.
//!
//! This module provides functions for resolving the descriptor, preset and
//! path history file locations and expanding shell variables like `~` in paths.

/// Default path for the script descriptor document
const DEFAULT_SCRIPTS_PATH: &str = "~/.script-desk/scripts.yml";
/// Default path for the saved parameter presets
const DEFAULT_PRESETS_PATH: &str = "~/.script-desk/presets.yml";
/// Default path for the confirmed folder path history
const DEFAULT_PATH_HISTORY_PATH: &str = "~/.script-desk/path_history.yml";

fn resolve(path_arg: &Option<String>, default: &str) -> String {
    let path = match path_arg {
        Some(path) => path,
        None => default,
    };

    shellexpand::tilde(path).to_string()
}

/// Resolves the script descriptor file path.
///
/// If a custom path is provided, uses that path. Otherwise, uses the default
/// descriptor path. Shell expansions like `~` are resolved.
///
/// # Examples
///
/// ```
/// use script_desk_core::config::get_scripts_path;
///
/// // Use default path
/// let default_path = get_scripts_path(&None);
///
/// // Use custom path
/// let custom_path = get_scripts_path(&Some("/path/to/scripts.yml".to_string()));
/// ```
pub fn get_scripts_path(scripts_path_arg: &Option<String>) -> String {
    resolve(scripts_path_arg, DEFAULT_SCRIPTS_PATH)
}

/// Resolves the preset file path, falling back to `~/.script-desk/presets.yml`.
pub fn get_presets_path(presets_path_arg: &Option<String>) -> String {
    resolve(presets_path_arg, DEFAULT_PRESETS_PATH)
}

/// Resolves the path history file path, falling back to
/// `~/.script-desk/path_history.yml`.
pub fn get_path_history_path(history_path_arg: &Option<String>) -> String {
    resolve(history_path_arg, DEFAULT_PATH_HISTORY_PATH)
}

/// Expands shell variables (`~`) in a user supplied path.
pub fn expand_path(path: &str) -> String {
    shellexpand::tilde(path).to_string()
}

/// Expands shell variables in a working directory path.
///
/// Returns None if no working directory is provided.
///
/// # Examples
///
/// ```
/// use script_desk_core::config::expand_working_directory;
///
/// let expanded = expand_working_directory(&Some("~/projects".to_string()));
/// assert!(expanded.is_some());
///
/// let none_result = expand_working_directory(&None);
/// assert!(none_result.is_none());
/// ```
pub fn expand_working_directory(working_directory: &Option<String>) -> Option<String> {
    working_directory.as_deref().map(expand_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_scripts_path_with_custom_path() {
        let custom_path = Some("/custom/path/scripts.yml".to_string());
        let result = get_scripts_path(&custom_path);
        assert_eq!(result, "/custom/path/scripts.yml");
    }

    #[test]
    fn test_get_scripts_path_with_none() {
        let result = get_scripts_path(&None);
        // Should expand the tilde in the default path
        assert!(result.ends_with("scripts.yml"));
        assert!(!result.starts_with('~'));
    }

    #[test]
    fn test_get_presets_path_with_tilde() {
        let tilde_path = Some("~/my-presets.yml".to_string());
        let result = get_presets_path(&tilde_path);
        assert!(!result.starts_with('~'));
        assert!(result.ends_with("my-presets.yml"));
    }

    #[test]
    fn test_get_path_history_path_with_none() {
        let result = get_path_history_path(&None);
        assert!(result.ends_with("path_history.yml"));
        assert!(!result.starts_with('~'));
    }

    #[test]
    fn test_expand_working_directory_with_some() {
        let working_dir = Some("~/projects/script-desk".to_string());
        let expanded = expand_working_directory(&working_dir).unwrap();
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("projects/script-desk"));
    }

    #[test]
    fn test_expand_working_directory_with_none() {
        assert!(expand_working_directory(&None).is_none());
    }

    #[test]
    fn test_expand_path_without_tilde() {
        assert_eq!(expand_path("/absolute/path"), "/absolute/path");
    }
}
