//! How parameter values were given on the command line.
//!
//! Values are either all named (`-p key=value`) or all positional; mixing
//! the two in one invocation is rejected before any script is looked up.

use script_desk_core::error::Error::{MixedParameterMode, ParameterFormat};
use script_desk_core::error::Result;

#[derive(PartialEq, Clone, Debug)]
pub enum Style {
    /// Nothing given; values come from a preset or the form
    None,
    /// `(name, value)` pairs from `-p`/`--param`, in the order given
    Named(Vec<(String, String)>),
    /// Trailing values, matched to the parameters in declaration order
    Positional(Vec<String>),
}

impl Style {
    /// Whether any value was given on the command line.
    pub fn is_given(&self) -> bool {
        !matches!(self, Style::None)
    }
}

/// Implemented by argument structures that carry parameter values.
pub trait Provider {
    /// # Errors
    ///
    /// Returns an error if named and positional values are mixed or a named
    /// value is malformed.
    fn get_style(&self) -> Result<Style>;
}

/// Splits `key=value` on its first `=`. The value may itself contain `=`.
fn split_named(parameter: &str) -> Result<(String, String)> {
    match parameter.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ParameterFormat(parameter.to_string())),
    }
}

/// Works out the [`Style`] of the given values.
///
/// # Errors
///
/// Returns [`MixedParameterMode`] if both kinds are given and
/// [`ParameterFormat`] if a named value is not `key=value`.
///
/// # Examples
///
/// ```rust
/// use script_desk_cli::arguments::{determine, Style};
///
/// let style = determine(&["who=alice".to_string()], &[]).unwrap();
/// assert_eq!(style, Style::Named(vec![("who".to_string(), "alice".to_string())]));
///
/// let style = determine(&[], &["alice".to_string()]).unwrap();
/// assert!(matches!(style, Style::Positional(_)));
///
/// assert!(determine(&["who=alice".to_string()], &["bob".to_string()]).is_err());
/// ```
pub fn determine(named: &[String], positional: &[String]) -> Result<Style> {
    if !named.is_empty() && !positional.is_empty() {
        return Err(MixedParameterMode);
    }

    if !named.is_empty() {
        let pairs = named
            .iter()
            .map(String::as_str)
            .map(split_named)
            .collect::<Result<Vec<_>>>()?;
        return Ok(Style::Named(pairs));
    }

    if positional.is_empty() {
        Ok(Style::None)
    } else {
        Ok(Style::Positional(positional.to_vec()))
    }
}
