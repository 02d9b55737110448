//! Parameter values and their resolution against a script's parameter specs.
//!
//! Resolution is the single gate between operator input and a running
//! worker: unknown names, missing values, unparsable numbers, out of range
//! numbers, values outside a dropdown's options and missing paths are all
//! rejected here, before any session exists.

use std::fmt::{Display, Formatter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::expand_path;
use crate::error::{Error, Result};
use crate::script_definitions::{ParameterKind, ParameterSpec, ScriptDescriptor};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(number) => Some(*number),
            ParamValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl Display for ParamValue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Number(number) => write!(formatter, "{number}"),
            ParamValue::Text(text) => formatter.write_str(text),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

/// Values keyed by parameter name, in the order of the script's parameters
/// once resolved.
pub type ParameterValues = IndexMap<String, ParamValue>;

/// Builds [`ParameterValues`] from `(name, value)` pairs.
pub fn values_from<K, V, I>(pairs: I) -> ParameterValues
where
    K: Into<String>,
    V: Into<ParamValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect()
}

/// Renders every value as a string, the form presets are persisted in.
pub fn to_strings(values: &ParameterValues) -> IndexMap<String, String> {
    values
        .iter()
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect()
}

pub fn from_strings(values: &IndexMap<String, String>) -> ParameterValues {
    values
        .iter()
        .map(|(name, value)| (name.clone(), ParamValue::Text(value.clone())))
        .collect()
}

/// Resolves `provided` against the descriptor's parameters.
///
/// Parameters without a provided value fall back to their default. The result
/// contains every parameter of the descriptor, in declaration order, with
/// numbers parsed and paths expanded.
///
/// # Errors
///
/// Returns a validation error for an unknown name, a missing value without a
/// default, or a value that does not satisfy its spec.
pub fn resolve(descriptor: &ScriptDescriptor, provided: &ParameterValues) -> Result<ParameterValues> {
    if let Some(unknown) = provided
        .keys()
        .find(|name| descriptor.parameter(name).is_none())
    {
        return Err(Error::UnknownParameter(unknown.clone()));
    }

    let mut resolved = ParameterValues::new();
    for spec in &descriptor.parameters {
        let value = provided
            .get(&spec.name)
            .or(spec.default.as_ref())
            .ok_or_else(|| Error::MissingValue(spec.name.clone()))?;

        resolved.insert(spec.name.clone(), check_value(spec, value)?);
    }

    Ok(resolved)
}

/// Checks a single value against its spec, including the filesystem checks
/// of path parameters.
pub fn check_value(spec: &ParameterSpec, value: &ParamValue) -> Result<ParamValue> {
    let checked = check_shape(spec, value).map_err(|reason| Error::invalid_value(&spec.name, reason))?;

    match spec.kind {
        ParameterKind::FilePath => {
            let path = checked.to_string();
            if !Path::new(&path).is_file() {
                return Err(Error::invalid_value(
                    &spec.name,
                    format!("`{path}` is not an existing file"),
                ));
            }
            Ok(checked)
        }
        ParameterKind::FolderPath => {
            let path = checked.to_string();
            if !Path::new(&path).is_dir() {
                return Err(Error::invalid_value(
                    &spec.name,
                    format!("`{path}` is not an existing folder"),
                ));
            }
            Ok(checked)
        }
        _ => Ok(checked),
    }
}

/// Checks everything that does not touch the filesystem. Used for declared
/// defaults at load time, where a path may legitimately not exist yet.
pub(crate) fn check_shape(
    spec: &ParameterSpec,
    value: &ParamValue,
) -> std::result::Result<ParamValue, String> {
    match spec.kind {
        ParameterKind::Text => Ok(ParamValue::Text(value.to_string())),
        ParameterKind::Number => {
            let number = value
                .as_number()
                .filter(|number| number.is_finite())
                .ok_or_else(|| format!("`{value}` is not a number"))?;

            if let Some(min) = spec.min {
                if number < min {
                    return Err(format!("{number} is below the minimum of {min}"));
                }
            }
            if let Some(max) = spec.max {
                if number > max {
                    return Err(format!("{number} is above the maximum of {max}"));
                }
            }

            Ok(ParamValue::Number(number))
        }
        ParameterKind::Dropdown => {
            let text = value.to_string();
            let options = spec.options.as_deref().unwrap_or_default();
            if options.iter().any(|option| *option == text) {
                Ok(ParamValue::Text(text))
            } else {
                Err(format!("`{text}` is not one of: {}", options.join(", ")))
            }
        }
        ParameterKind::FilePath => {
            let path = non_empty_path(value)?;
            if let Some(filetype) = &spec.filetype {
                let wanted = filetype.trim_start_matches('.');
                let matches = Path::new(&path)
                    .extension()
                    .and_then(|extension| extension.to_str())
                    .is_some_and(|extension| extension.eq_ignore_ascii_case(wanted));
                if !matches {
                    return Err(format!("`{path}` is not a .{wanted} file"));
                }
            }
            Ok(ParamValue::Text(path))
        }
        ParameterKind::FolderPath => non_empty_path(value).map(ParamValue::Text),
    }
}

fn non_empty_path(value: &ParamValue) -> std::result::Result<String, String> {
    let text = value.to_string();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("a path is required".to_string());
    }

    Ok(expand_path(trimmed))
}
