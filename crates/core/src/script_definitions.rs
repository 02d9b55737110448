use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::file_handling;
use crate::values::ParamValue;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterKind {
    Text,
    Number,
    Dropdown,
    FilePath,
    FolderPath,
}

impl Display for ParameterKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            ParameterKind::Text => "text",
            ParameterKind::Number => "number",
            ParameterKind::Dropdown => "dropdown",
            ParameterKind::FilePath => "file-path",
            ParameterKind::FolderPath => "folder-path",
        })
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub label: String,
    pub kind: ParameterKind,
    pub default: Option<ParamValue>,
    pub options: Option<Vec<String>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Extension filter for `file-path` parameters, with or without the dot.
    pub filetype: Option<String>,
}

impl Display for ParameterSpec {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "`{}` ({})", self.name, self.label)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub command: Vec<String>,
    pub working_directory: Option<String>,
    pub environment: Option<HashMap<String, String>>,
}

/// Where a script's code lives: a built-in registered by name, or an
/// external process launched from a command template.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum EntryPointRef {
    Builtin(String),
    Command(CommandSpec),
}

impl Display for EntryPointRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryPointRef::Builtin(name) => write!(formatter, "builtin `{name}`"),
            EntryPointRef::Command(spec) => formatter.write_str(&spec.command.join(" ")),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ColorDefinition {
    pub rgb: Option<(u8, u8, u8)>,
    pub ansi: Option<u8>,
    pub name: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ScriptDescriptor {
    /// Filled from the document key on load.
    #[serde(skip)]
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    #[serde(alias = "entryPoint")]
    pub entry_point: EntryPointRef,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default, alias = "supportsPreview")]
    pub supports_preview: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    pub color: Option<ColorDefinition>,
}

impl ScriptDescriptor {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|spec| spec.name == name)
    }
}

impl Display for ScriptDescriptor {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(formatter, "{} ({})", self.label, description),
            None => formatter.write_str(&self.label),
        }
    }
}

/// Every script descriptor known to the process, in document order.
///
/// Read-only once loaded; there is no mutation API.
#[derive(Debug, Clone, Default)]
pub struct DescriptorStore {
    scripts: IndexMap<String, ScriptDescriptor>,
}

impl DescriptorStore {
    /// Loads and validates the descriptor document at `path`.
    ///
    /// # Errors
    ///
    /// Fails as a whole if the file is unreadable, malformed, empty, or any
    /// entry is invalid.
    pub fn load(path: &str) -> Result<Self> {
        let scripts = file_handling::get_script_descriptors(path)?;
        Ok(Self { scripts })
    }

    /// Same as [`DescriptorStore::load`] for an in-memory document; `origin`
    /// names it in error messages.
    pub fn from_yaml_str(source: &str, origin: &str) -> Result<Self> {
        let scripts = file_handling::parse_script_descriptors(source, origin)?;
        Ok(Self { scripts })
    }

    pub fn get(&self, id: &str) -> Option<&ScriptDescriptor> {
        self.scripts.get(id)
    }

    pub fn require(&self, id: &str) -> Result<&ScriptDescriptor> {
        self.get(id)
            .ok_or_else(|| Error::ScriptNotFound(id.to_string()))
    }

    pub fn get_index(&self, index: usize) -> Option<&ScriptDescriptor> {
        self.scripts.get_index(index).map(|(_, descriptor)| descriptor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScriptDescriptor> {
        self.scripts.values()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_kind_display_matches_document_spelling() {
        assert_eq!(ParameterKind::FilePath.to_string(), "file-path");
        assert_eq!(ParameterKind::FolderPath.to_string(), "folder-path");
        assert_eq!(ParameterKind::Dropdown.to_string(), "dropdown");
    }

    #[test]
    fn test_entry_point_ref_untagged() {
        let builtin: EntryPointRef = serde_yaml::from_str("greet").unwrap();
        assert_eq!(builtin, EntryPointRef::Builtin("greet".to_string()));

        let command: EntryPointRef =
            serde_yaml::from_str("command: [python, scripts/concat.py]").unwrap();
        match command {
            EntryPointRef::Command(spec) => {
                assert_eq!(spec.command, vec!["python", "scripts/concat.py"]);
                assert!(spec.working_directory.is_none());
            }
            EntryPointRef::Builtin(_) => panic!("Expected a command entry point"),
        }
    }

    #[test]
    fn test_descriptor_display() {
        let descriptor = ScriptDescriptor {
            id: "scan".to_string(),
            label: "Scan text".to_string(),
            description: Some("Extract strings".to_string()),
            entry_point: EntryPointRef::Builtin("scan".to_string()),
            interactive: false,
            supports_preview: false,
            parameters: vec![],
            color: None,
        };
        assert_eq!(descriptor.to_string(), "Scan text (Extract strings)");
    }
}
