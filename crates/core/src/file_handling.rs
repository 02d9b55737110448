//! File handling and validation for script-desk data files.
//!
//! This module reads and validates the script descriptor document, and
//! provides the YAML read/write helpers the preset store and path history
//! persist through.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error::{
    EmptyId, IdWithColon, IdWithSpace, InvalidDefault, InvertedBounds, MissingOptions,
    MultipleColorTypes, NonUniqueParameterName, NumericId, UnknownPlaceholder,
};
use crate::error::{Error, Result};
use crate::interpolation::{get_templates, get_tokens};
use crate::script_definitions::{
    EntryPointRef, ParameterKind, ParameterSpec, ScriptDescriptor,
};
use crate::values::check_shape;

fn get_reader(file_description: &str, path: &str) -> Result<File> {
    File::open(path).map_err(|e| Error::io_error(file_description.to_string(), path.to_string(), e))
}

/// Reads and deserializes a YAML file.
///
/// Returns None if the file doesn't exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, or if its content
/// doesn't match the expected structure.
pub fn read_yaml<T: DeserializeOwned>(file_description: &str, path: &str) -> Result<Option<T>> {
    if !Path::exists(Path::new(path)) {
        return Ok(None);
    }

    let reader = get_reader(file_description, path)?;

    // This can't be shortcut with ? as serde wants to deserialize the error
    let parsed: serde_yaml::Result<T> = serde_yaml::from_reader(reader);

    match parsed {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => Err(Error::yaml_error(
            "reading".to_string(),
            file_description.to_string(),
            path.to_string(),
            e,
        )),
    }
}

/// Serializes `value` to `path` and makes it durable before returning.
///
/// The document is written to a sibling temp file, synced, then renamed over
/// the target, so a crash leaves either the old or the new document.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created or written, or
/// if serialization fails.
pub fn write_yaml<T: Serialize>(file_description: &str, path: &str, value: &T) -> Result<()> {
    let io_error = |e: std::io::Error| Error::io_error(file_description.to_string(), path.to_string(), e);

    let target = Path::new(path);
    if let Some(parent) = target.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let temp_path = target.with_extension("yml.tmp");
    let file = File::create(&temp_path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);

    serde_yaml::to_writer(&mut writer, value).map_err(|e| {
        Error::yaml_error(
            "writing".to_string(),
            file_description.to_string(),
            path.to_string(),
            e,
        )
    })?;

    writer.flush().map_err(io_error)?;
    writer.get_ref().sync_all().map_err(io_error)?;
    fs::rename(&temp_path, target).map_err(io_error)?;

    debug!("Wrote {file_description} file `{path}`");
    Ok(())
}

pub(crate) fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(EmptyId);
    }

    if id.contains(' ') {
        return Err(IdWithSpace(id.to_string()));
    }

    if id.contains(':') {
        return Err(IdWithColon(id.to_string()));
    }

    if id.chars().all(|c| c.is_numeric()) {
        return Err(NumericId(id.to_string()));
    }

    Ok(())
}

fn validate_parameter(script: &ScriptDescriptor, parameter: &ParameterSpec) -> Result<()> {
    validate_id(&parameter.name)?;

    if parameter.kind == ParameterKind::Dropdown
        && parameter.options.as_ref().map_or(true, |options| options.is_empty())
    {
        return Err(MissingOptions(script.id.clone(), parameter.name.clone()));
    }

    if let (Some(min), Some(max)) = (parameter.min, parameter.max) {
        if min > max {
            return Err(InvertedBounds(script.id.clone(), parameter.name.clone()));
        }
    }

    if let Some(default) = &parameter.default {
        check_shape(parameter, default).map_err(|reason| InvalidDefault {
            script: script.id.clone(),
            parameter: parameter.name.clone(),
            reason,
        })?;
    }

    Ok(())
}

fn validate_parameters(script: &ScriptDescriptor) -> Result<()> {
    let mut names = HashSet::new();
    for parameter in &script.parameters {
        validate_parameter(script, parameter)?;

        if !names.insert(parameter.name.as_str()) {
            // Found a duplicate name
            return Err(NonUniqueParameterName(
                script.id.clone(),
                parameter.name.clone(),
            ));
        }
    }

    Ok(())
}

fn validate_entry_point(script: &ScriptDescriptor) -> Result<()> {
    let EntryPointRef::Command(spec) = &script.entry_point else {
        return Ok(());
    };

    if spec.command.is_empty() {
        return Err(Error::EmptyCommand(script.id.clone()));
    }

    let templates = get_templates(&spec.command)?;
    for token in get_tokens(&templates) {
        if script.parameter(&token).is_none() {
            return Err(UnknownPlaceholder(script.id.clone(), token));
        }
    }

    Ok(())
}

fn validate_color(script: &ScriptDescriptor) -> Result<()> {
    if let Some(color) = &script.color {
        let defined_count = [color.rgb.is_some(), color.ansi.is_some(), color.name.is_some()]
            .iter()
            .filter(|&&x| x)
            .count();

        if defined_count > 1 {
            return Err(MultipleColorTypes);
        }
    }

    Ok(())
}

fn validate_scripts(scripts: &IndexMap<String, ScriptDescriptor>) -> Result<()> {
    for script in scripts.values() {
        validate_id(&script.id)?;
        validate_parameters(script)?;
        validate_entry_point(script)?;
        validate_color(script)?;
    }

    Ok(())
}

/// Parses and validates a descriptor document held in memory.
///
/// JSON documents are accepted as well, being a subset of YAML.
pub fn parse_script_descriptors(
    source: &str,
    origin: &str,
) -> Result<IndexMap<String, ScriptDescriptor>> {
    let parsed: IndexMap<String, ScriptDescriptor> = serde_yaml::from_str(source).map_err(|e| {
        Error::yaml_error(
            "reading".to_string(),
            "scripts".to_string(),
            origin.to_string(),
            e,
        )
    })?;

    finish_descriptors(parsed, origin)
}

fn finish_descriptors(
    mut parsed: IndexMap<String, ScriptDescriptor>,
    origin: &str,
) -> Result<IndexMap<String, ScriptDescriptor>> {
    if parsed.is_empty() {
        return Err(Error::empty_descriptor_source(origin.to_string()));
    }

    for (id, script) in parsed.iter_mut() {
        script.id.clone_from(id);
    }

    validate_scripts(&parsed)?;

    info!("Loaded {} script descriptors from `{}`", parsed.len(), origin);
    Ok(parsed)
}

/// Loads and validates script descriptors from a descriptor document.
///
/// # Errors
///
/// Returns an error if:
/// - The document cannot be read
/// - The YAML is malformed or an entry lacks a required field
/// - The document is empty
/// - Any script or parameter fails validation
///
/// # Examples
///
/// ```no_run
/// use script_desk_core::file_handling::get_script_descriptors;
///
/// let scripts = get_script_descriptors("/home/me/.script-desk/scripts.yml")?;
/// println!("Loaded {} scripts", scripts.len());
/// # Ok::<(), script_desk_core::error::Error>(())
/// ```
pub fn get_script_descriptors(path: &str) -> Result<IndexMap<String, ScriptDescriptor>> {
    let reader = get_reader("scripts", path)?;

    let parsed: IndexMap<String, ScriptDescriptor> = serde_yaml::from_reader(reader)
        .map_err(|e| Error::yaml_error("reading".to_string(), "scripts".to_string(), path.to_string(), e))?;

    finish_descriptors(parsed, path)
}
