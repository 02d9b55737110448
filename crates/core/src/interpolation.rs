use std::collections::{HashMap, HashSet};

use leon::Template;

use crate::error::Result;
use crate::values::ParameterValues;

/// Find all tokens in all arguments of templates of command.
pub fn get_tokens(templates: &[Template]) -> HashSet<String> {
    let mut tokens = HashSet::new();

    for template in templates {
        for key in template.keys() {
            let _ = tokens.insert((*key).to_string());
        }
    }

    tokens
}

pub fn get_templates(command: &[String]) -> Result<Vec<Template<'_>>> {
    let mut templates: Vec<Template> = Vec::new();

    for argument in command {
        templates.push(Template::parse(argument.as_ref())?);
    }

    Ok(templates)
}

fn build_context(values: &ParameterValues) -> HashMap<String, String> {
    values
        .iter()
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect()
}

pub fn interpolate_command(
    context: &HashMap<String, String>,
    templates: &[Template],
) -> Result<Vec<String>> {
    let mut interpolated_arguments: Vec<String> = Vec::new();

    for template in templates {
        interpolated_arguments.push(template.render(context)?);
    }

    Ok(interpolated_arguments)
}

/// Renders a command template into the argument vector of a script process.
///
/// Placeholders are filled from `values`. Every value no template mentions is
/// appended as a `--name=value` flag, in parameter order.
pub fn build_arguments(command: &[String], values: &ParameterValues) -> Result<Vec<String>> {
    let templates = get_templates(command)?;
    let tokens = get_tokens(&templates);
    let context = build_context(values);

    let mut arguments = interpolate_command(&context, &templates)?;
    for (name, value) in values {
        if !tokens.contains(name) {
            arguments.push(format!("--{name}={value}"));
        }
    }

    Ok(arguments)
}

/// Renders a single template string, such as a working directory or an
/// environment value.
pub fn interpolate_single(template: &str, values: &ParameterValues) -> Result<String> {
    let template = Template::parse(template)?;
    Ok(template.render(&build_context(values))?)
}
