use script_desk_core::error::Error::{ParameterCountMismatch, UnknownParameter};
use script_desk_core::error::Result;
use script_desk_core::script_definitions::ScriptDescriptor;
use script_desk_core::values::{ParamValue, ParameterValues};

use crate::arguments::style::Style;

/// Turns command-line values into parameter values for `descriptor`.
///
/// Only the values actually given are returned; defaults are applied when
/// the engine resolves them.
///
/// # Errors
///
/// Returns an error if:
/// - A named value refers to a parameter the script doesn't have
/// - The number of positional values doesn't match the parameter count
pub fn process_command_line(
    argument_style: &Style,
    descriptor: &ScriptDescriptor,
) -> Result<ParameterValues> {
    match argument_style {
        Style::None => Ok(ParameterValues::new()),
        Style::Named(named_params) => process_named_parameters(named_params, descriptor),
        Style::Positional(positional_params) => {
            process_positional_parameters(positional_params, descriptor)
        }
    }
}

/// Checks named values against the script's parameters. A name given
/// twice keeps its last value.
fn process_named_parameters(
    named_params: &[(String, String)],
    descriptor: &ScriptDescriptor,
) -> Result<ParameterValues> {
    let mut values = ParameterValues::new();

    for (key, value) in named_params {
        if descriptor.parameter(key).is_none() {
            return Err(UnknownParameter(key.clone()));
        }

        values.insert(key.clone(), ParamValue::from(value.as_str()));
    }

    Ok(values)
}

/// Process positional parameters based on parameter order
fn process_positional_parameters(
    positional_params: &[String],
    descriptor: &ScriptDescriptor,
) -> Result<ParameterValues> {
    if positional_params.len() != descriptor.parameters.len() {
        return Err(ParameterCountMismatch(
            descriptor.parameters.len(),
            positional_params.len(),
        ));
    }

    Ok(descriptor
        .parameters
        .iter()
        .zip(positional_params)
        .map(|(spec, value)| (spec.name.clone(), ParamValue::from(value.as_str())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use script_desk_core::error::Error;
    use script_desk_core::script_definitions::DescriptorStore;

    fn descriptor() -> ScriptDescriptor {
        let store = DescriptorStore::from_yaml_str(
            r#"
concat:
  label: Concatenate sheets
  entry_point: concat
  parameters:
    - { name: input, label: Workbook, kind: text }
    - { name: sheet, label: Sheet, kind: number, default: 1 }
"#,
            "test",
        )
        .unwrap();
        store.get("concat").unwrap().clone()
    }

    fn named(pairs: &[(&str, &str)]) -> Style {
        Style::Named(
            pairs
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_named_values() {
        let style = named(&[("input", "a=b.xlsx"), ("sheet", "2"), ("sheet", "3")]);
        let values = process_command_line(&style, &descriptor()).unwrap();
        assert_eq!(values["input"], ParamValue::Text("a=b.xlsx".to_string()));
        assert_eq!(values["sheet"], ParamValue::Text("3".to_string()));
    }

    #[test]
    fn test_unknown_named_value() {
        let unknown = named(&[("output", "x")]);
        assert!(matches!(
            process_command_line(&unknown, &descriptor()),
            Err(Error::UnknownParameter(name)) if name == "output"
        ));
    }

    #[test]
    fn test_positional_values_follow_parameter_order() {
        let style = Style::Positional(vec!["book.xlsx".to_string(), "3".to_string()]);
        let values = process_command_line(&style, &descriptor()).unwrap();
        let names: Vec<&String> = values.keys().collect();
        assert_eq!(names, vec!["input", "sheet"]);
        assert_eq!(values["sheet"], ParamValue::Text("3".to_string()));
    }

    #[test]
    fn test_positional_count_mismatch() {
        let style = Style::Positional(vec!["book.xlsx".to_string()]);
        assert!(matches!(
            process_command_line(&style, &descriptor()),
            Err(Error::ParameterCountMismatch(2, 1))
        ));
    }

    #[test]
    fn test_no_values() {
        assert!(process_command_line(&Style::None, &descriptor())
            .unwrap()
            .is_empty());
    }
}
