//! Toolkit-neutral description of a script's parameter form.
//!
//! Rendering is left to the front end; this module only decides which kind of
//! field each parameter needs and what it starts out holding.

use crate::script_definitions::{ParameterKind, ParameterSpec, ScriptDescriptor};
use crate::values::ParameterValues;

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    TextInput,
    NumberInput { min: Option<f64>, max: Option<f64> },
    Select { options: Vec<String> },
    FilePicker { filetype: Option<String> },
    FolderPicker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescription {
    pub name: String,
    pub label: String,
    pub widget: Widget,
    pub initial: Option<String>,
}

impl FieldDescription {
    /// A short hint describing what the field accepts, e.g. `0..100`.
    pub fn hint(&self) -> Option<String> {
        match &self.widget {
            Widget::TextInput => None,
            Widget::NumberInput { min, max } => match (min, max) {
                (None, None) => Some("number".to_string()),
                (Some(min), None) => Some(format!(">= {min}")),
                (None, Some(max)) => Some(format!("<= {max}")),
                (Some(min), Some(max)) => Some(format!("{min}..{max}")),
            },
            Widget::Select { options } => Some(options.join("/")),
            Widget::FilePicker { filetype: Some(filetype) } => {
                Some(format!("*.{}", filetype.trim_start_matches('.')))
            }
            Widget::FilePicker { filetype: None } => Some("file".to_string()),
            Widget::FolderPicker => Some("folder".to_string()),
        }
    }
}

pub fn describe_field(spec: &ParameterSpec) -> FieldDescription {
    let widget = match spec.kind {
        ParameterKind::Text => Widget::TextInput,
        ParameterKind::Number => Widget::NumberInput {
            min: spec.min,
            max: spec.max,
        },
        ParameterKind::Dropdown => Widget::Select {
            options: spec.options.clone().unwrap_or_default(),
        },
        ParameterKind::FilePath => Widget::FilePicker {
            filetype: spec.filetype.clone(),
        },
        ParameterKind::FolderPath => Widget::FolderPicker,
    };

    FieldDescription {
        name: spec.name.clone(),
        label: spec.label.clone(),
        widget,
        initial: spec.default.as_ref().map(ToString::to_string),
    }
}

/// Describes every field of a script's form. Values in `seed` (typically the
/// auto-selected preset) take precedence over declared defaults.
pub fn describe_form(
    descriptor: &ScriptDescriptor,
    seed: Option<&ParameterValues>,
) -> Vec<FieldDescription> {
    descriptor
        .parameters
        .iter()
        .map(|spec| {
            let mut field = describe_field(spec);
            if let Some(value) = seed.and_then(|seed| seed.get(&spec.name)) {
                field.initial = Some(value.to_string());
            }
            field
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script_definitions::EntryPointRef;
    use crate::values::{values_from, ParamValue};

    fn spec(name: &str, kind: ParameterKind) -> ParameterSpec {
        ParameterSpec {
            name: name.to_string(),
            label: format!("{name} label"),
            kind,
            default: None,
            options: None,
            min: None,
            max: None,
            filetype: None,
        }
    }

    #[test]
    fn test_each_kind_maps_to_its_widget() {
        let mut count = spec("count", ParameterKind::Number);
        count.min = Some(0.0);
        count.max = Some(100.0);
        count.default = Some(ParamValue::Number(10.0));
        let field = describe_field(&count);
        assert_eq!(
            field.widget,
            Widget::NumberInput {
                min: Some(0.0),
                max: Some(100.0)
            }
        );
        assert_eq!(field.initial.as_deref(), Some("10"));
        assert_eq!(field.hint().as_deref(), Some("0..100"));

        let mut mode = spec("mode", ParameterKind::Dropdown);
        mode.options = Some(vec!["full".to_string(), "changed".to_string()]);
        assert_eq!(
            describe_field(&mode).widget,
            Widget::Select {
                options: vec!["full".to_string(), "changed".to_string()]
            }
        );

        let mut input = spec("input", ParameterKind::FilePath);
        input.filetype = Some("xlsx".to_string());
        assert_eq!(describe_field(&input).hint().as_deref(), Some("*.xlsx"));

        assert_eq!(
            describe_field(&spec("folder", ParameterKind::FolderPath)).widget,
            Widget::FolderPicker
        );
        assert_eq!(describe_field(&spec("who", ParameterKind::Text)).hint(), None);
    }

    #[test]
    fn test_seed_values_override_defaults() {
        let mut who = spec("who", ParameterKind::Text);
        who.default = Some("world".into());
        let descriptor = ScriptDescriptor {
            id: "greet".to_string(),
            label: "Greet".to_string(),
            description: None,
            entry_point: EntryPointRef::Builtin("greet".to_string()),
            interactive: false,
            supports_preview: false,
            parameters: vec![who, spec("times", ParameterKind::Number)],
            color: None,
        };

        let unseeded = describe_form(&descriptor, None);
        assert_eq!(unseeded[0].initial.as_deref(), Some("world"));
        assert_eq!(unseeded[1].initial, None);

        let seed = values_from([("who", "alice")]);
        let seeded = describe_form(&descriptor, Some(&seed));
        assert_eq!(seeded[0].initial.as_deref(), Some("alice"));
        assert_eq!(seeded[0].label, "who label");
    }
}
