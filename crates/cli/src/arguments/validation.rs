use script_desk_core::script_definitions::ScriptDescriptor;
use script_desk_core::values::ParameterValues;

use crate::arguments::Style;

/// Determines whether to prompt the user for parameter values.
///
/// The function avoids prompting when:
/// 1. The script has no parameters
/// 2. The values come from a saved preset
/// 3. Every parameter was given on the command line
///
/// Otherwise the form is shown, pre-filled with whatever is known.
#[must_use]
pub fn should_prompt_for_parameters(
    descriptor: &ScriptDescriptor,
    provided: &ParameterValues,
    argument_style: &Style,
    from_preset: bool,
) -> bool {
    if descriptor.parameters.is_empty() || from_preset {
        return false;
    }

    // For command-line values we only skip prompting if the user has
    // provided ALL of them
    if argument_style.is_given() {
        return !has_all_command_line_parameters(descriptor, provided);
    }

    true
}

fn has_all_command_line_parameters(
    descriptor: &ScriptDescriptor,
    provided: &ParameterValues,
) -> bool {
    descriptor
        .parameters
        .iter()
        .all(|spec| provided.contains_key(&spec.name))
}
