use crossterm::style::Color;
use script_desk_core::error::{Error, Result};
use script_desk_core::script_definitions::{ColorDefinition, ScriptDescriptor};

/// Trait for converting color definitions to terminal colors
pub trait AsTermColor {
    /// # Errors
    ///
    /// Returns an error if more than one form is defined or the color name
    /// is unknown.
    fn as_crossterm_color(&self) -> Result<Option<Color>>;
}

impl AsTermColor for ColorDefinition {
    fn as_crossterm_color(&self) -> Result<Option<Color>> {
        match (self.rgb, self.ansi, &self.name) {
            (Some((r, g, b)), None, None) => Ok(Some(Color::Rgb { r, g, b })),
            (None, Some(ansi), None) => Ok(Some(Color::AnsiValue(ansi))),
            (None, None, Some(name)) => named_color(name).map(Some),
            (None, None, None) => Ok(None),
            _ => Err(Error::MultipleColorTypes),
        }
    }
}

fn named_color(name: &str) -> Result<Color> {
    Ok(match name.to_lowercase().as_str() {
        "black" => Color::Black,
        "darkgrey" => Color::DarkGrey,
        "red" => Color::Red,
        "darkred" => Color::DarkRed,
        "green" => Color::Green,
        "darkgreen" => Color::DarkGreen,
        "yellow" => Color::Yellow,
        "darkyellow" => Color::DarkYellow,
        "blue" => Color::Blue,
        "darkblue" => Color::DarkBlue,
        "magenta" => Color::Magenta,
        "darkmagenta" => Color::DarkMagenta,
        "cyan" => Color::Cyan,
        "darkcyan" => Color::DarkCyan,
        "white" => Color::White,
        "grey" => Color::Grey,
        _ => return Err(Error::UnknownColorName(name.to_string())),
    })
}

/// The list color of a script, if it declares one.
pub fn script_color(descriptor: &ScriptDescriptor) -> Result<Option<Color>> {
    match &descriptor.color {
        None => Ok(None),
        Some(color_definition) => color_definition.as_crossterm_color(),
    }
}
