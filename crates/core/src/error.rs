use leon::{ParseError, RenderError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of every [`Error`], used by callers that only care
/// about how a failure should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad descriptor, preset or history data.
    Config,
    /// A parameter value (or an answer) does not satisfy its spec.
    Validation,
    /// Name collision that the caller did not agree to overwrite.
    Conflict,
    /// Missing preset, script or pending question.
    NotFound,
    /// A session is already in flight.
    Busy,
    /// The operator aborted a pending question.
    Cancelled,
    /// The entry point failed while running.
    Execution,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Yaml {
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    },

    #[error("IO error with {} file at path `{}`: {}", .file_description, .path, .original)]
    Io {
        file_description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("No scripts were found in the descriptor document. Is `{}` empty?", .path)]
    EmptyDescriptorSource { path: String },

    #[error("Invalid ID: ID may not be empty")]
    EmptyId,

    #[error("Invalid ID `{}`: ID may not contain spaces", .0)]
    IdWithSpace(String),

    #[error("Invalid ID `{}`: ID may not contain a colon", .0)]
    IdWithColon(String),

    #[error("Invalid ID `{}`: ID cannot be purely numeric", .0)]
    NumericId(String),

    #[error("Found a non-unique parameter name on script {}: `{}`", .0, .1)]
    NonUniqueParameterName(String, String),

    #[error("Dropdown parameter `{}` on script {} declares no options", .1, .0)]
    MissingOptions(String, String),

    #[error("Parameter `{}` on script {} has a minimum above its maximum", .1, .0)]
    InvertedBounds(String, String),

    #[error("Default of parameter `{}` on script {} is invalid: {}", .parameter, .script, .reason)]
    InvalidDefault {
        script: String,
        parameter: String,
        reason: String,
    },

    #[error("The command of script {} is empty", .0)]
    EmptyCommand(String),

    #[error("Placeholder `{}` in the command of script {} is not a parameter", .1, .0)]
    UnknownPlaceholder(String, String),

    #[error("For a color, only one of `rgb`, `ansi` or `name` should be defined.")]
    MultipleColorTypes,

    #[error("Unknown color name: \"{}\"", .0)]
    UnknownColorName(String),

    #[error("No entry point named `{}` is registered", .0)]
    UnknownEntryPoint(String),

    #[error("Error parsing placeholder string: {}", .0)]
    Parse(#[from] ParseError),

    #[error("Error rendering template string: {}", .0)]
    Render(#[from] RenderError),

    #[error("Script not found: `{}`", .0)]
    ScriptNotFound(String),

    #[error("Unknown parameter `{}`", .0)]
    UnknownParameter(String),

    #[error("Missing value for parameter `{}`", .0)]
    MissingValue(String),

    #[error("Invalid value for parameter `{}`: {}", .parameter, .reason)]
    InvalidValue { parameter: String, reason: String },

    #[error("Parameters must be given as key=value, got `{}`", .0)]
    ParameterFormat(String),

    #[error("Expected {} positional values, got {}", .0, .1)]
    ParameterCountMismatch(usize, usize),

    #[error("Named and positional parameter values cannot be mixed")]
    MixedParameterMode,

    #[error("Invalid answer: {}", .0)]
    InvalidAnswer(String),

    #[error("Not a directory: `{}`", .0)]
    NotADirectory(String),

    #[error("Invalid preset name `{}`", .0)]
    InvalidPresetName(String),

    #[error("A preset named `{}` already exists for script {}", .name, .script)]
    PresetConflict { script: String, name: String },

    #[error("No preset named `{}` for script {}", .name, .script)]
    PresetNotFound { script: String, name: String },

    #[error("No question is waiting for an answer")]
    NoPendingQuestion,

    #[error("No script is running")]
    NoActiveSession,

    #[error("A script is already running")]
    Busy,

    #[error("Cancelled by the operator")]
    Cancelled,

    #[error("Script {} is not interactive and cannot ask questions", .0)]
    NotInteractive(String),

    #[error("{}", .0)]
    Execution(String),

    #[error("The script process exited with {}", exit_description(.0))]
    SubProcessExit(Option<i32>),

    #[error("Error with script process: {}", .0)]
    SubProcess(std::io::Error),

    #[error("STDIO error: {}", .0)]
    Stdio(#[from] std::io::Error),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by a signal)".to_string(),
    }
}

impl Error {
    pub fn empty_descriptor_source(path: String) -> Self {
        Self::EmptyDescriptorSource { path }
    }

    pub fn yaml_error(
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    ) -> Self {
        Self::Yaml {
            action,
            file_description,
            path,
            original,
        }
    }

    pub fn io_error(file_description: String, path: String, original: std::io::Error) -> Self {
        Self::Io {
            file_description,
            path,
            original,
        }
    }

    pub fn invalid_value(parameter: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    /// Failure raised by an entry point.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Yaml { .. }
            | Error::Io { .. }
            | Error::EmptyDescriptorSource { .. }
            | Error::EmptyId
            | Error::IdWithSpace(_)
            | Error::IdWithColon(_)
            | Error::NumericId(_)
            | Error::NonUniqueParameterName(_, _)
            | Error::MissingOptions(_, _)
            | Error::InvertedBounds(_, _)
            | Error::InvalidDefault { .. }
            | Error::EmptyCommand(_)
            | Error::UnknownPlaceholder(_, _)
            | Error::MultipleColorTypes
            | Error::UnknownColorName(_)
            | Error::UnknownEntryPoint(_)
            | Error::Parse(_)
            | Error::NotInteractive(_) => ErrorKind::Config,

            Error::UnknownParameter(_)
            | Error::MissingValue(_)
            | Error::InvalidValue { .. }
            | Error::ParameterFormat(_)
            | Error::ParameterCountMismatch(_, _)
            | Error::MixedParameterMode
            | Error::InvalidAnswer(_)
            | Error::NotADirectory(_)
            | Error::InvalidPresetName(_) => ErrorKind::Validation,

            Error::PresetConflict { .. } => ErrorKind::Conflict,

            Error::ScriptNotFound(_)
            | Error::PresetNotFound { .. }
            | Error::NoPendingQuestion
            | Error::NoActiveSession => ErrorKind::NotFound,

            Error::Busy => ErrorKind::Busy,

            Error::Cancelled => ErrorKind::Cancelled,

            Error::Render(_)
            | Error::Execution(_)
            | Error::SubProcessExit(_)
            | Error::SubProcess(_)
            | Error::Stdio(_) => ErrorKind::Execution,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(Error::Busy.kind(), ErrorKind::Busy);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            Error::PresetConflict {
                script: "greet".to_string(),
                name: "daily".to_string()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            Error::invalid_value("count", "above maximum").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::UnknownEntryPoint("nope".to_string()).kind(),
            ErrorKind::Config
        );
        assert_eq!(Error::execution("boom").kind(), ErrorKind::Execution);
        assert_eq!(Error::SubProcessExit(Some(2)).kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_execution_message_is_verbatim() {
        assert_eq!(Error::execution("disk full").to_string(), "disk full");
    }

    #[test]
    fn test_sub_process_exit_message() {
        assert_eq!(
            Error::SubProcessExit(Some(3)).to_string(),
            "The script process exited with status 3"
        );
        assert!(Error::SubProcessExit(None).to_string().contains("signal"));
    }
}
