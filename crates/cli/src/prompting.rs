//! Line-based prompts: parameter fields, run confirmation and the questions
//! a running script asks.
//!
//! Everything goes through [`Terminal`], which is generic over its input and
//! output so the whole interaction can be driven from a buffer in tests.

use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

use crossterm::queue;
use crossterm::style::{Print, ResetColor, SetForegroundColor};
use script_desk_core::broker::{Answer, InputKind, Question};
use script_desk_core::error::{Error, Result};
use script_desk_core::form::{FieldDescription, Widget};

/// Typed at any script question to cancel the run.
pub const CANCEL_COMMAND: &str = ":cancel";

pub enum RunChoice {
    Yes,
    No,
    ChangeParams,
}

pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl Terminal<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Reads one trimmed line. Returns `None` once the input is closed.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut input = String::new();
        if self.input.read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    /// Prints `text` without a newline and reads the reply.
    pub fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        self.read_line()
    }

    pub fn print_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    pub fn print_colored(&mut self, line: &str, color: crossterm::style::Color) -> Result<()> {
        queue!(
            self.output,
            SetForegroundColor(color),
            Print(line),
            ResetColor,
            Print("\n")
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()?;
        Ok(())
    }

    /// Prompts for one form field until a value is given. An empty reply
    /// takes the field's initial value. Folder fields offer `history` by
    /// number and select fields their options by number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the input closes.
    pub fn prompt_field(&mut self, field: &FieldDescription, history: &[String]) -> Result<String> {
        let choices: &[String] = match &field.widget {
            Widget::Select { options } => options,
            Widget::FolderPicker => history,
            _ => &[],
        };

        if !choices.is_empty() {
            if matches!(field.widget, Widget::FolderPicker) {
                self.print_line("Recent folders:")?;
            }
            for (index, choice) in choices.iter().enumerate() {
                self.print_line(&format!("  [{index}] {choice}"))?;
            }
        }

        let mut prompt_base = format!("Value for {} (`{}`)", field.label, field.name);
        if let Some(hint) = field.hint() {
            prompt_base.push_str(&format!(" <{hint}>"));
        }

        loop {
            let prompt = match &field.initial {
                Some(initial) => format!("{prompt_base} [{initial}]: "),
                None => format!("{prompt_base}: "),
            };

            let Some(read_value) = self.prompt(&prompt)? else {
                return Err(Error::Cancelled);
            };

            if read_value.is_empty() {
                if let Some(initial) = &field.initial {
                    return Ok(initial.clone());
                }
                // No input and no default - ask again
                continue;
            }

            if !choices.contains(&read_value) {
                if let Some(choice) = read_value
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| choices.get(index))
                {
                    return Ok(choice.clone());
                }
            }

            return Ok(read_value);
        }
    }

    /// Confirms with the user whether the script should be run
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the input closes.
    pub fn confirm_run(&mut self, has_params: bool) -> Result<RunChoice> {
        let prompt_change_params = if has_params {
            "/[c]hange parameters"
        } else {
            ""
        };

        loop {
            let prompt = format!("Are you sure you want to run? ([Y]es/[n]o{prompt_change_params}): ");
            let Some(input) = self.prompt(&prompt)? else {
                return Err(Error::Cancelled);
            };

            match input.to_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(RunChoice::Yes),
                "n" | "no" => return Ok(RunChoice::No),
                "c" if has_params => return Ok(RunChoice::ChangeParams),
                _ => {}
            }
        }
    }

    /// A plain yes/no question, defaulting to no.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the input closes.
    pub fn confirm(&mut self, message: &str) -> Result<bool> {
        let Some(input) = self.prompt(&format!("{message} [y/N]: "))? else {
            return Err(Error::Cancelled);
        };
        Ok(matches!(input.to_lowercase().as_str(), "y" | "yes"))
    }

    /// Asks a running script's question. Returns `None` if the operator
    /// cancels, either with [`CANCEL_COMMAND`] or by closing the input.
    pub fn ask(&mut self, question: &Question) -> Result<Option<Answer>> {
        loop {
            let prompt = match question {
                Question::Input { prompt, kind: InputKind::Text } => format!("{prompt} "),
                Question::Input { prompt, kind: InputKind::Number } => format!("{prompt} <number> "),
                Question::Confirmation { message } => format!("{message} [y/n] "),
            };

            let Some(input) = self.prompt(&prompt)? else {
                return Ok(None);
            };
            if input == CANCEL_COMMAND {
                return Ok(None);
            }

            match question {
                Question::Input { .. } => return Ok(Some(Answer::Value(input))),
                Question::Confirmation { .. } => match input.to_lowercase().as_str() {
                    "y" | "yes" => return Ok(Some(Answer::Confirmed(true))),
                    "n" | "no" => return Ok(Some(Answer::Confirmed(false))),
                    _ => self.print_line(&format!("Please answer y or n, or {CANCEL_COMMAND}"))?,
                },
            }
        }
    }
}
