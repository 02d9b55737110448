//! Drives a started session from the terminal until it finishes.

use std::io::{BufRead, Write};
use std::time::Duration;

use crossterm::style::Color;
use log::debug;
use script_desk_core::broker::{Answer, Question};
use script_desk_core::engine::{Engine, EngineEvent, SessionReport, SessionState};
use script_desk_core::error::{Error, ErrorKind, Result};

use crate::prompting::Terminal;

/// How long to wait for the worker before printing new output again.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Relays output and questions between the running session and the
/// terminal. Returns the report once the session is over.
///
/// # Errors
///
/// Returns [`Error::NoActiveSession`] if no session was started, or an
/// error if the terminal fails.
pub fn drive<R: BufRead, W: Write>(
    engine: &mut Engine,
    terminal: &mut Terminal<R, W>,
) -> Result<SessionReport> {
    if !engine.is_busy() {
        return Err(Error::NoActiveSession);
    }

    loop {
        let event = engine.next_event(POLL_INTERVAL);
        print_output(engine, terminal)?;

        match event {
            None => {}
            Some(EngineEvent::Question(question)) => answer_question(engine, terminal, &question)?,
            Some(EngineEvent::Finished(report)) => return Ok(report),
        }
    }
}

/// Prints whatever the session wrote since the last call. Error lines are
/// shown in red.
///
/// # Errors
///
/// Returns an error if the terminal fails.
pub fn print_output<R: BufRead, W: Write>(engine: &Engine, terminal: &mut Terminal<R, W>) -> Result<()> {
    for line in engine.drain_output() {
        if line.starts_with("error: ") {
            terminal.print_colored(&line, Color::Red)?;
        } else {
            terminal.print_line(&line)?;
        }
    }
    terminal.flush()
}

fn answer_question<R: BufRead, W: Write>(
    engine: &mut Engine,
    terminal: &mut Terminal<R, W>,
    question: &Question,
) -> Result<()> {
    loop {
        let Some(answer) = terminal.ask(question)? else {
            debug!("Operator cancelled at `{question}`");
            return engine.cancel();
        };

        let result = match answer {
            Answer::Value(value) => engine.answer(value),
            Answer::Confirmed(confirmed) => engine.confirm(confirmed),
        };

        match result {
            Err(error) if error.kind() == ErrorKind::Validation => {
                terminal.print_line(&error.to_string())?;
            }
            other => return other,
        }
    }
}

/// One-line summary of how the session ended.
pub fn summary(report: &SessionReport) -> String {
    let elapsed = report.finished_at - report.started_at;
    let seconds = elapsed.num_milliseconds() as f64 / 1000.0;
    let preset = report
        .preset
        .as_ref()
        .map(|preset| format!(" with preset `{preset}`"))
        .unwrap_or_default();

    match report.state {
        SessionState::Completed => {
            format!("{} completed{preset} in {seconds:.1}s", report.label)
        }
        state => format!("{} {state}{preset}: {}", report.label, report.message),
    }
}
