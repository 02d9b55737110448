//! External process entry points.
//!
//! The command template is rendered with the session's values and launched
//! with piped stdio. Standard output is read line by line; two line prefixes
//! turn into questions for the operator, and the answer is written back to
//! the process on its standard input:
//!
//! ```text
//! ::input::number::How many copies?    -> one line with the value
//! ::confirm::Overwrite report.xlsx?    -> `y` or `n`
//! ```
//!
//! Every other line, and all of standard error, is script output.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{ChildStderr, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::broker::InputKind;
use crate::config::expand_working_directory;
use crate::entry_point::{EntryPoint, RunContext};
use crate::error::{Error, Result};
use crate::interpolation::{build_arguments, interpolate_single};
use crate::output::OutputWriter;
use crate::script_definitions::CommandSpec;
use crate::values::ParameterValues;

pub const INPUT_PREFIX: &str = "::input::";
pub const CONFIRM_PREFIX: &str = "::confirm::";

/// How often a silent process is checked for cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long standard error may stay open after the process has ended.
const STDERR_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
enum ProtocolLine<'a> {
    Output(&'a str),
    Input { kind: InputKind, prompt: &'a str },
    Confirm(&'a str),
}

fn parse_line(line: &str) -> ProtocolLine<'_> {
    if let Some(rest) = line.strip_prefix(INPUT_PREFIX) {
        return match rest.split_once("::") {
            Some((kind, prompt)) => match kind.parse() {
                Ok(kind) => ProtocolLine::Input { kind, prompt },
                Err(_) => ProtocolLine::Input {
                    kind: InputKind::Text,
                    prompt: rest,
                },
            },
            None => ProtocolLine::Input {
                kind: InputKind::Text,
                prompt: rest,
            },
        };
    }

    match line.strip_prefix(CONFIRM_PREFIX) {
        Some(message) => ProtocolLine::Confirm(message),
        None => ProtocolLine::Output(line),
    }
}

#[derive(Debug, Clone)]
pub struct ProcessEntryPoint {
    spec: CommandSpec,
}

impl ProcessEntryPoint {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Builds the process for the given values without starting it.
    ///
    /// # Errors
    ///
    /// Returns an error if a template cannot be rendered or the rendered
    /// command is empty.
    pub fn build_command(&self, script_id: &str, values: &ParameterValues) -> Result<Command> {
        let arguments = build_arguments(&self.spec.command, values)?;
        let (program, arguments) = arguments
            .split_first()
            .ok_or_else(|| Error::EmptyCommand(script_id.to_string()))?;

        let mut command = Command::new(program);
        command.args(arguments);

        let working_directory = self
            .spec
            .working_directory
            .as_deref()
            .map(|directory| interpolate_single(directory, values))
            .transpose()?;
        if let Some(working_directory) = expand_working_directory(&working_directory) {
            command.current_dir(working_directory);
        }

        if let Some(environment) = &self.spec.environment {
            info!("Executing with environment variables: {:?}", environment);
            for (key, value) in environment {
                command.env(key, interpolate_single(value, values)?);
            }
        }

        Ok(command)
    }

    fn relay(
        context: &mut RunContext<'_>,
        lines: &Receiver<io::Result<Vec<u8>>>,
        mut stdin: Option<ChildStdin>,
    ) -> Result<()> {
        loop {
            if context.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let buffer = match lines.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(line) => line?,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            };
            if context.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let line = String::from_utf8_lossy(&buffer);
            let line = line.trim_end_matches(['\n', '\r']);

            match parse_line(line) {
                ProtocolLine::Output(text) => context.print(text),
                ProtocolLine::Input { kind, prompt } => {
                    let value = context.request_input(prompt, kind)?;
                    send_answer(stdin.as_mut(), &value)?;
                }
                ProtocolLine::Confirm(message) => {
                    let confirmed = context.request_confirmation(message)?;
                    send_answer(stdin.as_mut(), if confirmed { "y" } else { "n" })?;
                }
            }
        }
    }
}

/// Reads standard output on its own thread so the worker can keep watching
/// for cancellation while the process is silent. The channel closes at end
/// of output.
fn spawn_line_reader(stdout: impl Read + Send + 'static) -> Receiver<io::Result<Vec<u8>>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            let mut buffer = Vec::new();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) => break,
                Ok(_) => {
                    if sender.send(Ok(buffer)).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    let _ = sender.send(Err(error));
                    break;
                }
            }
        }
    });
    receiver
}

/// Copies standard error into the output on its own thread.
///
/// Once [`StderrRelay::finish`] returns, nothing more reaches the output,
/// even if a grandchild still holds the pipe open.
struct StderrRelay {
    open: Arc<Mutex<bool>>,
    done: Receiver<io::Result<u64>>,
}

impl StderrRelay {
    fn spawn(mut stderr: ChildStderr, mut writer: OutputWriter) -> Self {
        let open = Arc::new(Mutex::new(true));
        let (sender, done) = mpsc::channel();
        let relay_open = Arc::clone(&open);

        thread::spawn(move || {
            let mut chunk = [0_u8; 4096];
            let mut copied = 0_u64;
            let result = loop {
                let read = match stderr.read(&mut chunk) {
                    Ok(0) => break Ok(copied),
                    Ok(read) => read,
                    Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                    Err(error) => break Err(error),
                };

                let open = relay_open.lock();
                if !*open {
                    writer.discard_pending();
                    break Ok(copied);
                }
                if let Err(error) = writer.write_all(&chunk[..read]) {
                    break Err(error);
                }
                copied += read as u64;
            };
            {
                let open = relay_open.lock();
                if *open {
                    writer.flush_pending();
                } else {
                    writer.discard_pending();
                }
            }
            let _ = sender.send(result);
        });

        Self { open, done }
    }

    /// Waits up to `grace` for standard error to end, then closes the relay.
    fn finish(self, grace: Duration) {
        match self.done.recv_timeout(grace) {
            Ok(Ok(_)) => {}
            Ok(Err(error)) => warn!("Error reading script stderr: {error}"),
            Err(RecvTimeoutError::Timeout) => {
                debug!("Script stderr still open after {grace:?}; dropping the rest")
            }
            Err(RecvTimeoutError::Disconnected) => warn!("The stderr reader panicked"),
        }
        *self.open.lock() = false;
    }
}

fn send_answer(stdin: Option<&mut ChildStdin>, answer: &str) -> Result<()> {
    let stdin = stdin.ok_or_else(|| Error::execution("the script process has no input"))?;
    writeln!(stdin, "{answer}")?;
    stdin.flush()?;
    Ok(())
}

impl EntryPoint for ProcessEntryPoint {
    fn run(&self, context: &mut RunContext<'_>) -> Result<()> {
        let mut command = self.build_command(context.script_id(), context.values())?;
        let stdin = if context.is_interactive() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        command.stdin(stdin).stdout(Stdio::piped()).stderr(Stdio::piped());

        info!("Executing {:?}", command);
        let mut child = command.spawn().map_err(Error::SubProcess)?;

        let stderr_relay = child
            .stderr
            .take()
            .map(|stderr| StderrRelay::spawn(stderr, context.writer()));
        let stdin = child.stdin.take();
        let relayed = match child.stdout.take() {
            Some(stdout) => Self::relay(context, &spawn_line_reader(stdout), stdin),
            None => Err(Error::execution("the script process has no output")),
        };

        if let Err(error) = relayed {
            debug!("Stopping script process: {error}");
            if let Err(kill_error) = child.kill() {
                warn!("Could not kill script process: {kill_error}");
            }
            let _ = child.wait();
            if let Some(relay) = stderr_relay {
                relay.finish(STDERR_GRACE);
            }
            return Err(error);
        }

        let status = child.wait().map_err(Error::SubProcess)?;
        if let Some(relay) = stderr_relay {
            relay.finish(STDERR_GRACE);
        }

        if status.success() {
            Ok(())
        } else {
            Err(Error::SubProcessExit(status.code()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("plain"), ProtocolLine::Output("plain"));
        assert_eq!(
            parse_line("::input::number::How many?"),
            ProtocolLine::Input {
                kind: InputKind::Number,
                prompt: "How many?"
            }
        );
        assert_eq!(
            parse_line("::input::text::Name?"),
            ProtocolLine::Input {
                kind: InputKind::Text,
                prompt: "Name?"
            }
        );
        assert_eq!(
            parse_line("::input::Name?"),
            ProtocolLine::Input {
                kind: InputKind::Text,
                prompt: "Name?"
            }
        );
        assert_eq!(
            parse_line("::confirm::Proceed?"),
            ProtocolLine::Confirm("Proceed?")
        );
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use crate::broker::{session_channel, Answer, BrokerEvent, Question, WorkerOutcome};
        use crate::output::OutputSink;
        use crate::values::values_from;
        use std::collections::HashMap;
        use std::time::Duration;

        fn entry_point(command: &[&str]) -> ProcessEntryPoint {
            ProcessEntryPoint::new(CommandSpec {
                command: command.iter().map(ToString::to_string).collect(),
                working_directory: None,
                environment: None,
            })
        }

        fn run(
            entry_point: &ProcessEntryPoint,
            values: &ParameterValues,
        ) -> (Result<()>, Vec<String>) {
            let (broker, _handle) = session_channel();
            let sink = OutputSink::new();
            let result = {
                let mut context = RunContext::new("proc", values, &sink, &broker, false);
                entry_point.run(&mut context)
            };
            (result, sink.drain())
        }

        #[test]
        fn test_stdout_becomes_output() {
            let values = values_from([("who", "alice")]);
            let (result, lines) = run(&entry_point(&["echo", "hello, {who}"]), &values);
            assert!(result.is_ok());
            assert_eq!(lines, vec!["hello, alice"]);
        }

        #[test]
        fn test_unreferenced_values_become_flags() {
            let values = values_from([("mode", "full")]);
            let (result, lines) = run(&entry_point(&["echo"]), &values);
            assert!(result.is_ok());
            assert_eq!(lines, vec!["--mode=full"]);
        }

        #[test]
        fn test_non_zero_exit_fails() {
            let (result, lines) = run(
                &entry_point(&["sh", "-c", "echo partial; exit 3"]),
                &ParameterValues::new(),
            );
            assert!(matches!(result, Err(Error::SubProcessExit(Some(3)))));
            assert_eq!(lines, vec!["partial"]);
        }

        #[test]
        fn test_stderr_is_captured() {
            let (result, lines) = run(
                &entry_point(&["sh", "-c", "echo oops >&2"]),
                &ParameterValues::new(),
            );
            assert!(result.is_ok());
            assert_eq!(lines, vec!["oops"]);
        }

        #[test]
        fn test_missing_program_fails() {
            let (result, _) = run(
                &entry_point(&["script-desk-no-such-program"]),
                &ParameterValues::new(),
            );
            assert!(matches!(result, Err(Error::SubProcess(_))));
        }

        #[test]
        fn test_working_directory_and_environment() {
            let dir = tempfile::tempdir().unwrap();
            let mut environment = HashMap::new();
            environment.insert("GREETING".to_string(), "hi {who}".to_string());
            let entry_point = ProcessEntryPoint::new(CommandSpec {
                command: vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    "pwd; echo $GREETING".to_string(),
                ],
                working_directory: Some(dir.path().to_str().unwrap().to_string()),
                environment: Some(environment),
            });

            let values = values_from([("who", "bob")]);
            let mut command = entry_point.build_command("proc", &values).unwrap();
            let output = command.output().unwrap();
            let stdout = String::from_utf8(output.stdout).unwrap();
            let lines: Vec<&str> = stdout.lines().collect();

            let expected_dir = dir.path().canonicalize().unwrap();
            assert_eq!(
                std::path::Path::new(lines[0]).canonicalize().unwrap(),
                expected_dir
            );
            assert_eq!(lines[1], "hi bob");
        }

        #[test]
        fn test_confirmation_round_trip() {
            let entry_point = entry_point(&[
                "sh",
                "-c",
                "echo '::confirm::Proceed?'; read answer; echo got $answer",
            ]);
            let (broker, mut handle) = session_channel();
            let sink = OutputSink::new();
            let worker_sink = sink.clone();

            let worker = std::thread::spawn(move || {
                let values = ParameterValues::new();
                let result = {
                    let mut context =
                        RunContext::new("proc", &values, &worker_sink, &broker, true);
                    entry_point.run(&mut context)
                };
                let outcome = broker.outcome_of(&result);
                broker.finish(outcome);
            });

            let event = handle.wait(Duration::from_secs(10));
            assert_eq!(
                event,
                Some(BrokerEvent::Question(Question::Confirmation {
                    message: "Proceed?".to_string()
                }))
            );
            handle.answer(Answer::Confirmed(true)).unwrap();
            assert_eq!(
                handle.wait(Duration::from_secs(10)),
                Some(BrokerEvent::Finished(WorkerOutcome::Completed))
            );
            worker.join().unwrap();
            assert_eq!(sink.drain(), vec!["got y"]);
        }

        #[test]
        fn test_cancel_kills_process() {
            let entry_point = entry_point(&[
                "sh",
                "-c",
                "echo '::input::text::Name?'; read name; exec sleep 30",
            ]);
            let (broker, mut handle) = session_channel();
            let sink = OutputSink::new();
            let worker_sink = sink.clone();

            let worker = std::thread::spawn(move || {
                let values = ParameterValues::new();
                let result = {
                    let mut context =
                        RunContext::new("proc", &values, &worker_sink, &broker, true);
                    entry_point.run(&mut context)
                };
                let outcome = broker.outcome_of(&result);
                broker.finish(outcome);
            });

            assert!(matches!(
                handle.wait(Duration::from_secs(10)),
                Some(BrokerEvent::Question(_))
            ));
            handle.cancel();
            assert_eq!(
                handle.wait(Duration::from_secs(10)),
                Some(BrokerEvent::Finished(WorkerOutcome::Cancelled))
            );
            worker.join().unwrap();
        }

        fn spawn_worker(
            entry_point: ProcessEntryPoint,
            sink: &OutputSink,
        ) -> (crate::broker::BrokerHandle, std::thread::JoinHandle<()>) {
            let (broker, handle) = session_channel();
            let worker_sink = sink.clone();
            let worker = std::thread::spawn(move || {
                let values = ParameterValues::new();
                let result = {
                    let mut context =
                        RunContext::new("proc", &values, &worker_sink, &broker, false);
                    entry_point.run(&mut context)
                };
                let outcome = broker.outcome_of(&result);
                broker.finish(outcome);
            });
            (handle, worker)
        }

        #[test]
        fn test_cancel_silent_process() {
            let sink = OutputSink::new();
            let (mut handle, worker) = spawn_worker(entry_point(&["sleep", "30"]), &sink);

            std::thread::sleep(Duration::from_millis(200));
            let cancelled_at = std::time::Instant::now();
            handle.cancel();
            assert_eq!(
                handle.wait(Duration::from_secs(10)),
                Some(BrokerEvent::Finished(WorkerOutcome::Cancelled))
            );
            assert!(cancelled_at.elapsed() < Duration::from_secs(5));
            worker.join().unwrap();
        }

        #[test]
        fn test_late_stderr_after_cancel_is_dropped() {
            let sink = OutputSink::new();
            let (mut handle, worker) = spawn_worker(
                entry_point(&[
                    "sh",
                    "-c",
                    "echo started; (sleep 2; echo late >&2) & sleep 30",
                ]),
                &sink,
            );

            std::thread::sleep(Duration::from_millis(300));
            handle.cancel();
            assert_eq!(
                handle.wait(Duration::from_secs(10)),
                Some(BrokerEvent::Finished(WorkerOutcome::Cancelled))
            );
            worker.join().unwrap();

            std::thread::sleep(Duration::from_millis(2500));
            assert_eq!(sink.drain(), vec!["started"]);
        }
    }
}
