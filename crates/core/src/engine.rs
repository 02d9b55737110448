//! Runs one script at a time off the controller thread.
//!
//! The controller owns the [`Engine`] and drives it with [`Engine::poll`] or
//! [`Engine::next_event`]. Each session gets a fresh worker thread, a fresh
//! broker channel and its own output sink. Questions from the worker
//! surface as [`EngineEvent::Question`]; the end of the run surfaces as
//! [`EngineEvent::Finished`] after the engine is back to idle.

use std::any::Any;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::broker::{session_channel, Answer, Broker, BrokerEvent, BrokerHandle, Question, WorkerOutcome};
use crate::entry_point::{EntryPoint, Registry, RunContext};
use crate::error::{Error, Result};
use crate::output::OutputSink;
use crate::presets::PresetStore;
use crate::script_definitions::DescriptorStore;
use crate::values::{resolve, ParameterValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    WaitingForInput,
    WaitingForConfirmation,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

impl Display for SessionState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::WaitingForInput => "waiting for input",
            SessionState::WaitingForConfirmation => "waiting for confirmation",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        })
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub script_id: String,
    pub label: String,
    /// Always terminal.
    pub state: SessionState,
    pub preset: Option<String>,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Question(Question),
    Finished(SessionReport),
}

#[derive(Debug)]
struct ActiveSession {
    script_id: String,
    label: String,
    preset: Option<String>,
    state: SessionState,
    handle: BrokerHandle,
    worker: Option<JoinHandle<()>>,
    started_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Engine {
    descriptors: DescriptorStore,
    presets: PresetStore,
    registry: Registry,
    sink: OutputSink,
    session: Option<ActiveSession>,
    last_report: Option<SessionReport>,
}

impl Engine {
    pub fn new(descriptors: DescriptorStore, presets: PresetStore, registry: Registry) -> Self {
        Self {
            descriptors,
            presets,
            registry,
            sink: OutputSink::new(),
            session: None,
            last_report: None,
        }
    }

    pub fn descriptors(&self) -> &DescriptorStore {
        &self.descriptors
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    pub fn presets_mut(&mut self) -> &mut PresetStore {
        &mut self.presets
    }

    /// The current or most recent session's output.
    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    /// Lines written since the last drain.
    pub fn drain_output(&self) -> Vec<String> {
        self.sink.drain()
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Idle, |session| session.state)
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_some()
    }

    pub fn pending_question(&self) -> Option<&Question> {
        self.session
            .as_ref()
            .and_then(|session| session.handle.pending())
    }

    pub fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    /// Starts `script_id` with the given values.
    ///
    /// # Errors
    ///
    /// - [`Error::Busy`] while another session is running.
    /// - A not-found error for an unknown script.
    /// - A validation error if the values do not satisfy the parameters.
    /// - A config error if the entry point cannot be resolved. The error is
    ///   also written to the output.
    pub fn start(&mut self, script_id: &str, values: &ParameterValues) -> Result<()> {
        self.start_session(script_id, values, None)
    }

    /// Starts `script_id` with the values of a saved preset. The preset's
    /// usage is recorded when the session ends.
    ///
    /// # Errors
    ///
    /// As [`Engine::start`], plus a not-found error for an unknown preset.
    pub fn start_with_preset(&mut self, script_id: &str, preset: &str) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy);
        }
        let values = self.presets.load(script_id, preset, false)?;
        self.start_session(script_id, &values, Some(preset.to_string()))
    }

    fn start_session(
        &mut self,
        script_id: &str,
        provided: &ParameterValues,
        preset: Option<String>,
    ) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy);
        }

        let descriptor = self.descriptors.require(script_id)?;
        let values = resolve(descriptor, provided)?;

        let entry_point = match self.registry.resolve(&descriptor.entry_point) {
            Ok(entry_point) => entry_point,
            Err(error) => {
                self.sink = OutputSink::new();
                self.sink.append(format!("error: {error}"));
                return Err(error);
            }
        };

        // Writers left over from an earlier session keep the old sink
        self.sink = OutputSink::new();
        let (broker, handle) = session_channel();
        let worker = Worker {
            entry_point,
            script_id: descriptor.id.clone(),
            values,
            sink: self.sink.clone(),
            interactive: descriptor.interactive,
        };
        let worker = thread::Builder::new()
            .name(format!("script-{}", descriptor.id))
            .spawn(move || worker.run(broker))?;

        info!("Started {} ({})", descriptor.id, descriptor.entry_point);
        self.session = Some(ActiveSession {
            script_id: descriptor.id.clone(),
            label: descriptor.label.clone(),
            preset,
            state: SessionState::Running,
            handle,
            worker: Some(worker),
            started_at: Utc::now(),
        });

        Ok(())
    }

    /// Returns the next event without blocking.
    pub fn poll(&mut self) -> Option<EngineEvent> {
        let event = self.session.as_mut()?.handle.poll()?;
        self.observe(event)
    }

    /// Waits up to `timeout` for the next event. Returns immediately when no
    /// session is running.
    pub fn next_event(&mut self, timeout: Duration) -> Option<EngineEvent> {
        let event = self.session.as_mut()?.handle.wait(timeout)?;
        self.observe(event)
    }

    fn observe(&mut self, event: BrokerEvent) -> Option<EngineEvent> {
        match event {
            BrokerEvent::Question(question) => {
                let session = self.session.as_mut()?;
                session.state = match question {
                    Question::Input { .. } => SessionState::WaitingForInput,
                    Question::Confirmation { .. } => SessionState::WaitingForConfirmation,
                };
                debug!("{} is {}", session.script_id, session.state);
                Some(EngineEvent::Question(question))
            }
            BrokerEvent::Finished(outcome) => {
                let session = self.session.take()?;
                Some(EngineEvent::Finished(self.finalize(session, outcome)))
            }
        }
    }

    fn finalize(&mut self, mut session: ActiveSession, outcome: WorkerOutcome) -> SessionReport {
        let (state, message) = match outcome {
            WorkerOutcome::Completed => (SessionState::Completed, "completed".to_string()),
            WorkerOutcome::Failed(message) => (SessionState::Failed, message),
            WorkerOutcome::Cancelled => (SessionState::Cancelled, Error::Cancelled.to_string()),
        };

        if let Some(worker) = session.worker.take() {
            if worker.join().is_err() {
                warn!("Worker thread of {} panicked", session.script_id);
            }
        }

        if let Some(preset) = &session.preset {
            if let Err(error) = self.presets.record_use(&session.script_id, preset) {
                warn!("Could not update usage of preset `{preset}`: {error}");
            }
        }

        info!("{} finished: {}", session.script_id, state);
        let report = SessionReport {
            script_id: session.script_id,
            label: session.label,
            state,
            preset: session.preset,
            message,
            started_at: session.started_at,
            finished_at: Utc::now(),
        };
        self.last_report = Some(report.clone());
        report
    }

    fn session_mut(&mut self) -> Result<&mut ActiveSession> {
        self.session.as_mut().ok_or(Error::NoActiveSession)
    }

    /// Answers a pending input question.
    ///
    /// # Errors
    ///
    /// Fails if nothing is pending or the value does not fit the question.
    pub fn answer(&mut self, value: impl Into<String>) -> Result<()> {
        self.respond(Answer::Value(value.into()))
    }

    /// Answers a pending confirmation.
    ///
    /// # Errors
    ///
    /// Fails if nothing is pending or the question is not a confirmation.
    pub fn confirm(&mut self, confirmed: bool) -> Result<()> {
        self.respond(Answer::Confirmed(confirmed))
    }

    fn respond(&mut self, answer: Answer) -> Result<()> {
        let session = self.session_mut()?;
        session.handle.answer(answer)?;
        session.state = SessionState::Running;
        Ok(())
    }

    /// Cancels the running session. The session ends once the worker observes
    /// the cancellation, which is immediate if a question is pending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveSession`] when idle.
    pub fn cancel(&mut self) -> Result<()> {
        let session = self.session_mut()?;
        session.handle.cancel();
        session.state = SessionState::Running;
        info!("Cancellation requested for {}", session.script_id);
        Ok(())
    }

    /// Cancels the running session and blocks until its worker has stopped.
    /// Returns the report, or `None` when idle.
    pub fn cancel_and_wait(&mut self) -> Option<SessionReport> {
        self.session.as_mut()?.handle.cancel();
        loop {
            if let Some(EngineEvent::Finished(report)) = self.next_event(Duration::from_millis(100)) {
                return Some(report);
            }
            if !self.is_busy() {
                return self.last_report.clone();
            }
        }
    }
}

struct Worker {
    entry_point: Arc<dyn EntryPoint>,
    script_id: String,
    values: ParameterValues,
    sink: OutputSink,
    interactive: bool,
}

impl Worker {
    fn run(self, broker: Broker) {
        let result = {
            let mut context = RunContext::new(
                &self.script_id,
                &self.values,
                &self.sink,
                &broker,
                self.interactive,
            );
            panic::catch_unwind(AssertUnwindSafe(|| self.entry_point.run(&mut context)))
        };

        let outcome = match result {
            Ok(result) => broker.outcome_of(&result),
            Err(payload) => WorkerOutcome::Failed(format!(
                "script panicked: {}",
                panic_message(payload.as_ref())
            )),
        };

        match &outcome {
            WorkerOutcome::Completed => {}
            WorkerOutcome::Failed(message) => self.sink.append(format!("error: {message}")),
            WorkerOutcome::Cancelled => self.sink.append(format!("cancelled: {}", Error::Cancelled)),
        }
        broker.finish(outcome);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
