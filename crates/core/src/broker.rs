//! Question and answer channel between a running script and its controller.
//!
//! The worker side ([`Broker`]) blocks while a question is outstanding. The
//! controller side ([`BrokerHandle`]) sees questions and the final outcome as
//! [`BrokerEvent`]s and answers or cancels at its own pace. Cancellation is
//! sticky: once requested, every later question fails immediately.

use std::cell::Cell;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Number,
}

impl FromStr for InputKind {
    type Err = Error;

    fn from_str(kind: &str) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(InputKind::Text),
            "number" => Ok(InputKind::Number),
            other => Err(Error::InvalidAnswer(format!("unknown input kind `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Question {
    Input { prompt: String, kind: InputKind },
    Confirmation { message: String },
}

impl Display for Question {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Question::Input { prompt, .. } => formatter.write_str(prompt),
            Question::Confirmation { message } => formatter.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Value(String),
    Confirmed(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    Question(Question),
    Finished(WorkerOutcome),
}

#[derive(Debug)]
enum Response {
    Answer(Answer),
    Cancelled,
}

#[derive(Debug)]
enum Request {
    Ask(Question),
    Done(WorkerOutcome),
}

/// Creates the two ends of a session's channel.
pub fn session_channel() -> (Broker, BrokerHandle) {
    let (request_sender, request_receiver) = mpsc::sync_channel(1);
    let (response_sender, response_receiver) = mpsc::channel();
    let cancelled = Arc::new(AtomicBool::new(false));

    let broker = Broker {
        requests: request_sender,
        responses: response_receiver,
        cancelled: Arc::clone(&cancelled),
        observed_cancel: Cell::new(false),
    };
    let handle = BrokerHandle {
        requests: request_receiver,
        responses: response_sender,
        cancelled,
        pending: None,
        finished: false,
    };

    (broker, handle)
}

/// Worker end of a session channel.
#[derive(Debug)]
pub struct Broker {
    requests: SyncSender<Request>,
    responses: Receiver<Response>,
    cancelled: Arc<AtomicBool>,
    observed_cancel: Cell<bool>,
}

impl Broker {
    /// Asks the operator for a value and blocks until it arrives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the session is or becomes cancelled.
    pub fn request_input(&self, prompt: &str, kind: InputKind) -> Result<String> {
        let question = Question::Input {
            prompt: prompt.to_string(),
            kind,
        };
        match self.ask(question)? {
            Answer::Value(value) => Ok(value),
            Answer::Confirmed(_) => Err(Error::InvalidAnswer(
                "expected a value, got a confirmation".to_string(),
            )),
        }
    }

    /// Asks the operator a yes/no question and blocks until it is answered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the session is or becomes cancelled.
    pub fn request_confirmation(&self, message: &str) -> Result<bool> {
        let question = Question::Confirmation {
            message: message.to_string(),
        };
        match self.ask(question)? {
            Answer::Confirmed(confirmed) => Ok(confirmed),
            Answer::Value(_) => Err(Error::InvalidAnswer(
                "expected a confirmation, got a value".to_string(),
            )),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn ask(&self, question: Question) -> Result<Answer> {
        if self.is_cancelled() {
            return Err(self.cancelled_error());
        }

        debug!("Worker asking: {question}");
        if self.requests.send(Request::Ask(question)).is_err() {
            return Err(self.cancelled_error());
        }

        match self.responses.recv() {
            Ok(Response::Answer(answer)) => Ok(answer),
            Ok(Response::Cancelled) | Err(_) => Err(self.cancelled_error()),
        }
    }

    fn cancelled_error(&self) -> Error {
        self.observed_cancel.set(true);
        Error::Cancelled
    }

    /// Maps the entry point's result to the outcome reported to the
    /// controller. Once the worker has seen a cancellation, any result counts
    /// as cancelled.
    pub fn outcome_of(&self, result: &Result<()>) -> WorkerOutcome {
        match result {
            _ if self.observed_cancel.get() => WorkerOutcome::Cancelled,
            Ok(()) => WorkerOutcome::Completed,
            Err(error) if error.is_cancelled() => WorkerOutcome::Cancelled,
            Err(error) => WorkerOutcome::Failed(error.to_string()),
        }
    }

    /// Reports the final outcome. Consumes the broker, so nothing can be
    /// asked afterwards.
    pub fn finish(self, outcome: WorkerOutcome) {
        debug!("Worker finished: {outcome:?}");
        let _ = self.requests.send(Request::Done(outcome));
    }
}

/// Controller end of a session channel.
///
/// Dropping the handle cancels the session.
#[derive(Debug)]
pub struct BrokerHandle {
    requests: Receiver<Request>,
    responses: Sender<Response>,
    cancelled: Arc<AtomicBool>,
    pending: Option<Question>,
    finished: bool,
}

impl BrokerHandle {
    /// Returns the next event without blocking.
    pub fn poll(&mut self) -> Option<BrokerEvent> {
        while !self.finished {
            match self.requests.try_recv() {
                Ok(request) => {
                    if let Some(event) = self.accept(request) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(self.lost_worker()),
            }
        }
        None
    }

    /// Waits up to `timeout` for the next event.
    pub fn wait(&mut self, timeout: Duration) -> Option<BrokerEvent> {
        let deadline = Instant::now() + timeout;
        while !self.finished {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.requests.recv_timeout(remaining) {
                Ok(request) => {
                    if let Some(event) = self.accept(request) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return Some(self.lost_worker()),
            }
        }
        None
    }

    fn accept(&mut self, request: Request) -> Option<BrokerEvent> {
        match request {
            Request::Ask(question) if self.is_cancelled() => {
                debug!("Refusing question after cancellation: {question}");
                let _ = self.responses.send(Response::Cancelled);
                None
            }
            Request::Ask(question) => {
                self.pending = Some(question.clone());
                Some(BrokerEvent::Question(question))
            }
            Request::Done(outcome) => {
                self.finished = true;
                self.pending = None;
                Some(BrokerEvent::Finished(outcome))
            }
        }
    }

    fn lost_worker(&mut self) -> BrokerEvent {
        self.finished = true;
        self.pending = None;
        BrokerEvent::Finished(WorkerOutcome::Failed(
            "the script worker stopped without reporting an outcome".to_string(),
        ))
    }

    pub fn pending(&self) -> Option<&Question> {
        self.pending.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Answers the pending question.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPendingQuestion`] if nothing is waiting, or
    /// [`Error::InvalidAnswer`] if the answer does not fit the question. A
    /// rejected answer leaves the question pending.
    pub fn answer(&mut self, answer: Answer) -> Result<()> {
        let question = self.pending.as_ref().ok_or(Error::NoPendingQuestion)?;
        check_answer(question, &answer)?;

        self.pending = None;
        let _ = self.responses.send(Response::Answer(answer));
        Ok(())
    }

    /// Requests cancellation. A pending question is released immediately;
    /// otherwise the worker sees the request at its next question.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if self.pending.take().is_some() {
            let _ = self.responses.send(Response::Cancelled);
        }
    }
}

impl Drop for BrokerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn check_answer(question: &Question, answer: &Answer) -> Result<()> {
    match (question, answer) {
        (Question::Input { kind: InputKind::Text, .. }, Answer::Value(_))
        | (Question::Confirmation { .. }, Answer::Confirmed(_)) => Ok(()),
        (Question::Input { kind: InputKind::Number, .. }, Answer::Value(value)) => {
            match value.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => Ok(()),
                _ => Err(Error::InvalidAnswer(format!("`{value}` is not a number"))),
            }
        }
        (Question::Input { .. }, Answer::Confirmed(_)) => Err(Error::InvalidAnswer(
            "this question expects a value".to_string(),
        )),
        (Question::Confirmation { .. }, Answer::Value(_)) => Err(Error::InvalidAnswer(
            "this question expects a yes or no".to_string(),
        )),
    }
}
