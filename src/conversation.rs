//! The conversation log and the reducer that folds stream events into it.
//!
//! [`Conversation`] is the single writer for the session id, the message log,
//! the loading flag and the error banner. A query is represented by a
//! [`Turn`] obtained from [`Conversation::begin_turn`]; every event read from
//! the backend is handed back through [`Conversation::apply`] together with
//! that turn, which lets the log discard events from a stream the operator
//! has since abandoned.

use std::mem;

use crate::observability::{
    STALE_EVENTS_DROPPED, TURNS_INCOMPLETE, TURNS_REJECTED_BUSY, TURNS_STARTED,
};
use crate::types::{Message, QueryResponse, StreamEvent, ThoughtStep};
use crate::{Error, Result};

/// Text of the error appended when a stream ends without `complete` or `error`.
pub const INCOMPLETE_STREAM: &str = "Stream ended before the response completed";

/// Text of the error appended when the operator interrupts a turn.
pub const INTERRUPTED: &str = "Request interrupted before the response completed";

/// The outcome of applying one item to a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The turn is still waiting on events.
    Open,
    /// The turn reached `complete` or `error`; stop reading.
    Finished,
    /// The log moved on without this turn; stop reading and discard.
    Stale,
}

/// One in-flight query.
#[derive(Debug)]
pub struct Turn {
    session_id: String,
    generation: u64,
    enable_review: bool,
    steps: Vec<ThoughtStep>,
    finished: bool,
}

impl Turn {
    /// The session the query was sent to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether review events will be kept.
    pub fn enable_review(&self) -> bool {
        self.enable_review
    }

    /// Steps seen so far in this turn, before the developer result arrives.
    pub fn steps(&self) -> &[ThoughtStep] {
        &self.steps
    }

    /// Whether the turn has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Session id, message log, loading flag and error banner.
#[derive(Debug, Default)]
pub struct Conversation {
    session_id: Option<String>,
    messages: Vec<Message>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

impl Conversation {
    /// An empty conversation with no session.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current session id.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// The current session id, or [`Error::NoSession`].
    pub fn require_session(&self) -> Result<&str> {
        self.session_id.as_deref().ok_or(Error::NoSession)
    }

    /// The message log in arrival order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a turn is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The current error banner.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record `err` in the error banner.
    pub fn set_error(&mut self, err: &Error) {
        self.error = Some(err.user_message());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Adopt a freshly issued session: the log is emptied and any in-flight
    /// turn becomes stale.
    pub fn replace_session(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
        self.messages.clear();
        self.error = None;
        self.invalidate();
    }

    /// Replace the log wholesale, as after a history reload or a clear.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.invalidate();
    }

    /// Forget the session and everything in the log.
    pub fn reset(&mut self) {
        self.session_id = None;
        self.messages.clear();
        self.error = None;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.loading = false;
        self.generation += 1;
    }

    /// Start a turn by appending the operator's message.
    ///
    /// Fails without touching the log if there is no session or a turn is
    /// already in flight.
    pub fn begin_turn(&mut self, message: Message, enable_review: bool) -> Result<Turn> {
        let session_id = self.require_session()?.to_string();
        if self.loading {
            TURNS_REJECTED_BUSY.click();
            return Err(Error::busy(
                "a response is still streaming; wait for it to finish or interrupt it",
            ));
        }
        TURNS_STARTED.click();
        self.messages.push(message);
        self.loading = true;
        self.error = None;
        Ok(Turn {
            session_id,
            generation: self.generation,
            enable_review,
            steps: Vec::new(),
            finished: false,
        })
    }

    fn is_stale(&self, turn: &Turn) -> bool {
        turn.generation != self.generation
            || self.session_id.as_deref() != Some(turn.session_id.as_str())
    }

    fn finish(&mut self, turn: &mut Turn) -> TurnStatus {
        turn.finished = true;
        self.loading = false;
        TurnStatus::Finished
    }

    fn guard(&self, turn: &Turn) -> Option<TurnStatus> {
        if turn.finished {
            Some(TurnStatus::Finished)
        } else if self.is_stale(turn) {
            STALE_EVENTS_DROPPED.click();
            Some(TurnStatus::Stale)
        } else {
            None
        }
    }

    /// Fold one item read from the stream into the log.
    ///
    /// A line that failed to decode appends an error and leaves the turn
    /// open. Any other failure appends an error and ends the turn.
    pub fn apply(&mut self, turn: &mut Turn, item: Result<StreamEvent>) -> TurnStatus {
        if let Some(status) = self.guard(turn) {
            return status;
        }
        let event = match item {
            Ok(event) => event,
            Err(err) if err.is_line_error() => {
                self.messages.push(Message::error(err.to_string()));
                return TurnStatus::Open;
            }
            Err(err) => {
                self.messages.push(Message::error(err.user_message()));
                return self.finish(turn);
            }
        };
        match event {
            StreamEvent::Status { message } => {
                self.messages.push(Message::status(message));
                TurnStatus::Open
            }
            StreamEvent::Step {
                action,
                action_input,
                observation,
                ..
            } => {
                turn.steps
                    .push(ThoughtStep::new(action, action_input, observation));
                TurnStatus::Open
            }
            StreamEvent::DeveloperResult {
                response,
                thought_process,
            } => {
                let steps = match thought_process {
                    Some(steps) => steps,
                    None => mem::take(&mut turn.steps),
                };
                self.messages.push(Message::assistant(response, steps));
                TurnStatus::Open
            }
            StreamEvent::Review { review } => {
                if turn.enable_review {
                    self.messages.push(Message::review(review));
                }
                TurnStatus::Open
            }
            StreamEvent::Complete { .. } => self.finish(turn),
            StreamEvent::Error { message, .. } => {
                self.messages.push(Message::error(message));
                self.finish(turn)
            }
        }
    }

    /// The transport signalled end of stream.
    pub fn end_of_stream(&mut self, turn: &mut Turn) -> TurnStatus {
        if let Some(status) = self.guard(turn) {
            return status;
        }
        TURNS_INCOMPLETE.click();
        self.messages.push(Message::error(INCOMPLETE_STREAM));
        self.finish(turn)
    }

    /// The request failed before any event could be read.
    pub fn fail_turn(&mut self, turn: &mut Turn, err: &Error) -> TurnStatus {
        if let Some(status) = self.guard(turn) {
            return status;
        }
        self.messages.push(Message::error(err.user_message()));
        self.error = Some(err.user_message());
        self.finish(turn)
    }

    /// The operator gave up on the turn. Anything still arriving for it is
    /// discarded.
    pub fn abandon(&mut self, turn: &mut Turn) -> TurnStatus {
        if let Some(status) = self.guard(turn) {
            return status;
        }
        TURNS_INCOMPLETE.click();
        self.messages.push(Message::error(INTERRUPTED));
        turn.finished = true;
        self.invalidate();
        TurnStatus::Finished
    }

    /// Fold a complete non-streaming response into the log.
    pub fn apply_response(&mut self, turn: &mut Turn, response: QueryResponse) -> TurnStatus {
        if let Some(status) = self.guard(turn) {
            return status;
        }
        let QueryResponse {
            response,
            thought_process,
            review,
            ..
        } = response;
        self.messages.push(Message::assistant(
            response,
            thought_process.unwrap_or_default(),
        ));
        if let Some(review) = review.filter(|_| turn.enable_review) {
            self.messages.push(Message::review(review));
        }
        self.finish(turn)
    }
}
