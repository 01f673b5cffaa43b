//! Session lifecycle and query turns.
//!
//! [`Session`] owns the [`Conversation`] and is the only component that
//! mutates it. Every operation either updates the conversation or records
//! an error banner and leaves it as it was.

use std::fs::File;
use std::future::Future;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use serde_json::to_writer_pretty;

use crate::attachments::PendingAttachments;
use crate::backend::AssistantBackend;
use crate::conversation::{Conversation, Turn, TurnStatus};
use crate::render::Renderer;
use crate::types::{
    AgentType, HealthStatus, Message, QueryRequest, SessionInfo, SessionList, StreamEvent,
    ThoughtStep,
};
use crate::{Error, Result};

const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Per-query display and workflow preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Ask the backend for the thought process and show steps as they stream.
    pub show_details: bool,
    /// Ask for a review and keep it in the log.
    pub enable_review: bool,
    /// Which agent handles the query.
    pub agent_type: AgentType,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            show_details: true,
            enable_review: true,
            agent_type: AgentType::Developer,
        }
    }
}

impl QueryOptions {
    /// Review is only kept when the agent has a reviewer.
    fn review_requested(&self) -> bool {
        self.enable_review && self.agent_type.has_reviewer()
    }

    fn request(&self, query: &str, session_id: &str) -> QueryRequest {
        QueryRequest::new(query, Some(session_id.to_string()))
            .with_show_details(self.show_details)
            .with_review(self.enable_review)
            .with_agent_type(self.agent_type)
    }
}

/// The active session and its conversation log.
pub struct Session {
    backend: Arc<dyn AssistantBackend>,
    conversation: Conversation,
}

impl Session {
    /// Creates a session holder with no session yet; call [`create`](Self::create).
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self {
            backend,
            conversation: Conversation::new(),
        }
    }

    /// The backend this session talks to.
    pub fn backend(&self) -> &Arc<dyn AssistantBackend> {
        &self.backend
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn session_id(&self) -> Option<&str> {
        self.conversation.session_id()
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    /// The error banner left by the last failed operation.
    pub fn error(&self) -> Option<&str> {
        self.conversation.error()
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.conversation.set_error(err);
        }
        result
    }

    fn require_session(&mut self) -> Result<String> {
        let result = self.conversation.require_session().map(str::to_string);
        self.record(result)
    }

    /// Ask the backend for a new session and adopt it.
    pub async fn create(&mut self) -> Result<String> {
        let result = self.backend.create_session().await;
        let created = self.record(result)?;
        self.conversation.replace_session(created.session_id.clone());
        Ok(created.session_id)
    }

    /// Replace the log with the backend's history for the current session.
    ///
    /// Returns the number of messages loaded.
    pub async fn load_history(&mut self) -> Result<usize> {
        let session_id = self.require_session()?;
        let result = self.backend.session_history(&session_id).await;
        let history = self.record(result)?;
        let messages: Vec<Message> = history.messages.into_iter().map(Message::from).collect();
        let count = messages.len();
        self.conversation.replace_messages(messages);
        self.conversation.clear_error();
        Ok(count)
    }

    /// Clear the backend's history for the current session, then the log.
    pub async fn clear(&mut self) -> Result<()> {
        let session_id = self.require_session()?;
        let result = self.backend.clear_session(&session_id).await;
        self.record(result)?;
        self.conversation.replace_messages(Vec::new());
        self.conversation.clear_error();
        Ok(())
    }

    /// Empty the log and start over with a freshly issued session.
    pub async fn new_session(&mut self) -> Result<String> {
        self.conversation.replace_messages(Vec::new());
        self.conversation.clear_error();
        self.create().await
    }

    /// Metadata for the current session.
    pub async fn info(&mut self) -> Result<SessionInfo> {
        let session_id = self.require_session()?;
        let result = self.backend.session_info(&session_id).await;
        self.record(result)
    }

    /// Delete the current session on the backend and forget it locally.
    pub async fn delete(&mut self) -> Result<()> {
        let session_id = self.require_session()?;
        let result = self.backend.delete_session(&session_id).await;
        self.record(result)?;
        self.conversation.reset();
        Ok(())
    }

    /// Every session the backend holds.
    pub async fn list(&mut self) -> Result<SessionList> {
        let result = self.backend.list_sessions().await;
        self.record(result)
    }

    /// Backend readiness.
    pub async fn health(&mut self) -> Result<HealthStatus> {
        let result = self.backend.health().await;
        self.record(result)
    }

    fn begin(
        &mut self,
        query: &str,
        attachments: &PendingAttachments,
        options: &QueryOptions,
    ) -> Result<Turn> {
        let message = Message::user(query, attachments.names());
        self.conversation
            .begin_turn(message, options.review_requested())
    }

    fn render_from(&self, cursor: usize, show_details: bool, renderer: &mut dyn Renderer) -> usize {
        let messages = self.conversation.messages();
        for message in messages.iter().skip(cursor) {
            renderer.print_message(message, show_details);
        }
        messages.len()
    }

    /// Send a query over `/query/stream`, rendering the log as it grows.
    ///
    /// Fails only if the turn could not start: no session, or a turn already
    /// in flight. Everything after that, including transport failures, ends
    /// up in the log.
    pub async fn send(
        &mut self,
        query: &str,
        attachments: &mut PendingAttachments,
        options: &QueryOptions,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnStatus> {
        let mut turn = self.begin(query, attachments, options)?;
        let mut cursor = self.conversation.messages().len();
        let files = attachments.encode_all().await;
        let request = options
            .request(query, turn.session_id())
            .with_attachments(files);

        renderer.start_response();
        let opened = interruptible(&*renderer, self.backend.query_stream(request)).await;
        let mut stream = match opened {
            None => {
                let status = self.interrupt(&mut turn, renderer);
                renderer.finish_response();
                return Ok(status);
            }
            Some(Err(err)) => {
                let status = self.conversation.fail_turn(&mut turn, &err);
                self.render_from(cursor, options.show_details, renderer);
                renderer.finish_response();
                return Ok(status);
            }
            Some(Ok(stream)) => stream,
        };
        attachments.clear();

        let status = loop {
            let Some(item) = interruptible(&*renderer, stream.next()).await else {
                break self.interrupt(&mut turn, renderer);
            };
            let status = match item {
                Some(item) => {
                    if options.show_details
                        && let Ok(StreamEvent::Step {
                            step_number,
                            action,
                            action_input,
                            observation,
                        }) = &item
                    {
                        let step = ThoughtStep::new(action, action_input, observation);
                        renderer.print_step(*step_number, &step);
                    }
                    self.conversation.apply(&mut turn, item)
                }
                None => self.conversation.end_of_stream(&mut turn),
            };
            if status == TurnStatus::Stale {
                break status;
            }
            cursor = self.render_from(cursor, options.show_details, renderer);
            if status == TurnStatus::Finished {
                break status;
            }
        };
        renderer.finish_response();
        Ok(status)
    }

    /// Send a query over `/query` and wait for the whole response.
    pub async fn send_blocking(
        &mut self,
        query: &str,
        attachments: &mut PendingAttachments,
        options: &QueryOptions,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnStatus> {
        let mut turn = self.begin(query, attachments, options)?;
        let cursor = self.conversation.messages().len();
        let files = attachments.encode_all().await;
        let mut request = options
            .request(query, turn.session_id())
            .with_attachments(files);
        request.stream = Some(false);

        renderer.start_response();
        let status = match interruptible(&*renderer, self.backend.query(request)).await {
            None => {
                let status = self.interrupt(&mut turn, renderer);
                renderer.finish_response();
                return Ok(status);
            }
            Some(Ok(response)) => {
                attachments.clear();
                self.conversation.apply_response(&mut turn, response)
            }
            Some(Err(err)) => self.conversation.fail_turn(&mut turn, &err),
        };
        self.render_from(cursor, options.show_details, renderer);
        renderer.finish_response();
        Ok(status)
    }

    fn interrupt(&mut self, turn: &mut Turn, renderer: &mut dyn Renderer) -> TurnStatus {
        let status = self.conversation.abandon(turn);
        renderer.print_interrupted();
        status
    }

    /// Saves the conversation log to the specified path as JSON.
    pub fn save_transcript_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let transcript = TranscriptFile {
            version: 1,
            session_id: self.conversation.session_id(),
            messages: self.conversation.messages(),
        };
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &transcript).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })
    }
}

#[derive(Serialize)]
struct TranscriptFile<'a> {
    version: u8,
    session_id: Option<&'a str>,
    messages: &'a [Message],
}

/// Drive `future` to completion unless the renderer reports an interrupt first.
async fn interruptible<F: Future>(renderer: &dyn Renderer, future: F) -> Option<F::Output> {
    tokio::pin!(future);
    let mut ticker = tokio::time::interval(INTERRUPT_POLL);
    loop {
        tokio::select! {
            output = &mut future => return Some(output),
            _ = ticker.tick() => {
                if renderer.should_interrupt() {
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use bytes::Bytes;
    use futures::stream;

    use super::*;
    use crate::conversation::INCOMPLETE_STREAM;
    use crate::ndjson::{EventStream, process_ndjson};
    use crate::types::{
        CreateSessionResponse, DirectoryListing, HistoryEntry, MessageRole, QueryResponse,
        SessionHistory, Settings, SettingsUpdate, SettingsUpdateResponse, StatusResponse,
    };

    #[derive(Default)]
    struct FakeBackend {
        sessions: AtomicUsize,
        fail_create: AtomicBool,
        history: Mutex<Vec<HistoryEntry>>,
        streams: Mutex<VecDeque<Vec<Bytes>>>,
        requests: Mutex<Vec<QueryRequest>>,
        cleared: Mutex<Vec<String>>,
        stall: AtomicBool,
    }

    impl FakeBackend {
        fn with_stream(self, chunks: Vec<&str>) -> Self {
            self.streams
                .lock()
                .unwrap()
                .push_back(chunks.into_iter().map(|c| Bytes::from(c.to_string())).collect());
            self
        }
    }

    #[async_trait::async_trait]
    impl AssistantBackend for FakeBackend {
        async fn health(&self) -> Result<HealthStatus> {
            Err(Error::service_unavailable("not used"))
        }

        async fn create_session(&self) -> Result<CreateSessionResponse> {
            if self.fail_create.load(Ordering::Relaxed) {
                return Err(Error::connection("connection refused", None));
            }
            let n = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
            Ok(CreateSessionResponse {
                status: "success".to_string(),
                session_id: format!("session-{n}"),
                message: "Session created successfully".to_string(),
            })
        }

        async fn session_info(&self, _: &str) -> Result<SessionInfo> {
            Err(Error::not_found("Session not found or expired", None))
        }

        async fn session_history(&self, session_id: &str) -> Result<SessionHistory> {
            Ok(SessionHistory {
                status: "success".to_string(),
                session_id: session_id.to_string(),
                messages: self.history.lock().unwrap().clone(),
            })
        }

        async fn clear_session(&self, session_id: &str) -> Result<StatusResponse> {
            self.cleared.lock().unwrap().push(session_id.to_string());
            Ok(StatusResponse::default())
        }

        async fn delete_session(&self, _: &str) -> Result<StatusResponse> {
            Ok(StatusResponse::default())
        }

        async fn list_sessions(&self) -> Result<SessionList> {
            Ok(SessionList {
                active_sessions: 0,
                sessions: Vec::new(),
            })
        }

        async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
            if self.stall.load(Ordering::Relaxed) {
                futures::future::pending::<()>().await;
            }
            let session_id = request.session_id.clone().unwrap_or_default();
            self.requests.lock().unwrap().push(request);
            Ok(QueryResponse {
                status: "success".to_string(),
                session_id,
                response: "blocking answer".to_string(),
                thought_process: None,
                review: None,
                message_count: 2,
            })
        }

        async fn query_stream(&self, request: QueryRequest) -> Result<EventStream> {
            if self.stall.load(Ordering::Relaxed) {
                futures::future::pending::<()>().await;
            }
            self.requests.lock().unwrap().push(request);
            let chunks = self
                .streams
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::internal_server("Agent not initialized"))?;
            let bytes = stream::iter(chunks.into_iter().map(Ok));
            Ok(Box::pin(process_ndjson(bytes, None)))
        }

        async fn settings(&self) -> Result<Settings> {
            Ok(Settings::default())
        }

        async fn update_settings(&self, _: &SettingsUpdate) -> Result<SettingsUpdateResponse> {
            Ok(SettingsUpdateResponse::default())
        }

        async fn browse_directory(&self, _: Option<&str>) -> Result<DirectoryListing> {
            Ok(DirectoryListing::default())
        }
    }

    #[derive(Default)]
    struct Recorder {
        printed: Vec<MessageRole>,
        steps: usize,
        started: usize,
        finished: usize,
        interrupt: bool,
    }

    impl Renderer for Recorder {
        fn print_message(&mut self, message: &Message, _: bool) {
            self.printed.push(message.role());
        }
        fn print_step(&mut self, _: Option<u32>, _: &ThoughtStep) {
            self.steps += 1;
        }
        fn print_thought_process(&mut self, _: &[ThoughtStep]) {}
        fn print_error(&mut self, _: &str) {}
        fn print_warning(&mut self, _: &str) {}
        fn print_info(&mut self, _: &str) {}
        fn start_response(&mut self) {
            self.started += 1;
        }
        fn finish_response(&mut self) {
            self.finished += 1;
        }
        fn should_interrupt(&self) -> bool {
            self.interrupt
        }
    }

    const TURN: &str = concat!(
        r#"{"type": "status", "message": "Analyzing requirements..."}"#,
        "\n",
        r#"{"type": "step", "step_number": 1, "action": "read_file", "action_input": "app.py", "observation": "ok"}"#,
        "\n",
        r#"{"type": "developer_result", "response": "Done."}"#,
        "\n",
        r#"{"type": "review", "review": {"status": "success", "decision": "approved", "review": "LGTM"}}"#,
        "\n",
        r#"{"type": "complete", "message": "Task completed"}"#,
        "\n",
    );

    async fn session_with(backend: FakeBackend) -> (Session, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        let mut session = Session::new(backend.clone());
        session.create().await.unwrap();
        (session, backend)
    }

    #[tokio::test]
    async fn streamed_turn_fills_the_log() {
        let (mut session, backend) = session_with(FakeBackend::default().with_stream(vec![TURN])).await;
        let mut pending = PendingAttachments::new();
        let mut renderer = Recorder::default();
        let status = session
            .send("add an endpoint", &mut pending, &QueryOptions::default(), &mut renderer)
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Finished);
        let roles: Vec<_> = session.messages().iter().map(Message::role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Status,
                MessageRole::Assistant,
                MessageRole::Review
            ]
        );
        assert_eq!(renderer.printed, roles[1..].to_vec());
        assert_eq!(renderer.steps, 1);
        assert!(!session.is_loading());

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0].session_id.as_deref(), Some("session-1"));
        assert!(requests[0].stream.is_none());
    }

    #[tokio::test]
    async fn chunk_boundaries_do_not_change_the_log() {
        let whole = {
            let (mut session, _) = session_with(FakeBackend::default().with_stream(vec![TURN])).await;
            let mut pending = PendingAttachments::new();
            session
                .send("q", &mut pending, &QueryOptions::default(), &mut Recorder::default())
                .await
                .unwrap();
            session.messages().iter().map(|m| (m.role(), m.content().to_string())).collect::<Vec<_>>()
        };
        let bytes: Vec<String> = TURN.chars().map(String::from).collect();
        let (mut session, _) = session_with(
            FakeBackend::default().with_stream(bytes.iter().map(String::as_str).collect()),
        )
        .await;
        let mut pending = PendingAttachments::new();
        session
            .send("q", &mut pending, &QueryOptions::default(), &mut Recorder::default())
            .await
            .unwrap();
        let split: Vec<_> = session
            .messages()
            .iter()
            .map(|m| (m.role(), m.content().to_string()))
            .collect();
        assert_eq!(whole, split);
    }

    #[tokio::test]
    async fn truncated_stream_reports_one_error() {
        let (mut session, _) = session_with(FakeBackend::default().with_stream(vec![
            "{\"type\": \"status\", \"message\": \"Executing...\"}\n{\"type\": \"sta",
        ]))
        .await;
        let mut pending = PendingAttachments::new();
        session
            .send("q", &mut pending, &QueryOptions::default(), &mut Recorder::default())
            .await
            .unwrap();
        let errors: Vec<_> = session
            .messages()
            .iter()
            .filter(|m| m.role() == MessageRole::Error)
            .map(|m| m.content().to_string())
            .collect();
        // The cut-off fragment is flushed as a malformed line, then the
        // missing terminator is reported.
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1], INCOMPLETE_STREAM);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn failed_request_lands_in_the_log() {
        let (mut session, _) = session_with(FakeBackend::default()).await;
        let mut pending = PendingAttachments::new();
        pending.select(["notes.md"]);
        let status = session
            .send("q", &mut pending, &QueryOptions::default(), &mut Recorder::default())
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Finished);
        assert_eq!(session.messages().last().map(Message::content), Some("Agent not initialized"));
        assert_eq!(session.error(), Some("Agent not initialized"));
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn review_is_not_kept_for_cloud_architect() {
        let (mut session, _) = session_with(FakeBackend::default().with_stream(vec![TURN])).await;
        let options = QueryOptions {
            agent_type: AgentType::CloudArchitect,
            ..QueryOptions::default()
        };
        let mut pending = PendingAttachments::new();
        session
            .send("q", &mut pending, &options, &mut Recorder::default())
            .await
            .unwrap();
        assert!(session.messages().iter().all(|m| m.role() != MessageRole::Review));
    }

    #[tokio::test]
    async fn blocking_send_uses_query() {
        let (mut session, backend) = session_with(FakeBackend::default()).await;
        let mut pending = PendingAttachments::new();
        session
            .send_blocking("q", &mut pending, &QueryOptions::default(), &mut Recorder::default())
            .await
            .unwrap();
        assert_eq!(session.messages().last().map(Message::content), Some("blocking answer"));
        assert_eq!(backend.requests.lock().unwrap()[0].stream, Some(false));
    }

    #[tokio::test]
    async fn interrupt_while_opening_closes_the_response() {
        let (mut session, backend) = session_with(FakeBackend::default()).await;
        backend.stall.store(true, Ordering::Relaxed);
        let mut pending = PendingAttachments::new();
        let mut renderer = Recorder {
            interrupt: true,
            ..Recorder::default()
        };
        let status = session
            .send("q", &mut pending, &QueryOptions::default(), &mut renderer)
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Finished);
        assert_eq!((renderer.started, renderer.finished), (1, 1));
        assert!(!session.is_loading());
        assert_eq!(
            session.messages().last().map(Message::content),
            Some(crate::conversation::INTERRUPTED)
        );

        let status = session
            .send_blocking("q", &mut pending, &QueryOptions::default(), &mut renderer)
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Finished);
        assert_eq!((renderer.started, renderer.finished), (2, 2));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn new_session_always_starts_empty() {
        let (mut session, _) = session_with(FakeBackend::default().with_stream(vec![
            "{\"type\": \"error\", \"message\": \"Agent failed\"}\n",
        ]))
        .await;
        let mut pending = PendingAttachments::new();
        session
            .send("q", &mut pending, &QueryOptions::default(), &mut Recorder::default())
            .await
            .unwrap();
        assert!(!session.messages().is_empty());

        let previous = session.session_id().map(str::to_string);
        let id = session.new_session().await.unwrap();
        assert!(session.messages().is_empty());
        assert_ne!(Some(id), previous);
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn failed_create_keeps_prior_session() {
        let (mut session, backend) = session_with(FakeBackend::default()).await;
        backend.fail_create.store(true, Ordering::Relaxed);
        assert!(session.create().await.is_err());
        assert_eq!(session.session_id(), Some("session-1"));
        assert!(session.error().is_some_and(|e| e.contains("connection refused")));
    }

    #[tokio::test]
    async fn operations_need_a_session() {
        let mut session = Session::new(Arc::new(FakeBackend::default()));
        assert!(session.load_history().await.unwrap_err().is_no_session());
        assert!(session.clear().await.unwrap_err().is_no_session());
        let mut pending = PendingAttachments::new();
        let err = session
            .send("q", &mut pending, &QueryOptions::default(), &mut Recorder::default())
            .await
            .unwrap_err();
        assert!(err.is_no_session());
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn history_replaces_the_log() {
        let backend = FakeBackend::default();
        *backend.history.lock().unwrap() = vec![
            HistoryEntry {
                role: "user".to_string(),
                content: "hi".to_string(),
                timestamp: None,
            },
            HistoryEntry {
                role: "system".to_string(),
                content: "odd".to_string(),
                timestamp: None,
            },
        ];
        let (mut session, backend) = session_with(backend).await;
        assert_eq!(session.load_history().await.unwrap(), 2);
        assert_eq!(session.messages()[1].role(), MessageRole::Error);

        session.clear().await.unwrap();
        assert!(session.messages().is_empty());
        assert_eq!(*backend.cleared.lock().unwrap(), vec!["session-1".to_string()]);
    }

    #[test]
    fn transcript_is_written() {
        let session = Session::new(Arc::new(FakeBackend::default()));
        let path = std::env::temp_dir().join(format!(
            "devconsole-transcript-{}.json",
            std::process::id()
        ));
        session.save_transcript_to(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert!(value["messages"].as_array().unwrap().is_empty());
        let _ = std::fs::remove_file(&path);
    }
}
