//! Chat Session Manager
//!
//! Owns the conversation handle the model sees. A handle is opened with a
//! system instruction chosen by whether the opening turn carries an image, and
//! is replaced whenever a new image arrives (a new image is a new topic).
//! Text-only turns reuse the open handle so follow-up questions keep context.
//!
//! The handle's history is replayed on every request. A turn is committed to
//! it only after its stream completes, so a failed turn leaves the handle
//! exactly as it was.
//!
//! ```text
//!            send(has_new_image = true)
//!   Closed ───────────────────────────────▶ Open(image analysis)
//!     │  send(text)                            │  send(image)  ─▶ Open(new handle)
//!     └──────────────▶ Open(text only) ◀───────┘  send(text)    ─▶ same handle
//!                          │ close()
//!                          ▼
//!                        Closed
//! ```

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::backend::{ChatBackend, ChatRequest, Content, Part, StreamChunk};
use crate::citations::{Citation, CitationSet};
use crate::location::LatLng;
use crate::messages::SessionId;
use crate::prompts::{system_instruction, InstructionSet};

/// An open conversation handle
#[derive(Clone, Debug)]
pub struct ChatSession {
    /// Handle identifier
    pub id: SessionId,
    /// Instruction set chosen when the handle was opened
    pub instruction: InstructionSet,
    /// Full system instruction text
    pub system_instruction: String,
    /// Location bias captured when the handle was opened
    pub location_bias: Option<LatLng>,
    /// Committed turns, oldest first
    pub history: Vec<Content>,
}

impl ChatSession {
    fn open(instruction: InstructionSet, location_bias: Option<LatLng>) -> Self {
        Self {
            id: SessionId::new(),
            instruction,
            system_instruction: system_instruction(instruction),
            location_bias,
            history: Vec::new(),
        }
    }

    /// Number of committed exchanges
    #[must_use]
    pub fn turns(&self) -> usize {
        self.history.len() / 2
    }
}

/// Handle state
#[derive(Clone, Debug, Default)]
pub enum SessionState {
    /// No handle; the next send opens one
    #[default]
    Closed,
    /// A handle is open
    Open(ChatSession),
}

/// A finished turn, ready to commit
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedTurn {
    /// Handle the turn was sent on
    pub session_id: SessionId,
    /// The user content that was sent
    pub user: Content,
    /// Full accumulated response text
    pub text: String,
    /// Final deduplicated citations
    pub citations: Vec<Citation>,
}

/// Progress of a streaming turn
#[derive(Clone, Debug, PartialEq)]
pub enum TurnUpdate {
    /// Accumulated state after a delta
    Progress {
        /// All text so far
        text: String,
        /// All citations so far
        citations: Vec<Citation>,
    },
    /// The stream finished
    Completed(CompletedTurn),
    /// The stream failed
    Failed(String),
}

/// Consumer side of one in-flight turn
///
/// Folds backend chunks into the running text and citation set and yields the
/// merged state after every delta. After a terminal update it yields nothing.
/// Dropping it cancels the turn: the backend's forwarding task stops at its
/// next send.
#[derive(Debug)]
pub struct TurnStream {
    session_id: SessionId,
    user: Content,
    rx: mpsc::Receiver<StreamChunk>,
    text: String,
    citations: CitationSet,
    finished: bool,
}

impl TurnStream {
    /// Handle this turn was sent on
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Wait for the next update
    pub async fn next(&mut self) -> Option<TurnUpdate> {
        if self.finished {
            return None;
        }
        let chunk = self.rx.recv().await;
        Some(self.fold(chunk))
    }

    /// Next update if one is ready, without waiting
    pub fn try_next(&mut self) -> Option<TurnUpdate> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(chunk) => Some(self.fold(Some(chunk))),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.fold(None)),
        }
    }

    /// `None` is a closed channel, which counts as completion
    fn fold(&mut self, chunk: Option<StreamChunk>) -> TurnUpdate {
        match chunk {
            Some(StreamChunk::Delta { text, citations }) => {
                if let Some(text) = text {
                    self.text.push_str(&text);
                }
                self.citations.merge(citations);
                TurnUpdate::Progress {
                    text: self.text.clone(),
                    citations: self.citations.to_vec(),
                }
            }
            Some(StreamChunk::Complete) | None => {
                self.finished = true;
                TurnUpdate::Completed(CompletedTurn {
                    session_id: self.session_id.clone(),
                    user: self.user.clone(),
                    text: std::mem::take(&mut self.text),
                    citations: self.citations.to_vec(),
                })
            }
            Some(StreamChunk::Error(message)) => {
                self.finished = true;
                TurnUpdate::Failed(message)
            }
        }
    }
}

/// Owner of the conversation handle
#[derive(Debug)]
pub struct ChatSessionManager {
    model: String,
    state: SessionState,
}

impl ChatSessionManager {
    /// Create a manager with no open handle
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            state: SessionState::Closed,
        }
    }

    /// The open handle, if any
    #[must_use]
    pub fn current(&self) -> Option<&ChatSession> {
        match &self.state {
            SessionState::Open(session) => Some(session),
            SessionState::Closed => None,
        }
    }

    /// Close the handle; returns the closed handle's id
    pub fn close(&mut self) -> Option<SessionId> {
        match std::mem::take(&mut self.state) {
            SessionState::Open(session) => {
                tracing::debug!(session = %session.id, turns = session.turns(), "Closed chat session");
                Some(session.id)
            }
            SessionState::Closed => None,
        }
    }

    /// Send one user turn
    ///
    /// Opens a new handle when `has_new_image` is set or none is open. The
    /// prompt parts are sent after the handle's history.
    pub async fn send<B>(
        &mut self,
        backend: &B,
        parts: Vec<Part>,
        has_new_image: bool,
        location: Option<LatLng>,
    ) -> anyhow::Result<TurnStream>
    where
        B: ChatBackend + ?Sized,
    {
        let session = self.take_session_for_turn(has_new_image, location);

        let user = Content::user(parts);
        let mut contents = session.history.clone();
        contents.push(user.clone());

        let request = ChatRequest::new(
            self.model.clone(),
            session.system_instruction.clone(),
            contents,
        )
        .with_location_bias(session.location_bias);
        let session_id = session.id.clone();
        self.state = SessionState::Open(session);

        let rx = backend.send_streaming(&request).await?;

        Ok(TurnStream {
            session_id,
            user,
            rx,
            text: String::new(),
            citations: CitationSet::new(),
            finished: false,
        })
    }

    /// Append a completed turn to its handle's history
    ///
    /// Returns false when the handle has since been closed or replaced.
    pub fn commit(&mut self, turn: &CompletedTurn) -> bool {
        match &mut self.state {
            SessionState::Open(session) if session.id == turn.session_id => {
                session.history.push(turn.user.clone());
                session.history.push(Content::model_text(turn.text.clone()));
                true
            }
            _ => {
                tracing::debug!(session = %turn.session_id, "Dropping turn for a stale session");
                false
            }
        }
    }

    fn take_session_for_turn(&mut self, has_new_image: bool, location: Option<LatLng>) -> ChatSession {
        match std::mem::take(&mut self.state) {
            SessionState::Open(session) if !has_new_image => session,
            _ => {
                let session = ChatSession::open(InstructionSet::for_turn(has_new_image), location);
                tracing::info!(
                    session = %session.id,
                    instruction = ?session.instruction,
                    location_bias = location.is_some(),
                    "Opened chat session"
                );
                session
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Role;
    use crate::citations::CitationKind;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Records requests and replays a fixed chunk script
    struct ScriptedBackend {
        script: Vec<StreamChunk>,
        requests: Mutex<Vec<ChatRequest>>,
        fail_send: bool,
    }

    impl ScriptedBackend {
        fn new(script: Vec<StreamChunk>) -> Self {
            Self {
                script,
                requests: Mutex::new(Vec::new()),
                fail_send: false,
            }
        }

        fn last_request(&self) -> ChatRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "Scripted"
        }

        async fn health_check(&self) -> bool {
            true
        }

        async fn send_streaming(
            &self,
            request: &ChatRequest,
        ) -> anyhow::Result<mpsc::Receiver<StreamChunk>> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_send {
                anyhow::bail!("connection refused");
            }
            let (tx, rx) = mpsc::channel(16);
            for chunk in self.script.clone() {
                tx.send(chunk).await.unwrap();
            }
            Ok(rx)
        }
    }

    fn delta(text: &str) -> StreamChunk {
        StreamChunk::Delta {
            text: Some(text.to_string()),
            citations: vec![],
        }
    }

    async fn run_turn(stream: &mut TurnStream) -> TurnUpdate {
        let mut last = None;
        while let Some(update) = stream.next().await {
            last = Some(update);
        }
        last.unwrap()
    }

    #[tokio::test]
    async fn test_text_turn_opens_text_session() {
        let backend = ScriptedBackend::new(vec![delta("Hi"), StreamChunk::Complete]);
        let mut chat = ChatSessionManager::new("gemini-2.5-flash");

        let mut stream = chat.send(&backend, vec![Part::text("Paris")], false, None).await.unwrap();
        assert_eq!(chat.current().map(|s| s.instruction), Some(InstructionSet::TextOnly));
        assert_eq!(backend.last_request().system_instruction, system_instruction(InstructionSet::TextOnly));

        let TurnUpdate::Completed(turn) = run_turn(&mut stream).await else {
            panic!("expected completion");
        };
        assert_eq!(turn.text, "Hi");
        assert!(chat.commit(&turn));
        assert_eq!(chat.current().map(ChatSession::turns), Some(1));
    }

    #[tokio::test]
    async fn test_follow_up_replays_history() {
        let backend = ScriptedBackend::new(vec![delta("Answer"), StreamChunk::Complete]);
        let mut chat = ChatSessionManager::new("m");

        let mut first = chat.send(&backend, vec![Part::text("Q1")], false, None).await.unwrap();
        let TurnUpdate::Completed(turn) = run_turn(&mut first).await else {
            panic!("expected completion");
        };
        chat.commit(&turn);
        let first_id = chat.current().unwrap().id.clone();

        chat.send(&backend, vec![Part::text("Q2")], false, None).await.unwrap();
        assert_eq!(chat.current().unwrap().id, first_id);

        let contents = backend.last_request().contents;
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0], Content::user(vec![Part::text("Q1")]));
        assert_eq!(contents[1], Content::model_text("Answer"));
        assert_eq!(contents[2].role, Role::User);
    }

    #[tokio::test]
    async fn test_new_image_replaces_session() {
        let backend = ScriptedBackend::new(vec![StreamChunk::Complete]);
        let mut chat = ChatSessionManager::new("m");

        chat.send(&backend, vec![Part::text("Q1")], false, None).await.unwrap();
        let text_id = chat.current().unwrap().id.clone();

        let location = LatLng::new(10.0, 20.0).ok();
        chat.send(&backend, vec![Part::text("Where?")], true, location).await.unwrap();
        let session = chat.current().unwrap();
        assert_ne!(session.id, text_id);
        assert_eq!(session.instruction, InstructionSet::ImageAnalysis);
        assert_eq!(backend.last_request().contents.len(), 1);
        assert_eq!(backend.last_request().location_bias, location);
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_handle() {
        let backend = ScriptedBackend::new(vec![delta("part"), StreamChunk::Error("boom".to_string())]);
        let mut chat = ChatSessionManager::new("m");

        let mut stream = chat.send(&backend, vec![Part::text("Q")], false, None).await.unwrap();
        assert_eq!(run_turn(&mut stream).await, TurnUpdate::Failed("boom".to_string()));
        assert_eq!(chat.current().map(|s| s.history.len()), Some(0));
    }

    #[tokio::test]
    async fn test_send_error_propagates() {
        let mut backend = ScriptedBackend::new(vec![]);
        backend.fail_send = true;
        let mut chat = ChatSessionManager::new("m");

        let result = chat.send(&backend, vec![Part::text("Q")], false, None).await;
        assert!(result.is_err());
        assert!(chat.current().is_some());
    }

    #[tokio::test]
    async fn test_progress_accumulates_and_dedups() {
        let a = Citation::new("https://a", "A1", CitationKind::Web);
        let a2 = Citation::new("https://a", "A2", CitationKind::Web);
        let backend = ScriptedBackend::new(vec![
            StreamChunk::Delta {
                text: Some("It's ".to_string()),
                citations: vec![a],
            },
            StreamChunk::Delta {
                text: None,
                citations: vec![a2.clone()],
            },
            delta("in Paris."),
        ]);
        let mut chat = ChatSessionManager::new("m");
        let mut stream = chat.send(&backend, vec![Part::text("Q")], false, None).await.unwrap();

        let mut updates = Vec::new();
        while let Some(update) = stream.next().await {
            updates.push(update);
        }

        assert_eq!(
            updates[2],
            TurnUpdate::Progress {
                text: "It's in Paris.".to_string(),
                citations: vec![a2.clone()],
            }
        );
        // The channel closing without a terminal chunk completes the turn
        let TurnUpdate::Completed(turn) = &updates[3] else {
            panic!("expected completion");
        };
        assert_eq!(turn.citations, vec![a2]);
        assert_eq!(updates.len(), 4);
    }

    #[tokio::test]
    async fn test_commit_after_close_is_dropped() {
        let backend = ScriptedBackend::new(vec![StreamChunk::Complete]);
        let mut chat = ChatSessionManager::new("m");
        let mut stream = chat.send(&backend, vec![Part::text("Q")], false, None).await.unwrap();
        let TurnUpdate::Completed(turn) = run_turn(&mut stream).await else {
            panic!("expected completion");
        };

        assert!(chat.close().is_some());
        assert!(!chat.commit(&turn));
        assert!(chat.current().is_none());
        assert!(chat.close().is_none());
    }

    #[test]
    fn test_next_waits_for_a_chunk() {
        let (tx, rx) = mpsc::channel(4);
        let mut stream = TurnStream {
            session_id: SessionId::new(),
            user: Content::user(vec![Part::text("Q")]),
            rx,
            text: String::new(),
            citations: CitationSet::new(),
            finished: false,
        };

        {
            let mut next = tokio_test::task::spawn(stream.next());
            tokio_test::assert_pending!(next.poll());

            tx.try_send(delta("Paris")).unwrap();
            assert!(next.is_woken());
            let update = tokio_test::assert_ready!(next.poll());
            assert_eq!(
                update,
                Some(TurnUpdate::Progress {
                    text: "Paris".to_string(),
                    citations: vec![],
                })
            );
        }

        drop(tx);
        let mut next = tokio_test::task::spawn(stream.next());
        let update = tokio_test::assert_ready!(next.poll());
        assert!(matches!(update, Some(TurnUpdate::Completed(ref turn)) if turn.text == "Paris"));
    }
}
