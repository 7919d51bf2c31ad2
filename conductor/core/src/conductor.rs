//! Conductor - The Orchestration Core
//!
//! The Conductor is the single owner of Geo Explorer's state. It orchestrates:
//! - The chat session handle and the grounded chat backend
//! - The conversation log
//! - The live map intent
//! - The busy flag (at most one turn in flight)
//! - Communication with UI surfaces
//!
//! # Design Philosophy
//!
//! The Conductor is UI-agnostic. It doesn't know or care whether it's talking to
//! the TUI or a test harness. It communicates through:
//! - `ConductorMessage`: Commands sent TO the UI surface
//! - `SurfaceEvent`: Events received FROM the UI surface
//!
//! All state is mutated from the surface's event loop: the backend's stream is
//! drained by [`Conductor::poll_streaming`], never by a background task.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::attachment::ImageAttachment;
use crate::backend::{ChatBackend, InlineData, Part};
use crate::chat::{ChatSessionManager, TurnStream, TurnUpdate};
use crate::config::{ExplorerConfig, DEFAULT_MODEL};
use crate::directive::{parse_turn, MapIntent};
use crate::events::{SurfaceEvent, SurfaceType};
use crate::location::{LatLng, LocationProvider};
use crate::map::{MapView, MapViewController};
use crate::messages::{
    ConductorMessage, ConductorState, EventId, MessageId, MessageRole, NotifyLevel,
};
use crate::prompts::{DEFAULT_IMAGE_PROMPT, WELCOME_MESSAGE};
use crate::security::{ConductorLimits, InputValidator, ValidationResult};
use crate::session::{ConversationLog, ConversationMessage};

/// Prefix of the text that replaces a failed assistant turn
pub const TURN_ERROR_PREFIX: &str = "Sorry, something went wrong: ";
/// Advisory appended when an attachment cannot be loaded
pub const ATTACHMENT_ERROR_MESSAGE: &str = "Sorry, there was an error processing your image file.";

/// Conductor configuration
#[derive(Clone, Debug)]
pub struct ConductorConfig {
    /// Model to use
    pub model: String,
    /// First message of every conversation
    pub welcome_message: String,
    /// Whether to capture a location bias on start
    pub location_enabled: bool,
    /// Security limits
    pub limits: ConductorLimits,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            welcome_message: WELCOME_MESSAGE.to_string(),
            location_enabled: false,
            limits: ConductorLimits::default(),
        }
    }
}

impl ConductorConfig {
    /// Derive from the application configuration
    #[must_use]
    pub fn from_explorer(config: &ExplorerConfig) -> Self {
        Self {
            model: config.backend.model.clone(),
            welcome_message: WELCOME_MESSAGE.to_string(),
            location_enabled: config.location.enabled,
            limits: config.limits.clone(),
        }
    }
}

/// The turn currently streaming into a placeholder message
struct ActiveTurn {
    message_id: MessageId,
    stream: TurnStream,
}

/// The Conductor - headless orchestration core
pub struct Conductor<B: ChatBackend> {
    /// Configuration
    config: ConductorConfig,
    /// Chat backend
    backend: Arc<B>,
    /// Conversation handle
    chat: ChatSessionManager,
    /// Conversation log
    log: ConversationLog,
    /// Live map intent
    map: MapViewController,
    /// Current operational state
    state: ConductorState,
    /// Channel to send messages to UI surface
    tx: mpsc::Sender<ConductorMessage>,
    /// Connected surface info
    surface_type: Option<SurfaceType>,
    /// Whether start() has completed
    ready: bool,
    /// Source of the location bias
    location_provider: Option<Box<dyn LocationProvider>>,
    /// Captured location bias
    location: Option<LatLng>,
    /// Turn in flight; doubles as the busy flag
    active_turn: Option<ActiveTurn>,
    /// Input validator for surface events
    input_validator: InputValidator,
}

impl<B: ChatBackend + 'static> Conductor<B> {
    /// Create a new Conductor with the given backend
    pub fn new(backend: B, config: ConductorConfig, tx: mpsc::Sender<ConductorMessage>) -> Self {
        let input_validator = InputValidator::new(config.limits.clone());
        Self {
            chat: ChatSessionManager::new(config.model.clone()),
            log: ConversationLog::new(config.welcome_message.clone()),
            map: MapViewController::new(),
            config,
            backend: Arc::new(backend),
            state: ConductorState::Initializing,
            tx,
            surface_type: None,
            ready: false,
            location_provider: None,
            location: None,
            active_turn: None,
            input_validator,
        }
    }

    /// Use `provider` for the location bias
    #[must_use]
    pub fn with_location_provider(mut self, provider: impl LocationProvider + 'static) -> Self {
        self.location_provider = Some(Box::new(provider));
        self
    }

    /// Get current state
    pub fn state(&self) -> ConductorState {
        self.state
    }

    /// Check if start() has completed
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        self.active_turn.is_some() || self.state.is_busy()
    }

    /// The conversation log
    pub fn messages(&self) -> &[ConversationMessage] {
        self.log.messages()
    }

    /// The live map intent
    pub fn map_intent(&self) -> Option<&MapIntent> {
        self.map.intent()
    }

    /// What the map pane shows
    pub fn map_view(&self) -> MapView {
        self.map.view()
    }

    /// The conversation handle
    pub fn chat(&self) -> &ChatSessionManager {
        &self.chat
    }

    /// The captured location bias
    pub fn location(&self) -> Option<LatLng> {
        self.location
    }

    /// The connected surface
    pub fn surface_type(&self) -> Option<&SurfaceType> {
        self.surface_type.as_ref()
    }

    /// Start the Conductor
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.set_state(ConductorState::Initializing).await;

        // Check backend health
        if !self.backend.health_check().await {
            tracing::warn!(backend = self.backend.name(), "Backend health check failed");
            self.notify(
                NotifyLevel::Warning,
                &format!("{} backend not reachable - check your API key and network", self.backend.name()),
            )
            .await;
        }

        if self.config.location_enabled {
            self.capture_location().await;
        }

        self.ready = true;
        self.set_state(ConductorState::Ready).await;
        self.send_session_info().await;
        self.send_snapshot().await;

        Ok(())
    }

    /// Capture the location bias, appending the advisory once on failure
    async fn capture_location(&mut self) {
        let Some(provider) = self.location_provider.as_ref() else {
            tracing::debug!("Location enabled but no provider configured");
            return;
        };

        match provider.current_location().await {
            Ok(location) => {
                tracing::info!(%location, "Captured location bias");
                self.location = Some(location);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not get location");
                let advisory = ConversationMessage::with_id(
                    MessageId::location_advisory(),
                    MessageRole::Assistant,
                    e.advisory(),
                );
                if let Some(message) = self.log.add_message_once(advisory).cloned() {
                    self.send(ConductorMessage::MessageAppended { message }).await;
                }
            }
        }
    }

    /// Handle an event from the UI surface
    pub async fn handle_event(&mut self, event: SurfaceEvent) -> anyhow::Result<()> {
        match event {
            SurfaceEvent::Connected {
                event_id,
                surface_type,
            } => {
                tracing::info!(surface = surface_type.name(), "Surface connected");
                self.surface_type = Some(surface_type);
                self.ack(event_id).await;

                // Send current state to new surface
                self.send(ConductorMessage::State { state: self.state })
                    .await;
                self.send_session_info().await;
                self.send_snapshot().await;
            }

            SurfaceEvent::Disconnected { event_id, reason } => {
                tracing::info!(reason = ?reason, "Surface disconnected");
                self.surface_type = None;
                self.ack(event_id).await;
            }

            SurfaceEvent::UserMessage {
                event_id,
                content,
                image,
            } => {
                self.ack(event_id).await;
                self.handle_user_message(content, image).await?;
            }

            SurfaceEvent::SuggestionSelected {
                event_id,
                suggestion,
            } => {
                self.ack(event_id).await;
                let suggestion = suggestion.trim();
                if !suggestion.is_empty() {
                    self.map.set_intent(MapIntent::search(suggestion));
                    self.send_map().await;
                }
            }

            SurfaceEvent::RecenterMap { event_id } => {
                self.ack(event_id).await;
                self.map.recenter();
                self.send_map().await;
            }

            SurfaceEvent::ClearConversation { event_id } => {
                self.ack(event_id).await;
                self.clear_conversation().await;
            }

            SurfaceEvent::QuitRequested { event_id } => {
                self.ack(event_id).await;
                self.shutdown().await?;
            }
        }

        Ok(())
    }

    /// Handle a user submission
    async fn handle_user_message(
        &mut self,
        content: String,
        image: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        if self.is_busy() {
            tracing::debug!("Dropping submission while a turn is in flight");
            return Ok(());
        }
        if content.trim().is_empty() && image.is_none() {
            return Ok(());
        }

        if let ValidationResult::Invalid(reason) = self.input_validator.validate_message(&content) {
            tracing::warn!(reason = %reason, "Rejected user message");
            self.notify(NotifyLevel::Warning, &format!("Invalid message: {reason}"))
                .await;
            return Ok(());
        }

        self.set_state(ConductorState::Thinking).await;

        let prompt_text = if content.trim().is_empty() {
            DEFAULT_IMAGE_PROMPT.to_string()
        } else {
            content
        };

        let attachment = match image {
            Some(path) => {
                match ImageAttachment::load(&path, self.config.limits.max_attachment_bytes).await {
                    Ok(attachment) => Some(attachment),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to load attachment");
                        let message = self.log.add_advisory(ATTACHMENT_ERROR_MESSAGE).clone();
                        self.send(ConductorMessage::MessageAppended { message }).await;
                        self.set_state(ConductorState::Ready).await;
                        return Ok(());
                    }
                }
            }
            None => None,
        };

        let mut parts = vec![Part::text(prompt_text.clone())];
        if let Some(ref attachment) = attachment {
            parts.push(Part::InlineData(InlineData {
                mime_type: attachment.mime_type.clone(),
                data: attachment.data.clone(),
            }));
        }
        let has_new_image = attachment.is_some();

        let message = self.log.add_user_message(prompt_text, attachment).clone();
        self.send(ConductorMessage::MessageAppended { message }).await;

        let placeholder = self.log.start_assistant_response().clone();
        let message_id = placeholder.id.clone();
        self.send(ConductorMessage::MessageAppended {
            message: placeholder,
        })
        .await;

        match self
            .chat
            .send(self.backend.as_ref(), parts, has_new_image, self.location)
            .await
        {
            Ok(stream) => {
                tracing::debug!(session = %stream.session_id(), message = %message_id, "Turn started");
                self.active_turn = Some(ActiveTurn { message_id, stream });
                self.set_state(ConductorState::Responding).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start turn");
                self.fail_turn(&message_id, &e.to_string()).await;
                self.set_state(ConductorState::Ready).await;
            }
        }
        self.send_session_info().await;

        Ok(())
    }

    /// Poll for streaming updates
    ///
    /// Call this regularly to process incoming chunks.
    /// Returns true if there was activity.
    ///
    /// Every progress update carries the whole accumulated state, so the
    /// ready ones collapse into the latest. A poll sends the surface at most
    /// one progress update plus the terminal one, however many chunks queued.
    pub async fn poll_streaming(&mut self) -> bool {
        // Collect first so the stream borrow ends before applying
        let (message_id, progress, terminal) = {
            let Some(turn) = self.active_turn.as_mut() else {
                return false;
            };

            let mut progress = None;
            let mut terminal = None;
            while let Some(update) = turn.stream.try_next() {
                if matches!(update, TurnUpdate::Progress { .. }) {
                    progress = Some(update);
                } else {
                    terminal = Some(update);
                    break;
                }
            }
            (turn.message_id.clone(), progress, terminal)
        };

        if progress.is_none() && terminal.is_none() {
            return false;
        }

        for update in progress.into_iter().chain(terminal) {
            self.apply_turn_update(&message_id, update).await;
        }

        true
    }

    /// Drive the in-flight turn to its end (headless use)
    pub async fn run_turn_to_completion(&mut self) {
        while let Some(turn) = self.active_turn.as_mut() {
            let message_id = turn.message_id.clone();
            match turn.stream.next().await {
                Some(update) => self.apply_turn_update(&message_id, update).await,
                None => self.active_turn = None,
            }
        }
    }

    async fn apply_turn_update(&mut self, message_id: &MessageId, update: TurnUpdate) {
        match update {
            TurnUpdate::Progress { text, citations } => {
                if let Some(message) = self.log.update_streaming(message_id, &text, citations).cloned() {
                    self.send(ConductorMessage::MessageUpdated { message }).await;
                }
            }

            TurnUpdate::Completed(turn) => {
                self.active_turn = None;
                self.chat.commit(&turn);

                let parsed = parse_turn(&turn.text);
                tracing::debug!(
                    intent = ?parsed.map_intent,
                    suggestions = parsed.suggestions.as_ref().map_or(0, Vec::len),
                    citations = turn.citations.len(),
                    "Turn completed"
                );

                if let Some(message) = self
                    .log
                    .finalize(message_id, parsed.display_text, turn.citations, parsed.suggestions)
                    .cloned()
                {
                    self.send(ConductorMessage::MessageUpdated { message }).await;
                }
                if self.map.apply(parsed.map_intent) {
                    self.send_map().await;
                }
                self.set_state(ConductorState::Ready).await;
            }

            TurnUpdate::Failed(error) => {
                self.active_turn = None;
                tracing::warn!(error = %error, "Turn failed");
                self.fail_turn(message_id, &error).await;
                self.set_state(ConductorState::Ready).await;
            }
        }
    }

    async fn fail_turn(&mut self, message_id: &MessageId, error: &str) {
        if let Some(message) = self
            .log
            .fail(message_id, format!("{TURN_ERROR_PREFIX}{error}"))
            .cloned()
        {
            self.send(ConductorMessage::MessageUpdated { message }).await;
        }
    }

    /// Start a fresh conversation, cancelling any turn in flight
    async fn clear_conversation(&mut self) {
        if let Some(turn) = self.active_turn.take() {
            tracing::info!(message = %turn.message_id, "Cancelled in-flight turn");
        }
        self.chat.close();
        self.log.reset();
        self.map.clear();

        self.set_state(ConductorState::Ready).await;
        self.send_session_info().await;
        self.send_snapshot().await;
    }

    /// Shut down the Conductor
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.set_state(ConductorState::ShuttingDown).await;
        self.active_turn = None;
        self.chat.close();

        // Send quit to UI
        self.send(ConductorMessage::Quit {
            message: Some("Goodbye!".to_string()),
        })
        .await;

        Ok(())
    }

    async fn send_snapshot(&self) {
        self.send(ConductorMessage::Snapshot {
            messages: self.log.messages().to_vec(),
            map: self.map.view(),
        })
        .await;
    }

    async fn send_map(&self) {
        self.send(ConductorMessage::MapChanged {
            view: self.map.view(),
        })
        .await;
    }

    async fn send_session_info(&self) {
        self.send(ConductorMessage::SessionInfo {
            session_id: self.chat.current().map(|s| s.id.clone()),
            model: self.config.model.clone(),
            ready: self.ready,
        })
        .await;
    }

    /// Set state and notify UI
    async fn set_state(&mut self, state: ConductorState) {
        self.state = state;
        self.send(ConductorMessage::State { state }).await;
    }

    /// Send acknowledgment
    async fn ack(&self, event_id: EventId) {
        self.send(ConductorMessage::Ack { event_id }).await;
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, message: &str) {
        self.send(ConductorMessage::Notify {
            level,
            title: None,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the UI surface
    async fn send(&self, msg: ConductorMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ChatRequest, StreamChunk};
    use crate::location::LocationError;
    use crate::map::MapTarget;
    use crate::messages::MessageStatus;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    // Mock backend for testing
    struct MockBackend;

    #[async_trait]
    impl ChatBackend for MockBackend {
        fn name(&self) -> &str {
            "Mock"
        }

        async fn health_check(&self) -> bool {
            true
        }

        async fn send_streaming(
            &self,
            _request: &ChatRequest,
        ) -> anyhow::Result<mpsc::Receiver<StreamChunk>> {
            let (tx, rx) = mpsc::channel(10);
            tokio::spawn(async move {
                for text in ["It's in Paris.", "\nMAP_QUERY: Eiffel Tower, Paris"] {
                    let _ = tx
                        .send(StreamChunk::Delta {
                            text: Some(text.to_string()),
                            citations: vec![],
                        })
                        .await;
                }
                let _ = tx.send(StreamChunk::Complete).await;
            });
            Ok(rx)
        }
    }

    struct DeniedLocation;

    #[async_trait]
    impl LocationProvider for DeniedLocation {
        async fn current_location(&self) -> Result<LatLng, LocationError> {
            Err(LocationError::PermissionDenied)
        }
    }

    fn conductor() -> (Conductor<MockBackend>, mpsc::Receiver<ConductorMessage>) {
        let (tx, rx) = mpsc::channel(100);
        (Conductor::new(MockBackend, ConductorConfig::default(), tx), rx)
    }

    #[tokio::test]
    async fn test_conductor_creation() {
        let (conductor, _rx) = conductor();

        assert_eq!(conductor.state(), ConductorState::Initializing);
        assert!(!conductor.is_ready());
        assert_eq!(conductor.messages().len(), 1);
        assert_eq!(conductor.messages()[0].content, WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn test_conductor_start() {
        let (mut conductor, mut rx) = conductor();

        conductor.start().await.unwrap();

        assert!(conductor.is_ready());
        assert_eq!(conductor.state(), ConductorState::Ready);

        // Should have received state first
        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, ConductorMessage::State { .. }));
    }

    #[tokio::test]
    async fn test_surface_connect_and_disconnect() {
        let (mut conductor, _rx) = conductor();
        conductor
            .handle_event(SurfaceEvent::Connected {
                event_id: SurfaceEvent::new_event_id(),
                surface_type: SurfaceType::Tui,
            })
            .await
            .unwrap();
        assert_eq!(conductor.surface_type(), Some(&SurfaceType::Tui));

        conductor
            .handle_event(SurfaceEvent::Disconnected {
                event_id: SurfaceEvent::new_event_id(),
                reason: Some("user quit".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(conductor.surface_type(), None);
    }

    #[tokio::test]
    async fn test_end_to_end_map_query() {
        let (mut conductor, _rx) = conductor();
        conductor.start().await.unwrap();

        conductor
            .handle_event(SurfaceEvent::user_message("Eiffel Tower"))
            .await
            .unwrap();
        assert!(conductor.is_busy());
        conductor.run_turn_to_completion().await;

        let last = conductor.messages().last().unwrap();
        assert_eq!(last.content, "It's in Paris.");
        assert_eq!(last.status, MessageStatus::Complete);
        assert_eq!(
            conductor.map_intent(),
            Some(&MapIntent::search("Eiffel Tower, Paris"))
        );
        assert!(!conductor.is_busy());
        assert_eq!(conductor.chat().current().map(|s| s.turns()), Some(1));
    }

    #[tokio::test]
    async fn test_blank_submission_ignored() {
        let (mut conductor, _rx) = conductor();
        conductor.start().await.unwrap();

        conductor
            .handle_event(SurfaceEvent::user_message("   "))
            .await
            .unwrap();
        assert_eq!(conductor.messages().len(), 1);
        assert!(!conductor.is_busy());
    }

    #[tokio::test]
    async fn test_suggestion_and_recenter() {
        let (mut conductor, _rx) = conductor();
        conductor
            .handle_event(SurfaceEvent::SuggestionSelected {
                event_id: SurfaceEvent::new_event_id(),
                suggestion: "Louvre Museum".to_string(),
            })
            .await
            .unwrap();
        let view = conductor.map_view();
        assert!(matches!(view.target, MapTarget::Search { ref query, .. } if query == "Louvre Museum"));

        conductor
            .handle_event(SurfaceEvent::RecenterMap {
                event_id: SurfaceEvent::new_event_id(),
            })
            .await
            .unwrap();
        assert_eq!(conductor.map_view().target, view.target);
        assert_eq!(conductor.map_view().generation, view.generation + 1);
    }

    #[tokio::test]
    async fn test_location_advisory_appended_once() {
        let (tx, _rx) = mpsc::channel(100);
        let config = ConductorConfig {
            location_enabled: true,
            ..Default::default()
        };
        let mut conductor = Conductor::new(MockBackend, config, tx).with_location_provider(DeniedLocation);

        conductor.start().await.unwrap();
        conductor.start().await.unwrap();

        let advisories: Vec<_> = conductor
            .messages()
            .iter()
            .filter(|m| m.id == MessageId::location_advisory())
            .collect();
        assert_eq!(advisories.len(), 1);
        assert!(advisories[0].content.starts_with("Location access issue: "));
        assert!(conductor.location().is_none());
    }
}
