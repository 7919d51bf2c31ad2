//! Display State Types
//!
//! Types that represent the current display state for the TUI.
//! These are derived from ConductorMessages and used for rendering.
//!
//! # Design Philosophy
//!
//! The TUI is a "thin client" - it just renders what the Conductor tells it to.
//! Display state is the bridge between ConductorMessages and rendering.
//!
//! - DisplayMessage: A rendered conversation message
//! - MapView: What the map pane shows (passed through unchanged)

use geo_conductor::{
    Citation, ConductorMessage, ConductorState, ConversationMessage, MapTarget, MapView,
    MessageId, MessageRole, MessageStatus, NotifyLevel, PlaceholderReason, SessionId,
};

/// A rendered conversation message
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: DisplayRole,
    /// The message content
    pub content: String,
    /// Lifecycle state
    pub status: MessageStatus,
    /// Grounding sources
    pub citations: Vec<Citation>,
    /// Candidate places the user can pick
    pub suggestions: Vec<String>,
    /// Name of the attached image, if any
    pub image_name: Option<String>,
}

impl DisplayMessage {
    /// Whether this message is still being streamed
    pub fn is_streaming(&self) -> bool {
        self.status.is_in_flight()
    }

    /// Whether the turn behind this message failed
    pub fn is_failed(&self) -> bool {
        self.status == MessageStatus::Failed
    }
}

impl From<ConversationMessage> for DisplayMessage {
    fn from(message: ConversationMessage) -> Self {
        Self {
            id: message.id,
            role: message.role.into(),
            content: message.content,
            status: message.status,
            citations: message.citations,
            suggestions: message.suggestions.unwrap_or_default(),
            image_name: message.image.map(|image| image.file_name),
        }
    }
}

/// Display role for messages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayRole {
    /// User input
    User,
    /// The explorer assistant
    Assistant,
}

impl From<MessageRole> for DisplayRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => DisplayRole::User,
            MessageRole::Assistant => DisplayRole::Assistant,
        }
    }
}

impl DisplayRole {
    /// Get the prefix for this role
    pub fn prefix(&self) -> &'static str {
        match self {
            DisplayRole::User => "You: ",
            DisplayRole::Assistant => "Explorer: ",
        }
    }
}

/// The full display state for the TUI
#[derive(Debug)]
pub struct DisplayState {
    /// Conversation messages
    pub messages: Vec<DisplayMessage>,
    /// What the map pane shows
    pub map: MapView,
    /// Conductor state
    pub conductor_state: ConductorState,
    /// Model name
    pub session_model: String,
    /// Open chat session, if any
    pub session_id: Option<SessionId>,
    /// Whether system is ready
    pub ready: bool,
    /// Pending notification (if any)
    pub notification: Option<DisplayNotification>,
    /// Set once the Conductor has said goodbye
    pub quit_message: Option<String>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            map: MapView {
                target: MapTarget::Placeholder {
                    reason: PlaceholderReason::NoSearchYet,
                },
                generation: 0,
            },
            conductor_state: ConductorState::Initializing,
            session_model: String::new(),
            session_id: None,
            ready: false,
            notification: None,
            quit_message: None,
        }
    }
}

impl DisplayState {
    /// Create a new display state
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a ConductorMessage to update display state
    pub fn apply_message(&mut self, msg: ConductorMessage) {
        match msg {
            ConductorMessage::Snapshot { messages, map } => {
                self.messages = messages.into_iter().map(DisplayMessage::from).collect();
                self.map = map;
            }
            ConductorMessage::MessageAppended { message } => {
                self.messages.push(message.into());
            }
            ConductorMessage::MessageUpdated { message } => {
                let message = DisplayMessage::from(message);
                match self.messages.iter_mut().find(|m| m.id == message.id) {
                    Some(existing) => *existing = message,
                    None => {
                        tracing::debug!(id = %message.id, "Update for unknown message, appending");
                        self.messages.push(message);
                    }
                }
            }
            ConductorMessage::MapChanged { view } => {
                self.map = view;
            }

            // System messages
            ConductorMessage::State { state } => {
                self.conductor_state = state;
            }
            ConductorMessage::SessionInfo {
                session_id,
                model,
                ready,
            } => {
                self.session_id = session_id;
                self.session_model = model;
                self.ready = ready;
            }
            ConductorMessage::Notify {
                level,
                title,
                message,
            } => {
                self.notification = Some(DisplayNotification {
                    level,
                    title,
                    message,
                });
            }
            ConductorMessage::Quit { message } => {
                self.quit_message = Some(message.unwrap_or_default());
            }
            ConductorMessage::Ack { .. } => {}
        }
    }

    /// Suggestions of the latest assistant message
    pub fn latest_suggestions(&self) -> &[String] {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == DisplayRole::Assistant)
            .map_or(&[], |m| m.suggestions.as_slice())
    }

    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        self.conductor_state.is_busy()
    }

    /// Check if a message is currently streaming
    pub fn is_streaming(&self) -> bool {
        self.messages.iter().any(DisplayMessage::is_streaming)
    }

    /// Set a local notification
    pub fn notify(&mut self, level: NotifyLevel, message: impl Into<String>) {
        self.notification = Some(DisplayNotification {
            level,
            title: None,
            message: message.into(),
        });
    }

    /// Clear the notification
    pub fn clear_notification(&mut self) {
        self.notification = None;
    }
}

/// A notification to display
#[derive(Clone, Debug)]
pub struct DisplayNotification {
    /// Notification level
    pub level: NotifyLevel,
    /// Optional title
    pub title: Option<String>,
    /// Message content
    pub message: String,
}
