//! Conductor Messages
//!
//! Messages sent from the Conductor to UI surfaces. These represent all the ways
//! the orchestration layer can communicate with a connected surface (the TUI, a
//! headless test harness, ...).
//!
//! # Design Philosophy
//!
//! The Conductor owns the conversation log, the chat session handle and the live
//! map intent. Surfaces are pure renderers: they apply these messages to their
//! display state and never interpret model output themselves.

use serde::{Deserialize, Serialize};

use crate::map::MapView;
use crate::session::ConversationMessage;

/// Messages from Conductor to UI Surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ConductorMessage {
    // ============================================
    // Conversation Messages
    // ============================================
    /// Full state snapshot (on connect and after a conversation reset)
    Snapshot {
        /// Every message in the log, in insertion order
        messages: Vec<ConversationMessage>,
        /// What the map pane should currently show
        map: MapView,
    },

    /// A new message was appended to the log
    MessageAppended {
        /// The appended message
        message: ConversationMessage,
    },

    /// An existing message changed in place (streaming progress, finalization, failure)
    MessageUpdated {
        /// The message in its new state
        message: ConversationMessage,
    },

    // ============================================
    // Map Directives
    // ============================================
    /// The map view changed (new intent or a forced reload)
    MapChanged {
        /// The new map view
        view: MapView,
    },

    // ============================================
    // System Messages
    // ============================================
    /// System notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Title (optional)
        title: Option<String>,
        /// Message content
        message: String,
    },

    /// Conductor state change
    State {
        /// The new state
        state: ConductorState,
    },

    /// Acknowledgment of received event
    Ack {
        /// Event ID being acknowledged
        event_id: EventId,
    },

    /// Session information
    SessionInfo {
        /// Current chat session handle, if one is open
        session_id: Option<SessionId>,
        /// Model being used
        model: String,
        /// Whether the conductor accepts submissions
        ready: bool,
    },

    /// Request surface to quit
    Quit {
        /// Optional goodbye message
        message: Option<String>,
    },
}

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }

    /// ID of the welcome message that opens every conversation
    pub fn welcome() -> Self {
        Self("init".to_string())
    }

    /// ID reserved for the location advisory (appended at most once)
    pub fn location_advisory() -> Self {
        Self("system-location-error".to_string())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event identifier (for acks)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

/// Chat session handle identifier
///
/// A new handle is opened for every conversation topic (a new image always
/// starts a new topic), so these are random rather than sequential.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new unique session ID
    pub fn new() -> Self {
        Self(format!("chat_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    /// User input
    User,
    /// The model (and conductor advisories shown in its voice)
    Assistant,
}

/// Lifecycle of a message in the log
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Placeholder appended, no tokens yet
    Pending,
    /// Tokens are arriving
    Streaming,
    /// Final content
    Complete,
    /// The turn failed; content is the error text
    Failed,
}

impl MessageStatus {
    /// Whether the message can still change
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Streaming)
    }
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

/// Conductor operational states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductorState {
    /// Starting up, not ready
    Initializing,
    /// Ready for input
    Ready,
    /// Preparing a turn (loading attachment, opening the stream)
    Thinking,
    /// Streaming a response
    Responding,
    /// Shutting down
    ShuttingDown,
}

impl ConductorState {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Initializing => "Starting up...",
            Self::Ready => "Ready",
            Self::Thinking => "Thinking...",
            Self::Responding => "Responding...",
            Self::ShuttingDown => "Shutting down...",
        }
    }

    /// Whether a chat turn is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Thinking | Self::Responding)
    }
}
