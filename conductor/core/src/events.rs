//! Surface Events
//!
//! Events sent from UI surfaces to the Conductor. These represent all the ways
//! a UI can report user actions to the orchestration layer.
//!
//! # Design Philosophy
//!
//! UI surfaces are "dumb" renderers that forward user actions to the Conductor.
//! A surface never parses model output or decides what the map shows; it
//! reports "the user submitted this" or "the user picked that suggestion" and
//! renders whatever the Conductor sends back.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::messages::EventId;

/// Events from UI Surface to Conductor
///
/// These events tell the Conductor what the user is doing. The Conductor
/// responds with ConductorMessages.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SurfaceEvent {
    // ============================================
    // Connection Events
    // ============================================
    /// Surface connected to Conductor
    Connected {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// Surface type identifier
        surface_type: SurfaceType,
    },

    /// Surface disconnecting gracefully
    Disconnected {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// Reason for disconnect (optional)
        reason: Option<String>,
    },

    // ============================================
    // User Input Events
    // ============================================
    /// User submitted a message, optionally with an image
    UserMessage {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// The message text (may be blank when an image is attached)
        content: String,
        /// Path of the attached image
        image: Option<PathBuf>,
    },

    /// User picked one of the latest suggestions
    SuggestionSelected {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// The suggestion text
        suggestion: String,
    },

    /// User asked the map to reload
    RecenterMap {
        /// Event ID for acknowledgment
        event_id: EventId,
    },

    /// User asked for a fresh conversation
    ClearConversation {
        /// Event ID for acknowledgment
        event_id: EventId,
    },

    // ============================================
    // Lifecycle Events
    // ============================================
    /// User requested quit
    QuitRequested {
        /// Event ID for acknowledgment
        event_id: EventId,
    },
}

impl SurfaceEvent {
    /// Generate a new event ID for this event
    pub fn new_event_id() -> EventId {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        EventId(format!("evt_{id}"))
    }

    /// Get the event ID
    pub fn event_id(&self) -> &EventId {
        match self {
            Self::Connected { event_id, .. }
            | Self::Disconnected { event_id, .. }
            | Self::UserMessage { event_id, .. }
            | Self::SuggestionSelected { event_id, .. }
            | Self::RecenterMap { event_id }
            | Self::ClearConversation { event_id }
            | Self::QuitRequested { event_id } => event_id,
        }
    }

    /// A text-only user message
    pub fn user_message(content: impl Into<String>) -> Self {
        Self::UserMessage {
            event_id: Self::new_event_id(),
            content: content.into(),
            image: None,
        }
    }
}

/// Type of UI surface
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceType {
    /// Terminal UI (ratatui/crossterm)
    Tui,
    /// Headless (for testing/automation)
    Headless,
}

impl SurfaceType {
    /// Human-readable name
    pub fn name(&self) -> &str {
        match self {
            Self::Tui => "Terminal",
            Self::Headless => "Headless",
        }
    }
}
