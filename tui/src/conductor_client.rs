//! Conductor Client
//!
//! Thin wrapper around the Conductor for TUI integration.
//! This client embeds the Conductor directly (no network) and provides
//! a convenient interface for sending events and receiving messages.
//!
//! # Architecture
//!
//! The TUI is a "thin client" - it doesn't contain any business logic.
//! All orchestration happens in the Conductor. The TUI's job is:
//! 1. Convert terminal events to SurfaceEvents
//! 2. Send SurfaceEvents to Conductor
//! 3. Receive ConductorMessages
//! 4. Render display state based on messages

use std::path::PathBuf;

use tokio::sync::mpsc;

use geo_conductor::{
    ChatBackend, Conductor, ConductorConfig, ConductorMessage, ConductorState, ConfiguredLocation,
    LatLng, SurfaceEvent, SurfaceType,
};

/// Capacity of the Conductor -> TUI channel
const CHANNEL_CAPACITY: usize = 256;

/// Client for communicating with the embedded Conductor
pub struct ConductorClient<B: ChatBackend + 'static> {
    /// The embedded Conductor instance
    conductor: Conductor<B>,
    /// Receiver for messages from Conductor
    rx: mpsc::Receiver<ConductorMessage>,
}

impl<B: ChatBackend + 'static> ConductorClient<B> {
    /// Create a client around a new Conductor
    ///
    /// `location` feeds the location bias when `config.location_enabled` is set.
    pub fn new(backend: B, config: ConductorConfig, location: Option<LatLng>) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let conductor =
            Conductor::new(backend, config, tx).with_location_provider(ConfiguredLocation::new(location));
        Self { conductor, rx }
    }

    /// Start the Conductor (health check, location bias)
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.conductor.start().await
    }

    /// Connect this surface to the Conductor
    pub async fn connect(&mut self) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::Connected {
            event_id: SurfaceEvent::new_event_id(),
            surface_type: SurfaceType::Tui,
        })
        .await
    }

    /// Tell the Conductor this surface is going away
    pub async fn disconnect(&mut self, reason: impl Into<String>) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::Disconnected {
            event_id: SurfaceEvent::new_event_id(),
            reason: Some(reason.into()),
        })
        .await
    }

    /// Submit the composer's text and attachment
    pub async fn send_message(&mut self, content: String, image: Option<PathBuf>) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::UserMessage {
            event_id: SurfaceEvent::new_event_id(),
            content,
            image,
        })
        .await
    }

    /// Show a suggestion on the map
    pub async fn select_suggestion(&mut self, suggestion: String) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::SuggestionSelected {
            event_id: SurfaceEvent::new_event_id(),
            suggestion,
        })
        .await
    }

    /// Reload the map view
    pub async fn recenter_map(&mut self) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::RecenterMap {
            event_id: SurfaceEvent::new_event_id(),
        })
        .await
    }

    /// Start a fresh conversation
    pub async fn clear_conversation(&mut self) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::ClearConversation {
            event_id: SurfaceEvent::new_event_id(),
        })
        .await
    }

    /// Notify Conductor that user wants to quit
    pub async fn request_quit(&mut self) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::QuitRequested {
            event_id: SurfaceEvent::new_event_id(),
        })
        .await
    }

    /// Poll for streaming updates (must be called regularly)
    pub async fn poll_streaming(&mut self) -> bool {
        self.conductor.poll_streaming().await
    }

    /// Receive all pending messages from the Conductor (non-blocking)
    pub fn recv_all(&mut self) -> Vec<ConductorMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Get the current Conductor state
    pub fn state(&self) -> ConductorState {
        self.conductor.state()
    }

    /// Check if the Conductor is ready
    pub fn is_ready(&self) -> bool {
        self.conductor.is_ready()
    }

    /// Whether a surface is connected
    pub fn is_connected(&self) -> bool {
        self.conductor.surface_type().is_some()
    }

    /// Send raw surface event to Conductor
    pub async fn send_event(&mut self, event: SurfaceEvent) -> anyhow::Result<()> {
        self.conductor.handle_event(event).await
    }
}
