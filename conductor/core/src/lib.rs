//! Geo Conductor - Headless Core for Geo Explorer
//!
//! This crate provides the core logic for Geo Explorer, a chat client that
//! sends text and images to a grounded chat model, extracts map directives
//! from the streamed replies and decides what the map pane shows. It is
//! completely independent of any UI framework and can drive the TUI or run
//! headless for testing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          UI Surfaces                              │
//! │        ┌──────────────────────┐   ┌──────────────────────┐        │
//! │        │ TUI (ratatui)        │   │ Headless / tests     │        │
//! │        │ chat pane | map pane │   │                      │        │
//! │        └──────────┬───────────┘   └──────────┬───────────┘        │
//! │                   └─────────────┬────────────┘                    │
//! │                        SurfaceEvent (up)                          │
//! │                      ConductorMessage (down)                      │
//! └─────────────────────────────────┼─────────────────────────────────┘
//!                                   │
//! ┌─────────────────────────────────┼─────────────────────────────────┐
//! │                          CONDUCTOR CORE                            │
//! │  ┌──────────────────────────────┴───────────────────────────────┐ │
//! │  │                          Conductor                            │ │
//! │  │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────┐ │ │
//! │  │  │    Chat    │ │Conversation│ │  Map View  │ │ Directive  │ │ │
//! │  │  │  Session   │ │    Log     │ │ Controller │ │   Parser   │ │ │
//! │  │  └─────┬──────┘ └────────────┘ └────────────┘ └────────────┘ │ │
//! │  └────────┼──────────────────────────────────────────────────────┘ │
//! │     ┌─────┴──────┐                                                 │
//! │     │  Backend   │  Gemini streamGenerateContent (SSE)             │
//! │     └────────────┘                                                 │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Conductor`]: Owns all state and turns surface events into work
//! - [`ConductorMessage`]: Messages sent from Conductor to UI surfaces
//! - [`SurfaceEvent`]: Events sent from UI surfaces to Conductor
//! - [`ChatSessionManager`]: The conversation handle the model sees
//! - [`ConversationLog`]: The messages a surface renders
//! - [`MapViewController`]: The live map intent
//!
//! # Quick Start
//!
//! ```ignore
//! use geo_conductor::{
//!     backend::GeminiBackend, load_config, Conductor, ConductorConfig, SurfaceEvent, SurfaceType,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config(None)?;
//!     let (tx, mut rx) = mpsc::channel(100);
//!
//!     let backend = GeminiBackend::from_config(&config.backend)?;
//!     let mut conductor = Conductor::new(backend, ConductorConfig::from_explorer(&config), tx);
//!     conductor.start().await?;
//!
//!     conductor.handle_event(SurfaceEvent::Connected {
//!         event_id: SurfaceEvent::new_event_id(),
//!         surface_type: SurfaceType::Headless,
//!     }).await?;
//!
//!     conductor.handle_event(SurfaceEvent::user_message("Eiffel Tower")).await?;
//!     loop {
//!         conductor.poll_streaming().await;
//!         while let Ok(msg) = rx.try_recv() {
//!             // Render message
//!         }
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`attachment`]: Image loading for inline data
//! - [`backend`]: Chat backend abstraction and the Gemini implementation
//! - [`chat`]: Conversation handle and turn streaming
//! - [`citations`]: Grounding citations, deduplicated by URI
//! - [`conductor`]: Main Conductor struct
//! - [`config`]: TOML and environment configuration
//! - [`directive`]: Map directive parsing
//! - [`events`]: Events from UI surfaces to Conductor
//! - [`location`]: Optional location bias
//! - [`map`]: Map intent to view target
//! - [`messages`]: Messages from Conductor to UI surfaces
//! - [`prompts`]: System instructions
//! - [`security`]: Input limits
//! - [`session`]: Conversation log
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attachment;
pub mod backend;
pub mod chat;
pub mod citations;
pub mod conductor;
pub mod config;
pub mod directive;
pub mod events;
pub mod location;
pub mod map;
pub mod messages;
pub mod prompts;
pub mod security;
pub mod session;

// Re-exports for convenience
pub use attachment::{AttachmentError, ImageAttachment};
pub use backend::{ChatBackend, ChatRequest, Content, GeminiBackend, Part, StreamChunk};
pub use chat::{ChatSession, ChatSessionManager, CompletedTurn, SessionState, TurnStream, TurnUpdate};
pub use citations::{Citation, CitationKind, CitationSet};
pub use conductor::{Conductor, ConductorConfig, ATTACHMENT_ERROR_MESSAGE, TURN_ERROR_PREFIX};
pub use config::{default_config_path, load_config, ConfigError, ConfigSource, ExplorerConfig};
pub use directive::{parse_turn, MapIntent, ParsedTurn, NO_RESULT_QUERY};
pub use events::{SurfaceEvent, SurfaceType};
pub use location::{ConfiguredLocation, LatLng, LocationError, LocationProvider};
pub use map::{MapTarget, MapView, MapViewController, PlaceholderReason};
pub use messages::{
    ConductorMessage, ConductorState, EventId, MessageId, MessageRole, MessageStatus,
    NotifyLevel, SessionId,
};
pub use prompts::{InstructionSet, DEFAULT_IMAGE_PROMPT, WELCOME_MESSAGE};
pub use security::{ConductorLimits, InputValidator, ValidationResult};
pub use session::{ConversationLog, ConversationMessage};
