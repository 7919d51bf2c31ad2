//! Chat Backend Integration
//!
//! This module provides abstracted access to grounded chat backends through a
//! common trait interface.
//!
//! # Available Backends
//!
//! - **Gemini**: `streamGenerateContent` over server-sent events (default)
//!
//! # Usage
//!
//! ```ignore
//! use geo_conductor::backend::{ChatBackend, ChatRequest, Content, GeminiBackend, Part};
//!
//! let backend = GeminiBackend::from_config(&config.backend)?;
//! let request = ChatRequest::new("gemini-2.5-flash", instruction, vec![Content::user(vec![Part::text("Eiffel Tower")])]);
//! let rx = backend.send_streaming(&request).await?;
//! ```

mod gemini;
mod traits;

pub use gemini::{chunk_from_json, GeminiBackend, SseDecoder};
pub use traits::{
    ChatBackend, ChatRequest, Content, InlineData, Part, Role, StreamChunk, Tool,
};
