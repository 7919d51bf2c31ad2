//! Chat Backend Traits
//!
//! Trait definitions for grounded chat backends. The Conductor talks to the
//! backend only through [`ChatBackend`], so tests can script responses without
//! a network.
//!
//! Requests carry the full turn history: the REST API is stateless, so the
//! conversation handle lives client-side (see [`crate::chat`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::citations::Citation;
use crate::location::LatLng;

/// Author of a content block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The user
    User,
    /// The model
    Model,
}

/// Inline binary data
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
}

/// One part of a content block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    /// Plain text
    Text(String),
    /// An inline image
    InlineData(InlineData),
}

impl Part {
    /// A text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// The text, if this is a text part
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::InlineData(_) => None,
        }
    }
}

/// A turn's worth of content from one author
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Author
    pub role: Role,
    /// Parts in order
    pub parts: Vec<Part>,
}

impl Content {
    /// User content
    #[must_use]
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    /// Model content holding a single text part
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }
}

/// Grounding tools the model may call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    /// Web search grounding
    GoogleSearch,
    /// Maps grounding
    GoogleMaps,
}

impl Tool {
    /// Both grounding tools
    pub const GROUNDING: [Tool; 2] = [Tool::GoogleSearch, Tool::GoogleMaps];

    /// Key used in the request's `tools` array
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::GoogleSearch => "googleSearch",
            Self::GoogleMaps => "googleMaps",
        }
    }
}

/// One streamed chat request
#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    /// Model to use
    pub model: String,
    /// System instruction for the session
    pub system_instruction: String,
    /// Prior turns followed by the new user turn
    pub contents: Vec<Content>,
    /// Grounding tools
    pub tools: Vec<Tool>,
    /// Location bias for maps grounding
    pub location_bias: Option<LatLng>,
}

impl ChatRequest {
    /// Create a request with both grounding tools enabled
    pub fn new(model: impl Into<String>, system_instruction: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            model: model.into(),
            system_instruction: system_instruction.into(),
            contents,
            tools: Tool::GROUNDING.to_vec(),
            location_bias: None,
        }
    }

    /// Set the location bias
    #[must_use]
    pub fn with_location_bias(mut self, location: Option<LatLng>) -> Self {
        self.location_bias = location;
        self
    }
}

/// Stream events from chat backends
#[derive(Clone, Debug, PartialEq)]
pub enum StreamChunk {
    /// A delta: new text and/or grounding citations
    Delta {
        /// Text appended by this chunk
        text: Option<String>,
        /// Citations carried by this chunk
        citations: Vec<Citation>,
    },
    /// Response completed successfully
    Complete,
    /// Error occurred during streaming
    Error(String),
}

/// Chat Backend trait
///
/// Implement this trait to add support for a different grounded chat provider.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Get the backend name (e.g., "Gemini")
    fn name(&self) -> &str;

    /// Check if the backend is healthy and reachable
    async fn health_check(&self) -> bool;

    /// Send a request and get a streaming response
    ///
    /// Returns a channel receiver that will receive chunks as they arrive.
    /// The channel will be closed when the response is complete or an error occurs.
    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamChunk>>;
}
