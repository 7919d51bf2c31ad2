//! Gemini Backend Implementation
//!
//! Grounded chat backend for the Gemini REST API.
//!
//! # Gemini API
//!
//! - `POST /models/{model}:streamGenerateContent?alt=sse` - streamed generation
//! - `GET /models` - used as the health probe
//!
//! Authentication is the `x-goog-api-key` header. Each SSE event's `data:`
//! payload is one `GenerateContentResponse` JSON object.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::traits::{ChatBackend, ChatRequest, StreamChunk};
use crate::citations::Citation;
use crate::config::BackendSettings;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini backend client
#[derive(Clone)]
pub struct GeminiBackend {
    /// REST endpoint base, without trailing slash
    api_base: String,
    /// API key
    api_key: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl GeminiBackend {
    /// Create a new Gemini backend
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client,
        })
    }

    /// Create from the `[backend]` configuration section
    pub fn from_config(settings: &BackendSettings) -> anyhow::Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("No API key configured; set GEMINI_API_KEY or backend.api_key")
            })?;
        Self::new(
            settings.api_base.clone(),
            api_key,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    /// Get streamed generation endpoint URL
    fn stream_url(&self, model: &str) -> String {
        format!("{}/models/{model}:streamGenerateContent?alt=sse", self.api_base)
    }

    /// Get models endpoint URL
    fn models_url(&self) -> String {
        format!("{}/models", self.api_base)
    }

    /// Build the JSON request body
    fn build_body(request: &ChatRequest) -> Value {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| json!({ tool.wire_name(): {} }))
            .collect();

        let mut body = json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": request.contents,
            "tools": tools,
        });

        if let Some(location) = request.location_bias {
            body["toolConfig"] = json!({
                "retrievalConfig": {
                    "latLng": {
                        "latitude": location.latitude,
                        "longitude": location.longitude,
                    }
                }
            });
        }

        body
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(self.models_url())
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("pageSize", "1")])
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Gemini health check failed");
                false
            }
        }
    }

    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamChunk>> {
        let (tx, rx) = mpsc::channel(100);

        let url = self.stream_url(&request.model);
        let body = Self::build_body(request);

        tracing::debug!(
            model = %request.model,
            turns = request.contents.len(),
            location_bias = request.location_bias.is_some(),
            "Sending streamed chat request"
        );

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or(body);
            anyhow::bail!("Gemini returned {status}: {detail}");
        }

        let mut stream = response.bytes_stream();

        // Spawn task to process stream
        tokio::spawn(async move {
            let mut decoder = SseDecoder::default();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for payload in decoder.push(&bytes) {
                            if !forward_payload(&tx, &payload).await {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(StreamChunk::Error(e.to_string())).await;
                        return;
                    }
                }
            }

            if let Some(payload) = decoder.finish() {
                if !forward_payload(&tx, &payload).await {
                    return;
                }
            }

            let _ = tx.send(StreamChunk::Complete).await;
        });

        Ok(rx)
    }
}

/// Decode and forward one SSE payload; `false` means stop streaming
async fn forward_payload(tx: &mpsc::Sender<StreamChunk>, payload: &str) -> bool {
    let value = match serde_json::from_str::<Value>(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping undecodable stream payload");
            return true;
        }
    };

    match chunk_from_json(&value) {
        Ok(Some(chunk)) => tx.send(chunk).await.is_ok(),
        Ok(None) => true,
        Err(message) => {
            let _ = tx.send(StreamChunk::Error(message)).await;
            false
        }
    }
}

/// Convert one streamed response object into a chunk
///
/// Returns `Err` for an API error payload and `Ok(None)` for a payload that
/// carries neither text nor citations.
pub fn chunk_from_json(value: &Value) -> Result<Option<StreamChunk>, String> {
    if let Some(message) = error_message(value) {
        return Err(message);
    }

    let Some(candidate) = value.pointer("/candidates/0") else {
        return Ok(None);
    };

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let citations: Vec<Citation> = candidate
        .pointer("/groundingMetadata/groundingChunks")
        .and_then(Value::as_array)
        .map(|chunks| chunks.iter().filter_map(Citation::from_grounding_chunk).collect())
        .unwrap_or_default();

    if text.is_empty() && citations.is_empty() {
        return Ok(None);
    }

    Ok(Some(StreamChunk::Delta {
        text: (!text.is_empty()).then_some(text),
        citations,
    }))
}

fn error_message(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    Some(
        error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), ToString::to_string),
    )
}

/// Incremental server-sent-events decoder
///
/// Bytes are buffered until a full line is available so multi-byte characters
/// split across network chunks decode correctly. An event's `data:` lines are
/// joined with `\n` and dispatched at the blank line that ends the event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed bytes; returns the payloads of any events completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.take_event() {
                    events.push(event);
                }
            } else if let Some(data) = data_field(line) {
                self.data.push(data.to_string());
            }
            // Comments, `event:`, `id:` and `retry:` lines are not used.
        }

        events
    }

    /// Flush an event left unterminated at end of stream
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let rest = String::from_utf8_lossy(&rest);
            if let Some(data) = data_field(rest.trim_end_matches(['\n', '\r'])) {
                self.data.push(data.to_string());
            }
        }
        self.take_event()
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

/// Value of a `data:` line; one optional leading space is not part of it
fn data_field(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Content, Part};
    use crate::citations::CitationKind;
    use crate::location::LatLng;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sse_decoder_handles_split_events() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        assert!(decoder.push(b"1}\r\n").is_empty());
        assert_eq!(decoder.push(b"\r\ndata: {\"b\":2}\n\n"), vec![
            "{\"a\":1}".to_string(),
            "{\"b\":2}".to_string(),
        ]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_sse_decoder_multibyte_split() {
        let mut decoder = SseDecoder::default();
        let event = "data: \"Zürich\"\n\n".as_bytes();
        let (a, b) = event.split_at(9);
        assert!(decoder.push(a).is_empty());
        assert_eq!(decoder.push(b), vec!["\"Zürich\"".to_string()]);
    }

    #[test]
    fn test_sse_decoder_keeps_extra_leading_spaces() {
        let mut terminated = SseDecoder::default();
        assert_eq!(terminated.push(b"data:   \"x\"\n\n"), vec!["  \"x\"".to_string()]);

        let mut unterminated = SseDecoder::default();
        assert!(unterminated.push(b"data:   \"x\"").is_empty());
        assert_eq!(unterminated.finish(), Some("  \"x\"".to_string()));
    }

    #[test]
    fn test_sse_decoder_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b": keep-alive\n\ndata: {}").is_empty());
        assert_eq!(decoder.finish(), Some("{}".to_string()));
    }

    #[test]
    fn test_chunk_text_and_citations() {
        let value = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "It's in "}, {"text": "Paris."}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://w.example", "title": "Wiki"}},
                        {"maps": {"uri": "https://m.example"}}
                    ]
                }
            }]
        });

        let chunk = chunk_from_json(&value).unwrap().unwrap();
        assert_eq!(
            chunk,
            StreamChunk::Delta {
                text: Some("It's in Paris.".to_string()),
                citations: vec![
                    Citation::new("https://w.example", "Wiki", CitationKind::Web),
                    Citation::new("https://m.example", "https://m.example", CitationKind::Map),
                ],
            }
        );
    }

    #[test]
    fn test_chunk_without_content() {
        let value = json!({"candidates": [{"finishReason": "STOP"}], "usageMetadata": {}});
        assert_eq!(chunk_from_json(&value), Ok(None));
    }

    #[test]
    fn test_chunk_error_payload() {
        let value = json!({"error": {"code": 429, "message": "Resource exhausted"}});
        assert_eq!(chunk_from_json(&value), Err("Resource exhausted".to_string()));
    }

    #[test]
    fn test_request_body() {
        let request = ChatRequest::new(
            "gemini-2.5-flash",
            "You are Geo Explorer",
            vec![Content::user(vec![Part::text("Eiffel Tower")])],
        )
        .with_location_bias(LatLng::new(48.0, 2.0).ok());

        let body = GeminiBackend::build_body(&request);
        assert_eq!(
            body,
            json!({
                "systemInstruction": {"parts": [{"text": "You are Geo Explorer"}]},
                "contents": [{"role": "user", "parts": [{"text": "Eiffel Tower"}]}],
                "tools": [{"googleSearch": {}}, {"googleMaps": {}}],
                "toolConfig": {"retrievalConfig": {"latLng": {"latitude": 48.0, "longitude": 2.0}}}
            })
        );
    }

    #[test]
    fn test_from_config_requires_key() {
        let settings = BackendSettings::default();
        assert!(GeminiBackend::from_config(&settings).is_err());

        let backend = GeminiBackend::from_config(&BackendSettings {
            api_base: "http://localhost:9/v1beta/".to_string(),
            api_key: Some("k".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            backend.stream_url("m"),
            "http://localhost:9/v1beta/models/m:streamGenerateContent?alt=sse"
        );
    }
}
