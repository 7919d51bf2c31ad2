//! Conversation Log
//!
//! The ordered list of messages a surface renders. The log is append-only:
//! entries are mutated in place while an assistant turn streams and is
//! finalized, but never removed. The only exception is [`ConversationLog::reset`],
//! which restores the single welcome message.
//!
//! Per user turn two entries are appended back to back: the user's message and
//! a pending assistant placeholder that the streaming turn updates by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::ImageAttachment;
use crate::citations::Citation;
use crate::messages::{MessageId, MessageRole, MessageStatus};

/// Content of an assistant placeholder before any text arrives
pub const PENDING_CONTENT: &str = "...";

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Display text
    pub content: String,
    /// Image sent with a user message
    pub image: Option<ImageAttachment>,
    /// Grounding sources, deduplicated by URI
    pub citations: Vec<Citation>,
    /// Candidate places the user can pick from
    pub suggestions: Option<Vec<String>>,
    /// Lifecycle state
    pub status: MessageStatus,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    /// Create a complete message
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self::with_id(MessageId::new(), role, content)
    }

    /// Create a complete message with a specific ID
    pub fn with_id(id: MessageId, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            image: None,
            citations: Vec::new(),
            suggestions: None,
            status: MessageStatus::Complete,
            timestamp: Utc::now(),
        }
    }

    /// Create a pending assistant placeholder
    #[must_use]
    pub fn pending() -> Self {
        Self {
            status: MessageStatus::Pending,
            ..Self::new(MessageRole::Assistant, PENDING_CONTENT)
        }
    }

    /// Whether the message can still change
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.status.is_in_flight()
    }
}

/// Ordered conversation log
#[derive(Clone, Debug)]
pub struct ConversationLog {
    welcome: String,
    messages: Vec<ConversationMessage>,
}

impl ConversationLog {
    /// Create a log holding only the welcome message
    pub fn new(welcome: impl Into<String>) -> Self {
        let mut log = Self {
            welcome: welcome.into(),
            messages: Vec::new(),
        };
        log.reset();
        log
    }

    /// Restore the welcome-only state
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(ConversationMessage::with_id(
            MessageId::welcome(),
            MessageRole::Assistant,
            self.welcome.clone(),
        ));
    }

    /// Append the user's message
    pub fn add_user_message(
        &mut self,
        content: impl Into<String>,
        image: Option<ImageAttachment>,
    ) -> &ConversationMessage {
        let mut message = ConversationMessage::new(MessageRole::User, content);
        message.image = image;
        self.push(message)
    }

    /// Append a pending assistant placeholder
    pub fn start_assistant_response(&mut self) -> &ConversationMessage {
        self.push(ConversationMessage::pending())
    }

    /// Append a complete assistant message (attachment failures and similar)
    pub fn add_advisory(&mut self, content: impl Into<String>) -> &ConversationMessage {
        self.push(ConversationMessage::new(MessageRole::Assistant, content))
    }

    /// Append `message` unless an entry with its id already exists
    pub fn add_message_once(&mut self, message: ConversationMessage) -> Option<&ConversationMessage> {
        if self.get(&message.id).is_some() {
            return None;
        }
        Some(self.push(message))
    }

    /// Replace an in-flight message's accumulated text and citations
    ///
    /// Empty text keeps the placeholder content.
    pub fn update_streaming(
        &mut self,
        id: &MessageId,
        text: &str,
        citations: Vec<Citation>,
    ) -> Option<&ConversationMessage> {
        let message = self.in_flight_mut(id)?;
        message.content = if text.is_empty() {
            PENDING_CONTENT.to_string()
        } else {
            text.to_string()
        };
        message.citations = citations;
        message.status = MessageStatus::Streaming;
        Some(message)
    }

    /// Finalize an in-flight message with parsed output
    pub fn finalize(
        &mut self,
        id: &MessageId,
        display_text: String,
        citations: Vec<Citation>,
        suggestions: Option<Vec<String>>,
    ) -> Option<&ConversationMessage> {
        let message = self.in_flight_mut(id)?;
        message.content = display_text;
        message.citations = citations;
        message.suggestions = suggestions;
        message.status = MessageStatus::Complete;
        Some(message)
    }

    /// Replace an in-flight message with an error text
    pub fn fail(&mut self, id: &MessageId, error_text: String) -> Option<&ConversationMessage> {
        let message = self.in_flight_mut(id)?;
        message.content = error_text;
        message.status = MessageStatus::Failed;
        Some(message)
    }

    /// Get message by ID
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&ConversationMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// All messages in insertion order
    #[must_use]
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log has no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Suggestions of the most recent assistant message, if it has any
    #[must_use]
    pub fn latest_suggestions(&self) -> Option<&[String]> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .and_then(|m| m.suggestions.as_deref())
    }

    fn push(&mut self, message: ConversationMessage) -> &ConversationMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    fn in_flight_mut(&mut self, id: &MessageId) -> Option<&mut ConversationMessage> {
        let message = self.messages.iter_mut().find(|m| &m.id == id)?;
        if !message.is_in_flight() {
            tracing::debug!(id = %id, status = ?message.status, "Ignoring update to settled message");
            return None;
        }
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::CitationKind;
    use pretty_assertions::assert_eq;

    fn log() -> ConversationLog {
        ConversationLog::new("Hello!")
    }

    #[test]
    fn test_starts_with_welcome() {
        let log = log();
        assert_eq!(log.len(), 1);
        assert_eq!(log.messages()[0].id, MessageId::welcome());
        assert_eq!(log.messages()[0].content, "Hello!");
        assert_eq!(log.messages()[0].role, MessageRole::Assistant);
    }

    #[test]
    fn test_turn_lifecycle() {
        let mut log = log();
        log.add_user_message("Eiffel Tower", None);
        let id = log.start_assistant_response().id.clone();
        assert_eq!(log.get(&id).map(|m| m.content.as_str()), Some(PENDING_CONTENT));
        assert_eq!(log.get(&id).map(|m| m.status), Some(MessageStatus::Pending));

        let cite = Citation::new("https://w.example", "W", CitationKind::Web);
        log.update_streaming(&id, "It's in", vec![cite.clone()]);
        assert_eq!(log.get(&id).map(|m| m.status), Some(MessageStatus::Streaming));

        log.finalize(&id, "It's in Paris.".to_string(), vec![cite.clone()], None);
        let message = log.get(&id).unwrap();
        assert_eq!(message.content, "It's in Paris.");
        assert_eq!(message.citations, vec![cite]);
        assert_eq!(message.status, MessageStatus::Complete);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_settled_messages_are_not_mutated() {
        let mut log = log();
        let id = log.start_assistant_response().id.clone();
        log.fail(&id, "Sorry, something went wrong: boom".to_string());

        assert!(log.update_streaming(&id, "late token", vec![]).is_none());
        assert!(log.finalize(&id, "late".to_string(), vec![], None).is_none());
        assert_eq!(log.get(&id).map(|m| m.status), Some(MessageStatus::Failed));
    }

    #[test]
    fn test_empty_stream_text_keeps_placeholder() {
        let mut log = log();
        let id = log.start_assistant_response().id.clone();
        log.update_streaming(&id, "", vec![]);
        assert_eq!(log.get(&id).map(|m| m.content.as_str()), Some(PENDING_CONTENT));
    }

    #[test]
    fn test_add_message_once() {
        let mut log = log();
        let advisory = || {
            ConversationMessage::with_id(MessageId::location_advisory(), MessageRole::Assistant, "x")
        };
        assert!(log.add_message_once(advisory()).is_some());
        assert!(log.add_message_once(advisory()).is_none());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_reset_restores_welcome_only() {
        let mut log = log();
        log.add_user_message("a", None);
        log.add_advisory("b");
        log.reset();
        assert_eq!(log.len(), 1);
        assert_eq!(log.messages()[0].id, MessageId::welcome());
    }

    #[test]
    fn test_latest_suggestions() {
        let mut log = log();
        let id = log.start_assistant_response().id.clone();
        log.finalize(&id, "Which?".to_string(), vec![], Some(vec!["A".into(), "B".into()]));
        assert_eq!(log.latest_suggestions(), Some(&["A".to_string(), "B".to_string()][..]));

        log.add_user_message("A", None);
        let id = log.start_assistant_response().id.clone();
        log.finalize(&id, "Here.".to_string(), vec![], None);
        assert_eq!(log.latest_suggestions(), None);
    }
}
