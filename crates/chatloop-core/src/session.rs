//! Session Management
//!
//! One interactive session owns one conversation for the life of the
//! process. Nothing is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Conversation, Message};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for banners and log lines
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history
    pub conversation: Conversation,

    /// Model used for this session
    pub model: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,

    /// Cleared when the user ends the chat
    pub active: bool,
}

impl Session {
    /// Create a new session
    pub fn new(model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            conversation: Conversation::new(),
            model: model.into(),
            created_at: now,
            updated_at: now,
            active: true,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Title generated from the first user message
    pub fn title(&self) -> String {
        self.conversation
            .iter()
            .find_map(|m| match m {
                Message::User { content, .. } => Some(content),
                _ => None,
            })
            .map_or_else(
                || format!("Session {}", self.id.short()),
                |content| {
                    let preview: String = content.chars().take(50).collect();
                    if content.chars().count() > 50 {
                        format!("{preview}...")
                    } else {
                        preview
                    }
                },
            )
    }

    /// Render recent history, or a placeholder when there is none
    pub fn render_history(&self, limit: usize) -> String {
        let rendered = self.conversation.render(limit);
        if rendered.is_empty() {
            "(no history yet)".into()
        } else {
            rendered
        }
    }

    /// End the session
    pub fn end(&mut self) {
        self.active = false;
        self.touch();
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    /// Duration since creation
    pub fn duration(&self) -> chrono::Duration {
        self.updated_at - self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new("test-model");
        assert!(session.active);
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.render_history(10), "(no history yet)");
        assert!(session.title().starts_with("Session "));
    }

    #[test]
    fn test_title_from_first_user_message() {
        let mut session = Session::new("test-model");
        session.conversation.push(Message::user("x".repeat(60)));
        let title = session.title();
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 53);
    }

    #[test]
    fn test_end_marks_inactive() {
        let mut session = Session::new("test-model");
        session.end();
        assert!(!session.active);
        assert!(session.duration() >= chrono::Duration::zero());
    }
}
