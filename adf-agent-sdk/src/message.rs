//! Thread messages

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListSortOrder {
    #[default]
    Ascending,
    Descending,
}

impl ListSortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            ListSortOrder::Ascending => "asc",
            ListSortOrder::Descending => "desc",
        }
    }
}

/// A message on a conversation thread
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: MessageText },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageText {
    pub value: String,
}

impl ThreadMessage {
    pub fn text(id: impl Into<String>, role: MessageRole, value: impl Into<String>) -> Self {
        let role = match role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        Self {
            id: id.into(),
            role: role.to_string(),
            content: vec![MessageContent::Text {
                text: MessageText {
                    value: value.into(),
                },
            }],
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }

    /// The last text block, which is what the dashboards show for a message
    pub fn last_text(&self) -> Option<&str> {
        self.content.iter().rev().find_map(|block| match block {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Other => None,
        })
    }
}
