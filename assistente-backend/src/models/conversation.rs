use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-conversation persona selector. Stored as text in the database and
/// validated at every boundary; unknown values are rejected, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainMode {
    Generic,
    Mikrotik,
}

impl DomainMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainMode::Generic => "generic",
            DomainMode::Mikrotik => "mikrotik",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "generic" => Some(DomainMode::Generic),
            "mikrotik" => Some(DomainMode::Mikrotik),
            _ => None,
        }
    }
}

impl Default for DomainMode {
    fn default() -> Self {
        DomainMode::Generic
    }
}

impl std::fmt::Display for DomainMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transport origin of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Web,
    Telegram,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Web => "web",
            ChannelKind::Telegram => "telegram",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "web" => Some(ChannelKind::Web),
            "telegram" => Some(ChannelKind::Telegram),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub channel: ChannelKind,
    /// Channel-specific chat identifier (e.g. Telegram chat id). Unique per
    /// channel when present; web conversations have none.
    pub external_chat_id: Option<String>,
    pub title: String,
    /// Gates whether inbound bot messages are processed into replies.
    /// Toggled only by explicit user command.
    pub is_active: bool,
    pub domain_mode: DomainMode,
    pub created_at: DateTime<Utc>,
}
