use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Server suffix the chat session appends to group identifiers.
pub const GROUP_SERVER: &str = "g.us";

/// Chat address as delivered by the session, `user@server`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jid {
    pub user: String,
    pub server: String,
}

impl Jid {
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
        }
    }

    pub fn group(user: impl Into<String>) -> Self {
        Self::new(user, GROUP_SERVER)
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.server)
    }
}

/// Everything the chat session can push to us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    Message(MessageEvent),
    Receipt { chat: Jid, message_ids: Vec<String> },
    Presence { from: Jid, unavailable: bool },
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub info: MessageInfo,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    pub chat: Jid,
    pub is_group: bool,
    pub timestamp: DateTime<FixedOffset>,
}

/// Body of a chat message. Only one variant is ever populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Conversation { text: String },
    ExtendedText { text: String },
    Image { caption: Option<String> },
    Document { file_name: Option<String> },
    Protocol(ProtocolMessage),
}

/// Invisible control message that targets a previously sent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    pub kind: ProtocolKind,
    /// Id of the message being edited or revoked.
    pub key_id: String,
    #[serde(default)]
    pub edited: Option<Box<MessageContent>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    Revoke,
    MessageEdit,
    EphemeralSetting,
    HistorySyncNotification,
}

/// Result of classifying a transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    NewMessage {
        text: String,
        id: String,
        timestamp: DateTime<FixedOffset>,
    },
    Edit {
        id: String,
        new_text: String,
    },
    Revoke {
        id: String,
    },
    Ignored,
}
