use crate::common::{
    Jid, MessageContent, MessageEvent, ProtocolKind, ProtocolMessage, SyncEvent, TransportEvent,
};

/// Maps raw session events onto the handful of shapes the engine acts on.
///
/// Classification only reads the event itself, never the store.
#[derive(Debug, Clone)]
pub struct Classifier {
    monitored_chat: String,
}

impl Classifier {
    pub fn new(monitored_group: &str) -> Self {
        Self {
            monitored_chat: Jid::group(monitored_group).to_string(),
        }
    }

    pub fn monitored_chat(&self) -> &str {
        &self.monitored_chat
    }

    pub fn classify(&self, event: &TransportEvent) -> SyncEvent {
        match event {
            TransportEvent::Message(message) => self.classify_message(message),
            TransportEvent::Receipt { .. }
            | TransportEvent::Presence { .. }
            | TransportEvent::Connected
            | TransportEvent::Disconnected => SyncEvent::Ignored,
        }
    }

    fn classify_message(&self, event: &MessageEvent) -> SyncEvent {
        let info = &event.info;
        if !info.is_group || info.chat.to_string() != self.monitored_chat {
            return SyncEvent::Ignored;
        }

        match &event.content {
            MessageContent::Conversation { text } | MessageContent::ExtendedText { text } => {
                SyncEvent::NewMessage {
                    text: text.clone(),
                    id: info.id.clone(),
                    timestamp: info.timestamp,
                }
            }
            MessageContent::Protocol(protocol) => classify_protocol(protocol),
            MessageContent::Image { .. } | MessageContent::Document { .. } => SyncEvent::Ignored,
        }
    }
}

fn classify_protocol(protocol: &ProtocolMessage) -> SyncEvent {
    match protocol.kind {
        ProtocolKind::Revoke => SyncEvent::Revoke {
            id: protocol.key_id.clone(),
        },
        ProtocolKind::MessageEdit => match protocol.edited.as_deref() {
            Some(MessageContent::Conversation { text } | MessageContent::ExtendedText { text }) => {
                SyncEvent::Edit {
                    id: protocol.key_id.clone(),
                    new_text: text.clone(),
                }
            }
            _ => SyncEvent::Ignored,
        },
        ProtocolKind::EphemeralSetting | ProtocolKind::HistorySyncNotification => {
            SyncEvent::Ignored
        }
    }
}
