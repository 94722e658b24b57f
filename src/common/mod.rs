pub mod events;
pub mod types;

pub use events::{
    Jid, MessageContent, MessageEvent, ProtocolKind, ProtocolMessage, SyncEvent, TransportEvent,
};
pub use types::{ChatMessage, Flag};
