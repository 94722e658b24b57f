use std::sync::Arc;

use tokio::sync::mpsc;

use crate::classifier::Classifier;
use crate::common::{ChatMessage, Flag, SyncEvent, TransportEvent};
use crate::storage::{MessageStore, StorageError};

/// What the engine did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Inserted { id: String },
    /// Same id delivered twice; the stored row was left alone.
    Duplicate { id: String },
    Edited { id: String },
    Revoked { id: String },
    /// Edit or revoke for an id we never stored.
    Dropped { id: String },
    Ignored,
}

/// Applies classified session events to the message store.
pub struct SyncEngine {
    store: Arc<MessageStore>,
    classifier: Classifier,
}

impl SyncEngine {
    pub fn new(store: Arc<MessageStore>, classifier: Classifier) -> Self {
        Self { store, classifier }
    }

    pub fn handle(&self, event: &TransportEvent) -> Result<SyncOutcome, StorageError> {
        self.apply(self.classifier.classify(event))
    }

    pub fn apply(&self, event: SyncEvent) -> Result<SyncOutcome, StorageError> {
        match event {
            SyncEvent::NewMessage {
                text,
                id,
                timestamp,
            } => {
                let record = ChatMessage::new(id, text, timestamp);
                match self.store.insert(&record) {
                    Ok(()) => {
                        log::debug!("Inserted {record}");
                        Ok(SyncOutcome::Inserted {
                            id: record.message_id,
                        })
                    }
                    Err(StorageError::Conflict { message_id }) => {
                        Ok(SyncOutcome::Duplicate { id: message_id })
                    }
                    Err(err) => Err(err),
                }
            }
            SyncEvent::Edit { id, new_text } => {
                if self.store.update_text(&id, &new_text)? {
                    Ok(SyncOutcome::Edited { id })
                } else {
                    Ok(SyncOutcome::Dropped { id })
                }
            }
            SyncEvent::Revoke { id } => {
                if self.store.update_flag(&id, Flag::Deleted, true)? {
                    Ok(SyncOutcome::Revoked { id })
                } else {
                    Ok(SyncOutcome::Dropped { id })
                }
            }
            SyncEvent::Ignored => Ok(SyncOutcome::Ignored),
        }
    }

    /// Consume events until every sender is gone. Failed writes are logged
    /// and the loop moves on to the next event.
    pub async fn run(self, mut events: mpsc::Receiver<TransportEvent>) {
        match self.store.count() {
            Ok(count) => log::info!(
                "Sync engine watching {} with {count} stored messages",
                self.classifier.monitored_chat()
            ),
            Err(err) => log::warn!("Unable to count stored messages: {err}"),
        }

        while let Some(event) = events.recv().await {
            match self.handle(&event) {
                Ok(SyncOutcome::Inserted { id }) => log::info!("Stored new message {id}"),
                Ok(SyncOutcome::Edited { id }) => log::info!("Applied edit to {id}"),
                Ok(SyncOutcome::Revoked { id }) => log::info!("Marked {id} as deleted"),
                Ok(SyncOutcome::Duplicate { id }) => {
                    log::debug!("Ignoring duplicate delivery of {id}")
                }
                Ok(SyncOutcome::Dropped { id }) => {
                    log::debug!("Dropping edit/revoke for unknown message {id}")
                }
                Ok(SyncOutcome::Ignored) => {}
                Err(err) => log::error!("Failed to apply session event: {err}"),
            }
        }

        log::info!("Event stream closed; sync engine stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::events::MessageInfo;
    use crate::common::{Jid, MessageContent, MessageEvent, ProtocolKind, ProtocolMessage};
    use chrono::DateTime;

    const GROUP: &str = "120363041234567890";

    fn engine() -> (SyncEngine, Arc<MessageStore>) {
        let store = Arc::new(MessageStore::in_memory().expect("open store"));
        (
            SyncEngine::new(store.clone(), Classifier::new(GROUP)),
            store,
        )
    }

    fn new_message(id: &str, text: &str) -> SyncEvent {
        SyncEvent::NewMessage {
            text: text.to_string(),
            id: id.to_string(),
            timestamp: DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z")
                .expect("valid timestamp"),
        }
    }

    fn group_event(id: &str, content: MessageContent) -> TransportEvent {
        TransportEvent::Message(MessageEvent {
            info: MessageInfo {
                id: id.to_string(),
                chat: Jid::group(GROUP),
                is_group: true,
                timestamp: DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z")
                    .expect("valid timestamp"),
            },
            content,
        })
    }

    #[test]
    fn insert_edit_revoke_scenario() {
        let (engine, store) = engine();

        assert_eq!(
            engine.apply(new_message("A1", "buy milk")).expect("insert"),
            SyncOutcome::Inserted {
                id: "A1".to_string()
            }
        );
        let loaded = store.get_by_id("A1").expect("get");
        assert_eq!(loaded.message, "buy milk");
        assert_eq!(loaded.timestamp.to_rfc3339(), "2024-01-01T10:00:00+00:00");
        assert!(!loaded.is_checked && !loaded.is_done && !loaded.is_deleted);

        store.update_flag("A1", Flag::Checked, true).expect("check");

        assert_eq!(
            engine
                .apply(SyncEvent::Edit {
                    id: "A1".to_string(),
                    new_text: "buy oat milk".to_string(),
                })
                .expect("edit"),
            SyncOutcome::Edited {
                id: "A1".to_string()
            }
        );
        let edited = store.get_by_id("A1").expect("get");
        assert_eq!(edited.message, "buy oat milk");
        assert_eq!(edited.message_id, "A1");
        assert!(edited.is_checked);
        assert!(!edited.is_deleted);

        assert_eq!(
            engine
                .apply(SyncEvent::Revoke {
                    id: "A1".to_string()
                })
                .expect("revoke"),
            SyncOutcome::Revoked {
                id: "A1".to_string()
            }
        );
        let revoked = store.get_by_id("A1").expect("revoked row still readable");
        assert!(revoked.is_deleted);
        assert!(revoked.is_checked);
        assert_eq!(revoked.message, "buy oat milk");
        assert_eq!(store.get_all().expect("list").messages.len(), 1);
    }

    #[test]
    fn edit_and_revoke_for_unknown_ids_change_nothing() {
        let (engine, store) = engine();
        engine.apply(new_message("A1", "buy milk")).expect("insert");

        let edit = engine
            .apply(SyncEvent::Edit {
                id: "ghost".to_string(),
                new_text: "boo".to_string(),
            })
            .expect("edit unknown");
        assert_eq!(
            edit,
            SyncOutcome::Dropped {
                id: "ghost".to_string()
            }
        );

        let revoke = engine
            .apply(SyncEvent::Revoke {
                id: "ghost".to_string(),
            })
            .expect("revoke unknown");
        assert_eq!(
            revoke,
            SyncOutcome::Dropped {
                id: "ghost".to_string()
            }
        );

        let listing = store.get_all().expect("list");
        assert_eq!(listing.messages.len(), 1);
        assert_eq!(listing.messages[0].message, "buy milk");
        assert!(!listing.messages[0].is_deleted);
        assert!(matches!(
            store.get_by_id("ghost"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn duplicate_delivery_is_benign() {
        let (engine, store) = engine();
        engine.apply(new_message("A1", "buy milk")).expect("insert");
        engine
            .apply(SyncEvent::Edit {
                id: "A1".to_string(),
                new_text: "buy oat milk".to_string(),
            })
            .expect("edit");

        assert_eq!(
            engine.apply(new_message("A1", "buy milk")).expect("duplicate"),
            SyncOutcome::Duplicate {
                id: "A1".to_string()
            }
        );
        assert_eq!(store.count().expect("count"), 1);
        assert_eq!(store.get_by_id("A1").expect("get").message, "buy oat milk");

        engine.apply(new_message("B2", "pay rent")).expect("next insert");
        assert_eq!(store.count().expect("count"), 2);
    }

    #[test]
    fn edit_racing_ahead_of_insert_is_dropped() {
        let (engine, store) = engine();

        let early = engine
            .apply(SyncEvent::Edit {
                id: "A1".to_string(),
                new_text: "buy oat milk".to_string(),
            })
            .expect("early edit");
        assert_eq!(
            early,
            SyncOutcome::Dropped {
                id: "A1".to_string()
            }
        );
        assert_eq!(store.count().expect("count"), 0);

        engine.apply(new_message("A1", "buy milk")).expect("insert");
        assert_eq!(store.get_by_id("A1").expect("get").message, "buy milk");
    }

    #[test]
    fn handle_classifies_before_applying() {
        let (engine, store) = engine();

        let outside = TransportEvent::Message(MessageEvent {
            info: MessageInfo {
                id: "Z9".to_string(),
                chat: Jid::group("someone-else"),
                is_group: true,
                timestamp: DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z")
                    .expect("valid timestamp"),
            },
            content: MessageContent::Conversation {
                text: "not ours".to_string(),
            },
        });
        assert_eq!(
            engine.handle(&outside).expect("handle"),
            SyncOutcome::Ignored
        );
        assert_eq!(store.count().expect("count"), 0);

        let ours = group_event(
            "A1",
            MessageContent::ExtendedText {
                text: "buy milk".to_string(),
            },
        );
        assert_eq!(
            engine.handle(&ours).expect("handle"),
            SyncOutcome::Inserted {
                id: "A1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn run_keeps_going_after_duplicates() {
        let (engine, store) = engine();
        let (tx, rx) = mpsc::channel(16);

        let events = vec![
            group_event(
                "A1",
                MessageContent::ExtendedText {
                    text: "buy milk".to_string(),
                },
            ),
            group_event(
                "A1",
                MessageContent::ExtendedText {
                    text: "buy milk".to_string(),
                },
            ),
            group_event(
                "P1",
                MessageContent::Protocol(ProtocolMessage {
                    kind: ProtocolKind::MessageEdit,
                    key_id: "A1".to_string(),
                    edited: Some(Box::new(MessageContent::Conversation {
                        text: "buy oat milk".to_string(),
                    })),
                }),
            ),
            TransportEvent::Disconnected,
            group_event(
                "B2",
                MessageContent::Conversation {
                    text: "pay rent".to_string(),
                },
            ),
            group_event(
                "P2",
                MessageContent::Protocol(ProtocolMessage {
                    kind: ProtocolKind::Revoke,
                    key_id: "B2".to_string(),
                    edited: None,
                }),
            ),
        ];
        for event in events {
            tx.send(event).await.expect("send event");
        }
        drop(tx);

        engine.run(rx).await;

        assert_eq!(store.count().expect("count"), 2);
        assert_eq!(store.get_by_id("A1").expect("get").message, "buy oat milk");
        assert!(store.get_by_id("B2").expect("get").is_deleted);
    }
}
