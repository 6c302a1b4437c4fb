use desk_logging::{desk_error, desk_info, desk_warn};
use docdesk_core::model::{DocumentComparison, DocumentContradiction, DocumentPattern};
use docdesk_core::{CachedSession, Message};
use docdesk_engine::{LocalStore, Namespace, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Maps cached sessions onto the store's per-artifact namespaces.
#[derive(Debug, Clone)]
pub struct SessionPersistence {
    store: LocalStore,
}

impl SessionPersistence {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Unreadable namespaces are logged and treated as empty.
    pub fn load(&self, key: &str) -> Option<CachedSession> {
        let session = CachedSession {
            messages: self
                .read::<Vec<Message>>(Namespace::Conversation, key)
                .unwrap_or_default(),
            comparison: self.read::<DocumentComparison>(Namespace::Comparison, key),
            patterns: self
                .read::<Vec<DocumentPattern>>(Namespace::Patterns, key)
                .unwrap_or_default(),
            contradictions: self
                .read::<Vec<DocumentContradiction>>(Namespace::Contradictions, key)
                .unwrap_or_default(),
        };
        if session.is_empty() {
            return None;
        }
        desk_info!(
            "Restored session {} ({} messages)",
            key,
            session.messages.len()
        );
        Some(session)
    }

    pub fn save(&self, key: &str, session: &CachedSession) {
        self.write_or_clear(
            Namespace::Conversation,
            key,
            &session.messages,
            session.messages.is_empty(),
        );
        match &session.comparison {
            Some(comparison) => self.write(Namespace::Comparison, key, comparison),
            None => self.clear(Namespace::Comparison, key),
        }
        self.write_or_clear(
            Namespace::Patterns,
            key,
            &session.patterns,
            session.patterns.is_empty(),
        );
        self.write_or_clear(
            Namespace::Contradictions,
            key,
            &session.contradictions,
            session.contradictions.is_empty(),
        );
    }

    pub fn clear_conversation(&self, key: &str) {
        self.clear(Namespace::Conversation, key);
    }

    fn read<T: DeserializeOwned>(&self, namespace: Namespace, key: &str) -> Option<T> {
        match self.store.load(namespace, key) {
            Ok(value) => value,
            Err(err) => {
                desk_warn!("Could not read {} for {}: {}", namespace.as_str(), key, err);
                None
            }
        }
    }

    fn write_or_clear<T: Serialize>(
        &self,
        namespace: Namespace,
        key: &str,
        value: &T,
        empty: bool,
    ) {
        if empty {
            self.clear(namespace, key);
        } else {
            self.write(namespace, key, value);
        }
    }

    fn write<T: Serialize>(&self, namespace: Namespace, key: &str, value: &T) {
        if let Err(err) = self.store.save(namespace, key, value) {
            log_store_error("write", namespace, key, &err);
        }
    }

    fn clear(&self, namespace: Namespace, key: &str) {
        if let Err(err) = self.store.clear(namespace, key) {
            log_store_error("clear", namespace, key, &err);
        }
    }
}

fn log_store_error(action: &str, namespace: Namespace, key: &str, err: &StoreError) {
    desk_error!(
        "Failed to {} {} for {}: {}",
        action,
        namespace.as_str(),
        key,
        err
    );
}
