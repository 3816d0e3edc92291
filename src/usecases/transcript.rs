//! Append-only transcript of the current session, mirrored to the store.

use serde_json::Value;

use crate::domain::message::Message;

use super::contracts::SessionStore;

const TRANSCRIPT_HYDRATE_FAILED: &str = "TRANSCRIPT_HYDRATE_FAILED";
const TRANSCRIPT_ENTRY_DROPPED: &str = "TRANSCRIPT_ENTRY_DROPPED";
const TRANSCRIPT_PERSIST_FAILED: &str = "TRANSCRIPT_PERSIST_FAILED";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Rebuilds a transcript from its stored JSON form.
    ///
    /// An unreadable document yields an empty transcript; individual entries
    /// that do not decode are skipped and the rest are kept in order.
    pub fn hydrate(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        let entries: Vec<Value> = match serde_json::from_str(raw) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(
                    code = TRANSCRIPT_HYDRATE_FAILED,
                    error = %error,
                    "stored transcript is unreadable; continuing with an empty transcript"
                );
                return Self::default();
            }
        };

        let total = entries.len();
        let messages: Vec<Message> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(message) => Some(message),
                Err(error) => {
                    tracing::warn!(
                        code = TRANSCRIPT_ENTRY_DROPPED,
                        index,
                        error = %error,
                        "dropping malformed transcript entry"
                    );
                    None
                }
            })
            .collect();

        tracing::debug!(
            restored = messages.len(),
            stored = total,
            "transcript hydrated"
        );

        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn append(&mut self, message: Message, store: &mut dyn SessionStore) {
        self.push(message);
        self.persist(store);
    }

    /// Appends without touching the store.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.messages)
    }

    fn persist(&self, store: &mut dyn SessionStore) {
        if self.messages.is_empty() {
            return;
        }

        let result = self
            .to_json()
            .map_err(anyhow::Error::from)
            .and_then(|raw| store.save_transcript(&raw));

        if let Err(error) = result {
            tracing::warn!(
                code = TRANSCRIPT_PERSIST_FAILED,
                error = ?error,
                "transcript could not be persisted; keeping it in memory"
            );
        }
    }
}
