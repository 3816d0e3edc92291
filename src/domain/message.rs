use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text shown in place of a bot answer when a turn fails in transit.
pub const APOLOGY_TEXT: &str = "Sorry, I encountered an error, Please try again later.";

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn display_label(self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Bot => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: next_message_id(timestamp),
            text: text.into(),
            sender,
            timestamp,
        }
    }

    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(text, Sender::User, timestamp)
    }

    pub fn bot(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(text, Sender::Bot, timestamp)
    }

    /// The locally synthesized reply used when the backend could not be reached.
    pub fn apology(timestamp: DateTime<Utc>) -> Self {
        Self::bot(APOLOGY_TEXT, timestamp)
    }
}

fn next_message_id(timestamp: DateTime<Utc>) -> String {
    let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{seq}", timestamp.timestamp_millis())
}
