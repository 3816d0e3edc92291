use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    business::BusinessSummary,
    conversation::BackendReply,
    events::AppEvent,
    turn::{GatewayError, OutboundTurn},
};

use super::shell::ChatView;

pub trait AppEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>>;
}

pub trait ShellOrchestrator {
    fn is_running(&self) -> bool;
    fn view(&self) -> ChatView<'_>;
    fn handle_event(&mut self, event: AppEvent) -> Result<()>;
}

/// Everything the durable store knows about the last session.
///
/// Each field may be missing on its own: a brand-new session has no
/// transcript or business name yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredSession {
    pub session_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Serialized transcript, parsed by the transcript manager.
    pub transcript: Option<String>,
    pub business_name: Option<String>,
}

pub trait SessionStore {
    fn load(&self) -> Result<StoredSession>;
    /// Writes the id and its creation time as one unit.
    fn save_session(&mut self, session_id: &str, created_at: DateTime<Utc>) -> Result<()>;
    fn save_transcript(&mut self, raw: &str) -> Result<()>;
    fn save_business_name(&mut self, business_name: Option<&str>) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

impl<T: SessionStore + ?Sized> SessionStore for Box<T> {
    fn load(&self) -> Result<StoredSession> {
        (**self).load()
    }

    fn save_session(&mut self, session_id: &str, created_at: DateTime<Utc>) -> Result<()> {
        (**self).save_session(session_id, created_at)
    }

    fn save_transcript(&mut self, raw: &str) -> Result<()> {
        (**self).save_transcript(raw)
    }

    fn save_business_name(&mut self, business_name: Option<&str>) -> Result<()> {
        (**self).save_business_name(business_name)
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_turn(&self, message: &str, session_id: &str)
        -> Result<BackendReply, GatewayError>;
}

#[async_trait]
pub trait BusinessDirectorySource: Send + Sync {
    async fn fetch_businesses(&self) -> Result<Vec<BusinessSummary>, GatewayError>;
}

/// Runs backend calls off the UI thread and reports back as [`AppEvent`]s.
pub trait TurnDispatcher {
    fn dispatch_turn(&self, turn: OutboundTurn);
    fn dispatch_directory_fetch(&self);
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}
