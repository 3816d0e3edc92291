use thiserror::Error;

use super::{business::BusinessSummary, conversation::BackendReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    /// Free-form text typed by the user.
    Message,
    /// A pick from the business directory; the payload is the business id.
    BusinessSelection,
}

/// A chat request that has been accepted by the relay and must be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundTurn {
    pub turn_id: u64,
    /// Session that was active when the turn started.
    pub session_id: String,
    pub payload: String,
    pub kind: TurnKind,
}

/// Ways a backend call can fail. None of them end the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend answered with HTTP {0}")]
    Status(u16),
    #[error("backend response rejected: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "BACKEND_TRANSPORT",
            Self::Status(_) => "BACKEND_STATUS",
            Self::InvalidResponse(_) => "BACKEND_INVALID_RESPONSE",
        }
    }
}

pub type TurnOutcome = Result<BackendReply, GatewayError>;

pub type DirectoryOutcome = Result<Vec<BusinessSummary>, GatewayError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnCompletion {
    pub turn: OutboundTurn,
    pub outcome: TurnOutcome,
}
