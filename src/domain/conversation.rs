/// Backend token that asks the client to let the user pick a business.
pub const AWAITING_BUSINESS_TOKEN: &str = "AWAITING_BUSINESS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Chat,
    AwaitingBusiness,
}

impl ConversationState {
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some(AWAITING_BUSINESS_TOKEN) => Self::AwaitingBusiness,
            _ => Self::Chat,
        }
    }
}

/// A chat response that already passed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    /// The backend asked for the whole local session to be discarded.
    Reset,
    Answer {
        answer: String,
        state: ConversationState,
        business_name: Option<String>,
        business_description: Option<String>,
    },
}

impl BackendReply {
    pub fn answer(answer: impl Into<String>) -> Self {
        Self::Answer {
            answer: answer.into(),
            state: ConversationState::Chat,
            business_name: None,
            business_description: None,
        }
    }
}
