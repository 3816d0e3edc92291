//! JSON envelopes exchanged with the chatbot backend.

use serde::{Deserialize, Serialize};

use crate::domain::{
    business::BusinessSummary,
    conversation::{BackendReply, ConversationState},
    turn::GatewayError,
};

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub session_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseEnvelope {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub business_description: Option<String>,
    #[serde(default)]
    pub session_reset: Option<bool>,
}

impl ChatResponseEnvelope {
    /// A reset wins over everything else; otherwise `answer` is mandatory.
    pub fn into_reply(self) -> Result<BackendReply, GatewayError> {
        if self.session_reset.unwrap_or(false) {
            return Ok(BackendReply::Reset);
        }

        let answer = self.answer.ok_or_else(|| {
            GatewayError::InvalidResponse("chat response has no answer".to_owned())
        })?;

        Ok(BackendReply::Answer {
            answer,
            state: ConversationState::from_token(self.state.as_deref()),
            business_name: non_blank(self.business_name),
            business_description: non_blank(self.business_description),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BusinessListEnvelope {
    pub businesses: Vec<BusinessEntry>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BusinessEntry {
    pub business_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl BusinessListEnvelope {
    pub fn into_businesses(self) -> Vec<BusinessSummary> {
        if let Some(count) = self.count.filter(|count| *count != self.businesses.len()) {
            tracing::debug!(
                declared = count,
                received = self.businesses.len(),
                "business list count does not match its entries"
            );
        }

        self.businesses
            .into_iter()
            .map(|entry| BusinessSummary {
                business_id: entry.business_id,
                name: entry.name,
                description: entry.description.unwrap_or_default(),
            })
            .collect()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
