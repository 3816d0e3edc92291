use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{
    domain::{business::BusinessSummary, conversation::BackendReply, turn::GatewayError},
    infra::{config::BackendConfig, error::AppError},
    usecases::contracts::{BusinessDirectorySource, ChatGateway},
};

use super::wire::{BusinessListEnvelope, ChatRequest, ChatResponseEnvelope};

const CHAT_PATH: &str = "/chatbot/web-chat";
const BUSINESSES_PATH: &str = "/web-hook/get-all-business";

/// HTTP client for the chatbot backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("bizchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AppError::HttpClientInit)?;

        tracing::info!(base_url = %config.base_url, "backend client initialized");

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        serde_json::from_slice(&body).map_err(|error| GatewayError::InvalidResponse(error.to_string()))
    }
}

#[async_trait]
impl ChatGateway for BackendClient {
    async fn send_turn(
        &self,
        message: &str,
        session_id: &str,
    ) -> Result<BackendReply, GatewayError> {
        let response = self
            .http
            .post(self.url(CHAT_PATH))
            .json(&ChatRequest {
                message,
                session_id,
            })
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        let envelope: ChatResponseEnvelope = Self::decode(response).await?;
        envelope.into_reply()
    }
}

#[async_trait]
impl BusinessDirectorySource for BackendClient {
    async fn fetch_businesses(&self) -> Result<Vec<BusinessSummary>, GatewayError> {
        let response = self
            .http
            .get(self.url(BUSINESSES_PATH))
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        let envelope: BusinessListEnvelope = Self::decode(response).await?;
        Ok(envelope.into_businesses())
    }
}
