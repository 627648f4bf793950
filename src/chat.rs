use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ChatbotConfig;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chatbot responder is not configured")]
    NotConfigured,

    #[error("chatbot request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chatbot answered {status}: {body}")]
    Upstream { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    session_id: &'a str,
    user_input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    response: String,
}

/// Forwards conversation turns to the emotional-support responder.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    url: Option<String>,
}

impl ChatClient {
    pub fn new(config: &ChatbotConfig) -> Result<Self, ChatError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub async fn reply(&self, session_id: &str, user_input: &str) -> Result<String, ChatError> {
        let url = self.url.as_deref().ok_or(ChatError::NotConfigured)?;
        debug!(session_id, chars = user_input.chars().count(), "forwarding chat turn");

        let response = self
            .client
            .post(url)
            .json(&ChatRequest {
                session_id,
                user_input,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<ChatReply>().await?.response)
    }
}
