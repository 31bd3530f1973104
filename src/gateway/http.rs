//! HTTP tutor gateway client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;

use super::{GatewayError, TutorGateway, TutorReply};

/// Error description used when a rejection body carries no usable field.
const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    #[serde(default)]
    reply: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpTutorGateway {
    client: Client,
    endpoint: String,
}

impl HttpTutorGateway {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.gateway_url.clone(),
        })
    }
}

#[async_trait]
impl TutorGateway for HttpTutorGateway {
    async fn ask(&self, message: &str) -> Result<TutorReply, GatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AskRequest { message })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = rejection_detail(&body);
            tracing::warn!("Tutor gateway rejected request ({}): {}", status, detail);
            return Err(GatewayError::Rejected(detail));
        }

        // A success body that fails to decode counts as a failed exchange,
        // not as a gateway rejection.
        let body: AskResponse = response.json().await?;
        Ok(classify_reply(body.reply))
    }
}

fn classify_reply(reply: Option<String>) -> TutorReply {
    match reply {
        Some(text) if !text.trim().is_empty() => TutorReply::Answer(text),
        _ => TutorReply::Empty,
    }
}

fn rejection_detail(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}
