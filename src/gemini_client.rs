use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::gateway::{CompletionSource, GatewayError};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(GatewayError::MissingApiKey)?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, GatewayError> {
        let api_url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let request_body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [
                        {
                            "text": prompt
                        }
                    ]
                }
            ]
        });

        debug!("Sending request to Gemini model {}: {}", model, request_body);

        let response = self
            .client
            .post(&api_url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini request failed with status {}: {}", status, error_text);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let response_json: Value = response.json().await?;
        debug!("Received response from Gemini: {}", response_json);

        extract_text(&response_json).ok_or(GatewayError::EmptyResponse)
    }
}

#[async_trait]
impl CompletionSource for GeminiClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, GatewayError> {
        self.generate_content(model, prompt).await
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
