use super::ChatModel;
use crate::error::InvocationError;
use crate::models::ModelResponse;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Google Gemini through the native `generateContent` endpoint.
///
/// The key travels in the `x-goog-api-key` header and never in the URL.
/// The answer is the concatenated text parts of the first candidate.
pub struct GeminiModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl GeminiModel {
    pub fn new(api_key: &str, base_url: &str, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        let generation_config = if self.temperature.is_some() || self.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            })
        } else {
            None
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config,
        }
    }

    fn parse_response(body: GenerateContentResponse) -> Result<ModelResponse, InvocationError> {
        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or(InvocationError::EmptyResponse)?;

        let content: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if content.trim().is_empty() {
            return Err(InvocationError::EmptyResponse);
        }

        Ok(ModelResponse {
            content,
            completion_tokens: body
                .usage_metadata
                .and_then(|usage| usage.candidates_token_count),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

#[async_trait]
impl ChatModel for GeminiModel {
    async fn invoke(&self, prompt: &str) -> Result<ModelResponse, InvocationError> {
        let request = self.build_request(prompt);
        debug!(model = self.model.as_str(), "Sending Gemini generateContent request");

        let response = self
            .client
            .post(self.endpoint_url())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| InvocationError::Network(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => InvocationError::Auth,
                429 => InvocationError::RateLimited,
                _ => InvocationError::Api(format!("HTTP {}: {}", status, error_text)),
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| {
                InvocationError::Parse(format!("Failed to parse Gemini response: {}", e.without_url()))
            })?;

        Self::parse_response(body)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
