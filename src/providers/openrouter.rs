use super::ChatModel;
use super::openai_compat::{self, Sampling};
use crate::error::InvocationError;
use crate::models::ModelResponse;
use async_openai::types::ChatCompletionRequestUserMessageArgs;
use async_openai::{Client, config::OpenAIConfig};
use async_trait::async_trait;
use tracing::debug;

/// Unified chat shape: one user message in, one text out, through an
/// OpenAI-compatible gateway such as OpenRouter
pub struct UnifiedChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    sampling: Sampling,
}

impl UnifiedChatModel {
    pub fn new(api_key: &str, api_base: &str, model: impl Into<String>) -> Self {
        Self {
            client: openai_compat::create_client(api_key, api_base),
            model: model.into(),
            sampling: Sampling::default(),
        }
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.sampling = Sampling {
            temperature,
            max_tokens,
        };
        self
    }
}

#[async_trait]
impl ChatModel for UnifiedChatModel {
    async fn invoke(&self, prompt: &str) -> Result<ModelResponse, InvocationError> {
        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(|e| InvocationError::Api(format!("failed to build user message: {}", e)))?
            .into();

        let request = openai_compat::build_request(&self.model, vec![user_message], &self.sampling)?;
        debug!(model = self.model.as_str(), "Sending unified chat request");

        let response = openai_compat::execute(&self.client, request).await?;
        openai_compat::extract_model_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::openai_compat::fixtures;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_invoke_sends_single_user_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer or-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "openai/chatgpt-4o-latest",
                "messages": [{"role": "user", "content": "What is 2+2?"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(fixtures::chat_completion("2+2 is 4."))
            .create_async()
            .await;

        let model = UnifiedChatModel::new("or-key", &server.url(), "openai/chatgpt-4o-latest");
        let response = model.invoke("What is 2+2?").await.unwrap();

        assert_eq!(response.content, "2+2 is 4.");
        assert_eq!(response.completion_tokens, Some(7));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invoke_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(fixtures::api_error("Invalid API key"))
            .create_async()
            .await;

        let model = UnifiedChatModel::new("bad-key", &server.url(), "anthropic/claude-3-sonnet");
        let err = model.invoke("Name a primary color.").await.unwrap_err();

        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn test_provider_name() {
        let model = UnifiedChatModel::new("k", "http://localhost", "m");
        assert_eq!(model.provider_name(), "openrouter");
    }
}
