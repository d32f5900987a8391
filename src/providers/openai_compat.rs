use crate::error::InvocationError;
use crate::models::ModelResponse;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    CreateChatCompletionResponse,
};
use async_openai::{Client, config::OpenAIConfig};
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;

/// Sampling options shared by the OpenAI-compatible adapters
#[derive(Debug, Clone, Default)]
pub struct Sampling {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Create a client for an OpenAI-compatible endpoint with the built-in retry turned off
pub fn create_client(api_key: &str, api_base: &str) -> Client<OpenAIConfig> {
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base);

    let no_retry = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    Client::with_config(openai_config).with_backoff(no_retry)
}

/// Build a non-streaming chat completion request
pub fn build_request(
    model: &str,
    messages: Vec<ChatCompletionRequestMessage>,
    sampling: &Sampling,
) -> Result<CreateChatCompletionRequest, InvocationError> {
    let mut args = CreateChatCompletionRequestArgs::default();
    args.model(model).messages(messages).stream(false);

    if let Some(temperature) = sampling.temperature {
        args.temperature(temperature);
    }
    if let Some(max_tokens) = sampling.max_tokens {
        args.max_tokens(u16::try_from(max_tokens).unwrap_or(u16::MAX));
    }

    args.build()
        .map_err(|e| InvocationError::Api(format!("failed to build request: {}", e)))
}

/// Execute a chat completion request
pub async fn execute(
    client: &Client<OpenAIConfig>,
    request: CreateChatCompletionRequest,
) -> Result<CreateChatCompletionResponse, InvocationError> {
    client.chat().create(request).await.map_err(map_error)
}

/// Extract `choices[0].message.content` and token usage
pub fn extract_model_response(
    response: CreateChatCompletionResponse,
) -> Result<ModelResponse, InvocationError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(InvocationError::EmptyResponse)?;

    Ok(ModelResponse {
        content,
        completion_tokens: response.usage.map(|usage| usage.completion_tokens),
    })
}

fn map_error(err: OpenAIError) -> InvocationError {
    match err {
        OpenAIError::Reqwest(e) => InvocationError::Network(e.to_string()),
        OpenAIError::JSONDeserialize(e) => InvocationError::Parse(e.to_string()),
        OpenAIError::ApiError(api) => InvocationError::Api(api.message),
        other => InvocationError::Api(other.to_string()),
    }
}

#[cfg(test)]
pub mod fixtures {
    use serde_json::json;

    /// A chat completion body as returned by OpenAI-compatible endpoints
    pub fn chat_completion(content: &str) -> String {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 1_700_000_000u32,
            "model": "test-model",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
        })
        .to_string()
    }

    pub fn api_error(message: &str) -> String {
        json!({
            "error": {
                "message": message,
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            }
        })
        .to_string()
    }
}
