use super::ChatModel;
use super::openai_compat::{self, Sampling};
use crate::error::InvocationError;
use crate::models::ModelResponse;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use async_openai::{Client, config::OpenAIConfig};
use async_trait::async_trait;
use tracing::debug;

/// DeepSeek's native chat shape: a fixed system instruction plus the user
/// prompt, non-streaming, answer read from `choices[0].message.content`
pub struct DeepSeekModel {
    client: Client<OpenAIConfig>,
    model: String,
    system_prompt: String,
    sampling: Sampling,
}

impl DeepSeekModel {
    pub fn new(
        api_key: &str,
        api_base: &str,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client: openai_compat::create_client(api_key, api_base),
            model: model.into(),
            system_prompt: system_prompt.into(),
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
impl ChatModel for DeepSeekModel {
    async fn invoke(&self, prompt: &str) -> Result<ModelResponse, InvocationError> {
        let system_message = ChatCompletionRequestSystemMessageArgs::default()
            .content(self.system_prompt.clone())
            .build()
            .map_err(|e| InvocationError::Api(format!("failed to build system message: {}", e)))?
            .into();

        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(|e| InvocationError::Api(format!("failed to build user message: {}", e)))?
            .into();

        let request = openai_compat::build_request(
            &self.model,
            vec![system_message, user_message],
            &self.sampling,
        )?;
        debug!(model = self.model.as_str(), "Sending DeepSeek chat request");

        let response = openai_compat::execute(&self.client, request).await?;
        openai_compat::extract_model_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "deepseek"
    }
}
