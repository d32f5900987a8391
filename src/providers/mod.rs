//! Provider adapters. Every provider family sits behind [`ChatModel`], so the
//! runner never sees provider-specific response shapes.

use crate::error::InvocationError;
use crate::models::ModelResponse;
use async_trait::async_trait;

mod deepseek;
pub(crate) mod gemini;
#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod openai_compat;
mod openrouter;

pub use deepseek::DeepSeekModel;
pub use gemini::GeminiModel;
pub use openrouter::UnifiedChatModel;

/// A model that turns one prompt into one text response
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `prompt` and return the normalized response
    async fn invoke(&self, prompt: &str) -> Result<ModelResponse, InvocationError>;

    /// Provider family name, for diagnostics
    fn provider_name(&self) -> &'static str;
}
