use super::ChatModel;
use crate::error::InvocationError;
use crate::models::ModelResponse;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How a [`ScriptedModel`] answers
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer every prompt with `"{prefix}: {prompt}"`
    Echo(String),
    /// Fail every call, like a provider with a rejected key
    Fail,
    /// Fail only on prompts equal to the given text, echo the rest
    FailOn(String),
}

/// In-process model for exercising the runner without a network
pub struct ScriptedModel {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn echo(prefix: &str) -> Self {
        Self::new(Reply::Echo(prefix.to_string()))
    }

    pub fn failing() -> Self {
        Self::new(Reply::Fail)
    }

    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, prompt: &str) -> Result<ModelResponse, InvocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            Reply::Echo(prefix) => Ok(ModelResponse::text(format!("{}: {}", prefix, prompt))),
            Reply::Fail => Err(InvocationError::Auth),
            Reply::FailOn(bad) if bad == prompt => {
                Err(InvocationError::Api("scripted failure".to_string()))
            }
            Reply::FailOn(_) => Ok(ModelResponse::text(format!("ok: {}", prompt))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
