use crate::config::RunnerConfig;
use crate::error::{ConfigError, InvocationError, StoreError};
use crate::models::{
    FailureStage, ModelResponse, ModelSummary, PairFailure, Prompt, ResultRecord, RunSummary,
};
use crate::providers::ChatModel;
use crate::registry::ProviderRegistry;
use crate::store::ResponseStore;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Why a single (model, prompt) pair produced no record
#[derive(Debug, Error)]
pub enum PairError {
    #[error("invocation failed: {0}")]
    Invocation(#[from] InvocationError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

impl PairError {
    fn stage(&self) -> FailureStage {
        match self {
            PairError::Invocation(_) => FailureStage::Invocation,
            PairError::Persistence(_) => FailureStage::Persistence,
        }
    }
}

/// Loop options
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub request_timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self::from(&RunnerConfig::default())
    }
}

impl From<&RunnerConfig> for RunnerOptions {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            max_concurrency: config.max_concurrency.max(1),
        }
    }
}

/// Sends every prompt to every registered model and persists the answers
pub struct Runner {
    registry: ProviderRegistry,
    collections: BTreeMap<String, String>,
    store: Arc<dyn ResponseStore>,
    options: RunnerOptions,
}

impl Runner {
    /// Create a runner. Every registered model must have a response collection.
    pub fn new(
        registry: ProviderRegistry,
        collections: BTreeMap<String, String>,
        store: Arc<dyn ResponseStore>,
        options: RunnerOptions,
    ) -> Result<Self, ConfigError> {
        for name in registry.names() {
            if !collections.contains_key(name) {
                return Err(ConfigError::MissingCollection(name.to_string()));
            }
        }

        Ok(Self {
            registry,
            collections,
            store,
            options,
        })
    }

    /// Run every (model, prompt) pair.
    ///
    /// Models are processed in registration order and prompts in source
    /// order. A failing pair is logged and recorded in the summary; it never
    /// stops the remaining pairs.
    pub async fn run(&self, prompts: &[Prompt]) -> RunSummary {
        let mut summary = RunSummary::default();
        let total_models = self.registry.len();

        for (model_index, (name, handle)) in self.registry.models().iter().enumerate() {
            info!(
                model = name.as_str(),
                "Evaluating model {}/{}",
                model_index + 1,
                total_models
            );

            let (model_summary, failures) = self
                .run_model(name, handle.as_ref(), prompts, model_index + 1, total_models)
                .await;

            info!(
                model = name.as_str(),
                succeeded = model_summary.succeeded,
                failed = model_summary.failed,
                "Finished model"
            );
            summary.models.push(model_summary);
            summary.failures.extend(failures);
        }

        summary
    }

    /// Process all prompts for a single model
    async fn run_model(
        &self,
        name: &str,
        handle: &dyn ChatModel,
        prompts: &[Prompt],
        model_num: usize,
        total_models: usize,
    ) -> (ModelSummary, Vec<PairFailure>) {
        let collection = &self.collections[name];
        let mut model_summary = ModelSummary {
            model: name.to_string(),
            collection: collection.clone(),
            ..ModelSummary::default()
        };
        let mut failures = Vec::new();
        let total_prompts = prompts.len();

        // Up to max_concurrency invocations in flight; `buffered` yields them
        // in prompt order so records are still written in enumeration order.
        let invocations = futures::stream::iter(prompts)
            .map(move |prompt| async move { (prompt, self.invoke(handle, &prompt.content).await) })
            .buffered(self.options.max_concurrency);
        let mut invocations = pin!(invocations);

        while let Some((prompt, invocation)) = invocations.next().await {
            debug!(
                model = name,
                "Processing prompt {}/{}, model {}/{}",
                prompt.index + 1,
                total_prompts,
                model_num,
                total_models
            );

            match self.persist(name, collection, prompt, invocation).await {
                Ok(response) => {
                    model_summary.succeeded += 1;
                    if let Some(tokens) = response.completion_tokens {
                        model_summary.completion_tokens += u64::from(tokens);
                    }
                }
                Err(err) => {
                    error!(
                        model = name,
                        prompt_index = prompt.index,
                        stage = ?err.stage(),
                        "Error evaluating prompt: {}",
                        err
                    );
                    model_summary.failed += 1;
                    failures.push(PairFailure {
                        model: name.to_string(),
                        prompt_index: prompt.index,
                        prompt: prompt.content.clone(),
                        stage: err.stage(),
                        error: err.to_string(),
                    });
                }
            }
        }

        (model_summary, failures)
    }

    /// Invoke one model under the per-call timeout
    async fn invoke(
        &self,
        handle: &dyn ChatModel,
        prompt: &str,
    ) -> Result<ModelResponse, InvocationError> {
        tokio::time::timeout(self.options.request_timeout, handle.invoke(prompt))
            .await
            .map_err(|_| InvocationError::Timeout(self.options.request_timeout))?
    }

    /// Turn a finished invocation into exactly one stored record
    async fn persist(
        &self,
        name: &str,
        collection: &str,
        prompt: &Prompt,
        invocation: Result<ModelResponse, InvocationError>,
    ) -> Result<ModelResponse, PairError> {
        let response = invocation?;
        let record = ResultRecord::now(prompt, &response, name);
        self.store.append(collection, &record).await?;

        debug!(
            model = name,
            collection,
            prompt_index = prompt.index,
            "Saved response"
        );
        Ok(response)
    }
}
