use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single benchmark prompt, identified by its position in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub index: usize,
    pub content: String,
}

impl Prompt {
    pub fn new(index: usize, content: impl Into<String>) -> Self {
        Self {
            index,
            content: content.into(),
        }
    }
}

/// Normalized response from any provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated text response
    pub content: String,
    /// Completion tokens reported by the provider, if any
    pub completion_tokens: Option<u32>,
}

impl ModelResponse {
    #[cfg(test)]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            completion_tokens: None,
        }
    }
}

/// One persisted (prompt, response) pair. Field names are the stored document keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub prompt: String,
    pub response: String,
    pub model: String,
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
}

impl ResultRecord {
    /// Build a record stamped with the current UTC time
    pub fn now(prompt: &Prompt, response: &ModelResponse, model: &str) -> Self {
        Self {
            prompt: prompt.content.clone(),
            response: response.content.clone(),
            model: model.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// Where a (model, prompt) pair failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Invocation,
    Persistence,
}

/// A (model, prompt) pair that produced no record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairFailure {
    pub model: String,
    pub prompt_index: usize,
    pub prompt: String,
    pub stage: FailureStage,
    pub error: String,
}

/// Per-model tally for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model: String,
    pub collection: String,
    pub succeeded: usize,
    pub failed: usize,
    /// Sum of completion tokens over successful pairs that reported usage
    pub completion_tokens: u64,
}

/// Outcome of a full run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub models: Vec<ModelSummary>,
    pub failures: Vec<PairFailure>,
}

impl RunSummary {
    pub fn records_written(&self) -> usize {
        self.models.iter().map(|m| m.succeeded).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    #[cfg(test)]
    pub fn model(&self, name: &str) -> Option<&ModelSummary> {
        self.models.iter().find(|m| m.model == name)
    }
}
