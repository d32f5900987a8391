use crate::config::{Config, CredentialsConfig, ModelConfig, ProviderKind};
use crate::error::ConfigError;
use crate::providers::{ChatModel, DeepSeekModel, GeminiModel, UnifiedChatModel};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// Provider API keys, resolved once at startup
#[derive(Clone, Default)]
pub struct Credentials {
    keys: HashMap<ProviderKind, String>,
    env_vars: HashMap<ProviderKind, String>,
}

impl Credentials {
    /// Read every provider key from the environment variables named in `config`
    pub fn from_env(config: &CredentialsConfig) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(config: &CredentialsConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut credentials = Self::default();
        for provider in [ProviderKind::OpenRouter, ProviderKind::DeepSeek, ProviderKind::Gemini] {
            let env_var = config.env_var(provider).to_string();
            if let Some(key) = lookup(&env_var) {
                credentials.keys.insert(provider, key);
            }
            credentials.env_vars.insert(provider, env_var);
        }
        credentials
    }

    /// The key for `provider`, or a configuration error when it is unset or blank
    pub fn require(&self, provider: ProviderKind) -> Result<&str, ConfigError> {
        match self.keys.get(&provider).map(|k| k.trim()) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConfigError::MissingCredential {
                provider: provider.as_str().to_string(),
                env_var: self
                    .env_vars
                    .get(&provider)
                    .cloned()
                    .unwrap_or_else(|| provider.as_str().to_string()),
            }),
        }
    }
}

/// Named model handles in registration order
pub struct ProviderRegistry {
    models: Vec<(String, Arc<dyn ChatModel>)>,
}

impl ProviderRegistry {
    /// Wrap already-built handles. Names must be unique.
    pub fn new(models: Vec<(String, Arc<dyn ChatModel>)>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for (name, _) in &models {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateModel(name.clone()));
            }
        }
        Ok(Self { models })
    }

    /// Build one handle per configured model.
    ///
    /// Every credential the configured models need is checked before any
    /// handle is created, so a partial configuration never produces a
    /// registry with models quietly missing.
    pub fn build(config: &Config, credentials: &Credentials) -> Result<Self, ConfigError> {
        for model in &config.models {
            credentials.require(model.provider)?;
        }

        let mut models = Vec::with_capacity(config.models.len());
        for model in &config.models {
            let api_key = credentials.require(model.provider)?;
            let handle = Self::create_handle(model, api_key, &config.runner.system_prompt);
            info!(
                model = model.name.as_str(),
                provider = handle.provider_name(),
                provider_model = model.model.as_str(),
                "Registered model"
            );
            models.push((model.name.clone(), handle));
        }

        Self::new(models)
    }

    fn create_handle(model: &ModelConfig, api_key: &str, system_prompt: &str) -> Arc<dyn ChatModel> {
        match model.provider {
            ProviderKind::OpenRouter => Arc::new(
                UnifiedChatModel::new(api_key, model.api_base(), model.model.clone())
                    .with_sampling(model.temperature, model.max_tokens),
            ),
            ProviderKind::DeepSeek => Arc::new(
                DeepSeekModel::new(api_key, model.api_base(), model.model.clone(), system_prompt)
                    .with_sampling(model.temperature, model.max_tokens),
            ),
            ProviderKind::Gemini => Arc::new(
                GeminiModel::new(api_key, model.api_base(), model.model.clone())
                    .with_sampling(model.temperature, model.max_tokens),
            ),
        }
    }

    pub fn models(&self) -> &[(String, Arc<dyn ChatModel>)] {
        &self.models
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::ScriptedModel;

    fn all_keys() -> Credentials {
        Credentials::from_lookup(&CredentialsConfig::default(), |name| {
            Some(format!("key-for-{}", name))
        })
    }

    #[test]
    fn test_build_default_models_in_order() {
        let registry = ProviderRegistry::build(&Config::default(), &all_keys()).unwrap();
        assert_eq!(
            registry.names(),
            vec!["GPT-4o", "Claude 3 Sonnet", "Deepseek", "Gemini"]
        );

        let providers: Vec<_> = registry
            .models()
            .iter()
            .map(|(_, handle)| handle.provider_name())
            .collect();
        assert_eq!(providers, vec!["openrouter", "openrouter", "deepseek", "gemini"]);
    }

    #[test]
    fn test_missing_credential_fails_fast() {
        let credentials = Credentials::from_lookup(&CredentialsConfig::default(), |name| {
            (name != "GOOGLE_API_KEY").then(|| "present".to_string())
        });

        match ProviderRegistry::build(&Config::default(), &credentials) {
            Err(ConfigError::MissingCredential { provider, env_var }) => {
                assert_eq!(provider, "gemini");
                assert_eq!(env_var, "GOOGLE_API_KEY");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("registry built without a Gemini key"),
        }
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let credentials = Credentials::from_lookup(&CredentialsConfig::default(), |name| {
            Some(if name == "DEEPSEEK_API_KEY" { "   " } else { "k" }.to_string())
        });
        assert!(matches!(
            credentials.require(ProviderKind::DeepSeek),
            Err(ConfigError::MissingCredential { .. })
        ));
        assert_eq!(credentials.require(ProviderKind::OpenRouter).unwrap(), "k");
    }

    #[test]
    fn test_only_configured_providers_required() {
        let mut config = Config::default();
        config.models.retain(|m| m.provider == ProviderKind::DeepSeek);
        let credentials = Credentials::from_lookup(&CredentialsConfig::default(), |name| {
            (name == "DEEPSEEK_API_KEY").then(|| "ds".to_string())
        });

        let registry = ProviderRegistry::build(&config, &credentials).unwrap();
        assert_eq!(registry.names(), vec!["Deepseek"]);
    }

    #[test]
    fn test_custom_env_var_names() {
        let credentials_config = CredentialsConfig {
            openrouter_env: "MY_ROUTER_KEY".to_string(),
            ..CredentialsConfig::default()
        };
        let credentials = Credentials::from_lookup(&credentials_config, |_| None);

        match credentials.require(ProviderKind::OpenRouter) {
            Err(ConfigError::MissingCredential { env_var, .. }) => {
                assert_eq!(env_var, "MY_ROUTER_KEY")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let handle: Arc<dyn ChatModel> = Arc::new(ScriptedModel::echo("a"));
        let result = ProviderRegistry::new(vec![
            ("Same".to_string(), handle.clone()),
            ("Same".to_string(), handle),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateModel(_))));
    }
}
