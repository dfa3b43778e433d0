use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::providers::{OllamaProvider, OpenAIProvider};
use crate::traits::Provider;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.trim().is_empty()).then_some(api_key);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let credentials = Self::new().with_api_key(config.api_key.clone());
        match &config.base_url {
            Some(url) => credentials.with_base_url(url.clone()),
            None => credentials,
        }
    }
}

pub type ProviderConstructor =
    Box<dyn Fn(&Credentials, &str) -> Result<Arc<dyn Provider>> + Send + Sync>;

/// Vendor name to adapter constructor.
///
/// Populated once at startup and only read afterwards; pass it by
/// reference to whatever builds the orchestrator.
pub struct ProviderRegistry {
    constructors: HashMap<String, ProviderConstructor>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register("openai", |credentials, model| {
            let api_key = require_api_key(
                "openai",
                credentials,
                &["OPENAI_API_KEY", "RELAY_OPENAI_API_KEY"],
            )?;
            let mut provider = OpenAIProvider::new(api_key).with_model(model);
            if let Some(base_url) = &credentials.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        });

        registry.register("openrouter", |credentials, model| {
            let api_key = require_api_key(
                "openrouter",
                credentials,
                &["OPENROUTER_API_KEY", "RELAY_OPENROUTER_API_KEY"],
            )?;
            let mut provider = OpenAIProvider::openrouter(api_key).with_model(model);
            if let Some(base_url) = &credentials.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        });

        registry.register("ollama", |credentials, model| {
            let mut provider = OllamaProvider::new().with_model(model);
            if let Some(base_url) = &credentials.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        });

        registry
    }

    pub fn register<F>(&mut self, vendor: &str, constructor: F)
    where
        F: Fn(&Credentials, &str) -> Result<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(vendor.trim().to_lowercase(), Box::new(constructor));
    }

    pub fn contains(&self, vendor: &str) -> bool {
        self.constructors.contains_key(&vendor.trim().to_lowercase())
    }

    pub fn vendors(&self) -> Vec<String> {
        let mut vendors: Vec<String> = self.constructors.keys().cloned().collect();
        vendors.sort();
        vendors
    }

    pub fn resolve(
        &self,
        vendor: &str,
        credentials: &Credentials,
        model: &str,
    ) -> Result<Arc<dyn Provider>> {
        if model.trim().is_empty() {
            return Err(Error::config(format!("No model given for vendor '{}'", vendor)));
        }

        let constructor = self
            .constructors
            .get(&vendor.trim().to_lowercase())
            .ok_or_else(|| {
                Error::config(format!(
                    "Unknown vendor: {}. Available: {}",
                    vendor,
                    self.vendors().join(", ")
                ))
            })?;

        constructor(credentials, model.trim())
    }

    /// Chat provider and embedding provider for a validated config.
    pub fn resolve_config(&self, config: &Config) -> Result<(Arc<dyn Provider>, Arc<dyn Provider>)> {
        config.validate()?;
        let credentials = Credentials::from_config(config);

        let chat = self.resolve(&config.vendor, &credentials, &config.model)?;
        let embedder = self.resolve(
            &config.embedding_vendor,
            &credentials,
            &config.embedding_model,
        )?;
        Ok((chat, embedder))
    }
}

/// Explicit credentials first, then the vendor's environment variables.
pub fn require_api_key(vendor: &str, credentials: &Credentials, env_vars: &[&str]) -> Result<String> {
    if let Some(key) = &credentials.api_key {
        return Ok(key.clone());
    }

    for var_name in env_vars {
        if let Ok(key) = std::env::var(var_name)
            && !key.trim().is_empty()
        {
            return Ok(key);
        }
    }

    let hint = if env_vars.is_empty() {
        String::new()
    } else {
        format!(" (or set {})", env_vars.join(" / "))
    };
    Err(Error::config(format!("No API key configured for '{}'{}", vendor, hint)))
}
