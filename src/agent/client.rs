//! Provider registry and factory.
//!
//! Maps backends to concrete [`LlmProvider`] implementations and resolves
//! the per-operation [`Bindings`] for a run.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::agent::binding::{Backend, Bindings, Operation, OperationBinding};
use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::{GeminiProvider, OpenAiProvider};
use crate::error::AgentError;

/// Creates the [`LlmProvider`] for `backend`.
///
/// # Supported Backends
///
/// - `openai`: `OpenAI` chat completions via `async-openai`
/// - `groq`: Groq's `OpenAI`-compatible endpoint via `async-openai`
/// - `gemini`: Gemini `generateContent` via `reqwest`
///
/// # Errors
///
/// Returns [`AgentError::ApiKeyMissing`] if no key is configured for the
/// backend.
pub fn create_provider(
    backend: Backend,
    config: &AgentConfig,
) -> Result<Arc<dyn LlmProvider>, AgentError> {
    let api_key = config
        .api_keys
        .get(&backend)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| AgentError::ApiKeyMissing {
            backend: backend.to_string(),
            env_var: backend.api_key_env().to_string(),
        })?;
    let base_url = config
        .base_urls
        .get(&backend)
        .map(String::as_str)
        .or_else(|| backend.default_base_url());

    let provider: Arc<dyn LlmProvider> = match backend {
        Backend::OpenAi | Backend::Groq => Arc::new(OpenAiProvider::new(
            backend.as_str(),
            api_key,
            base_url,
            config.timeout,
        )),
        Backend::Gemini => Arc::new(GeminiProvider::new(
            api_key,
            base_url.unwrap_or("https://generativelanguage.googleapis.com/v1beta"),
            config.timeout,
        )?),
    };
    Ok(provider)
}

/// Resolves every operation to a binding, creating one provider per
/// distinct backend.
///
/// Fails before any network traffic if a bound backend has no key.
///
/// # Errors
///
/// Returns the first [`AgentError`] from [`create_provider`].
pub fn resolve_bindings(config: &AgentConfig) -> Result<Bindings, AgentError> {
    let mut providers: BTreeMap<Backend, Arc<dyn LlmProvider>> = BTreeMap::new();
    let mut bind = |operation: Operation| -> Result<OperationBinding, AgentError> {
        let backend = config.backend_for(operation);
        let provider = match providers.get(&backend) {
            Some(p) => Arc::clone(p),
            None => {
                let p = create_provider(backend, config)?;
                providers.insert(backend, Arc::clone(&p));
                p
            }
        };
        let model = config.model_for(backend, operation);
        debug!(%operation, %backend, %model, "bound operation");
        Ok(OperationBinding {
            operation,
            backend,
            model,
            provider,
        })
    };

    Ok(Bindings {
        clarify: bind(Operation::Clarify)?,
        plan: bind(Operation::Plan)?,
        generate_queries: bind(Operation::GenerateQueries)?,
        synthesize_report: bind(Operation::SynthesizeReport)?,
        next_step: bind(Operation::NextStep)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys(keys: &[Backend]) -> AgentConfig {
        keys.iter()
            .fold(AgentConfig::builder(), |b, &backend| b.api_key(backend, "test"))
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_create_groq_provider() {
        let config = config_with_keys(&[Backend::Groq]);
        let provider = create_provider(Backend::Groq, &config);
        assert_eq!(provider.map(|p| p.name()).ok(), Some("groq"));
    }

    #[test]
    fn test_create_gemini_provider() {
        let config = config_with_keys(&[Backend::Gemini]);
        let provider = create_provider(Backend::Gemini, &config).unwrap_or_else(|_| unreachable!());
        assert_eq!(provider.name(), "gemini");
        assert!(provider.supports_structured_output());
    }

    #[test]
    fn test_missing_key() {
        let config = config_with_keys(&[]);
        let result = create_provider(Backend::OpenAi, &config);
        assert!(matches!(
            result,
            Err(AgentError::ApiKeyMissing { ref env_var, .. }) if env_var == "OPENAI_API_KEY"
        ));
    }

    #[test]
    fn test_resolve_default_bindings() {
        let config = config_with_keys(&[Backend::Groq, Backend::Gemini]);
        let bindings = resolve_bindings(&config).unwrap_or_else(|_| unreachable!());
        assert_eq!(bindings.clarify.backend, Backend::Groq);
        assert_eq!(bindings.synthesize_report.backend, Backend::Gemini);
        assert_eq!(bindings.synthesize_report.provider.name(), "gemini");
        assert!(Arc::ptr_eq(&bindings.clarify.provider, &bindings.plan.provider));
    }

    #[test]
    fn test_resolve_fails_when_bound_backend_lacks_key() {
        let config = config_with_keys(&[Backend::Groq]);
        let result = resolve_bindings(&config);
        assert!(matches!(
            result,
            Err(AgentError::ApiKeyMissing { ref backend, .. }) if backend == "gemini"
        ));
    }
}
