//! Uniform `generate(prompt, options) -> text` over named LLM providers.
//!
//! Grounded on `forge-providers`: a shared `OnceLock<reqwest::Client>` HTTP
//! client, an `ApiConfig`-like per-provider configuration (host/model/
//! timeout/env-sourced key), and per-provider submodules each building a
//! provider-specific JSON request body. Adapted from forge-providers'
//! streaming SSE `send_message(..., on_event)` down to a single
//! non-streaming `generate` per spec - the Enhancement pool needs one
//! complete annotated response per claim batch, not incremental tokens, so
//! SSE parsing has no counterpart here.

pub mod claude;
pub mod error;
pub mod openai;

pub use error::LlmError;

use std::sync::OnceLock;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Shared HTTP client for all provider requests, built once per process.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| reqwest::Client::builder().build().expect("build shared HTTP client"))
}

/// One provider's identity, endpoint, and credentials source.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub host: String,
    pub model: String,
    pub timeout: Duration,
    api_key_env: String,
}

impl ProviderConfig {
    #[must_use]
    pub fn claude(model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: "claude".to_string(),
            host: "https://api.anthropic.com".to_string(),
            model: model.into(),
            timeout,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
        }
    }

    #[must_use]
    pub fn openai(model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: "openai".to_string(),
            host: "https://api.openai.com".to_string(),
            model: model.into(),
            timeout,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }

    fn api_key(&self) -> Result<String, LlmError> {
        std::env::var(&self.api_key_env)
            .map_err(|_| LlmError::InvalidResponse(format!("missing {} environment variable", self.api_key_env)))
    }
}

/// Per-request knobs honoured by every provider's `generate`.
#[derive(Default)]
pub struct GenerateOptions {
    pub cancellation: Option<CancellationToken>,
}

/// Run a future against `options.cancellation`, if set, mapping an early
/// cancellation to [`LlmError::Timeout`] (the Enhancement pool treats a
/// cancelled generation the same as a timed-out one: abandon the claim).
async fn run_cancellable<F, T>(future: F, options: &GenerateOptions) -> Result<T, LlmError>
where
    F: std::future::Future<Output = Result<T, LlmError>>,
{
    match &options.cancellation {
        Some(token) => tokio::select! {
            () = token.cancelled() => Err(LlmError::Timeout),
            result = future => result,
        },
        None => future.await,
    }
}

/// Generate one completion from `provider` for `prompt`.
///
/// # Errors
/// Propagates the provider's own request/parse errors; `Timeout` is
/// returned both for client timeouts and for options-driven cancellation.
pub async fn generate(provider: &ProviderConfig, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError> {
    match provider.name.as_str() {
        "claude" => run_cancellable(claude::generate(provider, prompt), options).await,
        "openai" => run_cancellable(openai::generate(provider, prompt), options).await,
        other => Err(LlmError::InvalidResponse(format!("unknown provider '{other}'"))),
    }
}

/// Try each provider in order until one succeeds, per the fallback mode
/// described in the spec; explicit single-provider selection should call
/// [`generate`] directly instead, bypassing fallback.
///
/// # Errors
/// Returns [`LlmError::AllProvidersFailed`] if every provider errors.
pub async fn generate_with_fallback(
    providers: &[ProviderConfig],
    prompt: &str,
    options: &GenerateOptions,
) -> Result<String, LlmError> {
    for provider in providers {
        match generate(provider, prompt, options).await {
            Ok(text) => return Ok(text),
            Err(error) => {
                tracing::warn!(provider = %provider.name, %error, "provider failed, trying next");
            }
        }
    }
    Err(LlmError::AllProvidersFailed)
}

/// Lightweight reachability probe: a short-timeout GET against the
/// provider's host. Used to decide whether a provider is worth trying
/// before committing to a full request.
pub async fn is_available(provider: &ProviderConfig) -> bool {
    http_client()
        .get(&provider.host)
        .timeout(Duration::from_secs(3))
        .send()
        .await
        .is_ok()
}
