//! LLM client component-boundary error type.

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("all configured providers failed")]
    AllProvidersFailed,

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),
}
