//! Enhancement pool component-boundary error type.

use crate::llm_client::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum EnhanceError {
    #[error("file missing for this page")]
    FileMissing,

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
