//! Anthropic Messages API, non-streaming.

use serde_json::json;

use super::{http_client, LlmError, ProviderConfig};

const MESSAGES_PATH: &str = "/v1/messages";

pub(super) async fn generate(provider: &ProviderConfig, prompt: &str) -> Result<String, LlmError> {
    let api_key = provider.api_key()?;
    let body = json!({
        "model": provider.model,
        "max_tokens": 4096,
        "messages": [{ "role": "user", "content": prompt }],
    });

    let response = http_client()
        .post(format!("{}{MESSAGES_PATH}", provider.host))
        .timeout(provider.timeout)
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .json(&body)
        .send()
        .await
        .map_err(|error| {
            if error.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Transport(error)
            }
        })?;

    if !response.status().is_success() {
        return Err(LlmError::InvalidResponse(format!("claude returned status {}", response.status())));
    }

    let value: serde_json::Value = response.json().await?;
    value
        .get("content")
        .and_then(|c| c.as_array())
        .and_then(|blocks| blocks.first())
        .and_then(|block| block.get("text"))
        .and_then(|text| text.as_str())
        .map(str::to_string)
        .ok_or_else(|| LlmError::InvalidResponse("missing content[0].text in claude response".to_string()))
}
