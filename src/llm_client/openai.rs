//! OpenAI Chat Completions API, non-streaming.

use serde_json::json;

use super::{http_client, LlmError, ProviderConfig};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

pub(super) async fn generate(provider: &ProviderConfig, prompt: &str) -> Result<String, LlmError> {
    let api_key = provider.api_key()?;
    let body = json!({
        "model": provider.model,
        "messages": [{ "role": "user", "content": prompt }],
    });

    let response = http_client()
        .post(format!("{}{CHAT_COMPLETIONS_PATH}", provider.host))
        .timeout(provider.timeout)
        .bearer_auth(api_key)
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
        return Err(LlmError::InvalidResponse(format!("openai returned status {}", response.status())));
    }

    let value: serde_json::Value = response.json().await?;
    value
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(str::to_string)
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content in openai response".to_string()))
}
