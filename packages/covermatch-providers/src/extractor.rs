use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Asks the configured chat-completion model to turn unstructured customer
/// text into a strict JSON record. The model is instructed to emit only
/// fields it can positively identify; retried a few times because smaller
/// models occasionally wrap the payload in prose despite the instruction.
pub async fn extract(
	cfg: &covermatch_config::LlmProviderConfig,
	system_prompt: &str,
	user_prompt: &str,
) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);

	for _ in 0..3 {
		let body = serde_json::json!({
			"model": cfg.model,
			"temperature": cfg.temperature,
			"messages": [
				{ "role": "system", "content": system_prompt },
				{ "role": "user", "content": user_prompt },
			],
		});
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		if let Ok(parsed) = parse_extractor_response(json) {
			return Ok(parsed);
		}
	}

	Err(Error::InvalidResponse { message: "Extractor response is not valid JSON.".to_string() })
}

fn parse_extractor_response(json: Value) -> Result<Value> {
	let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	else {
		if json.is_object() {
			return Ok(json);
		}

		return Err(Error::InvalidResponse {
			message: "Extractor response is missing JSON content.".to_string(),
		});
	};

	let cleaned = strip_markdown_fences(content);
	let parsed: Value = serde_json::from_str(cleaned).map_err(|_| Error::InvalidResponse {
		message: "Extractor content is not valid JSON.".to_string(),
	})?;

	Ok(parsed)
}

/// Models sometimes return the JSON inside a ```json fence or with leading
/// prose; recover the object instead of failing the whole extraction.
fn strip_markdown_fences(content: &str) -> &str {
	let content = content.trim();
	let without_fence = match content.find("```") {
		Some(start) => {
			let inner = &content[start + 3..];
			let inner = inner.strip_prefix("json").unwrap_or(inner);

			match inner.find("```") {
				Some(end) => &inner[..end],
				None => inner,
			}
		},
		None => content,
	};
	let without_fence = without_fence.trim().trim_end_matches('`');

	match without_fence.find('{') {
		Some(start) => without_fence[start..].trim(),
		None => without_fence,
	}
}
