use std::time::Duration;

use reqwest::{Client, header::USER_AGENT};
use serde_json::Value;

use crate::{Error, Result};

/// Resolves a free-form address query to coordinates via a Nominatim-style
/// search endpoint. `Ok(None)` means the provider answered but found
/// nothing; callers decide the fallback, not this client.
pub async fn geocode(
	cfg: &covermatch_config::GeocodingProviderConfig,
	query: &str,
) -> Result<Option<(f64, f64)>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}/search", cfg.api_base);
	let res = client
		.get(url)
		.header(USER_AGENT, &cfg.user_agent)
		.query(&[("q", query), ("format", "json"), ("limit", "1")])
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_geocode_response(json)
}

fn parse_geocode_response(json: Value) -> Result<Option<(f64, f64)>> {
	let results = json.as_array().ok_or_else(|| Error::InvalidResponse {
		message: "Geocoding response must be an array.".to_string(),
	})?;
	let Some(first) = results.first() else {
		return Ok(None);
	};
	// Nominatim returns coordinates as strings.
	let lat = coordinate(first, "lat")?;
	let lon = coordinate(first, "lon")?;

	Ok(Some((lat, lon)))
}

fn coordinate(node: &Value, key: &str) -> Result<f64> {
	let value = match node.get(key) {
		Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
		Some(Value::Number(number)) => number.as_f64(),
		_ => None,
	};

	value.filter(|v| v.is_finite()).ok_or_else(|| Error::InvalidResponse {
		message: format!("Geocoding result is missing a numeric {key}."),
	})
}
