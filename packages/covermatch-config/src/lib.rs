mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, GeocodingProviderConfig, LlmProviderConfig, Matching,
	Providers, Service, Spatial, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.max_corpus_items == 0 {
		return Err(Error::Validation {
			message: "storage.max_corpus_items must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.extractor.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.extractor.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.geocoding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.geocoding.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.geocoding.user_agent.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.geocoding.user_agent must be non-empty.".to_string(),
		});
	}
	if !cfg.providers.geocoding.fallback_lat.is_finite()
		|| !(-90.0..=90.0).contains(&cfg.providers.geocoding.fallback_lat)
	{
		return Err(Error::Validation {
			message: "providers.geocoding.fallback_lat must be a latitude in -90.0..=90.0."
				.to_string(),
		});
	}
	if !cfg.providers.geocoding.fallback_lon.is_finite()
		|| !(-180.0..=180.0).contains(&cfg.providers.geocoding.fallback_lon)
	{
		return Err(Error::Validation {
			message: "providers.geocoding.fallback_lon must be a longitude in -180.0..=180.0."
				.to_string(),
		});
	}
	if cfg.matching.top_k == 0 {
		return Err(Error::Validation {
			message: "matching.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.matching.suggestion_cap == 0 {
		return Err(Error::Validation {
			message: "matching.suggestion_cap must be greater than zero.".to_string(),
		});
	}
	if cfg.spatial.resolution > 15 {
		return Err(Error::Validation {
			message: "spatial.resolution must be an H3 resolution in 0..=15.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("extractor", &cfg.providers.extractor.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.geocoding
		.region_hint
		.as_deref()
		.map(|hint| hint.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.geocoding.region_hint = None;
	}
}
