use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub matching: Matching,
	#[serde(default)]
	pub spatial: Spatial,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub corpus_dir: std::path::PathBuf,
	pub policy_dir: std::path::PathBuf,
	/// Cap for the bulk corpus scan feeding the similarity pass.
	#[serde(default = "default_max_corpus_items")]
	pub max_corpus_items: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub extractor: LlmProviderConfig,
	pub geocoding: GeocodingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	/// Requested explicitly on every call so stored corpus vectors and new
	/// query vectors stay comparable across provider version changes.
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodingProviderConfig {
	pub api_base: String,
	pub user_agent: String,
	/// Appended to postal-code queries to narrow the search, e.g. "CA, USA".
	pub region_hint: Option<String>,
	pub timeout_ms: u64,
	/// Pause after each remote lookup, per the provider's acceptable-use policy.
	#[serde(default = "default_throttle_ms")]
	pub throttle_ms: u64,
	/// Regional centroid used when geocoding fails. A known precision loss,
	/// never a pipeline failure.
	pub fallback_lat: f64,
	pub fallback_lon: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Matching {
	pub top_k: u32,
	pub suggestion_cap: u32,
}
impl Default for Matching {
	fn default() -> Self {
		Self { top_k: 3, suggestion_cap: 5 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Spatial {
	pub resolution: u8,
}
impl Default for Spatial {
	fn default() -> Self {
		Self { resolution: 8 }
	}
}

fn default_max_corpus_items() -> u32 {
	1_000
}

fn default_throttle_ms() -> u64 {
	500
}
