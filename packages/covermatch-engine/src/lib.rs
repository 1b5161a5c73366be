pub mod assemble;
pub mod normalize;
pub mod recommend;
pub mod similarity;
pub mod spatial;

use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::{Arc, Mutex},
};

use serde_json::Value;

use covermatch_config::{
	Config, EmbeddingProviderConfig, GeocodingProviderConfig, LlmProviderConfig,
};
use covermatch_providers::{embedding, extractor, geocode};
use covermatch_storage::{CorpusStore, PolicyStore};

pub use assemble::{CoverageRecommendation, build_suggestion};
pub use recommend::{RecommendRequest, RecommendResponse};
pub use similarity::{SimilarityHit, SkipReason, Verdict, rank, rank_debug};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type ProviderResult<T> = covermatch_providers::Result<T>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, ProviderResult<Vec<Vec<f32>>>>;
}

pub trait ExtractorProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		system_prompt: &'a str,
		user_prompt: &'a str,
	) -> BoxFuture<'a, ProviderResult<Value>>;
}

pub trait GeocodingProvider
where
	Self: Send + Sync,
{
	fn geocode<'a>(
		&'a self,
		cfg: &'a GeocodingProviderConfig,
		query: &'a str,
	) -> BoxFuture<'a, ProviderResult<Option<(f64, f64)>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub extractor: Arc<dyn ExtractorProvider>,
	pub geocoding: Arc<dyn GeocodingProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		extractor: Arc<dyn ExtractorProvider>,
		geocoding: Arc<dyn GeocodingProvider>,
	) -> Self {
		Self { embedding, extractor, geocoding }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), extractor: provider.clone(), geocoding: provider }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, ProviderResult<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl ExtractorProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		system_prompt: &'a str,
		user_prompt: &'a str,
	) -> BoxFuture<'a, ProviderResult<Value>> {
		Box::pin(extractor::extract(cfg, system_prompt, user_prompt))
	}
}
impl GeocodingProvider for DefaultProviders {
	fn geocode<'a>(
		&'a self,
		cfg: &'a GeocodingProviderConfig,
		query: &'a str,
	) -> BoxFuture<'a, ProviderResult<Option<(f64, f64)>>> {
		Box::pin(geocode::geocode(cfg, query))
	}
}

/// The profile-matching pipeline. Explicitly constructed with its stores and
/// providers; the corpus is read-only from this path, so no locking is
/// needed beyond the postal-code geocoding cache.
pub struct MatchService {
	pub cfg: Config,
	pub corpus: Arc<dyn CorpusStore>,
	pub policies: Arc<dyn PolicyStore>,
	pub providers: Providers,
	pub(crate) geocode_cache: Mutex<HashMap<String, (f64, f64)>>,
	debug_similarity: bool,
}
impl MatchService {
	pub fn new(cfg: Config, corpus: Arc<dyn CorpusStore>, policies: Arc<dyn PolicyStore>) -> Self {
		Self::with_providers(cfg, corpus, policies, Providers::default())
	}

	pub fn with_providers(
		cfg: Config,
		corpus: Arc<dyn CorpusStore>,
		policies: Arc<dyn PolicyStore>,
		providers: Providers,
	) -> Self {
		Self {
			cfg,
			corpus,
			policies,
			providers,
			geocode_cache: Mutex::new(HashMap::new()),
			debug_similarity: false,
		}
	}

	/// Logs a per-entry include/exclude verdict for every corpus entry.
	pub fn debug_similarity(mut self, enabled: bool) -> Self {
		self.debug_similarity = enabled;

		self
	}

	pub(crate) fn debug_similarity_enabled(&self) -> bool {
		self.debug_similarity
	}
}
