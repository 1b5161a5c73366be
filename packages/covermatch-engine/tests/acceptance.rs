//! End-to-end pipeline tests with stubbed providers and in-memory stores.

use std::{
	path::PathBuf,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Instant,
};

use serde_json::{Value, json};

use covermatch_config::{
	Config, EmbeddingProviderConfig, GeocodingProviderConfig, LlmProviderConfig, Matching, Service,
	Spatial, Storage,
};
use covermatch_engine::{
	BoxFuture, EmbeddingProvider, ExtractorProvider, GeocodingProvider, MatchService,
	ProviderResult, Providers, RecommendRequest,
};
use covermatch_storage::{
	CorpusStore, Error as StorageError, memory::MemoryStore, models::CorpusEntry,
};

const DIMENSIONS: u32 = 4;

fn config() -> Config {
	Config {
		service: Service { log_level: "info".into() },
		storage: Storage {
			corpus_dir: PathBuf::from("/unused"),
			policy_dir: PathBuf::from("/unused"),
			max_corpus_items: 1_000,
		},
		providers: covermatch_config::Providers {
			embedding: EmbeddingProviderConfig {
				api_base: "http://localhost".into(),
				api_key: "test".into(),
				path: "/embeddings".into(),
				model: "test-embed".into(),
				dimensions: DIMENSIONS,
				timeout_ms: 1_000,
				default_headers: Default::default(),
			},
			extractor: LlmProviderConfig {
				api_base: "http://localhost".into(),
				api_key: "test".into(),
				path: "/chat/completions".into(),
				model: "test-llm".into(),
				temperature: 0.,
				timeout_ms: 1_000,
				default_headers: Default::default(),
			},
			geocoding: GeocodingProviderConfig {
				api_base: "http://localhost".into(),
				user_agent: "covermatch-tests".into(),
				region_hint: Some("CA, USA".into()),
				timeout_ms: 1_000,
				throttle_ms: 0,
				fallback_lat: 36.7783,
				fallback_lon: -119.4179,
			},
		},
		matching: Matching::default(),
		spatial: Spatial::default(),
	}
}

struct StubEmbedding {
	vector: Vec<f32>,
}
impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		_: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, ProviderResult<Vec<Vec<f32>>>> {
		let vectors = texts.iter().map(|_| self.vector.clone()).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_: &'a EmbeddingProviderConfig,
		_: &'a [String],
	) -> BoxFuture<'a, ProviderResult<Vec<Vec<f32>>>> {
		Box::pin(async {
			Err(covermatch_providers::Error::InvalidResponse {
				message: "embedding endpoint unavailable".into(),
			})
		})
	}
}

struct UnusedExtractor;
impl ExtractorProvider for UnusedExtractor {
	fn extract<'a>(
		&'a self,
		_: &'a LlmProviderConfig,
		_: &'a str,
		_: &'a str,
	) -> BoxFuture<'a, ProviderResult<Value>> {
		Box::pin(async { Ok(json!({})) })
	}
}

struct SpyGeocoder {
	calls: Arc<AtomicUsize>,
}
impl GeocodingProvider for SpyGeocoder {
	fn geocode<'a>(
		&'a self,
		_: &'a GeocodingProviderConfig,
		_: &'a str,
	) -> BoxFuture<'a, ProviderResult<Option<(f64, f64)>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async { Ok(Some((34.0522, -118.2437))) })
	}
}

struct UnreachableCorpus;
impl CorpusStore for UnreachableCorpus {
	fn read_all<'a>(
		&'a self,
		_: usize,
	) -> covermatch_storage::BoxFuture<'a, covermatch_storage::Result<Vec<CorpusEntry>>> {
		Box::pin(async {
			Err(StorageError::Unreachable {
				path: PathBuf::from("/corpus"),
				source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
			})
		})
	}
}

fn entry(id: &str, policy_id: &str, embedding: Value) -> CorpusEntry {
	CorpusEntry {
		id: id.into(),
		policy_id: Some(policy_id.into()),
		derived_text: Some(format!("profile text for {id}")),
		segment_label: Some(format!("segment {id}")),
		embedding: Some(embedding),
	}
}

fn sample_store() -> MemoryStore {
	MemoryStore::new(
		vec![
			entry("seg_close", "pol_close", json!([1.0, 0.0, 0.0, 0.0])),
			entry("seg_mid", "pol_mid", json!([1.0, 1.0, 0.0, 0.0])),
			entry("seg_far", "pol_far", json!([0.0, 0.0, 1.0, 0.0])),
			entry("seg_orphan", "pol_missing", json!([1.0, 0.1, 0.0, 0.0])),
			entry("seg_degraded", "pol_degraded", json!([0.0, 0.0, 0.0, 0.0])),
		],
		vec![
			json!({
				"id": "pol_close",
				"policyNumber": "POL-001",
				"coverage": {
					"coverages": ["Liability", "Collision"],
					"limits": { "Liability": "100/300" },
					"deductibles": { "Collision": 500 },
					"addOns": ["Roadside"]
				},
				"pricing": { "finalPremium": 1200.0 }
			}),
			json!({
				"id": "pol_mid",
				"policyNumber": "POL-002",
				"coverage": { "coverages": ["Liability"], "addOns": ["Rental"] },
				"pricing": { "finalPremium": 900.0 }
			}),
			json!({
				"id": "pol_far",
				"policyNumber": "POL-003",
				"coverage": { "coverages": ["Comprehensive"] }
			}),
		],
	)
}

fn service_with(
	embedding: Arc<dyn EmbeddingProvider>,
	geocoder_calls: Option<Arc<AtomicUsize>>,
) -> MatchService {
	let store = Arc::new(sample_store());
	let providers = Providers::new(
		embedding,
		Arc::new(UnusedExtractor),
		Arc::new(SpyGeocoder { calls: geocoder_calls.unwrap_or_default() }),
	);

	MatchService::with_providers(config(), store.clone(), store, providers)
}

fn structured_customer() -> Value {
	json!({
		"name": "Avery Cole",
		"dateOfBirth": "1988-04-02",
		"address": { "street": "12 Oak St", "city": "Fresno", "state": "CA", "postalCode": "93701" },
		"insuredVehicles": [{ "make": "Toyota", "model": "Camry", "year": 2021 }]
	})
}

#[tokio::test]
async fn ranked_matches_with_coverage_and_suggestion() {
	let service =
		service_with(Arc::new(StubEmbedding { vector: vec![1., 0., 0., 0.] }), None);
	let response = service.recommend(RecommendRequest::new(structured_customer())).await;

	assert!(response.error.is_none());
	assert_eq!(response.top_k_matches.len(), 3);

	let top = &response.top_k_matches[0];

	assert_eq!(top.policy_id.as_deref(), Some("pol_close"));
	assert!(top.resolved);
	assert_eq!(top.coverages, vec!["Liability", "Collision"]);
	assert_eq!(top.premium, Some(1200.0));

	// The orphan entry scores second but its policy document is missing.
	let orphan = &response.top_k_matches[1];

	assert_eq!(orphan.policy_id.as_deref(), Some("pol_missing"));
	assert!(!orphan.resolved);
	assert!(orphan.coverages.is_empty());

	// The zero-embedding entry is excluded from ranking entirely.
	assert!(
		response
			.top_k_matches
			.iter()
			.all(|matched| matched.policy_id.as_deref() != Some("pol_degraded"))
	);

	let suggestion = response.suggestion.unwrap();

	assert!(suggestion.contains("Liability"));
	assert!(suggestion.contains("$900.00"));
	assert!(suggestion.contains("$1200.00"));
}

#[tokio::test]
async fn embedding_outage_degrades_to_empty_match_list() {
	let service = service_with(Arc::new(FailingEmbedding), None);
	let response = service.recommend(RecommendRequest::new(structured_customer())).await;

	// A zero query vector matches nothing; this is degradation, not failure.
	assert!(response.error.is_none());
	assert!(response.top_k_matches.is_empty());
	assert!(response.suggestion.is_none());
}

#[tokio::test]
async fn unreachable_corpus_reports_an_error() {
	let policies = Arc::new(sample_store());
	let providers = Providers::new(
		Arc::new(StubEmbedding { vector: vec![1., 0., 0., 0.] }),
		Arc::new(UnusedExtractor),
		Arc::new(SpyGeocoder { calls: Arc::default() }),
	);
	let service = MatchService::with_providers(
		config(),
		Arc::new(UnreachableCorpus),
		policies,
		providers,
	);
	let response = service.recommend(RecommendRequest::new(structured_customer())).await;

	assert!(response.top_k_matches.is_empty());
	assert!(response.suggestion.is_none());
	assert!(response.error.unwrap().contains("unreachable"));
}

#[tokio::test]
async fn expired_deadline_short_circuits() {
	let service =
		service_with(Arc::new(StubEmbedding { vector: vec![1., 0., 0., 0.] }), None);
	let request = RecommendRequest {
		customer: structured_customer(),
		top_k: None,
		deadline: Some(Instant::now()),
	};
	let response = service.recommend(request).await;

	assert!(response.top_k_matches.is_empty());
	assert_eq!(response.error.as_deref(), Some("Request deadline exceeded."));
}

#[tokio::test]
async fn repeated_requests_are_identical() {
	let service =
		service_with(Arc::new(StubEmbedding { vector: vec![1., 0., 0., 0.] }), None);
	let first = service.recommend(RecommendRequest::new(structured_customer())).await;
	let second = service.recommend(RecommendRequest::new(structured_customer())).await;

	assert_eq!(
		serde_json::to_value(&first).unwrap(),
		serde_json::to_value(&second).unwrap()
	);
}

#[tokio::test]
async fn top_k_override_bounds_the_match_list() {
	let service =
		service_with(Arc::new(StubEmbedding { vector: vec![1., 0., 0., 0.] }), None);
	let request = RecommendRequest {
		customer: structured_customer(),
		top_k: Some(1),
		deadline: None,
	};
	let response = service.recommend(request).await;

	assert_eq!(response.top_k_matches.len(), 1);
	assert_eq!(response.top_k_matches[0].policy_id.as_deref(), Some("pol_close"));
}

#[tokio::test]
async fn empty_corpus_yields_empty_matches_without_error() {
	let store = Arc::new(MemoryStore::default());
	let providers = Providers::new(
		Arc::new(StubEmbedding { vector: vec![1., 0., 0., 0.] }),
		Arc::new(UnusedExtractor),
		Arc::new(SpyGeocoder { calls: Arc::default() }),
	);
	let service = MatchService::with_providers(config(), store.clone(), store, providers);
	let response = service.recommend(RecommendRequest::new(structured_customer())).await;

	assert!(response.error.is_none());
	assert!(response.top_k_matches.is_empty());
	assert!(response.suggestion.is_none());
}

#[tokio::test]
async fn postal_code_geocoding_is_cached() {
	let calls = Arc::new(AtomicUsize::new(0));
	let service = service_with(
		Arc::new(StubEmbedding { vector: vec![1., 0., 0., 0.] }),
		Some(calls.clone()),
	);

	service.recommend(RecommendRequest::new(structured_customer())).await;
	service.recommend(RecommendRequest::new(structured_customer())).await;

	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn response_serializes_with_explicit_nulls() {
	let service = service_with(Arc::new(FailingEmbedding), None);
	let response = service.recommend(RecommendRequest::new(structured_customer())).await;
	let value = serde_json::to_value(&response).unwrap();

	assert_eq!(value["TOP_K_MATCHES"], json!([]));
	assert_eq!(value["suggestion"], Value::Null);
	assert_eq!(value["error"], Value::Null);
}

#[tokio::test]
async fn premium_serializes_as_explicit_null() {
	let service =
		service_with(Arc::new(StubEmbedding { vector: vec![1., 0., 0., 0.] }), None);
	let response = service.recommend(RecommendRequest::new(structured_customer())).await;
	let value = serde_json::to_value(&response).unwrap();
	let matches = value["TOP_K_MATCHES"].as_array().unwrap();

	// Every match carries the premium key, null when nothing is priced;
	// the second hit is the unresolved one.
	for matched in matches {
		assert!(matched.get("premium").is_some());
	}

	assert_eq!(matches[1]["premium"], Value::Null);
}
