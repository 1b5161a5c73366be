//! The end-to-end recommendation pipeline.
//!
//! `recommend` is infallible by contract: every degraded stage (extraction,
//! geocoding, embedding) is absorbed with a warning, and only an unreachable
//! corpus or an already-expired deadline surfaces in the response's `error`
//! field. The match list and suggestion are always present, empty or null
//! when nothing applies.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
	MatchService,
	assemble::{CoverageRecommendation, build_suggestion},
	similarity::{Verdict, rank_debug},
};

#[derive(Debug, Clone)]
pub struct RecommendRequest {
	/// Raw customer record, structured or free-text.
	pub customer: Value,
	/// Per-request override of the configured match count.
	pub top_k: Option<u32>,
	/// The similarity pass is not started past this point.
	pub deadline: Option<Instant>,
}
impl RecommendRequest {
	pub fn new(customer: Value) -> Self {
		Self { customer, top_k: None, deadline: None }
	}
}

/// The fixed response shape. `suggestion` and `error` serialize as explicit
/// nulls so consumers never need presence checks.
#[derive(Debug, Serialize)]
pub struct RecommendResponse {
	#[serde(rename = "TOP_K_MATCHES")]
	pub top_k_matches: Vec<CoverageRecommendation>,
	pub suggestion: Option<String>,
	pub error: Option<String>,
}
impl RecommendResponse {
	fn failed(message: String) -> Self {
		Self { top_k_matches: Vec::new(), suggestion: None, error: Some(message) }
	}
}

impl MatchService {
	pub async fn recommend(&self, request: RecommendRequest) -> RecommendResponse {
		let trace_id = Uuid::new_v4();

		self.recommend_inner(request).instrument(tracing::info_span!("recommend", %trace_id)).await
	}

	async fn recommend_inner(&self, request: RecommendRequest) -> RecommendResponse {
		let top_k = request.top_k.unwrap_or(self.cfg.matching.top_k) as usize;

		let mut profile = self.canonical_profile(&request.customer).await;

		self.enrich_spatial(&mut profile).await;

		let text = covermatch_domain::project(&profile);

		tracing::debug!(text_len = text.len(), "Projected profile text.");

		let query = self.embed_or_zero(&text).await;

		if let Some(deadline) = request.deadline
			&& Instant::now() >= deadline
		{
			tracing::warn!("Deadline expired before the similarity pass.");

			return RecommendResponse::failed("Request deadline exceeded.".into());
		}

		let corpus = match self.corpus.read_all(self.cfg.storage.max_corpus_items as usize).await {
			Ok(corpus) => corpus,
			Err(err) => {
				tracing::error!(%err, "Corpus store unreachable.");

				return RecommendResponse::failed(format!("Corpus store unreachable: {err}"));
			},
		};
		let (hits, verdicts) = rank_debug(&query, &corpus, top_k);

		if self.debug_similarity_enabled() {
			for (entry, verdict) in corpus.iter().zip(&verdicts) {
				match verdict {
					Verdict::Included { score } =>
						tracing::info!(entry = %entry.id, score, "Entry scored."),
					Verdict::Skipped { reason } =>
						tracing::info!(entry = %entry.id, reason = reason.as_str(), "Entry skipped."),
				}
			}
		}

		tracing::info!(
			corpus = corpus.len(),
			scored = verdicts.iter().filter(|v| matches!(v, Verdict::Included { .. })).count(),
			matches = hits.len(),
			"Similarity pass complete."
		);

		let top_k_matches = self.assemble(&hits).await;
		let suggestion =
			build_suggestion(&top_k_matches, self.cfg.matching.suggestion_cap as usize);

		RecommendResponse { top_k_matches, suggestion, error: None }
	}

	/// Embeds the projected text, degrading to an all-zero query vector on
	/// provider failure. A zero query yields zero matches downstream rather
	/// than an error.
	async fn embed_or_zero(&self, text: &str) -> Vec<f32> {
		let cfg = &self.cfg.providers.embedding;
		let texts = [text.to_owned()];

		match self.providers.embedding.embed(cfg, &texts).await {
			Ok(mut vectors) if !vectors.is_empty() => vectors.swap_remove(0),
			Ok(_) => {
				tracing::warn!("Embedding provider returned no vectors; using zero vector.");

				vec![0.; cfg.dimensions as usize]
			},
			Err(err) => {
				tracing::warn!(%err, "Embedding failed; using zero vector.");

				vec![0.; cfg.dimensions as usize]
			},
		}
	}
}
