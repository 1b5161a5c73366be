//! Turns ranked similarity hits into coverage recommendations and an
//! aggregate suggestion line.

use serde::Serialize;
use serde_json::{Map, Value};

use covermatch_storage::models::PolicyDocument;

use crate::{MatchService, similarity::SimilarityHit};

/// One resolved (or unresolvable) match in the response. Collections are
/// always present, empty when the policy document carries no such section.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageRecommendation {
	#[serde(rename = "policyId")]
	pub policy_id: Option<String>,
	#[serde(rename = "segmentInfo", skip_serializing_if = "Option::is_none")]
	pub segment_label: Option<String>,
	#[serde(rename = "similarityScore")]
	pub similarity_score: f32,
	pub coverages: Vec<String>,
	pub limits: Map<String, Value>,
	pub deductibles: Map<String, Value>,
	#[serde(rename = "addOns")]
	pub add_ons: Vec<String>,
	/// Serialized as an explicit null when the policy carries no premium, so
	/// consumers never need a presence check.
	pub premium: Option<f64>,
	/// False when the hit's policy document could not be found; the hit is
	/// still reported with its score so the ranking stays visible.
	pub resolved: bool,
}

impl MatchService {
	/// Resolves every hit to its policy document and projects the coverage
	/// detail. A hit whose document is missing stays in the output, flagged
	/// unresolved, rather than silently shrinking the match list.
	pub async fn assemble(&self, hits: &[SimilarityHit]) -> Vec<CoverageRecommendation> {
		let mut recommendations = Vec::with_capacity(hits.len());

		for hit in hits {
			let document = self.resolve_policy(hit).await;
			let mut recommendation = match &document {
				Some(document) => project_coverage(document),
				None => CoverageRecommendation {
					policy_id: None,
					segment_label: None,
					similarity_score: 0.,
					coverages: Vec::new(),
					limits: Map::new(),
					deductibles: Map::new(),
					add_ons: Vec::new(),
					premium: None,
					resolved: false,
				},
			};

			if recommendation.policy_id.is_none() {
				recommendation.policy_id = hit.policy_id.clone();
			}

			recommendation.segment_label = hit.segment_label.clone();
			recommendation.similarity_score = hit.score;

			recommendations.push(recommendation);
		}

		recommendations
	}

	async fn resolve_policy(&self, hit: &SimilarityHit) -> Option<PolicyDocument> {
		let key = hit.policy_id.as_deref()?;

		match self.policies.fetch_by_id(key).await {
			Ok(Some(document)) => return Some(document),
			Ok(None) => (),
			Err(err) => {
				tracing::warn!(policy_id = key, %err, "Policy lookup by id failed.");

				return None;
			},
		}

		// Corpus entries sometimes reference the human-facing policy number
		// instead of the document id.
		match self.policies.find_by_policy_number(key).await {
			Ok(document) => {
				if document.is_none() {
					tracing::warn!(policy_id = key, "No policy document found for match.");
				}

				document
			},
			Err(err) => {
				tracing::warn!(policy_id = key, %err, "Policy lookup by number failed.");

				None
			},
		}
	}
}

fn project_coverage(document: &PolicyDocument) -> CoverageRecommendation {
	let coverage = document.get("coverage");

	CoverageRecommendation {
		policy_id: document.get("id").and_then(Value::as_str).map(str::to_owned),
		segment_label: None,
		similarity_score: 0.,
		coverages: string_list(coverage.and_then(|c| c.get("coverages"))),
		limits: object(coverage.and_then(|c| c.get("limits"))),
		deductibles: object(coverage.and_then(|c| c.get("deductibles"))),
		add_ons: string_list(coverage.and_then(|c| c.get("addOns"))),
		premium: document
			.get("pricing")
			.and_then(|pricing| pricing.get("finalPremium"))
			.and_then(Value::as_f64),
		resolved: true,
	}
}

fn string_list(value: Option<&Value>) -> Vec<String> {
	value
		.and_then(Value::as_array)
		.map(|items| {
			items.iter().filter_map(Value::as_str).map(str::to_owned).collect()
		})
		.unwrap_or_default()
}

fn object(value: Option<&Value>) -> Map<String, Value> {
	value.and_then(Value::as_object).cloned().unwrap_or_default()
}

/// One-line aggregate over the resolved matches: most frequent coverages
/// (first-appearance order on ties), the add-ons seen, and the premium
/// spread. `None` when no match resolved to a policy document.
pub fn build_suggestion(recommendations: &[CoverageRecommendation], cap: usize) -> Option<String> {
	let resolved: Vec<_> =
		recommendations.iter().filter(|recommendation| recommendation.resolved).collect();

	if resolved.is_empty() {
		return None;
	}

	let mut coverage_counts: Vec<(&str, usize)> = Vec::new();

	for recommendation in &resolved {
		for coverage in &recommendation.coverages {
			match coverage_counts.iter_mut().find(|(name, _)| *name == coverage) {
				Some((_, count)) => *count += 1,
				None => coverage_counts.push((coverage, 1)),
			}
		}
	}

	// Stable sort keeps first-appearance order among equal counts.
	coverage_counts.sort_by(|a, b| b.1.cmp(&a.1));
	coverage_counts.truncate(cap);

	let mut add_ons: Vec<&str> = Vec::new();

	for recommendation in &resolved {
		for add_on in &recommendation.add_ons {
			if !add_ons.contains(&add_on.as_str()) {
				add_ons.push(add_on);
			}
		}
	}

	let mut parts = Vec::new();

	if !coverage_counts.is_empty() {
		let names: Vec<_> = coverage_counts.iter().map(|(name, _)| *name).collect();

		parts.push(format!("Similar customers typically carry {}", names.join(", ")));
	}
	if !add_ons.is_empty() {
		parts.push(format!("popular add-ons: {}", add_ons.join(", ")));
	}

	let premiums: Vec<f64> =
		resolved.iter().filter_map(|recommendation| recommendation.premium).collect();

	if !premiums.is_empty() {
		let min = premiums.iter().copied().fold(f64::INFINITY, f64::min);
		let max = premiums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
		let mean = premiums.iter().sum::<f64>() / premiums.len() as f64;

		parts.push(format!("premiums range ${min:.2} to ${max:.2} (avg ${mean:.2})"));
	}

	(!parts.is_empty()).then(|| format!("{}.", parts.join("; ")))
}
