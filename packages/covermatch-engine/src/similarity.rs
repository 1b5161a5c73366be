//! Cosine ranking of the query vector against every corpus embedding.
//!
//! Ranking never aborts on a bad entry. Each corpus entry either yields a
//! finite score or a named skip reason, and the skip reasons are loggable so
//! a silent exclusion can always be explained after the fact.

use serde_json::Value;

use covermatch_storage::models::CorpusEntry;

/// Why a corpus entry was excluded from ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// Entry has no stored embedding at all.
	MissingEmbedding,
	/// Stored embedding exists but is not an all-numeric array.
	NonNumericEmbedding,
	/// Stored embedding is all zeros, the degraded-ingestion sentinel.
	ZeroEmbedding,
	/// Stored embedding length differs from the query vector's.
	LengthMismatch,
	/// The query vector itself is all zeros, so no cosine is defined.
	ZeroQuery,
	/// The cosine computation produced a non-finite value.
	NonFiniteScore,
}
impl SkipReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::MissingEmbedding => "missing embedding",
			Self::NonNumericEmbedding => "non-numeric embedding",
			Self::ZeroEmbedding => "zero embedding",
			Self::LengthMismatch => "length mismatch",
			Self::ZeroQuery => "zero query vector",
			Self::NonFiniteScore => "non-finite score",
		}
	}
}

/// Per-entry outcome of the similarity pass, index-aligned with the corpus.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
	Included { score: f32 },
	Skipped { reason: SkipReason },
}

/// One ranked match. `rank` is 1-based and assigned after the stable sort.
#[derive(Debug, Clone)]
pub struct SimilarityHit {
	pub index: usize,
	pub policy_id: Option<String>,
	pub segment_label: Option<String>,
	pub score: f32,
	pub rank: u32,
}

/// Scores every corpus entry against the query, one verdict per entry.
pub fn evaluate(query: &[f32], corpus: &[CorpusEntry]) -> Vec<Verdict> {
	let query_zero = query.iter().all(|component| *component == 0.);

	corpus
		.iter()
		.map(|entry| {
			let vector = match entry_vector(entry) {
				Ok(vector) => vector,
				Err(reason) => return Verdict::Skipped { reason },
			};

			if vector.len() != query.len() {
				return Verdict::Skipped { reason: SkipReason::LengthMismatch };
			}
			if vector.iter().all(|component| *component == 0.) {
				return Verdict::Skipped { reason: SkipReason::ZeroEmbedding };
			}
			if query_zero {
				return Verdict::Skipped { reason: SkipReason::ZeroQuery };
			}

			match cosine(query, &vector) {
				Some(score) => Verdict::Included { score },
				None => Verdict::Skipped { reason: SkipReason::NonFiniteScore },
			}
		})
		.collect()
}

/// Top-`top_k` entries by cosine similarity, descending. Ties keep corpus
/// order; the sort is stable and entries are seeded in index order.
pub fn rank(query: &[f32], corpus: &[CorpusEntry], top_k: usize) -> Vec<SimilarityHit> {
	rank_debug(query, corpus, top_k).0
}

/// As [`rank`], also returning the full per-entry verdict list for logging.
pub fn rank_debug(
	query: &[f32],
	corpus: &[CorpusEntry],
	top_k: usize,
) -> (Vec<SimilarityHit>, Vec<Verdict>) {
	let verdicts = evaluate(query, corpus);
	let mut hits = verdicts
		.iter()
		.enumerate()
		.filter_map(|(index, verdict)| match verdict {
			Verdict::Included { score } => Some(SimilarityHit {
				index,
				policy_id: corpus[index].policy_id.clone(),
				segment_label: corpus[index].segment_label.clone(),
				score: *score,
				rank: 0,
			}),
			Verdict::Skipped { .. } => None,
		})
		.collect::<Vec<_>>();

	hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
	hits.truncate(top_k);

	for (position, hit) in hits.iter_mut().enumerate() {
		hit.rank = position as u32 + 1;
	}

	(hits, verdicts)
}

fn entry_vector(entry: &CorpusEntry) -> Result<Vec<f32>, SkipReason> {
	let raw = entry.embedding.as_ref().ok_or(SkipReason::MissingEmbedding)?;
	let Value::Array(components) = raw else {
		return Err(SkipReason::NonNumericEmbedding);
	};

	components
		.iter()
		.map(|component| {
			component.as_f64().map(|value| value as f32).ok_or(SkipReason::NonNumericEmbedding)
		})
		.collect()
}

// Accumulated in f64 so long vectors of small components do not lose the dot
// product to f32 rounding.
fn cosine(a: &[f32], b: &[f32]) -> Option<f32> {
	let mut dot = 0.;
	let mut norm_a = 0.;
	let mut norm_b = 0.;

	for (x, y) in a.iter().zip(b) {
		let (x, y) = (f64::from(*x), f64::from(*y));

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	let score = dot / (norm_a.sqrt() * norm_b.sqrt());

	score.is_finite().then_some(score as f32)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entry(id: &str, embedding: Option<Value>) -> CorpusEntry {
		CorpusEntry {
			id: id.into(),
			policy_id: Some(format!("{id}-policy")),
			derived_text: None,
			segment_label: None,
			embedding,
		}
	}

	#[test]
	fn ranks_by_descending_cosine() {
		let corpus = [
			entry("far", Some(serde_json::json!([0.0, 1.0]))),
			entry("near", Some(serde_json::json!([1.0, 0.1]))),
			entry("exact", Some(serde_json::json!([2.0, 0.0]))),
		];
		let hits = rank(&[1., 0.], &corpus, 3);

		assert_eq!(hits.len(), 3);
		assert_eq!(hits[0].index, 2);
		assert_eq!(hits[0].rank, 1);
		assert!((hits[0].score - 1.).abs() < 1e-6);
		assert_eq!(hits[1].index, 1);
		assert_eq!(hits[2].index, 0);
	}

	#[test]
	fn ties_keep_corpus_order() {
		let corpus = [
			entry("first", Some(serde_json::json!([1.0, 0.0]))),
			entry("second", Some(serde_json::json!([3.0, 0.0]))),
		];
		let hits = rank(&[1., 0.], &corpus, 2);

		// Both score 1.0; the earlier entry wins rank 1.
		assert_eq!(hits[0].index, 0);
		assert_eq!(hits[1].index, 1);
	}

	#[test]
	fn truncates_to_top_k() {
		let corpus: Vec<_> =
			(0..5).map(|i| entry(&format!("e{i}"), Some(serde_json::json!([1.0, 0.0])))).collect();

		assert_eq!(rank(&[1., 0.], &corpus, 3).len(), 3);
	}

	#[test]
	fn skips_each_malformed_entry_with_its_reason() {
		let corpus = [
			entry("missing", None),
			entry("non_numeric", Some(serde_json::json!(["a", "b"]))),
			entry("not_array", Some(serde_json::json!("oops"))),
			entry("zero", Some(serde_json::json!([0.0, 0.0]))),
			entry("short", Some(serde_json::json!([1.0]))),
			entry("good", Some(serde_json::json!([1.0, 1.0]))),
		];
		let verdicts = evaluate(&[1., 0.], &corpus);

		assert_eq!(verdicts[0], Verdict::Skipped { reason: SkipReason::MissingEmbedding });
		assert_eq!(verdicts[1], Verdict::Skipped { reason: SkipReason::NonNumericEmbedding });
		assert_eq!(verdicts[2], Verdict::Skipped { reason: SkipReason::NonNumericEmbedding });
		assert_eq!(verdicts[3], Verdict::Skipped { reason: SkipReason::ZeroEmbedding });
		assert_eq!(verdicts[4], Verdict::Skipped { reason: SkipReason::LengthMismatch });
		assert!(matches!(verdicts[5], Verdict::Included { .. }));
	}

	#[test]
	fn zero_query_skips_every_comparable_entry() {
		let corpus = [entry("good", Some(serde_json::json!([1.0, 1.0])))];
		let verdicts = evaluate(&[0., 0.], &corpus);

		assert_eq!(verdicts[0], Verdict::Skipped { reason: SkipReason::ZeroQuery });
		assert!(rank(&[0., 0.], &corpus, 3).is_empty());
	}

	#[test]
	fn zero_embedding_reported_before_zero_query() {
		// When both sides are degraded the stored side is the more useful signal.
		let corpus = [entry("zero", Some(serde_json::json!([0.0, 0.0])))];
		let verdicts = evaluate(&[0., 0.], &corpus);

		assert_eq!(verdicts[0], Verdict::Skipped { reason: SkipReason::ZeroEmbedding });
	}
}
