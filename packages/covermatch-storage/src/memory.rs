use serde_json::Value;

use crate::{
	BoxFuture, CorpusStore, PolicyStore, Result,
	models::{CorpusEntry, PolicyDocument},
};

/// In-memory store for tests and embedded use. Entry order is the insertion
/// order, which the similarity engine relies on for stable tie-breaking.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
	corpus: Vec<CorpusEntry>,
	policies: Vec<PolicyDocument>,
}
impl MemoryStore {
	pub fn new(corpus: Vec<CorpusEntry>, policies: Vec<PolicyDocument>) -> Self {
		Self { corpus, policies }
	}
}
impl CorpusStore for MemoryStore {
	fn read_all<'a>(&'a self, max_items: usize) -> BoxFuture<'a, Result<Vec<CorpusEntry>>> {
		let entries: Vec<CorpusEntry> = self.corpus.iter().take(max_items).cloned().collect();

		Box::pin(async move { Ok(entries) })
	}
}
impl PolicyStore for MemoryStore {
	fn fetch_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<PolicyDocument>>> {
		let found = self
			.policies
			.iter()
			.find(|document| document.get("id").and_then(Value::as_str) == Some(id))
			.cloned();

		Box::pin(async move { Ok(found) })
	}

	fn find_by_policy_number<'a>(
		&'a self,
		policy_number: &'a str,
	) -> BoxFuture<'a, Result<Option<PolicyDocument>>> {
		let found = self
			.policies
			.iter()
			.find(|document| {
				document.get("policyNumber").and_then(Value::as_str) == Some(policy_number)
			})
			.cloned();

		Box::pin(async move { Ok(found) })
	}
}
