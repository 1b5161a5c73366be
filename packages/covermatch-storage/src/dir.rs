use std::{
	fs,
	path::{Path, PathBuf},
};

use serde_json::Value;

use crate::{
	BoxFuture, CorpusStore, Error, PolicyStore, Result,
	models::{CorpusEntry, PolicyDocument},
};

/// Keyed document collection backed by directories of JSON files: one
/// document per file, or a file holding an array of documents. Files are
/// visited in name order so scans are reproducible.
#[derive(Debug, Clone)]
pub struct DirStore {
	corpus_dir: PathBuf,
	policy_dir: PathBuf,
}
impl DirStore {
	pub fn new(corpus_dir: impl Into<PathBuf>, policy_dir: impl Into<PathBuf>) -> Self {
		Self { corpus_dir: corpus_dir.into(), policy_dir: policy_dir.into() }
	}

	fn read_corpus(&self, max_items: usize) -> Result<Vec<CorpusEntry>> {
		let mut entries = Vec::new();

		for path in json_files(&self.corpus_dir)? {
			for value in read_documents(&path)? {
				if entries.len() >= max_items {
					tracing::warn!(max_items, "Corpus scan capped; remaining entries ignored.");

					return Ok(entries);
				}

				match serde_json::from_value::<CorpusEntry>(value) {
					Ok(entry) => entries.push(entry),
					Err(err) => {
						tracing::warn!(path = %path.display(), %err, "Skipping malformed corpus document.");
					},
				}
			}
		}

		Ok(entries)
	}

	fn find_policy(&self, key: &str, value: &str) -> Result<Option<PolicyDocument>> {
		// Fast path for id lookups when documents are stored as {id}.json.
		if key == "id" {
			let direct = self.policy_dir.join(format!("{value}.json"));

			if direct.is_file() {
				let mut documents = read_documents(&direct)?;

				if documents.len() == 1 {
					return Ok(documents.pop());
				}
			}
		}

		for path in json_files(&self.policy_dir)? {
			for document in read_documents(&path)? {
				if document.get(key).and_then(Value::as_str) == Some(value) {
					return Ok(Some(document));
				}
			}
		}

		Ok(None)
	}
}
impl CorpusStore for DirStore {
	fn read_all<'a>(&'a self, max_items: usize) -> BoxFuture<'a, Result<Vec<CorpusEntry>>> {
		Box::pin(async move { self.read_corpus(max_items) })
	}
}
impl PolicyStore for DirStore {
	fn fetch_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<PolicyDocument>>> {
		Box::pin(async move { self.find_policy("id", id) })
	}

	fn find_by_policy_number<'a>(
		&'a self,
		policy_number: &'a str,
	) -> BoxFuture<'a, Result<Option<PolicyDocument>>> {
		Box::pin(async move { self.find_policy("policyNumber", policy_number) })
	}
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
	let reader = fs::read_dir(dir)
		.map_err(|err| Error::Unreachable { path: dir.to_path_buf(), source: err })?;
	let mut paths = Vec::new();

	for entry in reader {
		let entry =
			entry.map_err(|err| Error::Unreachable { path: dir.to_path_buf(), source: err })?;
		let path = entry.path();

		if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
			paths.push(path);
		}
	}

	paths.sort();

	Ok(paths)
}

fn read_documents(path: &Path) -> Result<Vec<Value>> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadDocument { path: path.to_path_buf(), source: err })?;
	let value: Value = serde_json::from_str(&raw)
		.map_err(|err| Error::ParseDocument { path: path.to_path_buf(), source: err })?;

	Ok(match value {
		Value::Array(items) => items,
		other => vec![other],
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn temp_dirs(tag: &str) -> (PathBuf, PathBuf) {
		let base = std::env::temp_dir().join(format!("covermatch_dir_store_{tag}_{}", std::process::id()));
		let corpus = base.join("corpus");
		let policies = base.join("policies");

		fs::create_dir_all(&corpus).unwrap();
		fs::create_dir_all(&policies).unwrap();

		(corpus, policies)
	}

	#[tokio::test]
	async fn reads_corpus_documents_in_name_order() {
		let (corpus, policies) = temp_dirs("order");

		fs::write(
			corpus.join("b.json"),
			r#"{"id": "segment_2", "policyId": "p2", "embedding": [0.0, 1.0]}"#,
		)
		.unwrap();
		fs::write(
			corpus.join("a.json"),
			r#"{"id": "segment_1", "policyId": "p1", "embedding": [1.0, 0.0]}"#,
		)
		.unwrap();

		let store = DirStore::new(&corpus, &policies);
		let entries = store.read_all(10).await.unwrap();

		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].id, "segment_1");
		assert_eq!(entries[1].id, "segment_2");

		fs::remove_dir_all(corpus.parent().unwrap()).ok();
	}

	#[tokio::test]
	async fn caps_the_corpus_scan() {
		let (corpus, policies) = temp_dirs("cap");

		fs::write(
			corpus.join("all.json"),
			r#"[{"id": "s1"}, {"id": "s2"}, {"id": "s3"}]"#,
		)
		.unwrap();

		let store = DirStore::new(&corpus, &policies);
		let entries = store.read_all(2).await.unwrap();

		assert_eq!(entries.len(), 2);

		fs::remove_dir_all(corpus.parent().unwrap()).ok();
	}

	#[tokio::test]
	async fn falls_back_to_policy_number_lookup() {
		let (corpus, policies) = temp_dirs("lookup");

		fs::write(
			policies.join("docs.json"),
			r#"[{"id": "x1", "policyNumber": "POL-77"}, {"id": "x2", "policyNumber": "POL-88"}]"#,
		)
		.unwrap();

		let store = DirStore::new(&corpus, &policies);

		assert!(store.fetch_by_id("missing").await.unwrap().is_none());

		let by_number = store.find_by_policy_number("POL-88").await.unwrap().unwrap();

		assert_eq!(by_number.get("id").and_then(|v| v.as_str()), Some("x2"));

		fs::remove_dir_all(corpus.parent().unwrap()).ok();
	}

	#[tokio::test]
	async fn missing_directory_is_unreachable() {
		let store = DirStore::new("/nonexistent/corpus", "/nonexistent/policies");

		assert!(matches!(store.read_all(10).await, Err(Error::Unreachable { .. })));
	}
}
