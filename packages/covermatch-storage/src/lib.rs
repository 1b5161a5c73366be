pub mod dir;
pub mod memory;
pub mod models;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin};

use crate::models::{CorpusEntry, PolicyDocument};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Bulk read of the embedded corpus for the similarity pass. Read-only from
/// the query path; ingestion is an offline batch process.
pub trait CorpusStore
where
	Self: Send + Sync,
{
	fn read_all<'a>(&'a self, max_items: usize) -> BoxFuture<'a, Result<Vec<CorpusEntry>>>;
}

/// Point lookups for the assembly pass: by document id first, then by the
/// secondary policy-number field.
pub trait PolicyStore
where
	Self: Send + Sync,
{
	fn fetch_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<PolicyDocument>>>;
	fn find_by_policy_number<'a>(
		&'a self,
		policy_number: &'a str,
	) -> BoxFuture<'a, Result<Option<PolicyDocument>>>;
}
