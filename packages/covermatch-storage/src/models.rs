use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One persisted policy-profile embedding, written by the offline batch
/// ingestion process. The embedding stays raw JSON on purpose: corrupt or
/// non-numeric stored data must surface as a per-entry similarity skip
/// reason, not as a deserialization failure aborting the whole scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
	pub id: String,
	#[serde(rename = "policyId", skip_serializing_if = "Option::is_none")]
	pub policy_id: Option<String>,
	#[serde(rename = "policyText", skip_serializing_if = "Option::is_none")]
	pub derived_text: Option<String>,
	#[serde(rename = "segmentInfo", skip_serializing_if = "Option::is_none")]
	pub segment_label: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub embedding: Option<Value>,
}

/// Policies are kept loosely typed: the assembler projects the coverage
/// sub-structure out of whatever shape the document collection holds.
pub type PolicyDocument = Value;
