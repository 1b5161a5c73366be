//! Canonical-profile construction: structured mapping first, model-based
//! extraction as the fallback for free-text records.

use serde_json::Value;
use time::OffsetDateTime;

use covermatch_domain::profile::{CustomerProfile, normalize_structured};

use crate::MatchService;

const EXTRACTION_SYSTEM_PROMPT: &str = "\
You are an assistant that extracts structured customer attributes from insurance records. \
Respond with a single JSON object and nothing else. \
Recognized fields: name, dateOfBirth, email, phone, address (street, city, state, postalCode), \
insuredVehicles (make, model, year, ageOfVehicle, vehicleType, mileage), \
coveredDrivers (dateOfBirth, relationship), \
policyNumber, policyType, policyEffectiveDate, \
coverage (coverages, limits, deductibles, addOns), riskFactors. \
Include ONLY fields that you can find in the record. Never invent values.";

impl MatchService {
	/// Builds the canonical profile for a raw customer record.
	///
	/// Structured mapping is tried first and wins whenever it recognizes
	/// anything. Only a record the mapper cannot read at all is sent to the
	/// extraction model; if that also fails the profile stays empty and the
	/// pipeline continues.
	pub async fn canonical_profile(&self, raw: &Value) -> CustomerProfile {
		let current_year = OffsetDateTime::now_utc().year();
		let structured = normalize_structured(raw, current_year);

		if !structured.is_empty() {
			return structured;
		}

		let record_text = match raw {
			Value::String(text) => text.clone(),
			other => match serde_json::to_string_pretty(other) {
				Ok(text) => text,
				Err(_) => other.to_string(),
			},
		};

		match self
			.providers
			.extractor
			.extract(&self.cfg.providers.extractor, EXTRACTION_SYSTEM_PROMPT, &record_text)
			.await
		{
			Ok(extracted) => normalize_structured(&extracted, current_year),
			Err(err) => {
				tracing::warn!(%err, "Attribute extraction failed; continuing with an empty profile.");

				CustomerProfile::default()
			},
		}
	}
}
