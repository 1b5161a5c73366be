use std::fmt::Write;

use crate::profile::CustomerProfile;

/// Serializes the canonical profile into the single text blob destined for
/// embedding. Pure and deterministic: field order is fixed (personal,
/// address+spatial, vehicles, drivers, policy, coverage, risk) and absent
/// fields contribute nothing, so similarity reflects content rather than
/// incidental key ordering or placeholder noise.
pub fn project(profile: &CustomerProfile) -> String {
	let mut text = String::from("Customer profile. ");

	if let Some(personal) = &profile.personal {
		push_field(&mut text, "Customer", personal.name.as_deref());
		push_field(&mut text, "DOB", personal.date_of_birth.as_deref());
	}

	if let Some(address) = &profile.address {
		let mut parts = Vec::new();

		parts.extend(address.street.as_deref());
		parts.extend(address.city.as_deref());
		parts.extend(address.state.as_deref());

		if !parts.is_empty() {
			let _ = write!(text, "Address: {}. ", parts.join(", "));
		}

		push_field(&mut text, "ZIP", address.postal_code.as_deref());
	}

	if let Some(spatial) = &profile.spatial {
		let _ = write!(text, "Area cell: {}. ", spatial.cell);

		if !spatial.neighbors.is_empty() {
			let _ = write!(text, "Nearby cells: {}. ", spatial.neighbors.join(", "));
		}
	}

	if !profile.vehicles.is_empty() {
		text.push_str("Vehicles: ");

		for vehicle in &profile.vehicles {
			let mut details = Vec::new();

			details.extend(vehicle.make.clone());
			details.extend(vehicle.model.clone());
			details.extend(vehicle.year.map(|year| year.to_string()));
			details.extend(vehicle.age_of_vehicle.map(|age| format!("{age} years old")));
			details.extend(vehicle.vehicle_type.clone());
			details.extend(vehicle.mileage.map(|mileage| format!("mileage {mileage}")));

			if !details.is_empty() {
				let _ = write!(text, "{}. ", details.join(", "));
			}
		}
	}

	if !profile.drivers.is_empty() {
		text.push_str("Drivers: ");

		for driver in &profile.drivers {
			let mut details = Vec::new();

			details.extend(driver.date_of_birth.as_deref().map(|dob| format!("born {dob}")));
			details.extend(driver.relationship.clone());

			if !details.is_empty() {
				let _ = write!(text, "{}. ", details.join(", "));
			}
		}
	}

	if let Some(policy) = &profile.policy {
		push_field(&mut text, "Policy", policy.policy_number.as_deref());
		push_field(&mut text, "Type", policy.policy_type.as_deref());
		push_field(&mut text, "Effective", policy.effective_date.as_deref());
	}

	if let Some(coverage) = &profile.coverage {
		if !coverage.coverages.is_empty() {
			let _ = write!(text, "Coverages: {}. ", coverage.coverages.join(", "));
		}

		// Limits and deductibles live in key-sorted maps, so iteration
		// order is stable.
		for (label, entries) in
			[("Limits", &coverage.limits), ("Deductibles", &coverage.deductibles)]
		{
			if !entries.is_empty() {
				let rendered: Vec<String> =
					entries.iter().map(|(key, value)| format!("{key} {value}")).collect();
				let _ = write!(text, "{label}: {}. ", rendered.join(", "));
			}
		}

		if !coverage.add_ons.is_empty() {
			let _ = write!(text, "Add-ons: {}. ", coverage.add_ons.join(", "));
		}
	}

	if let Some(risk) = &profile.risk {
		if !risk.risk_factors.is_empty() {
			let _ = write!(text, "Risk factors: {}. ", risk.risk_factors.join(", "));
		}

		if let Some(score) = risk.risk_score {
			let _ = write!(text, "Risk score: {score}. ");
		}
	}

	text.trim_end().to_string()
}

fn push_field(text: &mut String, label: &str, value: Option<&str>) {
	if let Some(value) = value {
		let _ = write!(text, "{label}: {value}. ");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::profile::{
		Address, CustomerProfile, Personal, SpatialCell, Vehicle, normalize_structured,
	};

	#[test]
	fn identical_profiles_project_identically() {
		let raw = serde_json::json!({
			"personal": { "name": "Emma Johnson", "dateOfBirth": "1992-11-23" },
			"vehicles": [{ "make": "Toyota", "model": "RAV4", "year": 2020 }],
			"coverage": { "coverages": ["Collision"], "limits": { "b": 1, "a": 2 } }
		});
		let profile = normalize_structured(&raw, 2026);

		assert_eq!(project(&profile), project(&profile.clone()));
	}

	#[test]
	fn absent_fields_contribute_nothing() {
		let empty = CustomerProfile::default();

		assert_eq!(project(&empty), "Customer profile.");
	}

	#[test]
	fn fixed_section_order() {
		let profile = CustomerProfile {
			personal: Some(Personal {
				date_of_birth: Some("1980-05-15".to_string()),
				..Personal::default()
			}),
			address: Some(Address {
				postal_code: Some("95123".to_string()),
				..Address::default()
			}),
			spatial: Some(SpatialCell {
				cell: "8828308281fffff".to_string(),
				neighbors: Vec::new(),
			}),
			vehicles: vec![Vehicle { make: Some("Honda".to_string()), ..Vehicle::default() }],
			..CustomerProfile::default()
		};
		let text = project(&profile);
		let dob = text.find("DOB").unwrap();
		let zip = text.find("ZIP").unwrap();
		let cell = text.find("Area cell").unwrap();
		let vehicles = text.find("Vehicles").unwrap();

		assert!(dob < zip && zip < cell && cell < vehicles);
	}

	#[test]
	fn sorted_limit_keys_keep_projection_stable() {
		let a = serde_json::json!({
			"coverage": { "limits": { "alpha": 1, "beta": 2 } }
		});
		let b = serde_json::json!({
			"coverage": { "limits": { "beta": 2, "alpha": 1 } }
		});
		let left = project(&normalize_structured(&a, 2026));
		let right = project(&normalize_structured(&b, 2026));

		assert_eq!(left, right);
	}
}
