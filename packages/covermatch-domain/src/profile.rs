use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical attribute set derived from a raw customer record. Every section
/// is optional; a key is present only when it was discoverable in the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub personal: Option<Personal>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub address: Option<Address>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub vehicles: Vec<Vehicle>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub drivers: Vec<Driver>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub policy: Option<PolicyInfo>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub coverage: Option<CoveragePrefs>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub risk: Option<Risk>,
	/// Added by the spatial enricher, never taken from the raw record.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub spatial: Option<SpatialCell>,
}
impl CustomerProfile {
	pub fn is_empty(&self) -> bool {
		self.personal.is_none()
			&& self.address.is_none()
			&& self.vehicles.is_empty()
			&& self.drivers.is_empty()
			&& self.policy.is_none()
			&& self.coverage.is_none()
			&& self.risk.is_none()
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personal {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub date_of_birth: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub street: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub city: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub state: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub postal_code: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub latitude: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub make: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub model: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub year: Option<i32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub age_of_vehicle: Option<i32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub vehicle_type: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mileage: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub date_of_birth: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub relationship: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyInfo {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub policy_number: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub policy_type: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub effective_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoveragePrefs {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub coverages: Vec<String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub limits: BTreeMap<String, Value>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub deductibles: BTreeMap<String, Value>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub add_ons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub risk_factors: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub risk_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialCell {
	pub cell: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub neighbors: Vec<String>,
}

/// Best-effort mapping from a raw, schema-free customer record to the
/// canonical profile. Unknown keys are ignored; recognized sections are
/// accepted at their common spellings (`vehicles` / `insuredVehicles`,
/// top-level or nested personal fields). Never fails: an unrecognizable
/// record yields an empty profile.
pub fn normalize_structured(raw: &Value, current_year: i32) -> CustomerProfile {
	let mut profile = CustomerProfile {
		personal: normalize_personal(raw),
		address: normalize_address(raw),
		vehicles: normalize_vehicles(raw),
		drivers: normalize_drivers(raw),
		policy: normalize_policy(raw),
		coverage: normalize_coverage(raw.get("coverage")),
		risk: normalize_risk(raw),
		spatial: None,
	};

	for vehicle in &mut profile.vehicles {
		if let Some(year) = vehicle.year
			&& vehicle.age_of_vehicle.is_none()
		{
			vehicle.age_of_vehicle = Some((current_year - year).max(0));
		}
	}

	profile
}

fn normalize_personal(raw: &Value) -> Option<Personal> {
	let nested = raw.get("personal");
	let personal = Personal {
		name: field_str(&[nested, Some(raw)], &["name", "fullName"]),
		date_of_birth: field_str(&[nested, Some(raw)], &["dateOfBirth", "dob"]),
		email: field_str(&[nested, Some(raw)], &["email"]),
		phone: field_str(&[nested, Some(raw)], &["phone", "phoneNumber"]),
	};

	(personal != Personal::default()).then_some(personal)
}

fn normalize_address(raw: &Value) -> Option<Address> {
	let node = raw
		.get("address")
		.or_else(|| raw.get("personal").and_then(|personal| personal.get("address")))?;

	// Web-form records carry the address as one free-form string.
	if let Some(text) = node.as_str() {
		let trimmed = text.trim();

		if trimmed.is_empty() {
			return None;
		}

		return Some(Address {
			street: Some(trimmed.to_string()),
			postal_code: crate::postal::postal_code(trimmed),
			..Address::default()
		});
	}

	let address = Address {
		street: field_str(&[Some(node)], &["street", "streetAddress"]),
		city: field_str(&[Some(node)], &["city"]),
		state: field_str(&[Some(node)], &["state"]),
		postal_code: field_str(&[Some(node)], &["postalCode", "zip", "zipCode"]),
		latitude: field_f64(node, &["latitude", "lat"]),
		longitude: field_f64(node, &["longitude", "lon", "lng"]),
	};

	(address != Address::default()).then_some(address)
}

fn normalize_vehicles(raw: &Value) -> Vec<Vehicle> {
	let list = raw
		.get("vehicles")
		.or_else(|| raw.get("insuredVehicles"))
		.and_then(Value::as_array)
		.map(Vec::as_slice);

	match list {
		Some(items) => items.iter().filter_map(normalize_vehicle).collect(),
		// A lone `vehicle` object also counts, per older record shapes.
		None => raw
			.get("vehicle")
			.or_else(|| raw.get("vehicleDetails"))
			.and_then(normalize_vehicle)
			.into_iter()
			.collect(),
	}
}

fn normalize_vehicle(node: &Value) -> Option<Vehicle> {
	if !node.is_object() {
		return None;
	}

	let vehicle = Vehicle {
		make: field_str(&[Some(node)], &["make"]),
		model: field_str(&[Some(node)], &["model"]),
		year: field_i32(node, &["year"]),
		age_of_vehicle: field_i32(node, &["ageOfVehicle"]),
		vehicle_type: field_str(&[Some(node)], &["vehicleType"]),
		mileage: field_i32(node, &["mileage"]).and_then(|m| u32::try_from(m).ok()),
	};

	(vehicle != Vehicle::default()).then_some(vehicle)
}

fn normalize_drivers(raw: &Value) -> Vec<Driver> {
	raw.get("coveredDrivers")
		.and_then(Value::as_array)
		.map(|items| {
			items
				.iter()
				.filter_map(|node| {
					let driver = Driver {
						date_of_birth: field_str(&[Some(node)], &["dateOfBirth", "dob"]),
						relationship: field_str(&[Some(node)], &["relationship"]),
					};

					(driver != Driver::default()).then_some(driver)
				})
				.collect()
		})
		.unwrap_or_default()
}

fn normalize_policy(raw: &Value) -> Option<PolicyInfo> {
	let nested = raw.get("policy");
	let policy = PolicyInfo {
		policy_number: field_str(&[nested, Some(raw)], &["policyNumber"]),
		policy_type: field_str(&[nested, Some(raw)], &["policyType"]),
		effective_date: field_str(&[nested, Some(raw)], &["policyEffectiveDate", "effectiveDate"]),
	};

	(policy != PolicyInfo::default()).then_some(policy)
}

fn normalize_coverage(node: Option<&Value>) -> Option<CoveragePrefs> {
	let node = node?;
	let coverage = CoveragePrefs {
		coverages: string_list(node.get("coverages")),
		limits: sorted_map(node.get("limits")),
		deductibles: sorted_map(node.get("deductibles")),
		add_ons: string_list(node.get("addOns")),
	};

	(coverage != CoveragePrefs::default()).then_some(coverage)
}

fn normalize_risk(raw: &Value) -> Option<Risk> {
	let nested = raw.get("risk").or_else(|| raw.get("riskAssessment"));
	let risk = Risk {
		risk_factors: string_list(
			raw.get("riskFactors").or_else(|| nested.and_then(|node| node.get("factors"))),
		),
		risk_score: nested.and_then(|node| field_f64(node, &["riskScore"])),
	};

	(risk != Risk::default()).then_some(risk)
}

fn field_str(nodes: &[Option<&Value>], keys: &[&str]) -> Option<String> {
	for node in nodes.iter().flatten() {
		for key in keys {
			if let Some(text) = node.get(*key).and_then(Value::as_str) {
				let trimmed = text.trim();

				if !trimmed.is_empty() {
					return Some(trimmed.to_string());
				}
			}
		}
	}

	None
}

// Numeric fields arrive as numbers or as quoted strings depending on which
// upstream form produced the record.
fn field_i32(node: &Value, keys: &[&str]) -> Option<i32> {
	for key in keys {
		match node.get(*key) {
			Some(Value::Number(number)) =>
				if let Some(value) = number.as_i64().and_then(|v| i32::try_from(v).ok()) {
					return Some(value);
				},
			Some(Value::String(text)) =>
				if let Ok(value) = text.trim().parse::<i32>() {
					return Some(value);
				},
			_ => {},
		}
	}

	None
}

fn field_f64(node: &Value, keys: &[&str]) -> Option<f64> {
	for key in keys {
		match node.get(*key) {
			Some(Value::Number(number)) =>
				if let Some(value) = number.as_f64() {
					return Some(value);
				},
			Some(Value::String(text)) =>
				if let Ok(value) = text.trim().parse::<f64>() {
					return Some(value);
				},
			_ => {},
		}
	}

	None
}

fn string_list(node: Option<&Value>) -> Vec<String> {
	node.and_then(Value::as_array)
		.map(|items| {
			items
				.iter()
				.filter_map(Value::as_str)
				.map(str::trim)
				.filter(|text| !text.is_empty())
				.map(str::to_string)
				.collect()
		})
		.unwrap_or_default()
}

fn sorted_map(node: Option<&Value>) -> BTreeMap<String, Value> {
	node.and_then(Value::as_object)
		.map(|map| map.iter().map(|(key, value)| (key.clone(), value.clone())).collect())
		.unwrap_or_default()
}
