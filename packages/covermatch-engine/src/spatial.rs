//! Resolves a profile's location to an H3 cell plus its immediate ring.
//!
//! Coordinate resolution is layered: explicit latitude/longitude on the
//! profile wins, then a cached postal-code geocode, then a remote lookup,
//! then the configured regional centroid. Enrichment degrades, it never
//! fails the pipeline.

use std::time::Duration;

use h3o::{LatLng, Resolution};

use covermatch_domain::profile::{CustomerProfile, SpatialCell};

use crate::MatchService;

impl MatchService {
	/// Attaches `spatial` to the profile when any location signal exists.
	/// A profile with no coordinates and no postal code is left untouched.
	pub async fn enrich_spatial(&self, profile: &mut CustomerProfile) {
		let coordinates = match self.resolve_coordinates(profile).await {
			Some(coordinates) => coordinates,
			None => return,
		};

		match cell_with_neighbors(coordinates, self.cfg.spatial.resolution) {
			Some(spatial) => profile.spatial = Some(spatial),
			None => {
				tracing::warn!(
					lat = coordinates.0,
					lon = coordinates.1,
					"Coordinates outside the valid range; skipping spatial enrichment."
				);
			},
		}
	}

	async fn resolve_coordinates(&self, profile: &CustomerProfile) -> Option<(f64, f64)> {
		let address = profile.address.as_ref()?;

		if let (Some(lat), Some(lon)) = (address.latitude, address.longitude) {
			return Some((lat, lon));
		}

		let postal_code = address.postal_code.clone()?;

		if let Some(cached) = self.cached_coordinates(&postal_code) {
			return Some(cached);
		}

		Some(self.geocode_postal_code(&postal_code).await)
	}

	fn cached_coordinates(&self, postal_code: &str) -> Option<(f64, f64)> {
		match self.geocode_cache.lock() {
			Ok(cache) => cache.get(postal_code).copied(),
			Err(_) => None,
		}
	}

	async fn geocode_postal_code(&self, postal_code: &str) -> (f64, f64) {
		let cfg = &self.cfg.providers.geocoding;
		let query = match &cfg.region_hint {
			Some(hint) => format!("{postal_code}, {hint}"),
			None => postal_code.to_owned(),
		};
		let resolved = self.providers.geocoding.geocode(cfg, &query).await;

		// The provider's acceptable-use policy asks for spaced requests.
		tokio::time::sleep(Duration::from_millis(cfg.throttle_ms)).await;

		let coordinates = match resolved {
			Ok(Some(coordinates)) => coordinates,
			Ok(None) => {
				tracing::warn!(postal_code, "Postal code not found; using fallback centroid.");

				(cfg.fallback_lat, cfg.fallback_lon)
			},
			Err(err) => {
				tracing::warn!(postal_code, %err, "Geocoding failed; using fallback centroid.");

				(cfg.fallback_lat, cfg.fallback_lon)
			},
		};

		if let Ok(mut cache) = self.geocode_cache.lock() {
			cache.insert(postal_code.to_owned(), coordinates);
		}

		coordinates
	}
}

fn cell_with_neighbors((lat, lon): (f64, f64), resolution: u8) -> Option<SpatialCell> {
	let position = LatLng::new(lat, lon).ok()?;
	let resolution = Resolution::try_from(resolution).ok()?;
	let cell = position.to_cell(resolution);
	let neighbors = cell
		.grid_disk::<Vec<_>>(1)
		.into_iter()
		.filter(|neighbor| *neighbor != cell)
		.map(|neighbor| neighbor.to_string())
		.collect();

	Some(SpatialCell { cell: cell.to_string(), neighbors })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cell_carries_six_neighbors() {
		let spatial = cell_with_neighbors((36.7783, -119.4179), 8).unwrap();

		assert_eq!(spatial.cell.len(), 15);
		assert_eq!(spatial.neighbors.len(), 6);
		assert!(!spatial.neighbors.contains(&spatial.cell));
	}

	#[test]
	fn same_coordinates_same_cell() {
		let a = cell_with_neighbors((34.0522, -118.2437), 8).unwrap();
		let b = cell_with_neighbors((34.0522, -118.2437), 8).unwrap();

		assert_eq!(a, b);
	}

	#[test]
	fn out_of_range_latitude_is_rejected() {
		assert!(cell_with_neighbors((200., 0.), 8).is_none());
	}
}
