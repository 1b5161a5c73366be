pub mod postal;
pub mod profile;
pub mod projection;

pub use profile::{
	Address, CoveragePrefs, CustomerProfile, Driver, Personal, PolicyInfo, Risk, SpatialCell,
	Vehicle, normalize_structured,
};
pub use projection::project;
