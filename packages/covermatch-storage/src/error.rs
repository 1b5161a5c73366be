pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Store unreachable at {path:?}.")]
	Unreachable { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to read document at {path:?}.")]
	ReadDocument { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse document at {path:?}.")]
	ParseDocument { path: std::path::PathBuf, source: serde_json::Error },
}
