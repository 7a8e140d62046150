//! Error types for tendril-reactive

use thiserror::Error;

/// Error type for reactive store conversions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReactiveError {
	/// A value that is not an object was used where an object is required
	#[error("Expected an object, found {0}")]
	NotAnObject(&'static str),

	/// JSON that is neither a map nor an array was wrapped as an object
	#[error("Expected a JSON object or array, found {0}")]
	NotAContainer(&'static str),
}

/// Result type for reactive store operations
pub type Result<T> = std::result::Result<T, ReactiveError>;
