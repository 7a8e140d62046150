//! Error types for tendril-dom

use thiserror::Error;

/// Markup that could not be turned into nodes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
	/// `<!--` without a closing `-->`
	#[error("Unterminated comment starting at byte {0}")]
	UnterminatedComment(usize),

	/// A raw-text element (`script`, `style`, ...) without its end tag
	#[error("Unterminated <{tag}> starting at byte {offset}")]
	UnterminatedRawText { tag: String, offset: usize },

	/// Selector text that is not a supported selector
	#[error("Invalid selector: {0}")]
	InvalidSelector(String),
}

/// Error type for DOM operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
	/// Parsing markup or selectors failed
	#[error(transparent)]
	Parse(#[from] ParseError),

	/// The requested insertion would produce an invalid tree
	#[error("Hierarchy request error: {0}")]
	HierarchyRequest(String),

	/// The reference node is not a child of this node
	#[error("Node not found: {0}")]
	NotFound(String),
}

/// Result type for DOM operations
pub type Result<T> = std::result::Result<T, DomError>;
