//! Error types for evaluation, mounting and configuration.

use tendril_dom::DomError;
use thiserror::Error;

/// Errors raised while compiling or running a template expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
	/// The source does not parse.
	#[error("syntax error at offset {offset} in `{expression}`")]
	Syntax {
		/// Source text as compiled.
		expression: String,
		/// Byte offset where parsing stopped.
		offset: usize,
	},
	/// An identifier resolves nowhere in the scope chain.
	#[error("{0} is not defined")]
	Reference(String),
	/// An operation on a value of the wrong kind.
	#[error("{0}")]
	Type(String),
	/// A count or length outside what a built-in accepts.
	#[error("{0}")]
	Range(String),
}

/// Errors raised by [`App::mount`](crate::app::App::mount).
#[derive(Debug, Error)]
pub enum MountError {
	/// The selector matched no element.
	#[error("mount target not found: {0}")]
	SelectorNotFound(String),
	/// The selector or markup was rejected by the DOM.
	#[error(transparent)]
	Dom(#[from] DomError),
}

/// Errors raised while loading an [`AppConfig`](crate::config::AppConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The TOML source does not deserialize.
	#[error("failed to parse configuration: {0}")]
	Toml(#[from] toml::de::Error),
	/// A value is out of range.
	#[error("invalid configuration: {0}")]
	Invalid(String),
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
