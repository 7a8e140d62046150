//! # tendril-dom
//!
//! In-memory live DOM for tendril.
//!
//! Directives and components operate on real, mutable nodes: text nodes are
//! updated in place, elements are moved between anchors, listeners are attached
//! and detached. This crate is the reference host for those operations and what
//! the test suites drive.
//!
//! ## Key Features
//!
//! - **Nodes**: elements, text, comments, fragments and documents behind a
//!   clonable [`Node`] handle
//! - **Parsing**: forgiving HTML fragment parser built on `nom`
//! - **Selectors**: type, id, class, attribute, descendant and child selectors
//! - **Events**: bubbling dispatch, `once` listeners, `prevent_default`,
//!   `stop_propagation`

pub mod document;
pub mod error;
pub mod event;
pub mod node;
pub mod parser;
pub mod selector;
pub mod serialize;

pub use document::Document;
pub use error::{DomError, ParseError, Result};
pub use event::{Event, ListenerId, ListenerOptions};
pub use node::{Node, NodeKind, WeakNode};
pub use parser::parse_fragment;
pub use selector::SelectorList;
pub use serialize::{escape_attribute, escape_text};
