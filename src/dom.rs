//! Live DOM
//!
//! The node tree directives bind to: elements, text and comments with
//! attributes, properties, listeners, an HTML fragment parser and simple
//! selectors.

pub use tendril_dom::*;
