//! Directive-driven templates and components
//!
//! This module provides access to tendril-pages: the expression evaluator,
//! the directive set, the component mounter and [`create_app`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use tendril::pages::{AppOptions, ComponentDefinition, MountTarget, create_app};
//!
//! let app = create_app(
//!     AppOptions::new()
//!         .component("greeting", ComponentDefinition::new("<b>hi {{ who }}</b>").prop("who", "you"))
//!         .document(document),
//! );
//! app.mount(MountTarget::Document)?;
//! ```

pub use tendril_pages::*;
