//! # Tendril
//!
//! A DOM-coupled reactive UI runtime.
//!
//! Tendril tracks mutable application state, re-runs only the DOM bindings
//! that read what changed, and interprets directive attributes
//! (conditionals, loops, bindings, components) directly against live nodes
//! without an intermediate virtual tree.
//!
//! ## Crates
//!
//! - [`reactive`] - observable objects, effects and the microtask scheduler
//! - [`dom`] - the in-memory live DOM the runtime drives
//! - [`pages`] - expression evaluator, directives, components and the app
//!   entry point (feature `pages`, on by default)
//!
//! ## Feature Flags
//!
//! - `minimal` - reactive store and DOM only
//! - `pages` - directives, components, `create_app`
//! - `debug-hooks` - per-directive `tracing` events in debug builds
//! - `full` (default) - everything above except `debug-hooks`
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use tendril::prelude::*;
//! use serde_json::json;
//!
//! let document = Document::with_body(r#"<p id="app">{{ greeting }}</p>"#)?;
//! let app = create_app(
//!     AppOptions::new()
//!         .data(json!({ "greeting": "Hello" }))
//!         .document(document.clone()),
//! );
//! app.mount(MountTarget::Selector("#app".into()))?;
//!
//! app.scope().set("greeting", Value::from("World"));
//! run_microtasks();
//! ```

pub mod dom;
#[cfg(feature = "pages")]
pub mod pages;
pub mod reactive;

pub use tendril_dom::{Document, Node};
pub use tendril_reactive::{Effect, Object, Value};

#[cfg(feature = "pages")]
pub use tendril_pages::{App, AppOptions, ComponentDefinition, MountTarget, create_app};

/// Everything an application usually needs
pub mod prelude {
	pub use tendril_dom::{Document, Event, Node};
	pub use tendril_reactive::{
		Effect, Function, Object, Value, next_tick, next_tick_future, run_microtasks, untrack,
	};

	#[cfg(feature = "pages")]
	pub use tendril_pages::{
		App, AppConfig, AppOptions, Cleanup, ComponentDefinition, Directive, DirectiveBinding,
		MountError, MountTarget, create_app,
	};
}
