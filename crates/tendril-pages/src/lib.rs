//! # tendril-pages
//!
//! Directive-driven templates over a live DOM, built on `tendril-reactive`.
//!
//! Markup is processed in place: the walker binds `{{ }}` interpolations
//! and `v-*` directives to reactive effects, `v-if` and `v-for` manage
//! child blocks, and registered component tags are replaced by their
//! rendered templates.
//!
//! ## Key Features
//!
//! - **Expression evaluator**: a small JavaScript-like expression language
//!   compiled once per source string and evaluated against scope chains
//! - **Contexts**: scope, effect ownership and teardown per block
//! - **Directives**: `bind`, `on`, `model`, `text`, `html`, `show`, `if`,
//!   `for`, `effect`, `ref` and custom ones
//! - **Components**: props, slots, `emit`, scoped styles, lifecycle hooks
//!
//! ## Example
//!
//! ```ignore
//! use tendril_pages::{AppOptions, MountTarget, create_app};
//!
//! let app = create_app(AppOptions::new().data(json!({ "count": 0 })).document(doc));
//! app.mount(MountTarget::Selector("#app".into()))?;
//! ```

pub mod app;
pub mod block;
pub mod component;
pub mod config;
pub mod context;
pub mod directive;
pub mod directives;
pub mod error;
pub mod eval;
pub mod host;
pub mod logging;
pub mod shared;
pub mod walk;

#[doc(hidden)]
pub use tracing as __tracing;

pub use app::{App, AppOptions, MountTarget, create_app};
pub use block::Block;
pub use component::{ComponentDefinition, Mounted, mount_component};
pub use config::{AppConfig, Delimiters};
pub use context::{AppState, Context, create_context, create_scoped_context};
pub use directive::{Cleanup, Directive, DirectiveBinding, Getter, Modifiers};
pub use error::{ConfigError, EvalError, EvalResult, MountError};
pub use walk::walk;
