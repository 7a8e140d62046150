//! Components - reusable templates with props, slots, events and scoped styles.
//!
//! A component is registered by name on an app (or inside another
//! component's definition) and mounted wherever a matching tag appears. The
//! host element is replaced by the rendered template; its content becomes
//! slots and its attributes become props, listeners or pass-through
//! attributes.
//!
//! ## Key Features
//!
//! - **Props**: `:prop="exp"` follows the parent expression, `prop="text"`
//!   is coerced; `emit(prop, value)` writes a bound prop back to the parent
//! - **Events**: `emit(name, payload)` runs the host's `@name` handler in the
//!   parent scope
//! - **Slots**: named `<template slot="...">` blocks and default content
//! - **Scoped styles**: injected once per type, `.$scope` rewritten to the
//!   component's scope class
//!
//! ## Example
//!
//! ```ignore
//! app.component(
//!     "greeting",
//!     ComponentDefinition::new("<p>Hello {{ name }} <slot></slot></p>")
//!         .prop("name", "world"),
//! );
//! // <greeting :name="user.name">!</greeting>
//! ```

mod definition;
mod mount;
pub mod props;
pub mod slots;
pub mod style;

pub use definition::{ComponentDefinition, DataFactory, Hook};
pub use mount::{Mounted, mount_component};
pub use props::{ExtractedProps, extract_props, update_props};
pub use slots::Slots;
