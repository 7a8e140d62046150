//! Built-in directives.
//!
//! Attribute directives (`bind`, `on`, `text`, `html`, `show`, `model`,
//! `effect`, `ref`) are plain functions dispatched by name. The structural
//! directives `if_` and `for_` take over the walk of their element and
//! return the node the walker continues from.

pub mod bind;
pub mod effect;
pub mod for_;
pub mod html;
pub mod if_;
pub mod model;
pub mod on;
pub mod reference;
pub mod show;
pub mod text;
