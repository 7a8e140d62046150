//! Reactive store
//!
//! Observable [`Object`]s record which effect read which key; writing a
//! changed value queues exactly those effects for the next flush.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tendril::reactive::{Effect, Object, Value, run_microtasks};
//!
//! let state = Object::new_map();
//! state.set("n", Value::from(1));
//! let s = state.clone();
//! let _effect = Effect::new(move || println!("{}", s.get("n").to_display_string()));
//! state.set("n", Value::from(2));
//! run_microtasks();
//! ```

pub use tendril_reactive::*;
