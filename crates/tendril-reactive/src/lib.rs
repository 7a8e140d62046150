//! # tendril-reactive
//!
//! Fine-grained reactive store for tendril.
//!
//! ## Key Features
//!
//! - **Observable objects**: [`Object`] maps and arrays record `(object, key)`
//!   reads made inside an [`Effect`] and re-run exactly those effects on change
//! - **Dirty-checking**: writing an unchanged value notifies nobody
//! - **Batched updates**: passive effects are coalesced by the [`Scheduler`] into
//!   one flush per microtask tick
//! - **Re-entrancy guard**: effects carry an explicit `Idle | Running | Disposed`
//!   state
//!
//! ## Example
//!
//! ```ignore
//! use tendril_reactive::{Effect, Object, Value, run_microtasks};
//!
//! let state = Object::new_map();
//! state.set("message", Value::from("Hello"));
//!
//! let s = state.clone();
//! let _effect = Effect::new(move || {
//!     println!("{}", s.get("message").to_display_string());
//! });
//!
//! state.set("message", Value::from("World"));
//! run_microtasks(); // prints "World"
//! ```

pub mod effect;
pub mod error;
pub mod object;
pub mod runtime;
pub mod scheduler;
pub mod value;

pub use effect::{Effect, EffectState};
pub use error::{ReactiveError, Result};
pub use object::{Object, WatchFn, WeakObject, reactive, ref_value};
pub use runtime::{EffectTiming, Key, NodeId, Runtime, untrack, with_runtime};
pub use scheduler::{
	DEFAULT_MAX_FLUSH_ITERATIONS, Job, Microtask, MicrotaskHook, Scheduler, enqueue_job,
	next_tick, next_tick_future, run_microtasks, schedule_microtask,
};
pub use value::{Function, HostRef, NativeFn, Value, format_number};
