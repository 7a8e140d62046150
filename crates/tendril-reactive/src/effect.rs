//! Effect - Reactive Computations
//!
//! `Effect` represents a computation that automatically re-runs when the object
//! properties it read during its last run change. Dependencies are tracked
//! automatically - any [`Object::get`](crate::Object::get) inside the effect
//! closure becomes a dependency.
//!
//! ## Key Features
//!
//! - **Automatic Dependency Tracking**: tracked reads inside the effect are recorded
//! - **Record-then-replace**: subscriptions are cleared before each run
//! - **Re-entrancy Guard**: an explicit `Idle | Running | Disposed` state; a trigger
//!   that reaches a running effect is rejected
//! - **Isolation**: a panic inside one effect is caught and logged, the caller
//!   (a flush or a write) carries on with the remaining subscribers
//! - **Memory Safe**: removes itself from the dependency graph when dropped
//!
//! ## Example
//!
//! ```ignore
//! use tendril_reactive::{Effect, Object, Value};
//!
//! let state = Object::new_map();
//! state.set("count", Value::from(0));
//!
//! let s = state.clone();
//! let _effect = Effect::new(move || {
//!     println!("Count is: {}", s.get("count").to_js_string());
//! });
//!
//! state.set("count", Value::from(42)); // queued for the next flush
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use super::runtime::{
	EffectTiming, NodeId, NodeType, Observer, ObserverGuard, try_with_runtime, with_runtime,
};

/// Type alias for effect functions
type EffectFn = Box<dyn FnMut() + 'static>;

/// Execution state of an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
	/// Waiting for a trigger
	Idle,
	/// Currently executing; further triggers are rejected
	Running,
	/// Disposed; never runs again
	Disposed,
}

struct EffectSlot {
	f: RefCell<EffectFn>,
	state: Cell<EffectState>,
	timing: EffectTiming,
}

// Storage for effect closures so they can be re-executed by id.
thread_local! {
	static EFFECTS: RefCell<BTreeMap<NodeId, Rc<EffectSlot>>> = const { RefCell::new(BTreeMap::new()) };
}

fn slot(effect_id: NodeId) -> Option<Rc<EffectSlot>> {
	EFFECTS
		.try_with(|storage| storage.borrow().get(&effect_id).cloned())
		.ok()
		.flatten()
}

/// Get the state of an effect by its ID.
///
/// Returns `None` if the effect doesn't exist (never created or disposed).
pub(crate) fn effect_state(effect_id: NodeId) -> Option<EffectState> {
	slot(effect_id).map(|slot| slot.state.get())
}

/// Get the timing for an effect by its ID.
pub(crate) fn effect_timing(effect_id: NodeId) -> Option<EffectTiming> {
	slot(effect_id).map(|slot| slot.timing)
}

/// Execute an effect by its ID.
///
/// Returns `false` when the effect is unknown, not idle, or panicked.
pub(crate) fn execute_effect(effect_id: NodeId) -> bool {
	let Some(slot) = slot(effect_id) else {
		return false;
	};
	if slot.state.get() != EffectState::Idle {
		tracing::trace!(effect = ?effect_id, state = ?slot.state.get(), "effect trigger rejected");
		return false;
	}

	slot.state.set(EffectState::Running);
	with_runtime(|rt| rt.clear_dependencies(effect_id));

	let result = {
		let _guard = ObserverGuard::push(Observer {
			id: effect_id,
			node_type: NodeType::Effect,
		});
		catch_unwind(AssertUnwindSafe(|| {
			let mut f = slot.f.borrow_mut();
			f();
		}))
	};

	match slot.state.get() {
		EffectState::Running => slot.state.set(EffectState::Idle),
		// Disposed by its own run: drop whatever it subscribed to meanwhile.
		EffectState::Disposed => {
			let _ = try_with_runtime(|rt| rt.remove_node(effect_id));
		}
		EffectState::Idle => {}
	}

	if result.is_err() {
		tracing::error!(effect = ?effect_id, "effect panicked; continuing with remaining subscribers");
	}
	result.is_ok()
}

/// A reactive computation that automatically re-runs when its dependencies change
///
/// Effects run immediately when created, and re-run whenever any tracked
/// property they read changes.
///
/// ## Example
///
/// ```ignore
/// let state = Object::new_map();
/// let doubled = Object::new_map();
///
/// let (s, d) = (state.clone(), doubled.clone());
/// Effect::new_with_timing(move || {
///     d.set("value", Value::from(s.get("count").to_number() * 2.0));
/// }, EffectTiming::Layout);
/// ```
pub struct Effect {
	/// Unique identifier for this effect
	id: NodeId,
	slot: Rc<EffectSlot>,
}

impl Effect {
	/// Create a new passive Effect that runs the given function
	///
	/// The function runs immediately, and is queued for re-execution on the
	/// scheduler whenever a dependency changes.
	pub fn new<F>(f: F) -> Self
	where
		F: FnMut() + 'static,
	{
		Self::new_with_timing(f, EffectTiming::Passive)
	}

	/// Create a new Effect with specified execution timing
	///
	/// Layout effects re-run synchronously inside the triggering write, passive
	/// effects in the next flush.
	pub fn new_with_timing<F>(f: F, timing: EffectTiming) -> Self
	where
		F: FnMut() + 'static,
	{
		let id = NodeId::new();
		let slot = Rc::new(EffectSlot {
			f: RefCell::new(Box::new(f)),
			state: Cell::new(EffectState::Idle),
			timing,
		});

		EFFECTS.with(|storage| {
			storage.borrow_mut().insert(id, slot.clone());
		});

		// Run the effect for the first time
		execute_effect(id);

		Self { id, slot }
	}

	/// Get the NodeId of this effect
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Current execution state
	pub fn state(&self) -> EffectState {
		self.slot.state.get()
	}

	/// Whether this effect has been disposed
	pub fn is_disposed(&self) -> bool {
		self.state() == EffectState::Disposed
	}

	/// Run the effect now, outside the scheduler
	///
	/// Returns `false` when the run was rejected (running or disposed) or panicked.
	pub fn run(&self) -> bool {
		execute_effect(self.id)
	}

	/// Dispose this effect
	///
	/// After calling this, the effect will no longer run and its subscriptions
	/// are removed from the dependency graph.
	pub fn dispose(&self) {
		if self.slot.state.replace(EffectState::Disposed) == EffectState::Disposed {
			return;
		}

		// Remove from runtime's dependency graph (ignore if TLS is destroyed)
		let _ = try_with_runtime(|rt| rt.remove_node(self.id));

		// The removed closure is dropped outside the storage borrow: it may own
		// nested effects whose own dispose touches the storage again.
		let removed = EFFECTS
			.try_with(|storage| storage.borrow_mut().remove(&self.id))
			.ok()
			.flatten();
		drop(removed);
	}
}

impl Drop for Effect {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl std::fmt::Debug for Effect {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Effect")
			.field("id", &self.id)
			.field("state", &self.state())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Object, Value};
	use serial_test::serial;

	#[test]
	#[serial]
	fn test_effect_runs_immediately() {
		let run_count = Rc::new(RefCell::new(0));
		let run_count_clone = run_count.clone();

		let _effect = Effect::new(move || {
			*run_count_clone.borrow_mut() += 1;
		});

		assert_eq!(*run_count.borrow(), 1);
	}

	#[test]
	#[serial]
	fn test_effect_reruns_on_property_change() {
		let state = Object::new_map();
		state.set("count", Value::from(0));
		let values = Rc::new(RefCell::new(Vec::new()));
		let values_clone = values.clone();

		let s = state.clone();
		let _effect = Effect::new(move || {
			values_clone.borrow_mut().push(s.get("count").to_number());
		});
		assert_eq!(*values.borrow(), vec![0.0]);

		state.set("count", Value::from(10));
		with_runtime(|rt| rt.flush());
		assert_eq!(*values.borrow(), vec![0.0, 10.0]);
	}

	#[test]
	#[serial]
	fn test_effect_dispose() {
		let state = Object::new_map();
		let run_count = Rc::new(RefCell::new(0));
		let run_count_clone = run_count.clone();

		let s = state.clone();
		let effect = Effect::new(move || {
			let _ = s.get("count");
			*run_count_clone.borrow_mut() += 1;
		});
		effect.dispose();

		state.set("count", Value::from(10));
		with_runtime(|rt| rt.flush());
		assert_eq!(*run_count.borrow(), 1);
		assert!(effect.is_disposed());
	}

	#[test]
	#[serial]
	fn test_effect_drop_cleans_up() {
		let state = Object::new_map();
		let run_count = Rc::new(RefCell::new(0));

		{
			let s = state.clone();
			let run_count_clone = run_count.clone();
			let _effect = Effect::new(move || {
				let _ = s.get("count");
				*run_count_clone.borrow_mut() += 1;
			});
		}

		state.set("count", Value::from(10));
		with_runtime(|rt| rt.flush());
		assert_eq!(*run_count.borrow(), 1);
		assert!(!with_runtime(|rt| rt.has_source(state.id())));
	}

	#[test]
	#[serial]
	fn test_self_writing_effect_does_not_recurse() {
		let state = Object::new_map();
		state.set("count", Value::from(0));
		let run_count = Rc::new(Cell::new(0));

		let s = state.clone();
		let runs = run_count.clone();
		let _effect = Effect::new_with_timing(
			move || {
				runs.set(runs.get() + 1);
				let next = s.get("count").to_number() + 1.0;
				s.set("count", Value::from(next));
			},
			EffectTiming::Layout,
		);

		assert_eq!(run_count.get(), 1);
		assert_eq!(state.get("count").to_number(), 1.0);
	}

	#[test]
	#[serial]
	fn test_panicking_effect_is_isolated() {
		let state = Object::new_map();
		let seen = Rc::new(Cell::new(0));

		let s1 = state.clone();
		let _bad = Effect::new(move || {
			if s1.get("n").to_number() > 0.0 {
				panic!("boom");
			}
		});
		let s2 = state.clone();
		let seen_clone = seen.clone();
		let _good = Effect::new(move || {
			seen_clone.set(s2.get("n").to_number() as i32);
		});

		state.set("n", Value::from(3));
		with_runtime(|rt| rt.flush());

		assert_eq!(seen.get(), 3);
	}
}
