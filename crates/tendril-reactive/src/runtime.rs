//! Reactive Runtime
//!
//! This module provides the core reactive runtime for managing object-property
//! dependencies, Effect execution, and update scheduling.
//!
//! ## Architecture
//!
//! The reactive system tracks reads of individual `(object, key)` pairs:
//!
//! 1. **Observer Stack**: Tracks the currently executing Effect
//! 2. **Dependency Tracking**: [`Object::get`](crate::Object::get) records the pair
//!    against the current observer
//! 3. **Update Scheduling**: Passive effects are queued on the [`Scheduler`] and
//!    coalesced into one flush per microtask tick
//! 4. **Record-then-replace**: an effect's subscriptions are cleared before every run
//!    and re-registered by whatever that run touches
//!
//! ## Example
//!
//! ```ignore
//! use tendril_reactive::{Effect, Object, Value, with_runtime};
//!
//! let state = Object::new_map();
//! state.set("count", Value::from(0));
//!
//! let s = state.clone();
//! let _effect = Effect::new(move || {
//!     // This get() call automatically registers the dependency
//!     println!("Count is: {}", s.get("count").to_js_string());
//! });
//!
//! state.set("count", Value::from(42));
//! with_runtime(|rt| rt.flush());
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexSet;

use crate::effect::{self, EffectState};
use crate::scheduler::{Job, Scheduler};

/// Unique identifier for reactive nodes (objects, effects, jobs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
	/// Create a new unique NodeId
	pub fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for NodeId {
	fn default() -> Self {
		Self::new()
	}
}

/// Property key a dependency is recorded against.
///
/// `Items` stands for the container as a whole: array contents and the key set
/// of a map. Array mutators trigger it exactly once per call.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
	/// A named property
	Prop(Rc<str>),
	/// The container itself (array items, map key set)
	Items,
}

impl Key {
	/// Create a named property key
	pub fn prop(name: &str) -> Self {
		Key::Prop(Rc::from(name))
	}
}

/// Type of observer pushed onto the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	/// An Effect run (reads are tracked)
	Effect,
	/// An untracked section (reads are not tracked)
	Untracked,
}

/// Effect execution timing.
///
/// - Layout effects run synchronously inside the write that triggered them
/// - Passive effects are queued and run in the next scheduler flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectTiming {
	/// Layout effect - runs synchronously
	Layout,
	/// Passive effect - runs in the microtask flush
	#[default]
	Passive,
}

/// Observer represents a currently executing Effect or an untracked section
#[derive(Debug, Clone)]
pub struct Observer {
	/// Identifier of the observing node
	pub id: NodeId,
	/// Type of this observer
	pub node_type: NodeType,
}

/// Dependency graph.
///
/// `sources` maps object identity to key to the ordered set of subscribed
/// effects; `dependencies` is the reverse table used to clear an effect's
/// subscriptions before it re-runs.
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
	pub(crate) sources: BTreeMap<NodeId, BTreeMap<Key, IndexSet<NodeId>>>,
	pub(crate) dependencies: BTreeMap<NodeId, Vec<(NodeId, Key)>>,
}

/// Per-thread reactive runtime
///
/// This struct manages the reactive dependency graph and update scheduling.
/// It uses thread-local storage to maintain separate runtime state per thread.
pub struct Runtime {
	/// Observer stack for tracking currently executing effects
	observer_stack: RefCell<Vec<Observer>>,
	/// Dependency graph
	pub(crate) dependency_graph: RefCell<DependencyGraph>,
	/// Job queue and microtask queue
	scheduler: Scheduler,
}

impl Runtime {
	/// Create a new Runtime instance
	pub fn new() -> Self {
		Self {
			observer_stack: RefCell::new(Vec::new()),
			dependency_graph: RefCell::new(DependencyGraph::default()),
			scheduler: Scheduler::new(),
		}
	}

	/// The scheduler owned by this runtime
	pub fn scheduler(&self) -> &Scheduler {
		&self.scheduler
	}

	/// Get the current observer (the currently executing Effect)
	///
	/// Returns `None` outside any effect and inside an untracked section.
	pub fn current_observer(&self) -> Option<NodeId> {
		self.observer_stack
			.borrow()
			.last()
			.filter(|observer| observer.node_type == NodeType::Effect)
			.map(|observer| observer.id)
	}

	/// Push an observer onto the stack
	pub fn push_observer(&self, observer: Observer) {
		self.observer_stack.borrow_mut().push(observer);
	}

	/// Pop an observer from the stack
	pub fn pop_observer(&self) -> Option<Observer> {
		self.observer_stack.borrow_mut().pop()
	}

	/// Track a dependency between the current observer and `(object, key)`
	///
	/// This is called automatically by tracked object reads.
	pub fn track(&self, object: NodeId, key: &Key) {
		let Some(observer_id) = self.current_observer() else {
			return;
		};
		let mut graph = self.dependency_graph.borrow_mut();

		let subscribers = graph
			.sources
			.entry(object)
			.or_default()
			.entry(key.clone())
			.or_default();
		if !subscribers.insert(observer_id) {
			return;
		}

		graph
			.dependencies
			.entry(observer_id)
			.or_default()
			.push((object, key.clone()));
	}

	/// Notify that `(object, key)` has changed
	///
	/// Layout effects execute synchronously, passive effects are queued on the
	/// scheduler. Effects that are currently running are skipped so that an
	/// effect writing state it reads does not re-trigger itself.
	pub fn trigger(&self, object: NodeId, key: &Key) {
		let subscribers: Vec<NodeId> = {
			let graph = self.dependency_graph.borrow();
			match graph.sources.get(&object).and_then(|keys| keys.get(key)) {
				Some(set) => set.iter().copied().collect(),
				None => return,
			}
		};

		for effect_id in subscribers {
			match effect::effect_state(effect_id) {
				Some(EffectState::Idle) => {}
				_ => continue,
			}
			match effect::effect_timing(effect_id) {
				Some(EffectTiming::Layout) => {
					effect::execute_effect(effect_id);
				}
				Some(EffectTiming::Passive) | None => {
					self.scheduler.enqueue_job(Job::effect(effect_id));
				}
			}
		}
	}

	/// Drain the job queue now
	///
	/// Hosts normally reach this through the microtask armed by
	/// [`Scheduler::enqueue_job`]; tests call it directly.
	pub fn flush(&self) {
		self.scheduler.flush();
	}

	/// Clear the subscriptions of an effect
	///
	/// Called before re-executing an effect so it only depends on what the next
	/// run touches.
	pub fn clear_dependencies(&self, node_id: NodeId) {
		let mut graph = self.dependency_graph.borrow_mut();
		let Some(dependencies) = graph.dependencies.remove(&node_id) else {
			return;
		};

		for (object, key) in dependencies {
			let now_empty = match graph.sources.get_mut(&object) {
				Some(keys) => {
					if let Some(set) = keys.get_mut(&key) {
						set.shift_remove(&node_id);
						if set.is_empty() {
							keys.remove(&key);
						}
					}
					keys.is_empty()
				}
				None => false,
			};
			if now_empty {
				graph.sources.remove(&object);
			}
		}
	}

	/// Remove an effect from the dependency graph
	pub fn remove_node(&self, node_id: NodeId) {
		self.clear_dependencies(node_id);
	}

	/// Forget every subscription recorded against an object
	///
	/// Called when the object is dropped.
	pub fn remove_source(&self, object: NodeId) {
		let mut graph = self.dependency_graph.borrow_mut();
		let Some(keys) = graph.sources.remove(&object) else {
			return;
		};
		for subscribers in keys.values() {
			for effect_id in subscribers {
				if let Some(deps) = graph.dependencies.get_mut(effect_id) {
					deps.retain(|(source, _)| *source != object);
				}
			}
		}
	}

	/// Check if an object has any recorded subscriptions (for testing)
	pub fn has_source(&self, object: NodeId) -> bool {
		self.dependency_graph.borrow().sources.contains_key(&object)
	}

	/// Get the number of subscribers for `(object, key)` (for testing)
	pub fn subscriber_count(&self, object: NodeId, key: &Key) -> usize {
		self.dependency_graph
			.borrow()
			.sources
			.get(&object)
			.and_then(|keys| keys.get(key))
			.map(|set| set.len())
			.unwrap_or(0)
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

// Thread-local runtime instance
//
// In WASM, there is only one thread, so this effectively provides a global runtime.
// On non-WASM platforms, each thread gets its own runtime instance.
thread_local! {
	static RUNTIME: Runtime = Runtime::new();
}

/// Get a reference to the thread's runtime
///
/// # Example
///
/// ```ignore
/// use tendril_reactive::with_runtime;
///
/// with_runtime(|rt| rt.flush());
/// ```
pub fn with_runtime<F, R>(f: F) -> R
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.with(f)
}

/// Try to access the runtime (safe version for Drop implementations)
///
/// Returns None if the thread-local storage has been destroyed.
pub(crate) fn try_with_runtime<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.try_with(f).ok()
}

/// Pops the observer it pushed when dropped, including during unwinding.
pub(crate) struct ObserverGuard;

impl ObserverGuard {
	pub(crate) fn push(observer: Observer) -> Self {
		with_runtime(|rt| rt.push_observer(observer));
		Self
	}
}

impl Drop for ObserverGuard {
	fn drop(&mut self) {
		let _ = try_with_runtime(|rt| rt.pop_observer());
	}
}

/// Run `f` without tracking any reads it performs
///
/// Used when an effect builds child effects or reads state it must not
/// re-run on.
pub fn untrack<F, R>(f: F) -> R
where
	F: FnOnce() -> R,
{
	let _guard = ObserverGuard::push(Observer {
		id: NodeId::new(),
		node_type: NodeType::Untracked,
	});
	f()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serial_test::serial;

	fn effect_observer(id: NodeId) -> Observer {
		Observer {
			id,
			node_type: NodeType::Effect,
		}
	}

	#[test]
	#[serial]
	fn test_node_id_uniqueness() {
		let id1 = NodeId::new();
		let id2 = NodeId::new();
		let id3 = NodeId::new();

		assert_ne!(id1, id2);
		assert_ne!(id2, id3);
		assert_ne!(id1, id3);
	}

	#[test]
	#[serial]
	fn test_runtime_observer_stack() {
		let runtime = Runtime::new();
		assert!(runtime.current_observer().is_none());

		let id1 = NodeId::new();
		runtime.push_observer(effect_observer(id1));
		assert_eq!(runtime.current_observer(), Some(id1));

		let id2 = NodeId::new();
		runtime.push_observer(effect_observer(id2));
		assert_eq!(runtime.current_observer(), Some(id2));

		runtime.push_observer(Observer {
			id: NodeId::new(),
			node_type: NodeType::Untracked,
		});
		assert!(runtime.current_observer().is_none());
		runtime.pop_observer();

		runtime.pop_observer();
		assert_eq!(runtime.current_observer(), Some(id1));

		runtime.pop_observer();
		assert!(runtime.current_observer().is_none());
	}

	#[test]
	#[serial]
	fn test_dependency_tracking() {
		let runtime = Runtime::new();
		let object = NodeId::new();
		let effect_id = NodeId::new();
		let key = Key::prop("count");

		runtime.push_observer(effect_observer(effect_id));
		runtime.track(object, &key);
		runtime.track(object, &key);

		assert_eq!(runtime.subscriber_count(object, &key), 1);
		let graph = runtime.dependency_graph.borrow();
		assert_eq!(graph.dependencies[&effect_id], vec![(object, key)]);
	}

	#[test]
	#[serial]
	fn test_track_outside_effect_is_pass_through() {
		let runtime = Runtime::new();
		let object = NodeId::new();

		runtime.track(object, &Key::prop("count"));

		assert!(!runtime.has_source(object));
	}

	#[test]
	#[serial]
	fn test_clear_dependencies() {
		let runtime = Runtime::new();
		let object = NodeId::new();
		let effect_id = NodeId::new();

		runtime.push_observer(effect_observer(effect_id));
		runtime.track(object, &Key::prop("a"));
		runtime.track(object, &Key::Items);
		runtime.pop_observer();

		runtime.clear_dependencies(effect_id);

		assert_eq!(runtime.subscriber_count(object, &Key::prop("a")), 0);
		assert!(!runtime.has_source(object));
		assert!(
			!runtime
				.dependency_graph
				.borrow()
				.dependencies
				.contains_key(&effect_id)
		);
	}

	#[test]
	#[serial]
	fn test_remove_source_drops_reverse_edges() {
		let runtime = Runtime::new();
		let object = NodeId::new();
		let other = NodeId::new();
		let effect_id = NodeId::new();

		runtime.push_observer(effect_observer(effect_id));
		runtime.track(object, &Key::prop("a"));
		runtime.track(other, &Key::prop("b"));
		runtime.pop_observer();

		runtime.remove_source(object);

		let graph = runtime.dependency_graph.borrow();
		assert_eq!(
			graph.dependencies[&effect_id],
			vec![(other, Key::prop("b"))]
		);
	}
}
