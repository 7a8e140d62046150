//! DOM events and listener registration.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::node::Node;

/// Listener callback
pub type ListenerFn = dyn Fn(&Event) + 'static;

/// Handle returned by [`Node::add_event_listener`], used to remove the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

impl ListenerId {
	pub(crate) fn next() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(1);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

/// Options for [`Node::add_event_listener_with_options`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerOptions {
	/// Remove the listener after its first invocation
	pub once: bool,
}

#[derive(Clone)]
pub(crate) struct Listener {
	pub(crate) id: ListenerId,
	pub(crate) event_type: Rc<str>,
	pub(crate) once: bool,
	pub(crate) callback: Rc<ListenerFn>,
}

struct EventInner {
	event_type: Rc<str>,
	bubbles: bool,
	detail: serde_json::Value,
	target: RefCell<Option<Node>>,
	current_target: RefCell<Option<Node>>,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
}

/// A dispatched event; clones share state
#[derive(Clone)]
pub struct Event(Rc<EventInner>);

impl Event {
	/// A bubbling event of the given type
	pub fn new(event_type: &str) -> Self {
		Self::with_options(event_type, true, serde_json::Value::Null)
	}

	/// An event with explicit bubbling and a detail payload
	pub fn with_options(event_type: &str, bubbles: bool, detail: serde_json::Value) -> Self {
		Self(Rc::new(EventInner {
			event_type: Rc::from(event_type),
			bubbles,
			detail,
			target: RefCell::new(None),
			current_target: RefCell::new(None),
			default_prevented: Cell::new(false),
			propagation_stopped: Cell::new(false),
		}))
	}

	pub fn event_type(&self) -> &str {
		&self.0.event_type
	}

	pub fn bubbles(&self) -> bool {
		self.0.bubbles
	}

	pub fn detail(&self) -> &serde_json::Value {
		&self.0.detail
	}

	/// The node the event was dispatched on
	pub fn target(&self) -> Option<Node> {
		self.0.target.borrow().clone()
	}

	/// The node whose listeners are currently running
	pub fn current_target(&self) -> Option<Node> {
		self.0.current_target.borrow().clone()
	}

	pub fn prevent_default(&self) {
		self.0.default_prevented.set(true);
	}

	pub fn default_prevented(&self) -> bool {
		self.0.default_prevented.get()
	}

	pub fn stop_propagation(&self) {
		self.0.propagation_stopped.set(true);
	}

	pub fn propagation_stopped(&self) -> bool {
		self.0.propagation_stopped.get()
	}

	pub(crate) fn set_target(&self, node: &Node) {
		*self.0.target.borrow_mut() = Some(node.clone());
	}

	pub(crate) fn set_current_target(&self, node: Option<&Node>) {
		*self.0.current_target.borrow_mut() = node.cloned();
	}

	pub fn ptr_eq(&self, other: &Event) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event")
			.field("type", &self.event_type())
			.field("bubbles", &self.bubbles())
			.field("default_prevented", &self.default_prevented())
			.finish()
	}
}
