//! Name resolution for expressions.

use std::cell::RefCell;
use std::rc::Rc;

use tendril_reactive::{Object, Value};

/// Where identifiers resolve and assignments land
pub trait Scope {
	/// `None` when the name is not declared anywhere in this scope chain
	fn lookup(&self, name: &str) -> Option<Value>;

	/// Returns `false` when no scope in the chain accepts the write
	fn assign(&self, name: &str, value: Value) -> bool;

	/// Receiver for `this` and for unqualified calls
	fn this_value(&self) -> Value;
}

/// Shared scope handle; arrow functions capture it
pub type Env = Rc<dyn Scope>;

impl Scope for Object {
	fn lookup(&self, name: &str) -> Option<Value> {
		self.has(name).then(|| self.get(name))
	}

	fn assign(&self, name: &str, value: Value) -> bool {
		self.set(name, value);
		true
	}

	fn this_value(&self) -> Value {
		Value::Object(self.clone())
	}
}

/// Non-reactive locals layered over a parent scope
///
/// Holds `$el`, `$event` and arrow-function parameters.
pub struct Locals {
	vars: RefCell<Vec<(Rc<str>, Value)>>,
	parent: Env,
}

impl Locals {
	pub fn new<K: AsRef<str>>(vars: impl IntoIterator<Item = (K, Value)>, parent: Env) -> Env {
		Rc::new(Self {
			vars: RefCell::new(
				vars.into_iter()
					.map(|(k, v)| (Rc::from(k.as_ref()), v))
					.collect(),
			),
			parent,
		})
	}
}

impl Scope for Locals {
	fn lookup(&self, name: &str) -> Option<Value> {
		let local = self
			.vars
			.borrow()
			.iter()
			.find(|(k, _)| &**k == name)
			.map(|(_, v)| v.clone());
		local.or_else(|| self.parent.lookup(name))
	}

	fn assign(&self, name: &str, value: Value) -> bool {
		{
			let mut vars = self.vars.borrow_mut();
			if let Some(slot) = vars.iter_mut().find(|(k, _)| &**k == name) {
				slot.1 = value;
				return true;
			}
		}
		self.parent.assign(name, value)
	}

	fn this_value(&self) -> Value {
		self.parent.this_value()
	}
}

/// Environment rooted at a scope object
pub fn object_env(scope: &Object) -> Env {
	Rc::new(scope.clone())
}
