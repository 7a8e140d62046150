//! `ref` - registers an element under `$refs`.

use std::cell::RefCell;
use std::rc::Rc;

use tendril_reactive::{Object, Value};

use crate::directive::{Cleanup, DirectiveBinding};
use crate::host::node_value;

/// `$refs[name].$el` follows the element
///
/// An existing entry (a mounted component instance, say) keeps its other
/// fields. Renaming the ref drops the old entry, and so does teardown.
pub fn reference(binding: &DirectiveBinding<'_>) -> Option<Cleanup> {
	let Some(refs) = binding.ctx.refs() else {
		crate::warn_log!(expression = binding.exp, "ref used without a $refs table");
		return None;
	};
	let getter = binding.getter();
	let el = binding.el.clone();
	let previous: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));

	let effect_refs = refs.clone();
	let effect_previous = previous.clone();
	binding.effect(move || {
		let name = getter.get().to_js_string();
		let entry = match effect_refs.get_untracked(&name) {
			Value::Object(existing) => {
				existing.set("$el", node_value(&el));
				existing
			}
			_ => Object::from_entries([("$el", node_value(&el))]),
		};
		effect_refs.define(&name, Value::Object(entry));

		let mut previous = effect_previous.borrow_mut();
		if let Some(old) = previous.as_deref() {
			if old != name {
				effect_refs.delete(old);
			}
		}
		*previous = Some(name);
	});

	Some(Box::new(move || {
		if let Some(name) = previous.borrow_mut().take() {
			refs.delete(&name);
		}
	}))
}
