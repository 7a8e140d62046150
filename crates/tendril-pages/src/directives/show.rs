//! `v-show` - toggles `display: none`.

use crate::directive::{Cleanup, DirectiveBinding};

pub fn show(binding: &DirectiveBinding<'_>) -> Option<Cleanup> {
	let getter = binding.getter();
	let el = binding.el.clone();
	let initial = el.style_property("display").unwrap_or_default();
	binding.effect(move || {
		if getter.get().is_truthy() {
			el.set_style_property("display", &initial);
		} else {
			el.set_style_property("display", "none");
		}
	});
	None
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serial_test::serial;
	use tendril_dom::Node;
	use tendril_reactive::{Value, run_microtasks};

	use crate::context::create_context;
	use crate::directive::process_directive;

	#[rstest]
	#[serial]
	fn test_show_restores_initial_display() {
		let ctx = create_context(None);
		ctx.scope().set("visible", Value::Bool(false));
		let el = Node::element("div");
		el.set_attribute("style", "display: flex");

		process_directive(&el, "v-show", "visible", &ctx);
		assert_eq!(el.style_property("display").as_deref(), Some("none"));

		ctx.scope().set("visible", Value::Bool(true));
		run_microtasks();
		assert_eq!(el.style_property("display").as_deref(), Some("flex"));
	}
}
