//! `v-text` and text interpolation.

use crate::directive::{Cleanup, DirectiveBinding};

/// Keep the node's text in sync with the expression
///
/// Text nodes have their data replaced in place; elements get their
/// children replaced by a single text node.
pub fn text(binding: &DirectiveBinding<'_>) -> Option<Cleanup> {
	let getter = binding.getter();
	let el = binding.el.clone();
	binding.effect(move || {
		let value = getter.get().to_display_string();
		if el.is_text() {
			el.set_data(&value);
		} else {
			el.set_text_content(&value);
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
	fn test_text_tracks_expression() {
		let ctx = create_context(None);
		ctx.scope().set("n", Value::from(1));
		let el = Node::element("span");

		process_directive(&el, "v-text", "n * 2", &ctx);
		assert_eq!(el.text_content(), "2");

		ctx.scope().set("n", Value::from(5));
		run_microtasks();
		assert_eq!(el.text_content(), "10");
		assert!(!el.has_attribute("v-text"));
	}

	#[rstest]
	#[serial]
	fn test_nullish_renders_empty() {
		let ctx = create_context(None);
		let el = Node::element("span");
		process_directive(&el, "v-text", "null", &ctx);
		assert_eq!(el.text_content(), "");
	}
}
