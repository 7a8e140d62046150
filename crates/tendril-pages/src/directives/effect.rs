//! `v-effect` - runs a statement body whenever what it reads changes.

use tendril_reactive::next_tick;

use crate::directive::{Cleanup, DirectiveBinding};
use crate::eval;

/// Start the effect on the next tick so sibling bindings are in place first
pub fn effect(binding: &DirectiveBinding<'_>) -> Option<Cleanup> {
	let getter = binding.getter();
	let ctx = binding.ctx.clone();
	next_tick(move || {
		ctx.effect(move || {
			eval::execute(getter.env(), getter.expression());
		});
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
	fn test_effect_is_deferred_then_reactive() {
		let ctx = create_context(None);
		ctx.scope().set("count", Value::from(1));
		ctx.scope().set("log", Value::from(""));
		let el = Node::element("div");

		process_directive(&el, "v-effect", "$el.textContent = count", &ctx);
		assert_eq!(el.text_content(), "");

		run_microtasks();
		assert_eq!(el.text_content(), "1");

		ctx.scope().set("count", Value::from(2));
		run_microtasks();
		assert_eq!(el.text_content(), "2");
	}

	#[rstest]
	#[serial]
	fn test_effect_not_started_after_teardown() {
		let ctx = create_context(None);
		ctx.scope().set("hits", Value::from(0));
		let el = Node::element("div");

		process_directive(&el, "v-effect", "hits++", &ctx);
		ctx.teardown();
		run_microtasks();

		assert_eq!(ctx.scope().get("hits"), Value::from(0));
	}
}
