//! `v-html`.

use crate::directive::{Cleanup, DirectiveBinding};

pub fn html(binding: &DirectiveBinding<'_>) -> Option<Cleanup> {
	let getter = binding.getter();
	let el = binding.el.clone();
	binding.effect(move || {
		let markup = getter.get().to_display_string();
		if let Err(err) = el.set_inner_html(&markup) {
			crate::warn_log!(expression = getter.expression(), error = %err, "v-html produced invalid markup");
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
	fn test_html_replaces_children() {
		let ctx = create_context(None);
		ctx.scope().set("markup", Value::from("<b>bold</b>"));
		let el = Node::element("div");

		process_directive(&el, "v-html", "markup", &ctx);
		assert_eq!(el.inner_html(), "<b>bold</b>");

		ctx.scope().set("markup", Value::from("<i>x</i>"));
		run_microtasks();
		assert_eq!(el.inner_html(), "<i>x</i>");
	}
}
