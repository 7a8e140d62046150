//! `@event` / `v-on:event` - DOM event listeners.
//!
//! A handler written as a bare path (`save`, `form.submit`) is called with
//! the event; anything else runs as a statement body with `$event` and
//! `$el` in scope.

use tendril_dom::ListenerOptions;

use crate::directive::{Cleanup, DirectiveBinding};
use crate::eval::{self, Locals};
use crate::host::{event_value, node_value};

pub fn on(binding: &DirectiveBinding<'_>) -> Option<Cleanup> {
	let Some(event_type) = binding.arg.filter(|a| !a.is_empty()) else {
		crate::warn_log!(expression = binding.exp, "v-on requires an event name");
		return None;
	};
	let exp = binding.exp.trim();
	let body = if eval::is_simple_path(exp) {
		format!("{exp}($event)")
	} else {
		exp.to_string()
	};
	let prevent = binding.has_modifier("prevent");
	let stop = binding.has_modifier("stop");
	let self_only = binding.has_modifier("self");
	let options = ListenerOptions {
		once: binding.has_modifier("once"),
	};

	let env = binding.ctx.env();
	let weak_el = binding.el.downgrade();
	let id = binding
		.el
		.add_event_listener_with_options(event_type, options, move |event| {
			let Some(el) = weak_el.upgrade() else {
				return;
			};
			if self_only && !event.target().is_some_and(|t| t.ptr_eq(&el)) {
				return;
			}
			if prevent {
				event.prevent_default();
			}
			if stop {
				event.stop_propagation();
			}
			let locals = Locals::new(
				[("$event", event_value(event)), ("$el", node_value(&el))],
				env.clone(),
			);
			eval::execute(&locals, &body);
		});

	let el = binding.el.clone();
	Some(Box::new(move || {
		el.remove_event_listener(id);
	}))
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serial_test::serial;
	use tendril_dom::{Event, Node};
	use tendril_reactive::{Function, Value};

	use crate::context::create_context;
	use crate::directive::process_directive;

	#[rstest]
	#[serial]
	fn test_statement_handler_mutates_scope() {
		let ctx = create_context(None);
		ctx.scope().set("count", Value::from(0));
		let el = Node::element("button");

		process_directive(&el, "@click", "count++", &ctx);
		el.click();
		el.click();

		assert_eq!(ctx.scope().get("count"), Value::from(2));
	}

	#[rstest]
	#[serial]
	fn test_path_handler_receives_event() {
		let ctx = create_context(None);
		ctx.scope().set(
			"record",
			Value::Function(Function::new("record", |this, args| {
				let kind = args
					.first()
					.and_then(crate::host::as_event)
					.map(|e| e.event_type().to_string())
					.unwrap_or_default();
				if let Some(scope) = this.as_object() {
					scope.set("seen", Value::from(kind));
				}
				Value::Undefined
			})),
		);
		let el = Node::element("input");

		process_directive(&el, "v-on:change", "record", &ctx);
		el.dispatch_event(&Event::new("change"));

		assert_eq!(ctx.scope().get("seen"), Value::from("change"));
	}

	#[rstest]
	#[serial]
	fn test_modifiers() {
		let ctx = create_context(None);
		ctx.scope().set("hits", Value::from(0));
		let parent = Node::element("div");
		let child = Node::element("span");
		parent.append_child(&child).unwrap();

		process_directive(&parent, "@click.self", "hits++", &ctx);
		process_directive(&child, "@click.prevent.once", "hits += 10", &ctx);

		assert!(!child.click());
		assert!(child.click());
		parent.click();

		assert_eq!(ctx.scope().get("hits"), Value::from(11));
	}

	#[rstest]
	#[serial]
	fn test_teardown_removes_listener() {
		let ctx = create_context(None);
		let el = Node::element("button");
		process_directive(&el, "@click", "1", &ctx);
		assert_eq!(el.listener_count("click"), 1);
		ctx.teardown();
		assert_eq!(el.listener_count("click"), 0);
	}
}
