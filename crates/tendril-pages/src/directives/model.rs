//! `v-model` - two-way binding for form controls.
//!
//! Text inputs and textareas listen to `input` (`change` with `.lazy`),
//! checkboxes bind a boolean or membership in an array, radios bind the
//! checked option's value and selects bind the selected option's value (an
//! array when `multiple`). `.trim` and `.number` post-process typed text.

use tendril_dom::Node;
use tendril_reactive::{Object, Value};

use crate::directive::{Cleanup, DirectiveBinding, Getter};
use crate::eval;
use crate::shared::{loose_equal, loose_index_of, loose_to_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
	Text,
	Checkbox,
	Radio,
	Select,
}

fn control_of(el: &Node) -> Control {
	match el.local_name().as_deref() {
		Some("select") => Control::Select,
		Some("input") => match el.get_attribute("type").as_deref() {
			Some("checkbox") => Control::Checkbox,
			Some("radio") => Control::Radio,
			_ => Control::Text,
		},
		_ => Control::Text,
	}
}

pub fn model(binding: &DirectiveBinding<'_>) -> Option<Cleanup> {
	let el = binding.el.clone();
	let getter = binding.getter();
	let control = control_of(&el);
	let trim = binding.has_modifier("trim");
	let number = binding.has_modifier("number") || el.get_attribute("type").as_deref() == Some("number");
	let event_type = match control {
		Control::Text if !binding.has_modifier("lazy") => "input",
		_ => "change",
	};

	let weak_el = el.downgrade();
	let writer = getter.clone();
	let id = el.add_event_listener(event_type, move |_| {
		let Some(el) = weak_el.upgrade() else {
			return;
		};
		let value = match control {
			Control::Text => {
				let raw = el.value();
				let text = if trim { raw.trim().to_string() } else { raw };
				let value = Value::from(text);
				if number { loose_to_number(&value) } else { value }
			}
			Control::Checkbox => {
				let current = writer.get();
				match current.as_object().filter(|o| o.is_array()) {
					Some(list) => {
						toggle_membership(list, &element_value(&el), el.checked());
						return;
					}
					None => Value::Bool(el.checked()),
				}
			}
			Control::Radio => element_value(&el),
			Control::Select => selected_value(&el),
		};
		write(&writer, value);
	});

	let render_el = el.clone();
	binding.effect(move || {
		let value = getter.get();
		match control {
			Control::Text => {
				let shown = value.to_display_string();
				if render_el.value() != shown {
					render_el.set_property("value", serde_json::Value::String(shown));
				}
			}
			Control::Checkbox => {
				let checked = match value.as_object().filter(|o| o.is_array()) {
					Some(list) => loose_index_of(&list.items(), &element_value(&render_el)).is_some(),
					None => value.is_truthy(),
				};
				render_el.set_property("checked", serde_json::Value::Bool(checked));
			}
			Control::Radio => {
				let checked = loose_equal(&value, &element_value(&render_el));
				render_el.set_property("checked", serde_json::Value::Bool(checked));
			}
			Control::Select => select_options(&render_el, &value),
		}
	});

	Some(Box::new(move || {
		el.remove_event_listener(id);
	}))
}

fn write(getter: &Getter, value: Value) {
	if let Err(err) = eval::assign(getter.env(), getter.expression(), value) {
		crate::warn_log!(expression = getter.expression(), error = %err, "v-model target is not assignable");
	}
}

fn toggle_membership(list: &Object, value: &Value, checked: bool) {
	let items = list.items();
	match (loose_index_of(&items, value), checked) {
		(None, true) => {
			list.push(vec![value.clone()]);
		}
		(Some(index), false) => {
			list.splice(index, 1, Vec::new());
		}
		_ => {}
	}
}

/// The bound value of a checkbox, radio or option; numbers stay numbers
fn element_value(el: &Node) -> Value {
	match el.property("value") {
		Some(json) => Value::from_json(json),
		None if el.local_name().as_deref() == Some("option") => Value::from(el.text_content()),
		None => Value::from("on"),
	}
}

fn options(select: &Node) -> Vec<Node> {
	select
		.descendants()
		.into_iter()
		.filter(|n| n.local_name().as_deref() == Some("option"))
		.collect()
}

fn selected_value(select: &Node) -> Value {
	let selected = options(select)
		.into_iter()
		.filter(|o| matches!(o.property("selected"), Some(serde_json::Value::Bool(true))));
	if select.has_attribute("multiple") {
		Value::Object(Object::new_array(selected.map(|o| element_value(&o)).collect()))
	} else {
		selected
			.map(|o| element_value(&o))
			.next()
			.unwrap_or(Value::Null)
	}
}

fn select_options(select: &Node, value: &Value) {
	let multiple = select.has_attribute("multiple");
	let wanted = value.as_object().filter(|o| o.is_array()).map(Object::items);
	for option in options(select) {
		let option_value = element_value(&option);
		let selected = match (&wanted, multiple) {
			(Some(items), true) => loose_index_of(items, &option_value).is_some(),
			_ => loose_equal(value, &option_value),
		};
		option.set_property("selected", serde_json::Value::Bool(selected));
	}
}
