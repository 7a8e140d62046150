//! `:name` / `v-bind:name` - property, attribute, class and style bindings.
//!
//! Without an argument the expression must produce a map whose entries are
//! bound one by one; keys dropped from the map are cleared.

use tendril_dom::Node;
use tendril_reactive::Value;

use crate::directive::{Cleanup, DirectiveBinding};
use crate::shared::{camelize, normalize_class, normalize_style};

/// Names always written as attributes even when a property exists
const FORCE_ATTR: &[&str] = &["spellcheck", "draggable", "form", "list", "type"];

const BOOLEAN_PROPS: &[&str] = &["checked", "selected", "disabled", "hidden"];

pub fn bind(binding: &DirectiveBinding<'_>) -> Option<Cleanup> {
	let getter = binding.getter();
	let el = binding.el.clone();
	let key = binding.arg.map(|arg| {
		if binding.has_modifier("camel") {
			camelize(arg)
		} else {
			arg.to_string()
		}
	});
	let static_class = el.get_attribute("class");
	let mut previous = Value::Undefined;

	binding.effect(move || {
		let value = getter.get();
		let target = Target {
			el: &el,
			static_class: static_class.as_deref(),
		};
		match &key {
			Some(key) => target.set(key, &value, &previous),
			None => target.set_all(&value, &previous),
		}
		previous = value;
	});
	None
}

struct Target<'a> {
	el: &'a Node,
	static_class: Option<&'a str>,
}

impl Target<'_> {
	fn set(&self, key: &str, value: &Value, previous: &Value) {
		let el = self.el;
		match key {
			"class" => {
				let dynamic = normalize_class(value);
				let merged = [self.static_class.unwrap_or_default(), dynamic.as_str()]
					.iter()
					.map(|s| s.trim())
					.filter(|s| !s.is_empty())
					.collect::<Vec<_>>()
					.join(" ");
				el.set_attribute("class", &merged);
			}
			"style" => update_style(el, value, previous),
			"textContent" => el.set_text_content(&value.to_display_string()),
			"innerHTML" => {
				if let Err(err) = el.set_inner_html(&value.to_display_string()) {
					crate::warn_log!(error = %err, "bound innerHTML rejected");
				}
			}
			"value" => {
				let json = if value.is_nullish() {
					serde_json::Value::String(String::new())
				} else {
					value.to_json()
				};
				el.set_property("value", json);
			}
			_ if BOOLEAN_PROPS.contains(&key) => {
				let on = value.is_truthy();
				el.set_property(key, serde_json::Value::Bool(on));
				if on {
					el.set_attribute(key, "");
				} else {
					el.remove_attribute(key);
				}
			}
			_ if el.has_property(key) && !FORCE_ATTR.contains(&key) && key != "id" => {
				el.set_property(key, value.to_json());
			}
			_ => {
				if value.is_nullish() {
					el.remove_attribute(key);
				} else {
					el.set_attribute(key, &value.to_js_string());
				}
			}
		}
	}

	fn set_all(&self, value: &Value, previous: &Value) {
		let Some(map) = value.as_object().filter(|o| !o.is_array()) else {
			crate::warn_log!("v-bind without an argument expects an object");
			return;
		};
		let old = previous.as_object();
		for (key, v) in map.entries() {
			let prev = old.map(|o| o.get_untracked(&key)).unwrap_or_default();
			self.set(&key, &v, &prev);
		}
		if let Some(old) = old {
			for key in old.keys() {
				if !map.has_own(&key) {
					self.set(&key, &Value::Null, &Value::Undefined);
				}
			}
		}
	}
}

fn update_style(el: &Node, value: &Value, previous: &Value) {
	match value {
		v if !v.is_truthy() => el.remove_attribute("style"),
		Value::String(css) => {
			if !value.strict_eq(previous) {
				el.set_attribute("style", css);
			}
		}
		_ => {
			let declarations = normalize_style(value);
			for (name, v) in &declarations {
				el.set_style_property(name, v.trim_end_matches("!important").trim_end());
			}
			if previous.as_object().is_some() {
				for (name, _) in normalize_style(previous) {
					if !declarations.iter().any(|(n, _)| *n == name) {
						el.set_style_property(&name, "");
					}
				}
			}
		}
	}
}
