//! Prop extraction from a component's host element.
//!
//! `:name="exp"` evaluates `exp` against the parent scope and remembers the
//! expression as the prop's root binding (`$root_name`), which `emit` and
//! [`update_props`] use to write back. A bare `name="text"` is coerced from
//! its text. Declared props missing from the host fall back to their
//! default, or `null`.

use indexmap::IndexMap;
use tendril_dom::Node;
use tendril_reactive::{Object, Value};

use super::ComponentDefinition;
use crate::context::Context;
use crate::eval;
use crate::shared::camelize;

/// Props of one host element
#[derive(Debug, Default)]
pub struct ExtractedProps {
	pub values: IndexMap<String, Value>,
	/// Prop name to the parent expression it was bound to
	pub root_bindings: IndexMap<String, String>,
}

impl ExtractedProps {
	/// The `$props` table: values plus `$root_<prop>` entries
	pub fn to_object(&self) -> Object {
		let table = Object::new_map();
		for (name, value) in &self.values {
			table.define(name, value.clone());
		}
		for (name, exp) in &self.root_bindings {
			table.define(&format!("$root_{name}"), Value::from(exp.as_str()));
		}
		table
	}
}

/// Prop name an attribute targets, and whether it is dynamic
pub(crate) fn prop_target(attribute: &str) -> (String, bool) {
	match attribute
		.strip_prefix(':')
		.or_else(|| attribute.strip_prefix("v-bind:"))
	{
		Some(name) => (camelize(name), true),
		None => (camelize(attribute), false),
	}
}

pub fn extract_props(el: &Node, definition: &ComponentDefinition, ctx: &Context) -> ExtractedProps {
	let mut props = ExtractedProps::default();
	let env = ctx.env();
	for (attribute, source) in el.attributes() {
		let (name, dynamic) = prop_target(&attribute);
		if !definition.has_prop(&name) {
			continue;
		}
		let value = if dynamic {
			props.root_bindings.insert(name.clone(), source.clone());
			eval::try_evaluate(&env, &source).unwrap_or_else(|_| Value::from(source))
		} else {
			coerce_static(&source)
		};
		props.values.insert(name, value);
	}
	for (name, default) in definition.props() {
		if !props.values.contains_key(name) {
			let value = if default.is_undefined() { Value::Null } else { default.clone() };
			props.values.insert(name.clone(), value);
		}
	}
	props
}

/// `true`/`false`, numbers, or the text itself; a bare attribute is `true`
pub fn coerce_static(text: &str) -> Value {
	match text {
		"" | "true" => Value::Bool(true),
		"false" => Value::Bool(false),
		_ => match text.trim().parse::<f64>() {
			Ok(n) if !text.trim().is_empty() => Value::Number(n),
			_ => Value::from(text),
		},
	}
}

/// Push `value` into every registered instance whose prop is bound to `parent_key`
pub fn update_props(ctx: &Context, parent_key: &str, value: &Value) {
	let Some(refs) = ctx.refs() else {
		return;
	};
	for (_, entry) in refs.entries() {
		let Some(instance) = entry.as_object() else {
			continue;
		};
		let Some(table) = instance.get_untracked("$props").as_object().cloned() else {
			continue;
		};
		for (key, bound) in table.entries() {
			if let Some(prop) = key.strip_prefix("$root_") {
				if bound.as_str() == Some(parent_key) {
					instance.set(prop, value.clone());
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	use crate::context::create_context;

	fn host(html: &str) -> Node {
		Node::parse_fragment(html).unwrap().first_child().unwrap()
	}

	#[rstest]
	#[case("true", Value::Bool(true))]
	#[case("", Value::Bool(true))]
	#[case("false", Value::Bool(false))]
	#[case("42", Value::from(42))]
	#[case("1.5", Value::from(1.5))]
	#[case("hello", Value::from("hello"))]
	fn test_coerce_static(#[case] text: &str, #[case] expected: Value) {
		assert_eq!(coerce_static(text), expected);
	}

	#[rstest]
	fn test_extract_dynamic_static_and_defaults() {
		let ctx = create_context(None);
		ctx.scope().set("y", Value::from(5));
		let def = ComponentDefinition::new("<p></p>")
			.prop("x", Value::Undefined)
			.prop("size", 1)
			.prop("label", "none")
			.prop("missing", Value::Undefined);
		let el = host(r#"<my-thing :x="y" size="3" title="ignored"></my-thing>"#);

		let props = extract_props(&el, &def, &ctx);

		assert_eq!(props.values["x"], Value::from(5));
		assert_eq!(props.values["size"], Value::from(3));
		assert_eq!(props.values["label"], Value::from("none"));
		assert_eq!(props.values["missing"], Value::Null);
		assert!(!props.values.contains_key("title"));
		assert_eq!(props.root_bindings["x"], "y");
		assert_eq!(props.to_object().get("$root_x"), Value::from("y"));
	}

	#[rstest]
	fn test_failed_prop_expression_falls_back_to_text() {
		let ctx = create_context(None);
		let def = ComponentDefinition::new("<p></p>").prop("msg", Value::Undefined);
		let props = extract_props(&host(r#"<c-x :msg="not here"></c-x>"#), &def, &ctx);
		assert_eq!(props.values["msg"], Value::from("not here"));
	}

	#[rstest]
	fn test_kebab_attributes_target_camel_props() {
		let ctx = create_context(None);
		let def = ComponentDefinition::new("<p></p>").prop("maxItems", 0);
		let props = extract_props(&host(r#"<c-x max-items="7"></c-x>"#), &def, &ctx);
		assert_eq!(props.values["maxItems"], Value::from(7));
	}

	#[rstest]
	fn test_update_props_follows_root_bindings() {
		let ctx = create_context(None);
		let instance = Object::from_json(json!({ "x": 1 }));
		let mut props = ExtractedProps::default();
		props.root_bindings.insert("x".to_string(), "y".to_string());
		instance.define("$props", Value::Object(props.to_object()));
		ctx.refs().unwrap().define("child", Value::Object(instance.clone()));

		update_props(&ctx, "y", &Value::from(9));

		assert_eq!(instance.get("x"), Value::from(9));
	}
}
