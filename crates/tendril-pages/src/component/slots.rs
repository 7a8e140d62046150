//! Slot capture and resolution.
//!
//! Before a component replaces its host element, the host's content is
//! captured: `<template>` children marked with `v-slot`/`c-slot`/`slot`
//! become named slots (named by their `name`, `slot` or `v-slot:name`
//! attribute), and whatever remains becomes the default slot. Each render
//! swaps the template's `<slot>` placeholders for fresh copies walked
//! against the parent scope.

use indexmap::IndexMap;
use tendril_dom::Node;
use tendril_reactive::{Object, Value};

use crate::context::{Context, create_scoped_context};
use crate::walk::walk_children;

/// Content captured for one slot
#[derive(Debug, Clone)]
pub struct SlotContent {
	nodes: Vec<Node>,
	/// `v-slot="card"` exposes the component instance as `card`
	scope_var: Option<String>,
}

impl SlotContent {
	pub fn markup(&self) -> String {
		self.nodes
			.iter()
			.map(|n| if n.is_text() { n.text_content() } else { n.outer_html() })
			.collect()
	}
}

/// Slots captured from one host element
#[derive(Debug, Clone, Default)]
pub struct Slots(IndexMap<String, SlotContent>);

fn slot_marker(template: &Node) -> Option<(Option<String>, Option<String>)> {
	for (attribute, value) in template.attributes() {
		let named = attribute
			.strip_prefix("v-slot:")
			.or_else(|| attribute.strip_prefix("c-slot:"))
			.or_else(|| attribute.strip_prefix('#'));
		if let Some(name) = named {
			return Some((Some(name.to_string()), Some(value)));
		}
		if attribute == "v-slot" || attribute == "c-slot" {
			return Some((None, Some(value)));
		}
		if attribute == "slot" {
			return Some((Some(value), None));
		}
	}
	None
}

pub(super) fn is_blank(node: &Node) -> bool {
	node.is_comment() || (node.is_text() && node.text_content().trim().is_empty())
}

impl Slots {
	/// Take the content of `host`, leaving it empty
	pub fn capture(host: &Node) -> Self {
		let mut slots = IndexMap::new();
		for child in host.element_children() {
			if child.local_name().as_deref() != Some("template") {
				continue;
			}
			let Some((marked_name, scope_var)) = slot_marker(&child) else {
				continue;
			};
			let name = child
				.get_attribute("name")
				.or(marked_name)
				.filter(|n| !n.is_empty())
				.unwrap_or_else(|| "default".to_string());
			child.remove();
			slots.insert(
				name,
				SlotContent {
					nodes: child.children(),
					scope_var: scope_var.filter(|v| !v.trim().is_empty()),
				},
			);
		}
		let rest = host.children();
		if !slots.contains_key("default") && !rest.iter().all(is_blank) {
			slots.insert(
				"default".to_string(),
				SlotContent {
					nodes: rest,
					scope_var: None,
				},
			);
		}
		host.clear_children();
		Self(slots)
	}

	pub fn names(&self) -> Vec<String> {
		self.0.keys().cloned().collect()
	}

	pub fn get(&self, name: &str) -> Option<&SlotContent> {
		self.0.get(name)
	}

	/// `$slots`: slot name to captured markup
	pub fn to_object(&self) -> Object {
		Object::from_entries(
			self.0
				.iter()
				.map(|(name, content)| (name.as_str(), Value::from(content.markup()))),
		)
	}

	/// Replace the `<slot>` placeholders under `root`
	///
	/// Captured content is copied and walked with `parent_ctx`; a slot with
	/// nothing captured keeps its fallback children, or shows the configured
	/// missing-slot text.
	pub fn render(&self, root: &Node, instance: &Object, parent_ctx: &Context) {
		let placeholders = match root.query_selector_all("slot") {
			Ok(found) => found,
			Err(err) => {
				crate::error_log!(error = %err, "slot lookup failed");
				return;
			}
		};
		for placeholder in placeholders {
			let name = placeholder
				.get_attribute("name")
				.unwrap_or_else(|| "default".to_string());
			let fragment = Node::fragment();
			let filled = match self.0.get(&name) {
				Some(content) => {
					let copied = content
						.nodes
						.iter()
						.try_for_each(|node| fragment.append_child(&node.clone_node(true)));
					let ctx = match &content.scope_var {
						Some(var) => create_scoped_context(
							parent_ctx,
							&Object::from_entries([(var.as_str(), Value::Object(instance.clone()))]),
						),
						None => parent_ctx.clone(),
					};
					walk_children(&fragment, &ctx);
					copied
				}
				None if placeholder.has_children() => move_children(&placeholder, &fragment),
				None => {
					crate::warn_log!(slot = name, "slot is not defined");
					let missing = parent_ctx.config().missing_slot(&name);
					fragment.append_child(&Node::text(&missing))
				}
			};
			if let Err(err) = filled.and_then(|()| placeholder.replace_with(&fragment)) {
				crate::warn_log!(slot = name, error = %err, "failed to fill slot");
			}
		}
	}
}

fn move_children(from: &Node, to: &Node) -> tendril_dom::Result<()> {
	from.children()
		.iter()
		.try_for_each(|child| to.append_child(child))
}
