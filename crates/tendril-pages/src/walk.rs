//! Tree walker - binds directives depth-first over a live subtree.
//!
//! Elements are checked in a fixed order: `v-pre` skips the subtree,
//! `v-if` and `v-for` take over the element entirely, registered component
//! tags are mounted, then `scope` and `ref` are applied before the children
//! are walked. Attribute directives run last, so an element's bindings see
//! its children already wired; `v-model` follows the other attributes and
//! `@` listeners come after that.

use tendril_dom::{Node, NodeKind};
use tendril_reactive::{Object, Value};

use crate::component::mount_component;
use crate::context::{Context, create_scoped_context};
use crate::directive::{Modifiers, apply_directive, is_directive_attribute, parse_modifiers, process_directive};
use crate::directives;
use crate::eval;
use crate::shared::is_native_tag;

/// Remove attribute `name` from `el`, returning its value if it was present
pub(crate) fn take_attribute(el: &Node, name: &str) -> Option<String> {
	let value = el.get_attribute(name)?;
	el.remove_attribute(name);
	Some(value)
}

fn take_first(el: &Node, names: &[&str]) -> Option<String> {
	names.iter().find_map(|name| take_attribute(el, name))
}

/// A JSON string literal, which is also a valid expression literal
fn string_literal(s: &str) -> String {
	serde_json::Value::String(s.to_string()).to_string()
}

/// Process `node` and its subtree against `ctx`
///
/// Returns the node the parent's walk should continue from when this node
/// was moved or replaced.
pub fn walk(node: &Node, ctx: &Context) -> Option<Node> {
	match node.kind() {
		NodeKind::Element => walk_element(node, ctx),
		NodeKind::Text => {
			interpolate(node, ctx);
			None
		}
		NodeKind::Fragment | NodeKind::Document => {
			walk_children(node, ctx);
			None
		}
		NodeKind::Comment => None,
	}
}

pub(crate) fn walk_children(node: &Node, ctx: &Context) {
	let mut child = node.first_child();
	while let Some(current) = child {
		child = walk(&current, ctx).or_else(|| current.next_sibling());
	}
}

fn walk_element(el: &Node, ctx: &Context) -> Option<Node> {
	if el.has_attribute("v-pre") || el.has_attribute("c-pre") {
		return None;
	}
	if let Some(exp) = take_first(el, &["v-if", "c-if"]) {
		return directives::if_::process(el, &exp, ctx);
	}
	if let Some(exp) = take_first(el, &["v-for", "c-for"]) {
		return directives::for_::process(el, &exp, ctx);
	}
	if let Some(tag) = el.local_name() {
		if !is_native_tag(&tag) && ctx.resolve_component(&tag).is_some() {
			let next = el.next_sibling();
			// The first render commits synchronously, so later siblings mount after this one
			drop(mount_component(ctx, el, &tag, None));
			return next;
		}
	}

	let mut ctx = ctx.clone();
	if let Some(exp) = take_first(el, &["scope", "v-scope", "c-scope"]) {
		let data = if exp.trim().is_empty() {
			Object::new_map()
		} else {
			match eval::evaluate(&ctx.env(), &exp) {
				Value::Object(data) => data,
				_ => Object::new_map(),
			}
		};
		ctx = create_scoped_context(&ctx, &data);
		if let Value::String(template) = data.get_untracked("$template") {
			resolve_template(el, &template, &ctx);
		}
	}

	if let Some(name) = take_attribute(el, "ref") {
		apply_directive(
			el,
			&directives::reference::reference,
			&string_literal(&name),
			&ctx,
			None,
			&Modifiers::new(),
		);
	}

	walk_children(el, &ctx);

	if take_first(el, &["v-else", "c-else", "v-else-if", "c-else-if"]).is_some() {
		crate::warn_log!(tag = el.tag_name(), "v-else without a preceding v-if");
	}

	let mut models = Vec::new();
	let mut listeners = Vec::new();
	for (name, value) in el.attributes() {
		if !is_directive_attribute(&name) || name == "v-cloak" || name == "c-cloak" {
			continue;
		}
		let (bare, _) = parse_modifiers(&name);
		if bare == "v-model" || bare == "c-model" {
			models.push((name, value));
		} else if bare.starts_with('@') || bare.starts_with("v-on") || bare.starts_with("c-on") {
			listeners.push((name, value));
		} else {
			process_directive(el, &name, &value, &ctx);
		}
	}
	for (name, value) in models.into_iter().chain(listeners) {
		process_directive(el, &name, &value, &ctx);
	}
	None
}

/// Fill `el` from a `#id` template or from markup
fn resolve_template(el: &Node, template: &str, ctx: &Context) {
	if template.starts_with('#') {
		let found = ctx.document().query_selector(template).ok().flatten();
		let Some(source) = found else {
			crate::warn_log!(template, "template fragment not found");
			return;
		};
		for child in source.children() {
			if let Err(err) = el.append_child(&child.clone_node(true)) {
				crate::warn_log!(template, error = %err, "failed to copy template fragment");
			}
		}
		return;
	}
	if let Err(err) = el.set_inner_html(template) {
		crate::warn_log!(error = %err, "invalid $template markup");
	}
}

/// Bind a text node containing interpolations as one text effect
///
/// `a {{ x }} b` becomes the expression `"a "+$s(x)+" b"`.
fn interpolate(node: &Node, ctx: &Context) {
	let Some(data) = node.data() else {
		return;
	};
	let delimiters = &ctx.config().delimiters;
	let (open, close) = (delimiters.open.as_str(), delimiters.close.as_str());
	if !data.contains(open) {
		return;
	}

	let mut segments = Vec::new();
	let mut has_expression = false;
	let mut rest = data.as_str();
	while let Some(start) = rest.find(open) {
		let after = &rest[start + open.len()..];
		let Some(end) = after.find(close) else {
			break;
		};
		if start > 0 {
			segments.push(string_literal(&rest[..start]));
		}
		segments.push(format!("$s({})", after[..end].trim()));
		has_expression = true;
		rest = &after[end + close.len()..];
	}
	if !has_expression {
		return;
	}
	if !rest.is_empty() {
		segments.push(string_literal(rest));
	}
	apply_directive(
		node,
		&directives::text::text,
		&segments.join("+"),
		ctx,
		None,
		&Modifiers::new(),
	);
}
