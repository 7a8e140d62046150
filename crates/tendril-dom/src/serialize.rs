//! Markup serialization for live nodes.

use crate::node::{Node, NodeData};
use crate::parser::VOID_ELEMENTS;

/// Escape text content (`&`, `<`, `>`)
pub fn escape_text(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for ch in text.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			c => out.push(c),
		}
	}
	out
}

/// Escape an attribute value for double quotes
pub fn escape_attribute(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	for ch in value.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			c => out.push(c),
		}
	}
	out
}

pub(crate) fn outer_html(node: &Node) -> String {
	let mut out = String::new();
	write_node(node, false, &mut out);
	out
}

pub(crate) fn inner_html(node: &Node) -> String {
	let raw = matches!(node.local_name().as_deref(), Some("script" | "style"));
	let mut out = String::new();
	for child in node.children() {
		write_node(&child, raw, &mut out);
	}
	out
}

fn write_node(node: &Node, raw_text: bool, out: &mut String) {
	let children = node.children();
	match &*node.0.data.borrow() {
		NodeData::Text(text) => {
			if raw_text {
				out.push_str(text);
			} else {
				out.push_str(&escape_text(text));
			}
		}
		NodeData::Comment(data) => {
			out.push_str("<!--");
			out.push_str(data);
			out.push_str("-->");
		}
		NodeData::Fragment | NodeData::Document => {
			for child in &children {
				write_node(child, false, out);
			}
		}
		NodeData::Element(el) => {
			out.push('<');
			out.push_str(&el.tag);
			for (name, value) in &el.attributes {
				out.push(' ');
				out.push_str(name);
				out.push_str("=\"");
				out.push_str(&escape_attribute(value));
				out.push('"');
			}
			out.push('>');
			if VOID_ELEMENTS.contains(&&*el.tag) {
				return;
			}
			let raw = matches!(&*el.tag, "script" | "style");
			for child in &children {
				write_node(child, raw, out);
			}
			out.push_str("</");
			out.push_str(&el.tag);
			out.push('>');
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_round_trip_markup() {
		let html = r#"<div class="a" data-x="1 &quot;q&quot;"><br><p>a &amp; b</p><!--c--></div>"#;
		let fragment = Node::parse_fragment(html).unwrap();

		assert_eq!(fragment.outer_html(), html);
	}

	#[rstest]
	fn test_style_text_is_not_escaped() {
		let style = Node::element("style");
		style.append_child(&Node::text(".a > .b {}")).unwrap();

		assert_eq!(style.outer_html(), "<style>.a > .b {}</style>");
	}

	#[rstest]
	fn test_boolean_attribute_serializes_empty() {
		let input = Node::element("input");
		input.set_attribute("disabled", "");

		assert_eq!(input.outer_html(), r#"<input disabled="">"#);
	}
}
