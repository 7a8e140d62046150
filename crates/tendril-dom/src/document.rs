//! Document - the root of a live tree with `<head>` and `<body>`.

use crate::error::{DomError, Result};
use crate::node::Node;

/// An HTML document; clones share the same tree
#[derive(Debug, Clone)]
pub struct Document {
	root: Node,
	html: Node,
	head: Node,
	body: Node,
}

impl Document {
	/// An empty `<html><head></head><body></body></html>` document
	pub fn new() -> Self {
		let root = Node::document();
		let html = Node::element("html");
		let head = Node::element("head");
		let body = Node::element("body");
		// Fresh nodes always accept children.
		let _ = html.append_child(&head);
		let _ = html.append_child(&body);
		let _ = root.append_child(&html);
		Self {
			root,
			html,
			head,
			body,
		}
	}

	/// A document whose body holds the parsed `html`
	pub fn with_body(html: &str) -> Result<Self> {
		let document = Self::new();
		document.body.set_inner_html(html)?;
		Ok(document)
	}

	/// The document node itself
	pub fn node(&self) -> &Node {
		&self.root
	}

	pub fn document_element(&self) -> &Node {
		&self.html
	}

	pub fn head(&self) -> &Node {
		&self.head
	}

	pub fn body(&self) -> &Node {
		&self.body
	}

	pub fn create_element(&self, tag: &str) -> Node {
		Node::element(tag)
	}

	pub fn create_text_node(&self, data: &str) -> Node {
		Node::text(data)
	}

	pub fn create_comment(&self, data: &str) -> Node {
		Node::comment(data)
	}

	pub fn create_document_fragment(&self) -> Node {
		Node::fragment()
	}

	pub fn get_element_by_id(&self, id: &str) -> Option<Node> {
		self.root
			.descendants()
			.into_iter()
			.find(|n| n.is_element() && n.id().as_deref() == Some(id))
	}

	pub fn query_selector(&self, selector: &str) -> Result<Option<Node>> {
		self.root.query_selector(selector)
	}

	pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>> {
		self.root.query_selector_all(selector)
	}

	/// Like [`query_selector`](Self::query_selector) but a miss is an error
	pub fn require(&self, selector: &str) -> Result<Node> {
		self.query_selector(selector)?
			.ok_or_else(|| DomError::NotFound(format!("no element matches {selector:?}")))
	}
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_body_content_is_connected() {
		let document = Document::with_body(r#"<main id="root"><p>hi</p></main>"#).unwrap();

		let main = document.get_element_by_id("root").unwrap();
		assert!(main.is_connected());
		assert!(document.body().contains(&main));
		assert_eq!(
			document.node().outer_html(),
			r#"<html><head></head><body><main id="root"><p>hi</p></main></body></html>"#
		);
	}

	#[rstest]
	fn test_require_reports_missing_selector() {
		let document = Document::new();

		assert!(matches!(document.require("#nope"), Err(DomError::NotFound(_))));
	}
}
