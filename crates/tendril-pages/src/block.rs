//! Blocks - a mounted subtree with its own context.
//!
//! Non-root blocks walk a clone of their template inside a holder fragment,
//! so the template can be mounted again later. A `<template>` becomes a fragment block
//! whose nodes sit between two empty text anchors.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tendril_dom::Node;

use crate::context::{Context, Lifecycle, create_context};
use crate::walk::{walk, walk_children};

struct BlockInner {
	template: Node,
	is_fragment: bool,
	ctx: Context,
	parent: Option<Weak<Lifecycle>>,
	anchors: RefCell<Option<(Node, Node)>>,
}

/// A mounted subtree; clones share the same block
#[derive(Clone)]
pub struct Block(Rc<BlockInner>);

impl Block {
	/// Build and walk a block
	///
	/// A root block processes `template` in place with `parent_ctx`. Any
	/// other block works on a clone, gets a child context and is tracked by
	/// `parent_ctx` until removed.
	pub fn new(template: &Node, parent_ctx: &Context, is_root: bool) -> Self {
		let is_template = template.local_name().as_deref() == Some("template");
		if is_root {
			walk(template, parent_ctx);
			return Self(Rc::new(BlockInner {
				template: template.clone(),
				is_fragment: false,
				ctx: parent_ctx.clone(),
				parent: None,
				anchors: RefCell::new(None),
			}));
		}

		// Clones are walked inside a holder so a component tag can replace itself
		let holder = Node::fragment();
		let copied = if is_template {
			template
				.children()
				.iter()
				.try_for_each(|child| holder.append_child(&child.clone_node(true)))
		} else {
			holder.append_child(&template.clone_node(true))
		};
		if let Err(err) = copied {
			crate::warn_log!(error = %err, "failed to copy block template");
		}
		let ctx = create_context(Some(parent_ctx));
		walk_children(&holder, &ctx);

		let children = holder.children();
		let (node, is_fragment) = match children.as_slice() {
			[single] if !is_template => {
				single.remove();
				(single.clone(), false)
			}
			_ => (holder, true),
		};
		let block = Self(Rc::new(BlockInner {
			template: node,
			is_fragment,
			ctx,
			parent: Some(parent_ctx.downgrade_lifecycle()),
			anchors: RefCell::new(None),
		}));
		parent_ctx.lifecycle().push_block(block.clone());
		block
	}

	pub fn ctx(&self) -> &Context {
		&self.0.ctx
	}

	pub fn is_fragment(&self) -> bool {
		self.0.is_fragment
	}

	/// The element of an element block, or the start anchor of a mounted fragment
	pub fn node(&self) -> Node {
		match &*self.0.anchors.borrow() {
			Some((start, _)) => start.clone(),
			None => self.0.template.clone(),
		}
	}

	/// Nodes currently belonging to the block, anchors excluded
	pub fn nodes(&self) -> Vec<Node> {
		let Some((start, end)) = self.0.anchors.borrow().clone() else {
			return if self.0.is_fragment {
				self.0.template.children()
			} else {
				vec![self.0.template.clone()]
			};
		};
		let mut nodes = Vec::new();
		let mut current = start.next_sibling();
		while let Some(node) = current {
			if node.ptr_eq(&end) {
				break;
			}
			current = node.next_sibling();
			nodes.push(node);
		}
		nodes
	}

	/// Insert (or move) the block's nodes into `parent` before `anchor`
	pub fn insert(&self, parent: &Node, anchor: Option<&Node>) {
		if !self.0.is_fragment {
			if let Err(err) = parent.insert_before(&self.0.template, anchor) {
				crate::warn_log!(error = %err, "failed to insert block");
			}
			return;
		}
		let existing = self.0.anchors.borrow().clone();
		let result = match existing {
			Some((start, end)) => {
				let mut current = Some(start);
				let mut result = Ok(());
				while let Some(node) = current {
					current = node.next_sibling();
					result = result.and(parent.insert_before(&node, anchor));
					if node.ptr_eq(&end) {
						break;
					}
				}
				result
			}
			None => {
				let start = Node::text("");
				let end = Node::text("");
				let result = parent
					.insert_before(&end, anchor)
					.and_then(|()| parent.insert_before(&start, Some(&end)))
					.and_then(|()| parent.insert_before(&self.0.template, Some(&end)));
				*self.0.anchors.borrow_mut() = Some((start, end));
				result
			}
		};
		if let Err(err) = result {
			crate::warn_log!(error = %err, "failed to insert fragment block");
		}
	}

	/// Detach from the DOM and from the parent context, then tear down
	pub fn remove(&self) {
		if let Some(parent) = self.0.parent.as_ref().and_then(Weak::upgrade) {
			parent.remove_block(self);
		}
		let anchors = self.0.anchors.borrow_mut().take();
		match anchors {
			Some((start, end)) => {
				let mut current = Some(start);
				while let Some(node) = current {
					current = node.next_sibling();
					node.remove();
					if node.ptr_eq(&end) {
						break;
					}
				}
			}
			None => self.0.template.remove(),
		}
		self.teardown();
	}

	/// Tear down the block's context: child blocks, effects, cleanups
	pub fn teardown(&self) {
		self.0.ctx.teardown();
	}

	pub fn ptr_eq(&self, other: &Block) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;
	use tendril_reactive::{Value, run_microtasks};

	fn element(html: &str) -> Node {
		let fragment = Node::parse_fragment(html).unwrap();
		fragment.first_child().unwrap()
	}

	#[rstest]
	#[serial]
	fn test_non_root_block_clones_template_and_registers_with_parent() {
		let ctx = create_context(None);
		ctx.scope().set("msg", Value::from("hi"));
		let template = element("<p v-text=\"msg\"></p>");

		let block = Block::new(&template, &ctx, false);

		assert!(!block.node().ptr_eq(&template));
		assert_eq!(block.node().text_content(), "hi");
		assert!(template.has_attribute("v-text"));
		assert_eq!(ctx.block_count(), 1);
	}

	#[rstest]
	#[serial]
	fn test_fragment_block_inserts_between_anchors_and_removes_cleanly() {
		let ctx = create_context(None);
		let parent = element("<div><hr></div>");
		let anchor = parent.first_child().unwrap();
		let template = element("<template><b>1</b><i>2</i></template>");

		let block = Block::new(&template, &ctx, false);
		block.insert(&parent, Some(&anchor));
		assert_eq!(parent.inner_html(), "<b>1</b><i>2</i><hr>");
		assert_eq!(block.nodes().len(), 2);

		block.remove();
		assert_eq!(parent.inner_html(), "<hr>");
		assert_eq!(ctx.block_count(), 0);
	}

	#[rstest]
	#[serial]
	fn test_removed_block_stops_updating() {
		let ctx = create_context(None);
		ctx.scope().set("msg", Value::from("a"));
		let parent = element("<div></div>");
		let block = Block::new(&element("<span v-text=\"msg\"></span>"), &ctx, false);
		block.insert(&parent, None);
		let node = block.node();

		block.remove();
		ctx.scope().set("msg", Value::from("b"));
		run_microtasks();

		assert_eq!(node.text_content(), "a");
		assert!(!parent.has_children());
	}

	#[rstest]
	#[serial]
	fn test_root_block_walks_in_place() {
		let ctx = create_context(None);
		ctx.scope().set("msg", Value::from("x"));
		let root = element("<div><span v-text=\"msg\"></span></div>");

		let block = Block::new(&root, &ctx, true);

		assert!(block.node().ptr_eq(&root));
		assert_eq!(root.inner_html(), "<span>x</span>");
		assert_eq!(ctx.block_count(), 0);
	}
}
