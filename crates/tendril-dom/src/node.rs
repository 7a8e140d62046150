//! Live DOM nodes.
//!
//! [`Node`] is a cheap, clonable handle to a node in an in-memory tree. Parents
//! own their children; children hold a weak back-pointer. The operations mirror
//! the browser DOM closely enough that directive code reads the same as it
//! would over `web-sys`.
//!
//! ## Example
//!
//! ```ignore
//! use tendril_dom::Node;
//!
//! let list = Node::element("ul");
//! let item = Node::element("li");
//! item.set_text_content("first");
//! list.append_child(&item)?;
//!
//! assert_eq!(list.outer_html(), "<ul><li>first</li></ul>");
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;

use crate::error::{DomError, Result};
use crate::event::{Event, Listener, ListenerFn, ListenerId, ListenerOptions};
use crate::parser;
use crate::selector::SelectorList;
use crate::serialize;

/// Kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	Element,
	Text,
	Comment,
	Fragment,
	Document,
}

pub(crate) struct ElementData {
	pub(crate) tag: Rc<str>,
	pub(crate) attributes: IndexMap<String, String>,
	pub(crate) properties: HashMap<String, serde_json::Value>,
}

pub(crate) enum NodeData {
	Element(ElementData),
	Text(String),
	Comment(String),
	Fragment,
	Document,
}

pub(crate) struct NodeInner {
	identity: usize,
	pub(crate) data: RefCell<NodeData>,
	parent: RefCell<Weak<NodeInner>>,
	children: RefCell<Vec<Node>>,
	listeners: RefCell<Vec<Listener>>,
}

/// Handle to a live DOM node; clones refer to the same node
#[derive(Clone)]
pub struct Node(pub(crate) Rc<NodeInner>);

/// Non-owning handle to a [`Node`]
#[derive(Clone)]
pub struct WeakNode(Weak<NodeInner>);

impl WeakNode {
	pub fn upgrade(&self) -> Option<Node> {
		self.0.upgrade().map(Node)
	}
}

impl fmt::Debug for WeakNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.upgrade() {
			Some(node) => write!(f, "WeakNode({node:?})"),
			None => f.write_str("WeakNode(<dropped>)"),
		}
	}
}

/// Properties that reflect an attribute until they are first assigned
const REFLECTED_PROPERTIES: &[&str] = &["value", "checked", "selected", "disabled", "id", "hidden"];

impl Node {
	fn from_data(data: NodeData) -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(1);
		Self(Rc::new(NodeInner {
			identity: COUNTER.fetch_add(1, Ordering::Relaxed),
			data: RefCell::new(data),
			parent: RefCell::new(Weak::new()),
			children: RefCell::new(Vec::new()),
			listeners: RefCell::new(Vec::new()),
		}))
	}

	/// Create an element; the tag name is lower-cased
	pub fn element(tag: &str) -> Self {
		Self::from_data(NodeData::Element(ElementData {
			tag: Rc::from(tag.to_ascii_lowercase()),
			attributes: IndexMap::new(),
			properties: HashMap::new(),
		}))
	}

	pub fn text(data: &str) -> Self {
		Self::from_data(NodeData::Text(data.to_string()))
	}

	pub fn comment(data: &str) -> Self {
		Self::from_data(NodeData::Comment(data.to_string()))
	}

	pub fn fragment() -> Self {
		Self::from_data(NodeData::Fragment)
	}

	pub(crate) fn document() -> Self {
		Self::from_data(NodeData::Document)
	}

	/// Parse markup into a fragment
	pub fn parse_fragment(html: &str) -> Result<Self> {
		parser::parse_fragment(html)
	}

	/// Stable identity of this node, unique for the process lifetime
	pub fn identity(&self) -> usize {
		self.0.identity
	}

	pub fn ptr_eq(&self, other: &Node) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub fn downgrade(&self) -> WeakNode {
		WeakNode(Rc::downgrade(&self.0))
	}

	pub fn kind(&self) -> NodeKind {
		match &*self.0.data.borrow() {
			NodeData::Element(_) => NodeKind::Element,
			NodeData::Text(_) => NodeKind::Text,
			NodeData::Comment(_) => NodeKind::Comment,
			NodeData::Fragment => NodeKind::Fragment,
			NodeData::Document => NodeKind::Document,
		}
	}

	pub fn is_element(&self) -> bool {
		self.kind() == NodeKind::Element
	}

	pub fn is_text(&self) -> bool {
		self.kind() == NodeKind::Text
	}

	pub fn is_comment(&self) -> bool {
		self.kind() == NodeKind::Comment
	}

	pub fn is_fragment(&self) -> bool {
		self.kind() == NodeKind::Fragment
	}

	fn can_have_children(&self) -> bool {
		matches!(
			self.kind(),
			NodeKind::Element | NodeKind::Fragment | NodeKind::Document
		)
	}

	/// Lower-case tag name, or `None` for non-elements
	pub fn local_name(&self) -> Option<Rc<str>> {
		match &*self.0.data.borrow() {
			NodeData::Element(el) => Some(el.tag.clone()),
			_ => None,
		}
	}

	/// Upper-case tag name as the DOM reports it (empty for non-elements)
	pub fn tag_name(&self) -> String {
		self.local_name()
			.map(|t| t.to_ascii_uppercase())
			.unwrap_or_default()
	}

	// ------------------------------------------------------------------
	// Tree navigation
	// ------------------------------------------------------------------

	pub fn parent(&self) -> Option<Node> {
		self.0.parent.borrow().upgrade().map(Node)
	}

	/// Snapshot of the child list
	pub fn children(&self) -> Vec<Node> {
		self.0.children.borrow().clone()
	}

	/// Element children only
	pub fn element_children(&self) -> Vec<Node> {
		self.0
			.children
			.borrow()
			.iter()
			.filter(|c| c.is_element())
			.cloned()
			.collect()
	}

	pub fn has_children(&self) -> bool {
		!self.0.children.borrow().is_empty()
	}

	pub fn first_child(&self) -> Option<Node> {
		self.0.children.borrow().first().cloned()
	}

	pub fn last_child(&self) -> Option<Node> {
		self.0.children.borrow().last().cloned()
	}

	fn index_in_parent(&self) -> Option<(Node, usize)> {
		let parent = self.parent()?;
		let index = parent
			.0
			.children
			.borrow()
			.iter()
			.position(|c| c.ptr_eq(self))?;
		Some((parent, index))
	}

	pub fn next_sibling(&self) -> Option<Node> {
		let (parent, index) = self.index_in_parent()?;
		parent.0.children.borrow().get(index + 1).cloned()
	}

	pub fn previous_sibling(&self) -> Option<Node> {
		let (parent, index) = self.index_in_parent()?;
		let index = index.checked_sub(1)?;
		parent.0.children.borrow().get(index).cloned()
	}

	pub fn next_element_sibling(&self) -> Option<Node> {
		let mut next = self.next_sibling();
		while let Some(node) = next {
			if node.is_element() {
				return Some(node);
			}
			next = node.next_sibling();
		}
		None
	}

	/// Whether `other` is this node or one of its descendants
	pub fn contains(&self, other: &Node) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if node.ptr_eq(self) {
				return true;
			}
			current = node.parent();
		}
		false
	}

	/// Whether the node is attached below a document
	pub fn is_connected(&self) -> bool {
		let mut current = Some(self.clone());
		while let Some(node) = current {
			if node.kind() == NodeKind::Document {
				return true;
			}
			current = node.parent();
		}
		false
	}

	/// All descendants in document order
	pub fn descendants(&self) -> Vec<Node> {
		let mut out = Vec::new();
		fn walk(node: &Node, out: &mut Vec<Node>) {
			for child in node.0.children.borrow().iter() {
				out.push(child.clone());
				walk(child, out);
			}
		}
		walk(self, &mut out);
		out
	}

	// ------------------------------------------------------------------
	// Mutation
	// ------------------------------------------------------------------

	/// Append `child`; a fragment contributes its children
	pub fn append_child(&self, child: &Node) -> Result<()> {
		self.insert_before(child, None)
	}

	/// Insert `child` before `reference` (or at the end when `None`)
	///
	/// A node that already has a parent is moved. Inserting a fragment moves
	/// its children and leaves the fragment empty.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<()> {
		if !self.can_have_children() {
			return Err(DomError::HierarchyRequest(format!(
				"{:?} nodes cannot have children",
				self.kind()
			)));
		}
		if child.contains(self) {
			return Err(DomError::HierarchyRequest(
				"a node cannot be inserted into itself or its descendant".to_string(),
			));
		}
		if let Some(reference) = reference {
			if reference.ptr_eq(child) {
				return Ok(());
			}
			if !reference.parent().is_some_and(|p| p.ptr_eq(self)) {
				return Err(DomError::NotFound(
					"reference node is not a child of this node".to_string(),
				));
			}
		}

		let nodes = if child.is_fragment() {
			let taken = std::mem::take(&mut *child.0.children.borrow_mut());
			for node in &taken {
				*node.0.parent.borrow_mut() = Weak::new();
			}
			taken
		} else {
			child.remove();
			vec![child.clone()]
		};

		let mut children = self.0.children.borrow_mut();
		let index = reference
			.and_then(|r| children.iter().position(|c| c.ptr_eq(r)))
			.unwrap_or(children.len());
		for (offset, node) in nodes.into_iter().enumerate() {
			*node.0.parent.borrow_mut() = Rc::downgrade(&self.0);
			children.insert(index + offset, node);
		}
		Ok(())
	}

	/// Detach this node from its parent; no-op when detached
	pub fn remove(&self) {
		if let Some((parent, index)) = self.index_in_parent() {
			parent.0.children.borrow_mut().remove(index);
		}
		*self.0.parent.borrow_mut() = Weak::new();
	}

	/// Remove `child` from this node
	pub fn remove_child(&self, child: &Node) -> Result<()> {
		if !child.parent().is_some_and(|p| p.ptr_eq(self)) {
			return Err(DomError::NotFound(
				"node to remove is not a child of this node".to_string(),
			));
		}
		child.remove();
		Ok(())
	}

	/// Insert `node` immediately before this node
	pub fn before(&self, node: &Node) -> Result<()> {
		let parent = self
			.parent()
			.ok_or_else(|| DomError::HierarchyRequest("node has no parent".to_string()))?;
		parent.insert_before(node, Some(self))
	}

	/// Insert `node` immediately after this node
	pub fn after(&self, node: &Node) -> Result<()> {
		let parent = self
			.parent()
			.ok_or_else(|| DomError::HierarchyRequest("node has no parent".to_string()))?;
		let next = self.next_sibling();
		parent.insert_before(node, next.as_ref())
	}

	/// Put `node` where this node is and detach this node
	pub fn replace_with(&self, node: &Node) -> Result<()> {
		if node.ptr_eq(self) {
			return Ok(());
		}
		self.before(node)?;
		self.remove();
		Ok(())
	}

	/// Remove every child
	pub fn clear_children(&self) {
		let children = std::mem::take(&mut *self.0.children.borrow_mut());
		for child in children {
			*child.0.parent.borrow_mut() = Weak::new();
		}
	}

	/// Copy this node; `deep` copies descendants too
	///
	/// Attributes and character data are copied. Properties and listeners are not.
	pub fn clone_node(&self, deep: bool) -> Node {
		let data = match &*self.0.data.borrow() {
			NodeData::Element(el) => NodeData::Element(ElementData {
				tag: el.tag.clone(),
				attributes: el.attributes.clone(),
				properties: HashMap::new(),
			}),
			NodeData::Text(t) => NodeData::Text(t.clone()),
			NodeData::Comment(c) => NodeData::Comment(c.clone()),
			NodeData::Fragment => NodeData::Fragment,
			NodeData::Document => NodeData::Document,
		};
		let copy = Node::from_data(data);
		if deep {
			for child in self.children() {
				let child_copy = child.clone_node(true);
				*child_copy.0.parent.borrow_mut() = Rc::downgrade(&copy.0);
				copy.0.children.borrow_mut().push(child_copy);
			}
		}
		copy
	}

	// ------------------------------------------------------------------
	// Character data and content
	// ------------------------------------------------------------------

	/// Text or comment data (`None` for other kinds)
	pub fn data(&self) -> Option<String> {
		match &*self.0.data.borrow() {
			NodeData::Text(t) | NodeData::Comment(t) => Some(t.clone()),
			_ => None,
		}
	}

	/// Replace text or comment data; ignored for other kinds
	pub fn set_data(&self, value: &str) {
		match &mut *self.0.data.borrow_mut() {
			NodeData::Text(t) | NodeData::Comment(t) => {
				value.clone_into(t);
			}
			_ => {}
		}
	}

	/// Concatenated text of all descendant text nodes
	pub fn text_content(&self) -> String {
		match &*self.0.data.borrow() {
			NodeData::Text(t) | NodeData::Comment(t) => return t.clone(),
			_ => {}
		}
		let mut out = String::new();
		for node in self.descendants() {
			if let NodeData::Text(t) = &*node.0.data.borrow() {
				out.push_str(t);
			}
		}
		out
	}

	/// Replace content with a single text node (or just set data on text nodes)
	pub fn set_text_content(&self, value: &str) {
		if matches!(self.kind(), NodeKind::Text | NodeKind::Comment) {
			self.set_data(value);
			return;
		}
		self.clear_children();
		if !value.is_empty() {
			let text = Node::text(value);
			*text.0.parent.borrow_mut() = Rc::downgrade(&self.0);
			self.0.children.borrow_mut().push(text);
		}
	}

	pub fn inner_html(&self) -> String {
		serialize::inner_html(self)
	}

	pub fn outer_html(&self) -> String {
		serialize::outer_html(self)
	}

	/// Replace the children with parsed `html`
	pub fn set_inner_html(&self, html: &str) -> Result<()> {
		let fragment = parser::parse_fragment(html)?;
		self.clear_children();
		self.append_child(&fragment)
	}

	// ------------------------------------------------------------------
	// Attributes
	// ------------------------------------------------------------------

	fn with_element<R>(&self, f: impl FnOnce(&ElementData) -> R) -> Option<R> {
		match &*self.0.data.borrow() {
			NodeData::Element(el) => Some(f(el)),
			_ => None,
		}
	}

	fn with_element_mut<R>(&self, f: impl FnOnce(&mut ElementData) -> R) -> Option<R> {
		match &mut *self.0.data.borrow_mut() {
			NodeData::Element(el) => Some(f(el)),
			_ => None,
		}
	}

	pub fn get_attribute(&self, name: &str) -> Option<String> {
		self.with_element(|el| el.attributes.get(name).cloned())
			.flatten()
	}

	pub fn has_attribute(&self, name: &str) -> bool {
		self.with_element(|el| el.attributes.contains_key(name))
			.unwrap_or(false)
	}

	/// Set an attribute, keeping its original position when it already exists
	pub fn set_attribute(&self, name: &str, value: &str) {
		self.with_element_mut(|el| {
			el.attributes.insert(name.to_string(), value.to_string());
		});
	}

	pub fn remove_attribute(&self, name: &str) {
		self.with_element_mut(|el| {
			el.attributes.shift_remove(name);
		});
	}

	/// Attributes in source order
	pub fn attributes(&self) -> Vec<(String, String)> {
		self.with_element(|el| {
			el.attributes
				.iter()
				.map(|(k, v)| (k.clone(), v.clone()))
				.collect()
		})
		.unwrap_or_default()
	}

	pub fn id(&self) -> Option<String> {
		self.get_attribute("id")
	}

	pub fn class_list(&self) -> Vec<String> {
		self.get_attribute("class")
			.map(|c| c.split_whitespace().map(str::to_string).collect())
			.unwrap_or_default()
	}

	pub fn has_class(&self, class: &str) -> bool {
		self.class_list().iter().any(|c| c == class)
	}

	pub fn add_class(&self, class: &str) {
		let mut classes = self.class_list();
		if !classes.iter().any(|c| c == class) {
			classes.push(class.to_string());
			self.set_attribute("class", &classes.join(" "));
		}
	}

	pub fn remove_class(&self, class: &str) {
		let classes = self.class_list();
		if classes.iter().any(|c| c == class) {
			let kept: Vec<_> = classes.into_iter().filter(|c| c != class).collect();
			self.set_attribute("class", &kept.join(" "));
		}
	}

	fn style_declarations(&self) -> Vec<(String, String)> {
		self.get_attribute("style")
			.map(|style| {
				style
					.split(';')
					.filter_map(|decl| {
						let (name, value) = decl.split_once(':')?;
						let name = name.trim();
						(!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
					})
					.collect()
			})
			.unwrap_or_default()
	}

	fn write_style_declarations(&self, declarations: &[(String, String)]) {
		if declarations.is_empty() {
			self.remove_attribute("style");
			return;
		}
		let text = declarations
			.iter()
			.map(|(k, v)| format!("{k}: {v};"))
			.collect::<Vec<_>>()
			.join(" ");
		self.set_attribute("style", &text);
	}

	/// Value of one inline style property
	pub fn style_property(&self, name: &str) -> Option<String> {
		self.style_declarations()
			.into_iter()
			.find(|(k, _)| k == name)
			.map(|(_, v)| v)
	}

	/// Set one inline style property; an empty value removes it
	pub fn set_style_property(&self, name: &str, value: &str) {
		let mut declarations = self.style_declarations();
		declarations.retain(|(k, _)| k != name);
		if !value.is_empty() {
			declarations.push((name.to_string(), value.to_string()));
		}
		self.write_style_declarations(&declarations);
	}

	// ------------------------------------------------------------------
	// Properties
	// ------------------------------------------------------------------

	/// Whether `name` is a known element property
	///
	/// Explicitly assigned properties and the reflected ones (`value`,
	/// `checked`, ...) count.
	pub fn has_property(&self, name: &str) -> bool {
		REFLECTED_PROPERTIES.contains(&name)
			|| self
				.with_element(|el| el.properties.contains_key(name))
				.unwrap_or(false)
	}

	/// Read a property; unassigned reflected properties fall back to the attribute
	pub fn property(&self, name: &str) -> Option<serde_json::Value> {
		let explicit = self
			.with_element(|el| el.properties.get(name).cloned())
			.flatten();
		if explicit.is_some() {
			return explicit;
		}
		match name {
			"value" => {
				if self.local_name().as_deref() == Some("textarea") {
					Some(serde_json::Value::String(self.text_content()))
				} else {
					self.get_attribute("value").map(serde_json::Value::String)
				}
			}
			"checked" | "selected" | "disabled" | "hidden" => {
				self.is_element().then(|| serde_json::Value::Bool(self.has_attribute(name)))
			}
			"id" => self.get_attribute("id").map(serde_json::Value::String),
			_ => None,
		}
	}

	pub fn set_property(&self, name: &str, value: serde_json::Value) {
		self.with_element_mut(|el| {
			el.properties.insert(name.to_string(), value);
		});
	}

	/// The `value` property as text
	pub fn value(&self) -> String {
		match self.property("value") {
			Some(serde_json::Value::String(s)) => s,
			Some(serde_json::Value::Null) | None => String::new(),
			Some(other) => other.to_string(),
		}
	}

	pub fn checked(&self) -> bool {
		matches!(self.property("checked"), Some(serde_json::Value::Bool(true)))
	}

	// ------------------------------------------------------------------
	// Selectors
	// ------------------------------------------------------------------

	/// First descendant matching `selector`
	pub fn query_selector(&self, selector: &str) -> Result<Option<Node>> {
		let list = SelectorList::parse(selector)?;
		Ok(self.descendants().into_iter().find(|n| list.matches(n)))
	}

	/// All descendants matching `selector`, in document order
	pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>> {
		let list = SelectorList::parse(selector)?;
		Ok(self
			.descendants()
			.into_iter()
			.filter(|n| list.matches(n))
			.collect())
	}

	pub fn matches(&self, selector: &str) -> Result<bool> {
		Ok(SelectorList::parse(selector)?.matches(self))
	}

	/// Closest inclusive ancestor matching `selector`
	pub fn closest(&self, selector: &str) -> Result<Option<Node>> {
		let list = SelectorList::parse(selector)?;
		let mut current = Some(self.clone());
		while let Some(node) = current {
			if list.matches(&node) {
				return Ok(Some(node));
			}
			current = node.parent();
		}
		Ok(None)
	}

	// ------------------------------------------------------------------
	// Events
	// ------------------------------------------------------------------

	pub fn add_event_listener<F>(&self, event_type: &str, callback: F) -> ListenerId
	where
		F: Fn(&Event) + 'static,
	{
		self.add_event_listener_with_options(event_type, ListenerOptions::default(), callback)
	}

	pub fn add_event_listener_with_options<F>(
		&self,
		event_type: &str,
		options: ListenerOptions,
		callback: F,
	) -> ListenerId
	where
		F: Fn(&Event) + 'static,
	{
		let id = ListenerId::next();
		let callback: Rc<ListenerFn> = Rc::new(callback);
		self.0.listeners.borrow_mut().push(Listener {
			id,
			event_type: Rc::from(event_type),
			once: options.once,
			callback,
		});
		id
	}

	/// Returns whether a listener was removed
	pub fn remove_event_listener(&self, id: ListenerId) -> bool {
		let mut listeners = self.0.listeners.borrow_mut();
		let before = listeners.len();
		listeners.retain(|l| l.id != id);
		listeners.len() != before
	}

	pub fn listener_count(&self, event_type: &str) -> usize {
		self.0
			.listeners
			.borrow()
			.iter()
			.filter(|l| &*l.event_type == event_type)
			.count()
	}

	fn invoke_listeners(&self, event: &Event) {
		let matching: Vec<Listener> = self
			.0
			.listeners
			.borrow()
			.iter()
			.filter(|l| &*l.event_type == event.event_type())
			.cloned()
			.collect();
		for listener in matching {
			if listener.once {
				self.remove_event_listener(listener.id);
			}
			let callback = listener.callback.clone();
			if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
				tracing::error!(event = event.event_type(), "event listener panicked");
			}
		}
	}

	/// Dispatch `event` at this node, bubbling up when the event bubbles
	///
	/// Returns `false` when a listener called `prevent_default`.
	pub fn dispatch_event(&self, event: &Event) -> bool {
		event.set_target(self);
		let mut path = vec![self.clone()];
		if event.bubbles() {
			let mut current = self.parent();
			while let Some(node) = current {
				current = node.parent();
				path.push(node);
			}
		}
		for node in &path {
			if event.propagation_stopped() {
				break;
			}
			event.set_current_target(Some(node));
			node.invoke_listeners(event);
		}
		event.set_current_target(None);
		!event.default_prevented()
	}

	/// Dispatch a bubbling `click`
	pub fn click(&self) -> bool {
		self.dispatch_event(&Event::new("click"))
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &*self.0.data.borrow() {
			NodeData::Element(el) => write!(f, "<{}>#{}", el.tag, self.0.identity),
			NodeData::Text(t) => write!(f, "#text({t:?})"),
			NodeData::Comment(c) => write!(f, "#comment({c:?})"),
			NodeData::Fragment => write!(f, "#fragment#{}", self.0.identity),
			NodeData::Document => write!(f, "#document#{}", self.0.identity),
		}
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for Node {}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::Cell;

	fn list_of(items: &[&str]) -> Node {
		let ul = Node::element("ul");
		for item in items {
			let li = Node::element("li");
			li.set_text_content(item);
			ul.append_child(&li).unwrap();
		}
		ul
	}

	#[rstest]
	fn test_append_moves_existing_child() {
		let a = Node::element("div");
		let b = Node::element("div");
		let child = Node::element("span");

		a.append_child(&child).unwrap();
		b.append_child(&child).unwrap();

		assert!(!a.has_children());
		assert!(child.parent().unwrap().ptr_eq(&b));
	}

	#[rstest]
	fn test_fragment_insertion_moves_children() {
		let ul = list_of(&["a", "c"]);
		let fragment = Node::fragment();
		let b = Node::element("li");
		b.set_text_content("b");
		fragment.append_child(&b).unwrap();

		let second = ul.children()[1].clone();
		ul.insert_before(&fragment, Some(&second)).unwrap();

		assert_eq!(ul.text_content(), "abc");
		assert!(!fragment.has_children());
	}

	#[rstest]
	fn test_cannot_insert_ancestor() {
		let outer = Node::element("div");
		let inner = Node::element("div");
		outer.append_child(&inner).unwrap();

		assert!(matches!(
			inner.append_child(&outer),
			Err(DomError::HierarchyRequest(_))
		));
	}

	#[rstest]
	fn test_replace_with_keeps_position() {
		let ul = list_of(&["a", "b", "c"]);
		let middle = ul.children()[1].clone();
		let marker = Node::comment("anchor");

		middle.replace_with(&marker).unwrap();

		assert_eq!(ul.outer_html(), "<ul><li>a</li><!--anchor--><li>c</li></ul>");
		assert!(middle.parent().is_none());
	}

	#[rstest]
	fn test_siblings() {
		let ul = list_of(&["a", "b"]);
		let first = ul.first_child().unwrap();

		assert_eq!(first.next_sibling().unwrap().text_content(), "b");
		assert!(first.previous_sibling().is_none());
	}

	#[rstest]
	fn test_style_property_round_trip() {
		let el = Node::element("div");
		el.set_attribute("style", "color: red");

		el.set_style_property("display", "none");
		assert_eq!(el.style_property("display").as_deref(), Some("none"));
		assert_eq!(el.style_property("color").as_deref(), Some("red"));

		el.set_style_property("display", "");
		assert_eq!(el.get_attribute("style").as_deref(), Some("color: red;"));
	}

	#[rstest]
	fn test_reflected_value_property() {
		let input = Node::element("input");
		input.set_attribute("value", "initial");
		assert_eq!(input.value(), "initial");

		input.set_property("value", serde_json::json!("typed"));
		assert_eq!(input.value(), "typed");
		assert_eq!(input.get_attribute("value").as_deref(), Some("initial"));
	}

	#[rstest]
	fn test_event_bubbles_and_stops() {
		let outer = Node::element("div");
		let inner = Node::element("button");
		outer.append_child(&inner).unwrap();
		let outer_hits = Rc::new(Cell::new(0));
		let hits = outer_hits.clone();
		outer.add_event_listener("click", move |_| hits.set(hits.get() + 1));

		inner.click();
		assert_eq!(outer_hits.get(), 1);

		inner.add_event_listener("click", |e| e.stop_propagation());
		inner.click();
		assert_eq!(outer_hits.get(), 1);
	}

	#[rstest]
	fn test_once_listener_and_removal() {
		let button = Node::element("button");
		let count = Rc::new(Cell::new(0));
		let c = count.clone();
		button.add_event_listener_with_options("click", ListenerOptions { once: true }, move |_| {
			c.set(c.get() + 1)
		});
		let c = count.clone();
		let id = button.add_event_listener("click", move |_| c.set(c.get() + 10));

		button.click();
		button.click();
		assert_eq!(count.get(), 21);

		assert!(button.remove_event_listener(id));
		button.click();
		assert_eq!(count.get(), 21);
	}

	#[rstest]
	fn test_clone_node_is_independent() {
		let ul = list_of(&["a"]);
		let copy = ul.clone_node(true);
		copy.first_child().unwrap().set_text_content("z");

		assert_eq!(ul.text_content(), "a");
		assert_eq!(copy.text_content(), "z");
	}
}
