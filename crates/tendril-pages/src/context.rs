//! Context chain - the scope, lifecycle and registries a subtree is
//! processed with.
//!
//! A [`Context`] pairs a scope object with a lifecycle (child blocks,
//! effects, cleanup callbacks). Child contexts made by
//! [`create_context`] share the scope but own a fresh lifecycle; scoped
//! contexts made by [`create_scoped_context`] get a new scope layered over
//! the parent's and share the parent's lifecycle.
//!
//! ## Key Features
//!
//! - **Read-through scopes**: a scoped context resolves undeclared names in
//!   the parent scope and writes undeclared names through to it
//! - **Ordered teardown**: child blocks, then effects, then cleanups
//! - **Shared registries**: directives and components are shared down the
//!   chain; component-local definitions produce a merged table
//!
//! ## Example
//!
//! ```ignore
//! let root = create_context(None);
//! root.scope().set("count", Value::from(0));
//!
//! let item = create_scoped_context(&root, &Object::from_json(json!({ "row": 1 })));
//! assert_eq!(item.scope().get("count"), Value::from(0));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tendril_dom::{Document, Node};
use tendril_reactive::{Effect, Object, Value};

use crate::block::Block;
use crate::component::ComponentDefinition;
use crate::config::AppConfig;
use crate::directive::{Cleanup, Directive};
use crate::eval::{Env, object_env};

pub(crate) type DirectiveTable = Rc<RefCell<IndexMap<String, Rc<dyn Directive>>>>;
pub(crate) type ComponentTable = Rc<RefCell<IndexMap<String, Rc<ComponentDefinition>>>>;

/// Per-application state reachable from every context
///
/// Owns the document, the configuration and the registry of injected
/// component styles.
pub struct AppState {
	document: Document,
	config: AppConfig,
	styles: RefCell<IndexMap<String, Node>>,
	next_instance: Cell<usize>,
}

impl AppState {
	pub fn new(document: Document, config: AppConfig) -> Rc<Self> {
		Rc::new(Self {
			document,
			config,
			styles: RefCell::new(IndexMap::new()),
			next_instance: Cell::new(0),
		})
	}

	pub fn document(&self) -> &Document {
		&self.document
	}

	pub fn config(&self) -> &AppConfig {
		&self.config
	}

	/// Append a `<style>` to the document head unless `id` is present
	///
	/// Returns whether a new element was injected.
	pub fn inject_style(&self, id: &str, css: &str) -> bool {
		if self.styles.borrow().contains_key(id) {
			return false;
		}
		let style = self.document.create_element("style");
		style.set_attribute("id", id);
		style.set_text_content(css);
		if let Err(err) = self.document.head().append_child(&style) {
			crate::warn_log!(id, error = %err, "failed to inject component style");
			return false;
		}
		self.styles.borrow_mut().insert(id.to_string(), style);
		true
	}

	pub fn has_style(&self, id: &str) -> bool {
		self.styles.borrow().contains_key(id)
	}

	/// Remove every injected style element
	pub fn clear_styles(&self) {
		let styles = std::mem::take(&mut *self.styles.borrow_mut());
		for (_, style) in styles {
			style.remove();
		}
	}

	/// Sequence number for generated instance references
	pub fn next_instance_id(&self) -> usize {
		let id = self.next_instance.get() + 1;
		self.next_instance.set(id);
		id
	}
}

/// Blocks, effects and cleanups owned by one context
#[derive(Default)]
pub(crate) struct Lifecycle {
	blocks: RefCell<Vec<Block>>,
	effects: RefCell<Vec<Effect>>,
	cleanups: RefCell<Vec<Cleanup>>,
	torn_down: Cell<bool>,
}

impl Lifecycle {
	pub(crate) fn push_block(&self, block: Block) {
		self.blocks.borrow_mut().push(block);
	}

	pub(crate) fn remove_block(&self, block: &Block) {
		self.blocks.borrow_mut().retain(|b| !b.ptr_eq(block));
	}

	fn teardown(&self) {
		self.torn_down.set(true);
		let blocks = std::mem::take(&mut *self.blocks.borrow_mut());
		for block in blocks {
			block.teardown();
		}
		let effects = std::mem::take(&mut *self.effects.borrow_mut());
		for effect in effects {
			effect.dispose();
		}
		let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
		for cleanup in cleanups {
			cleanup();
		}
	}
}

/// Scope plus lifecycle plus registries; clones are cheap handles
#[derive(Clone)]
pub struct Context {
	scope: Object,
	lifecycle: Rc<Lifecycle>,
	directives: DirectiveTable,
	components: ComponentTable,
	app: Rc<AppState>,
}

impl Context {
	/// A root context over `scope`
	pub fn new(scope: Object, app: Rc<AppState>) -> Self {
		if !scope.has_own("$refs") {
			scope.define("$refs", Value::Object(Object::new_map()));
		}
		Self {
			scope,
			lifecycle: Rc::new(Lifecycle::default()),
			directives: Rc::new(RefCell::new(IndexMap::new())),
			components: Rc::new(RefCell::new(IndexMap::new())),
			app,
		}
	}

	pub fn scope(&self) -> &Object {
		&self.scope
	}

	/// Evaluation environment rooted at this context's scope
	pub fn env(&self) -> Env {
		object_env(&self.scope)
	}

	pub fn app(&self) -> &Rc<AppState> {
		&self.app
	}

	pub fn document(&self) -> &Document {
		self.app.document()
	}

	pub fn config(&self) -> &AppConfig {
		self.app.config()
	}

	/// The `$refs` object of this scope chain
	pub fn refs(&self) -> Option<Object> {
		self.scope.get_untracked("$refs").as_object().cloned()
	}

	/// Run `f` as an effect owned by this context
	///
	/// Ignored once the context has been torn down.
	pub fn effect<F>(&self, f: F)
	where
		F: FnMut() + 'static,
	{
		if self.is_torn_down() {
			return;
		}
		let effect = Effect::new(f);
		self.lifecycle.effects.borrow_mut().push(effect);
	}

	pub fn add_cleanup<F>(&self, f: F)
	where
		F: FnOnce() + 'static,
	{
		self.lifecycle.cleanups.borrow_mut().push(Box::new(f));
	}

	/// Tear down child blocks, stop effects, then run cleanups
	pub fn teardown(&self) {
		self.lifecycle.teardown();
	}

	pub fn is_torn_down(&self) -> bool {
		self.lifecycle.torn_down.get()
	}

	/// Number of child blocks currently tracked
	pub fn block_count(&self) -> usize {
		self.lifecycle.blocks.borrow().len()
	}

	/// Number of live effects owned by this context
	pub fn effect_count(&self) -> usize {
		self.lifecycle.effects.borrow().len()
	}

	pub(crate) fn lifecycle(&self) -> &Rc<Lifecycle> {
		&self.lifecycle
	}

	pub(crate) fn downgrade_lifecycle(&self) -> Weak<Lifecycle> {
		Rc::downgrade(&self.lifecycle)
	}

	pub fn directive(&self, name: &str) -> Option<Rc<dyn Directive>> {
		self.directives.borrow().get(name).cloned()
	}

	pub fn register_directive(&self, name: &str, directive: Rc<dyn Directive>) {
		self.directives
			.borrow_mut()
			.insert(name.to_string(), directive);
	}

	pub fn register_component(&self, name: &str, definition: Rc<ComponentDefinition>) {
		self.components
			.borrow_mut()
			.insert(name.to_string(), definition);
	}

	pub(crate) fn clear_components(&self) {
		self.components.borrow_mut().clear();
	}

	/// Find a component by tag name
	///
	/// Registered names match tags exactly, in kebab-case or ignoring case,
	/// so `MyButton`, `myButton` and `my-button` all resolve `<my-button>`.
	pub fn resolve_component(&self, tag: &str) -> Option<(String, Rc<ComponentDefinition>)> {
		let wanted = normalize_component_name(tag);
		self.components
			.borrow()
			.iter()
			.find(|(name, _)| normalize_component_name(name) == wanted)
			.map(|(name, def)| (name.clone(), def.clone()))
	}

	/// Same context with a component table extended by `local`
	///
	/// A local name shadows every ambient spelling of the same component.
	pub(crate) fn with_components(&self, local: &IndexMap<String, Rc<ComponentDefinition>>) -> Self {
		if local.is_empty() {
			return self.clone();
		}
		let shadowed: HashSet<String> = local.keys().map(|name| normalize_component_name(name)).collect();
		let mut merged = local.clone();
		for (name, def) in self.components.borrow().iter() {
			if !shadowed.contains(&normalize_component_name(name)) {
				merged.entry(name.clone()).or_insert_with(|| def.clone());
			}
		}
		Self {
			components: Rc::new(RefCell::new(merged)),
			..self.clone()
		}
	}

	/// Same registries and lifecycle over another scope
	pub(crate) fn with_scope(&self, scope: Object) -> Self {
		Self {
			scope,
			..self.clone()
		}
	}
}

fn normalize_component_name(name: &str) -> String {
	name.chars()
		.filter(|c| *c != '-' && *c != '_')
		.flat_map(char::to_lowercase)
		.collect()
}

/// A child context sharing the parent's scope with a fresh lifecycle
///
/// Without a parent, a root context over an empty scope in a fresh document.
pub fn create_context(parent: Option<&Context>) -> Context {
	match parent {
		Some(parent) => Context {
			lifecycle: Rc::new(Lifecycle::default()),
			..parent.clone()
		},
		None => Context::new(
			Object::new_map(),
			AppState::new(Document::new(), AppConfig::default()),
		),
	}
}

/// A context whose scope holds `data` and reads through to the parent scope
///
/// Writes to names declared in `data` stay local; writes to anything else
/// go to the parent. `$refs` inherits from the parent's so lookups climb
/// while registrations stay local. Functions in `data` are bound to the new
/// scope.
pub fn create_scoped_context(ctx: &Context, data: &Object) -> Context {
	let scope = Object::with_parent(ctx.scope());
	for (key, value) in data.entries() {
		scope.define(&key, value);
	}
	let refs = match ctx.refs() {
		Some(parent_refs) => Object::with_parent(&parent_refs),
		None => Object::new_map(),
	};
	scope.define("$refs", Value::Object(refs));
	bind_context_methods(&scope);
	ctx.with_scope(scope)
}

/// Bind every function stored directly on `scope` to it
pub fn bind_context_methods(scope: &Object) {
	for (key, value) in scope.entries() {
		if let Value::Function(f) = value {
			if !f.is_bound() {
				scope.define(&key, Value::Function(f.bind(scope)));
			}
		}
	}
}
