//! App entry point - creates the root scope and mounts root blocks.
//!
//! An [`App`] owns everything that outlives a single block: the root
//! context, the component and directive registries, and the injected style
//! cache. Nothing is global; two apps over two documents never share state.
//!
//! ## Key Features
//!
//! - **Root discovery**: a target carrying `scope` is the only root;
//!   otherwise every outermost `[scope]` descendant is mounted, falling back
//!   to the target itself
//! - **Root scope**: initial data plus methods bound to the scope, with
//!   `$s`, `$nextTick` and `$refs`
//! - **Hooks**: `created` at creation, `mounted` after the roots are walked
//!
//! ## Example
//!
//! ```ignore
//! let app = create_app(
//!     AppOptions::new()
//!         .data(json!({ "count": 0 }))
//!         .method("inc", |this, _| { /* ... */ Value::Undefined })
//!         .document(document),
//! );
//! app.mount(MountTarget::Selector("#app".into()))?;
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tendril_dom::{Document, Node};
use tendril_reactive::{Function, Object, Value, next_tick, with_runtime};

use crate::block::Block;
use crate::component::{ComponentDefinition, Hook};
use crate::config::AppConfig;
use crate::context::{AppState, Context, bind_context_methods};
use crate::directive::Directive;
use crate::error::MountError;

const SCOPE_SELECTOR: &str = "[scope]";

/// Options for [`create_app`]
#[derive(Default)]
pub struct AppOptions {
	data: Option<serde_json::Value>,
	methods: IndexMap<String, Function>,
	components: IndexMap<String, ComponentDefinition>,
	created: Option<Hook>,
	mounted: Option<Hook>,
	config: AppConfig,
	document: Option<Document>,
}

impl AppOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Initial root data; non-object values are ignored
	pub fn data(mut self, data: serde_json::Value) -> Self {
		self.data = Some(data);
		self
	}

	/// A root method; `this` is the root scope
	pub fn method<F>(mut self, name: &str, f: F) -> Self
	where
		F: Fn(&Value, &[Value]) -> Value + 'static,
	{
		self.methods.insert(name.to_string(), Function::new(name, f));
		self
	}

	pub fn component(mut self, name: &str, definition: ComponentDefinition) -> Self {
		self.components.insert(name.to_string(), definition);
		self
	}

	pub fn created<F>(mut self, hook: F) -> Self
	where
		F: Fn(&Object) + 'static,
	{
		self.created = Some(Rc::new(hook));
		self
	}

	pub fn mounted<F>(mut self, hook: F) -> Self
	where
		F: Fn(&Object) + 'static,
	{
		self.mounted = Some(Rc::new(hook));
		self
	}

	pub fn config(mut self, config: AppConfig) -> Self {
		self.config = config;
		self
	}

	/// Document to mount into; defaults to an empty one
	pub fn document(mut self, document: Document) -> Self {
		self.document = Some(document);
		self
	}
}

/// What [`App::mount`] attaches to
#[derive(Debug, Clone)]
pub enum MountTarget {
	Selector(String),
	Element(Node),
	/// The document element
	Document,
}

/// A created application
pub struct App {
	ctx: Context,
	mounted: Option<Hook>,
	blocks: RefCell<Vec<Block>>,
}

/// Build the root scope and context, then run `created`
pub fn create_app(options: AppOptions) -> App {
	let AppOptions {
		data,
		methods,
		components,
		created,
		mounted,
		config,
		document,
	} = options;

	with_runtime(|rt| {
		rt.scheduler()
			.set_max_flush_iterations(config.max_flush_iterations)
	});

	let scope = data.map_or_else(Object::new_map, Object::from_json);
	for (name, method) in methods {
		scope.define(&name, Value::Function(method));
	}
	scope.define(
		"$s",
		Value::Function(Function::new("$s", |_, args| {
			Value::from(args.first().cloned().unwrap_or_default().to_display_string())
		})),
	);
	scope.define("$nextTick", Value::Function(next_tick_function()));
	scope.define("$refs", Value::Object(Object::new_map()));
	bind_context_methods(&scope);

	let app = AppState::new(document.unwrap_or_default(), config);
	let ctx = Context::new(scope, app);
	for (name, definition) in components {
		ctx.register_component(&name, Rc::new(definition));
	}
	if let Some(hook) = &created {
		hook(ctx.scope());
	}
	crate::debug_log!("app created");

	App {
		ctx,
		mounted,
		blocks: RefCell::new(Vec::new()),
	}
}

/// `$nextTick(callback)`: call `callback` with no arguments on the next tick
fn next_tick_function() -> Function {
	Function::new("$nextTick", |_, args| {
		if let Some(Value::Function(callback)) = args.first() {
			let callback = callback.clone();
			next_tick(move || {
				callback.call(&Value::Undefined, &[]);
			});
		}
		Value::Undefined
	})
}

impl App {
	pub fn scope(&self) -> &Object {
		self.ctx.scope()
	}

	pub fn context(&self) -> &Context {
		&self.ctx
	}

	pub fn document(&self) -> &Document {
		self.ctx.document()
	}

	/// Register a custom directive, usable as `v-<name>`
	pub fn directive(&self, name: &str, directive: Rc<dyn Directive>) -> &Self {
		self.ctx.register_directive(name, directive);
		self
	}

	pub fn component(&self, name: &str, definition: ComponentDefinition) -> &Self {
		self.ctx.register_component(name, Rc::new(definition));
		self
	}

	/// Walk every root under `target` as a root block, then run `mounted`
	pub fn mount(&self, target: MountTarget) -> Result<&Self, MountError> {
		let el = match target {
			MountTarget::Selector(selector) => match self.document().query_selector(&selector)? {
				Some(el) => el,
				None => {
					crate::error_log!(selector, "mount target not found");
					return Err(MountError::SelectorNotFound(selector));
				}
			},
			MountTarget::Element(el) => el,
			MountTarget::Document => self.document().document_element().clone(),
		};

		let roots = find_roots(&el)?;
		crate::info_log!(roots = roots.len(), "mounting app");
		let blocks: Vec<Block> = roots
			.iter()
			.map(|root| Block::new(root, &self.ctx, true))
			.collect();
		self.blocks.borrow_mut().extend(blocks);

		if let Some(hook) = &self.mounted {
			hook(self.ctx.scope());
		}
		Ok(self)
	}

	/// Tear down every root block and drop injected styles and registrations
	pub fn unmount(&self) {
		for block in self.blocks.borrow_mut().drain(..) {
			block.teardown();
		}
		self.ctx.teardown();
		self.ctx.app().clear_styles();
		self.ctx.clear_components();
		crate::info_log!("app unmounted");
	}

	/// Number of mounted root blocks
	pub fn root_count(&self) -> usize {
		self.blocks.borrow().len()
	}
}

/// Roots under `el`: `el` itself if marked, else its outermost marked
/// descendants, else `el`
fn find_roots(el: &Node) -> Result<Vec<Node>, MountError> {
	if el.has_attribute("scope") {
		return Ok(vec![el.clone()]);
	}
	let mut roots = Vec::new();
	for candidate in el.query_selector_all(SCOPE_SELECTOR)? {
		let nested = match candidate.parent() {
			Some(parent) => parent.closest(SCOPE_SELECTOR)?.is_some(),
			None => false,
		};
		if !nested {
			roots.push(candidate);
		}
	}
	if roots.is_empty() {
		roots.push(el.clone());
	}
	Ok(roots)
}
