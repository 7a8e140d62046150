//! Component mounting.
//!
//! Mounting resolves the tag, builds an isolated instance scope and installs
//! a render effect on the component's context. The instance reaches its
//! parent only through `$parent`, `$refs`, props and `emit`. The effect
//! re-renders whenever the instance's `$template` changes, replacing
//! the previously rendered root in place.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll};

use futures::FutureExt;
use futures::channel::oneshot;
use indexmap::IndexMap;
use tendril_dom::Node;
use tendril_reactive::{Function, Object, Value, untrack};

use super::ComponentDefinition;
use super::props::{extract_props, prop_target};
use super::slots::{Slots, is_blank};
use super::style::{inject_component_style, scope_class};
use crate::context::{Context, bind_context_methods, create_context};
use crate::directive::{is_directive_attribute, parse_modifiers, process_directive};
use crate::eval::{self, Locals};
use crate::host::node_value;
use crate::shared::camelize;
use crate::walk::walk;

/// Completion handle of [`mount_component`]
///
/// Resolves once the first render has been committed and the `mounted`
/// hook has run. Tags that are not registered components resolve
/// immediately without an instance.
pub struct Mounted {
	instance: Option<Object>,
	ready: Option<oneshot::Receiver<()>>,
}

impl Mounted {
	fn unresolved() -> Self {
		Self {
			instance: None,
			ready: None,
		}
	}

	/// The instance scope, if a component was mounted
	pub fn instance(&self) -> Option<&Object> {
		self.instance.as_ref()
	}
}

impl Future for Mounted {
	type Output = ();

	fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<()> {
		let Some(ready) = self.ready.as_mut() else {
			return Poll::Ready(());
		};
		match ready.poll_unpin(cx) {
			// A dropped sender means the component was torn down before mounting
			Poll::Ready(_) => {
				self.ready = None;
				Poll::Ready(())
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Mount the component registered for `tag` in place of `el`
///
/// `root` is exposed to the instance as `$root`; without one the host's
/// parent element is used.
pub fn mount_component(ctx: &Context, el: &Node, tag: &str, root: Option<&Node>) -> Mounted {
	let Some((name, definition)) = ctx.resolve_component(tag) else {
		crate::debug_log!(tag, "not a registered component");
		return Mounted::unresolved();
	};
	crate::debug_log!(component = %name, "mounting component");

	let app = ctx.app().clone();
	let host_attributes: IndexMap<String, String> = el.attributes().into_iter().collect();
	let props = extract_props(el, &definition, ctx);
	let slots = Slots::capture(el);
	let ref_id = host_attributes
		.get("ref")
		.cloned()
		.unwrap_or_else(|| format!("{}{}", camelize(&name), app.next_instance_id()));
	let parent_refs = ctx.refs();

	let instance = Object::new_map();
	for (key, value) in definition.fields() {
		instance.define(key, value.clone());
	}
	for (key, value) in &props.values {
		instance.define(key, value.clone());
	}
	if let Some(Value::Object(data)) = definition.initial_data() {
		for (key, value) in data.entries() {
			instance.define(&key, value);
		}
	}
	for (key, method) in definition.methods() {
		instance.define(key, Value::Function(method.clone()));
	}

	let props_table = props.to_object();
	let root_value = root
		.cloned()
		.or_else(|| el.parent())
		.map_or(Value::Null, |node| node_value(&node));
	let refs = match &parent_refs {
		Some(parent) => Object::with_parent(parent),
		None => Object::new_map(),
	};
	instance.define("$ref", Value::from(ref_id.as_str()));
	instance.define("$props", Value::Object(props_table.clone()));
	instance.define("$template", Value::from(definition.template()));
	instance.define("$style", Value::from(definition.style_sheet()));
	instance.define("$slots", Value::Object(slots.to_object()));
	instance.define("$el", Value::Null);
	instance.define("$parent", Value::Object(ctx.scope().clone()));
	instance.define("$root", root_value);
	instance.define("$refs", Value::Object(refs));
	instance.define(
		"emit",
		Value::Function(emit_function(
			ctx,
			&instance,
			&ref_id,
			props.root_bindings.clone(),
			host_listeners(&host_attributes),
		)),
	);
	bind_context_methods(&instance);

	for (prop, exp) in &props.root_bindings {
		let env = ctx.env();
		let target = instance.downgrade();
		let table = props_table.clone();
		let (prop, exp) = (prop.clone(), exp.clone());
		ctx.effect(move || {
			let Ok(value) = eval::try_evaluate(&env, &exp) else {
				return;
			};
			if let Some(instance) = target.upgrade() {
				table.set(&prop, value.clone());
				instance.set(&prop, value);
			}
		});
	}

	let component_ctx = create_context(Some(ctx))
		.with_components(definition.components())
		.with_scope(instance.clone());
	{
		let component_ctx = component_ctx.clone();
		ctx.add_cleanup(move || component_ctx.teardown());
	}
	if let Some(refs) = parent_refs.clone() {
		let id = ref_id.clone();
		ctx.add_cleanup(move || {
			refs.delete(&id);
		});
	}

	let scope_class = definition.style_sheet().map(|css| {
		inject_component_style(&app, &name, css);
		scope_class(&name)
	});

	let current_render: Rc<RefCell<Option<Context>>> = Rc::new(RefCell::new(None));
	{
		let current_render = current_render.clone();
		component_ctx.add_cleanup(move || {
			if let Some(render_ctx) = current_render.borrow_mut().take() {
				render_ctx.teardown();
			}
		});
	}

	let (sender, receiver) = oneshot::channel();
	let mut renderer = Renderer {
		name,
		definition,
		instance: instance.clone(),
		slots,
		host_attributes,
		scope_class,
		parent: ctx.clone(),
		component_ctx: component_ctx.clone(),
		current_node: el.clone(),
		current_render,
		ref_id,
		parent_refs,
		rendered: false,
		mounted: Some(sender),
	};
	let template_source = instance.downgrade();
	component_ctx.effect(move || {
		let Some(instance) = template_source.upgrade() else {
			return;
		};
		let template = instance.get("$template").to_js_string();
		untrack(|| renderer.render(&template));
	});

	Mounted {
		instance: Some(instance),
		ready: Some(receiver),
	}
}

struct Renderer {
	name: String,
	definition: Rc<ComponentDefinition>,
	instance: Object,
	slots: Slots,
	host_attributes: IndexMap<String, String>,
	scope_class: Option<String>,
	parent: Context,
	component_ctx: Context,
	current_node: Node,
	current_render: Rc<RefCell<Option<Context>>>,
	ref_id: String,
	parent_refs: Option<Object>,
	rendered: bool,
	mounted: Option<oneshot::Sender<()>>,
}

impl Renderer {
	fn render(&mut self, template: &str) {
		let root = match build_root(template) {
			Ok(root) => root,
			Err(err) => {
				crate::error_log!(component = %self.name, error = %err, "invalid component template");
				// Nothing will mount; release whoever awaits it
				self.mounted.take();
				return;
			}
		};
		if let Some(previous) = self.current_render.borrow_mut().take() {
			previous.teardown();
		}
		let render_ctx = create_context(Some(&self.component_ctx));
		*self.current_render.borrow_mut() = Some(render_ctx.clone());
		let host_ctx = render_ctx.with_scope(self.parent.scope().clone());

		let mut host_directives = Vec::new();
		for (attribute, value) in &self.host_attributes {
			if attribute == "ref" || self.definition.has_prop(&prop_target(attribute).0) {
				continue;
			}
			if is_directive_attribute(attribute) {
				host_directives.push((attribute.clone(), value.clone()));
			} else if attribute == "class" {
				for class in value.split_whitespace() {
					root.add_class(class);
				}
			} else {
				root.set_attribute(attribute, value);
			}
		}
		if let Some(class) = &self.scope_class {
			root.add_class(class);
		}

		let first_render = !self.rendered;
		self.rendered = true;
		self.instance.define("$el", node_value(&root));
		if first_render {
			if let Some(hook) = self.definition.created_hook() {
				hook(&self.instance);
			}
		}

		walk(&root, &render_ctx);
		self.slots.render(&root, &self.instance, &host_ctx);
		for (attribute, value) in &host_directives {
			process_directive(&root, attribute, value, &host_ctx);
		}

		if let Err(err) = self.current_node.replace_with(&root) {
			crate::warn_log!(component = %self.name, error = %err, "failed to place rendered component");
		}
		self.current_node = root;
		if let Some(refs) = &self.parent_refs {
			refs.define(&self.ref_id, Value::Object(self.instance.clone()));
		}

		if first_render {
			if let Some(hook) = self.definition.mounted_hook() {
				hook(&self.instance);
			}
			if let Some(sender) = self.mounted.take() {
				let _ = sender.send(());
			}
			crate::debug_log!(component = %self.name, "component mounted");
		}
	}
}

/// The single element root of `template`, or a `<div>` wrapping everything
fn build_root(template: &str) -> tendril_dom::Result<Node> {
	let fragment = Node::parse_fragment(template.trim())?;
	let elements = fragment.element_children();
	let only_element = fragment
		.children()
		.iter()
		.all(|child| child.kind() == tendril_dom::NodeKind::Element || is_blank(child));
	if elements.len() == 1 && only_element {
		let root = elements[0].clone();
		root.remove();
		return Ok(root);
	}
	let wrapper = Node::element("div");
	wrapper.append_child(&fragment)?;
	Ok(wrapper)
}

/// `@name` / `v-on:name` handlers declared on the host, by event name
fn host_listeners(attributes: &IndexMap<String, String>) -> IndexMap<String, String> {
	attributes
		.iter()
		.filter_map(|(attribute, handler)| {
			let (bare, _) = parse_modifiers(attribute);
			let event = bare
				.strip_prefix('@')
				.or_else(|| bare.strip_prefix("v-on:"))
				.or_else(|| bare.strip_prefix("c-on:"))?;
			Some((event.to_string(), handler.clone()))
		})
		.collect()
}

/// `emit(name, payload)` for one instance
///
/// A name bound as a dynamic prop writes `payload` back to the parent
/// expression; otherwise the host's handler for `name` runs in the parent
/// scope with `$event` set to `payload`.
fn emit_function(
	parent: &Context,
	instance: &Object,
	ref_id: &str,
	root_bindings: IndexMap<String, String>,
	listeners: IndexMap<String, String>,
) -> Function {
	let parent_env = parent.env();
	let parent_refs = parent.refs();
	let instance = instance.downgrade();
	let ref_id = ref_id.to_string();
	Function::new("emit", move |_, args| {
		let event = args.first().map(Value::to_js_string).unwrap_or_default();
		let payload = args.get(1).cloned().unwrap_or_default();
		if let Some(target) = root_bindings.get(&event) {
			if let (Some(refs), Some(instance)) = (&parent_refs, instance.upgrade()) {
				refs.define(&ref_id, Value::Object(instance));
			}
			if let Err(err) = eval::assign(&parent_env, target, payload) {
				crate::warn_log!(event, binding = %target, error = %err, "failed to write prop back to parent");
			}
		} else if let Some(handler) = listeners.get(&event) {
			let source = if eval::is_simple_path(handler) {
				format!("{handler}($event)")
			} else {
				handler.clone()
			};
			let env = Locals::new([("$event", payload)], parent_env.clone());
			eval::execute(&env, &source);
		} else {
			crate::debug_log!(event, "emitted event has no listener");
		}
		Value::Undefined
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::executor::block_on;
	use rstest::rstest;
	use serde_json::json;
	use serial_test::serial;
	use std::cell::Cell;
	use tendril_reactive::run_microtasks;

	fn host_in(html: &str) -> (Node, Node) {
		let container = Node::element("div");
		container.set_inner_html(html).unwrap();
		let host = container.first_child().unwrap();
		(container, host)
	}

	fn increment(this: &Value, _: &[Value]) -> Value {
		if let Some(instance) = this.as_object() {
			let count = instance.get("count").to_number();
			instance.set("count", Value::from(count + 1.0));
		}
		Value::Undefined
	}

	#[rstest]
	#[serial]
	fn test_unknown_tag_resolves_without_instance() {
		let ctx = create_context(None);
		let (_, host) = host_in("<nothing-here></nothing-here>");
		let mounted = mount_component(&ctx, &host, "nothing-here", None);
		assert!(mounted.instance().is_none());
		block_on(mounted);
	}

	#[rstest]
	#[serial]
	fn test_mount_replaces_host_and_renders_props() {
		let ctx = create_context(None);
		ctx.scope().set("title", Value::from("Hi"));
		ctx.register_component(
			"card-title",
			Rc::new(ComponentDefinition::new("<h2>{{ label }}!</h2>").prop("label", "none")),
		);
		let (container, host) = host_in(r#"<card-title :label="title" class="big" ref="head"></card-title>"#);

		let mounted = mount_component(&ctx, &host, "card-title", None);

		assert_eq!(container.inner_html(), r#"<h2 class="big">Hi!</h2>"#);
		let instance = mounted.instance().unwrap().clone();
		assert_eq!(instance.get("label"), Value::from("Hi"));
		assert!(ctx.refs().unwrap().get("head").as_object().unwrap().ptr_eq(&instance));
		block_on(mounted);

		ctx.scope().set("title", Value::from("Bye"));
		run_microtasks();
		assert_eq!(container.text_content(), "Bye!");
		assert_eq!(
			instance.get("$props").as_object().unwrap().get("label"),
			Value::from("Bye")
		);
	}

	#[rstest]
	#[serial]
	fn test_methods_update_instance_state() {
		let ctx = create_context(None);
		ctx.register_component(
			"click-counter",
			Rc::new(
				ComponentDefinition::new(r#"<button @click="inc">{{ count }}</button>"#)
					.data(|| json!({ "count": 0 }))
					.method("inc", increment),
			),
		);
		let (container, host) = host_in("<click-counter></click-counter>");
		mount_component(&ctx, &host, "click-counter", None);

		let button = container.first_child().unwrap();
		button.click();
		button.click();
		run_microtasks();

		assert_eq!(button.text_content(), "2");
		assert!(!ctx.scope().has_own("count"));
	}

	#[rstest]
	#[serial]
	fn test_instance_writes_stay_on_the_instance() {
		let ctx = create_context(None);
		ctx.scope().set("shared", Value::from("parent"));
		ctx.register_component(
			"scratch-pad",
			Rc::new(
				ComponentDefinition::new(r#"<button @click="note = 'clicked'">{{ note }}</button>"#)
					.created(|instance| instance.set("scratch", Value::from(42))),
			),
		);
		let (container, host) = host_in("<scratch-pad></scratch-pad>");
		let mounted = mount_component(&ctx, &host, "scratch-pad", None);
		let instance = mounted.instance().unwrap().clone();

		container.first_child().unwrap().click();
		run_microtasks();

		assert_eq!(instance.get("scratch"), Value::from(42));
		assert_eq!(instance.get("note"), Value::from("clicked"));
		assert!(!ctx.scope().has_own("scratch"));
		assert!(!ctx.scope().has_own("note"));
		assert!(!instance.has("shared"));
		assert!(instance.get("$parent").as_object().unwrap().ptr_eq(ctx.scope()));
	}

	#[rstest]
	#[serial]
	fn test_unparsable_first_template_releases_mount_handle() {
		let ctx = create_context(None);
		let hooks = Rc::new(Cell::new(0));
		let (created, mounted_count) = (hooks.clone(), hooks.clone());
		ctx.register_component(
			"broken-box",
			Rc::new(
				ComponentDefinition::new("<p>x</p><!-- never closed")
					.created(move |_| created.set(created.get() + 1))
					.mounted(move |_| mounted_count.set(mounted_count.get() + 10)),
			),
		);
		let (container, host) = host_in("<broken-box></broken-box>");

		let mounted = mount_component(&ctx, &host, "broken-box", None);
		let instance = mounted.instance().unwrap().clone();
		block_on(mounted);
		assert_eq!(hooks.get(), 0);
		assert_eq!(container.inner_html(), "<broken-box></broken-box>");

		instance.set("$template", Value::from("<p>fixed</p>"));
		run_microtasks();
		assert_eq!(container.inner_html(), "<p>fixed</p>");
		assert_eq!(hooks.get(), 11);
	}

	#[rstest]
	#[serial]
	fn test_emit_writes_bound_prop_back_to_parent() {
		let ctx = create_context(None);
		ctx.scope().set("total", Value::from(1));
		ctx.register_component(
			"stepper",
			Rc::new(
				ComponentDefinition::new(r#"<button @click="emit('value', value + 1)">+</button>"#)
					.prop("value", 0),
			),
		);
		let (container, host) = host_in(r#"<stepper :value="total"></stepper>"#);
		let mounted = mount_component(&ctx, &host, "stepper", None);

		container.first_child().unwrap().click();
		run_microtasks();

		assert_eq!(ctx.scope().get("total"), Value::from(2));
		assert_eq!(mounted.instance().unwrap().get("value"), Value::from(2));
	}

	#[rstest]
	#[serial]
	fn test_emit_runs_host_listener_with_payload() {
		let ctx = create_context(None);
		ctx.scope().set("last", Value::Null);
		ctx.register_component(
			"picker",
			Rc::new(ComponentDefinition::new(r#"<a @click="emit('pick', 'b')">pick</a>"#)),
		);
		let (container, host) = host_in(r#"<picker @pick="last = $event"></picker>"#);
		mount_component(&ctx, &host, "picker", None);

		container.first_child().unwrap().click();

		assert_eq!(ctx.scope().get("last"), Value::from("b"));
	}

	#[rstest]
	#[serial]
	fn test_slots_render_with_parent_scope() {
		let ctx = create_context(None);
		ctx.scope().set("who", Value::from("parent"));
		ctx.register_component(
			"panel",
			Rc::new(
				ComponentDefinition::new(r#"<section><header><slot name="title"></slot></header><slot></slot></section>"#)
					.data(|| json!({ "who": "child" })),
			),
		);
		let (container, host) = host_in(
			r#"<panel><template slot="title">T</template><p>{{ who }}</p></panel>"#,
		);

		mount_component(&ctx, &host, "panel", None);

		assert_eq!(
			container.inner_html(),
			"<section><header>T</header><p>parent</p></section>"
		);
	}

	#[rstest]
	#[serial]
	fn test_hooks_run_in_order_once() {
		let ctx = create_context(None);
		let log = Rc::new(RefCell::new(Vec::new()));
		let (created_log, mounted_log) = (log.clone(), log.clone());
		ctx.register_component(
			"hooked",
			Rc::new(
				ComponentDefinition::new("<p>{{ n }}</p>")
					.field("n", 1)
					.created(move |instance| {
						created_log.borrow_mut().push(format!("created {}", instance.get("n").to_js_string()));
					})
					.mounted(move |instance| {
						let placed = instance.get("$el").is_nullish();
						mounted_log.borrow_mut().push(format!("mounted {}", !placed));
					}),
			),
		);
		let (_, host) = host_in("<hooked></hooked>");
		let mounted = mount_component(&ctx, &host, "hooked", None);

		let instance = mounted.instance().unwrap().clone();
		instance.set("$template", Value::from("<p>again</p>"));
		run_microtasks();

		assert_eq!(*log.borrow(), vec!["created 1".to_string(), "mounted true".to_string()]);
	}

	#[rstest]
	#[serial]
	fn test_template_change_rerenders_in_place() {
		let ctx = create_context(None);
		ctx.register_component("swap", Rc::new(ComponentDefinition::new("<p>one</p>")));
		let (container, host) = host_in("<swap></swap><hr>");
		let mounted = mount_component(&ctx, &host, "swap", None);

		mounted
			.instance()
			.unwrap()
			.set("$template", Value::from("<b>two</b>"));
		run_microtasks();

		assert_eq!(container.inner_html(), "<b>two</b><hr>");
	}

	#[rstest]
	#[serial]
	fn test_scoped_style_and_class() {
		let ctx = create_context(None);
		ctx.register_component(
			"fancy-box",
			Rc::new(ComponentDefinition::new("<div>x</div>").styles(".$scope { color: red }")),
		);
		let (container, host) = host_in("<fancy-box></fancy-box><fancy-box></fancy-box>");
		let second = host.next_sibling().unwrap();

		mount_component(&ctx, &host, "fancy-box", None);
		mount_component(&ctx, &second, "fancy-box", None);

		assert_eq!(
			container.inner_html(),
			r#"<div class="scope-fancyBox">x</div><div class="scope-fancyBox">x</div>"#
		);
		assert!(ctx.app().has_style("style-fancyBox"));
	}

	#[rstest]
	#[serial]
	fn test_local_components_and_multi_root_wrapper() {
		let ctx = create_context(None);
		ctx.register_component(
			"outer-list",
			Rc::new(
				ComponentDefinition::new("<inner-item></inner-item><inner-item></inner-item>")
					.component("inner-item", ComponentDefinition::new("<i>i</i>")),
			),
		);
		let (container, host) = host_in("<outer-list></outer-list>");

		mount_component(&ctx, &host, "outer-list", None);

		assert_eq!(container.inner_html(), "<div><i>i</i><i>i</i></div>");
		assert!(ctx.resolve_component("inner-item").is_none());
	}

	#[rstest]
	#[serial]
	fn test_teardown_stops_updates_and_drops_ref() {
		let ctx = create_context(None);
		let renders = Rc::new(Cell::new(0));
		let counter = renders.clone();
		ctx.scope().set("text", Value::from("a"));
		ctx.register_component(
			"echo",
			Rc::new(
				ComponentDefinition::new("<p>{{ message }}</p>")
					.prop("message", "")
					.created(move |_| counter.set(counter.get() + 1)),
			),
		);
		let (container, host) = host_in(r#"<echo :message="text" ref="e"></echo>"#);
		mount_component(&ctx, &host, "echo", None);

		ctx.teardown();
		ctx.scope().set("text", Value::from("b"));
		run_microtasks();

		assert_eq!(container.text_content(), "a");
		assert!(!ctx.refs().unwrap().has_own("e"));
		assert_eq!(renders.get(), 1);
	}

	#[rstest]
	fn test_host_listeners_strip_modifiers() {
		let mut attributes = IndexMap::new();
		attributes.insert("@save.once".to_string(), "onSave".to_string());
		attributes.insert("v-on:close".to_string(), "open = false".to_string());
		attributes.insert("title".to_string(), "x".to_string());

		let listeners = host_listeners(&attributes);

		assert_eq!(listeners.len(), 2);
		assert_eq!(listeners["save"], "onSave");
		assert_eq!(listeners["close"], "open = false");
	}
}
