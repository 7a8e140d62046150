//! Component definitions.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tendril_reactive::{Function, Object, Value};

/// Lifecycle hook; receives the component instance
pub type Hook = Rc<dyn Fn(&Object)>;

/// Produces the initial `data` of each instance
pub type DataFactory = Rc<dyn Fn() -> serde_json::Value>;

/// Everything needed to mount a component, built fluently
///
/// ```ignore
/// let counter = ComponentDefinition::new("<button @click=\"count++\">{{ label }} {{ count }}</button>")
///     .prop("label", "Clicks")
///     .data(|| json!({ "count": 0 }));
/// ```
#[derive(Clone)]
pub struct ComponentDefinition {
	template: String,
	styles: Option<String>,
	props: IndexMap<String, Value>,
	fields: IndexMap<String, Value>,
	data: Option<DataFactory>,
	methods: IndexMap<String, Function>,
	components: IndexMap<String, Rc<ComponentDefinition>>,
	created: Option<Hook>,
	mounted: Option<Hook>,
}

impl ComponentDefinition {
	pub fn new(template: impl Into<String>) -> Self {
		Self {
			template: template.into(),
			styles: None,
			props: IndexMap::new(),
			fields: IndexMap::new(),
			data: None,
			methods: IndexMap::new(),
			components: IndexMap::new(),
			created: None,
			mounted: None,
		}
	}

	/// Stylesheet injected once per component type
	///
	/// The configured scope token (`.$scope` by default) is rewritten to the
	/// component's scope class.
	pub fn styles(mut self, css: impl Into<String>) -> Self {
		self.styles = Some(css.into());
		self
	}

	/// Declare a prop; `Value::Undefined` as default means `null`
	pub fn prop(mut self, name: &str, default: impl Into<Value>) -> Self {
		self.props.insert(name.to_string(), default.into());
		self
	}

	/// A plain field copied onto every instance
	pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
		self.fields.insert(name.to_string(), value.into());
		self
	}

	pub fn data<F>(mut self, factory: F) -> Self
	where
		F: Fn() -> serde_json::Value + 'static,
	{
		self.data = Some(Rc::new(factory));
		self
	}

	/// A method; `this` is the instance once mounted
	pub fn method<F>(mut self, name: &str, f: F) -> Self
	where
		F: Fn(&Value, &[Value]) -> Value + 'static,
	{
		self.methods.insert(name.to_string(), Function::new(name, f));
		self
	}

	/// A nested component only visible inside this one's template
	pub fn component(mut self, name: &str, definition: ComponentDefinition) -> Self {
		self.components
			.insert(name.to_string(), Rc::new(definition));
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

	pub fn template(&self) -> &str {
		&self.template
	}

	pub fn style_sheet(&self) -> Option<&str> {
		self.styles.as_deref()
	}

	pub fn props(&self) -> &IndexMap<String, Value> {
		&self.props
	}

	pub fn has_prop(&self, name: &str) -> bool {
		self.props.contains_key(name)
	}

	pub fn fields(&self) -> &IndexMap<String, Value> {
		&self.fields
	}

	pub fn methods(&self) -> &IndexMap<String, Function> {
		&self.methods
	}

	pub fn components(&self) -> &IndexMap<String, Rc<ComponentDefinition>> {
		&self.components
	}

	/// Fresh result of the data factory, if any
	pub(crate) fn initial_data(&self) -> Option<Value> {
		self.data.as_ref().map(|factory| Value::from_json(factory()))
	}

	pub(crate) fn created_hook(&self) -> Option<&Hook> {
		self.created.as_ref()
	}

	pub(crate) fn mounted_hook(&self) -> Option<&Hook> {
		self.mounted.as_ref()
	}
}

impl fmt::Debug for ComponentDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentDefinition")
			.field("template", &self.template)
			.field("styles", &self.styles)
			.field("props", &self.props.keys().collect::<Vec<_>>())
			.field("methods", &self.methods.keys().collect::<Vec<_>>())
			.field("components", &self.components.keys().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}
