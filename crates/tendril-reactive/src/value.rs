//! Dynamic values flowing through scopes and expressions.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde_json::Number;

use crate::object::{Object, WeakObject};

/// Native function signature: `(this, arguments) -> result`
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Value;

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
	/// Absent value
	#[default]
	Undefined,
	/// Explicit null
	Null,
	/// Boolean
	Bool(bool),
	/// IEEE-754 number
	Number(f64),
	/// Immutable string
	String(Rc<str>),
	/// Observable map or array
	Object(Object),
	/// Callable
	Function(Function),
	/// Opaque host handle (DOM node, event, ...) compared by identity
	Host(HostRef),
}

impl Value {
	/// Build a string value
	pub fn str(s: &str) -> Self {
		Value::String(Rc::from(s))
	}

	/// `undefined`
	pub fn is_undefined(&self) -> bool {
		matches!(self, Value::Undefined)
	}

	/// `null` or `undefined`
	pub fn is_nullish(&self) -> bool {
		matches!(self, Value::Undefined | Value::Null)
	}

	/// Truthiness: `false`, `0`, `NaN`, `""`, `null` and `undefined` are falsy
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Undefined | Value::Null => false,
			Value::Bool(b) => *b,
			Value::Number(n) => *n != 0.0 && !n.is_nan(),
			Value::String(s) => !s.is_empty(),
			Value::Object(_) | Value::Function(_) | Value::Host(_) => true,
		}
	}

	pub fn as_object(&self) -> Option<&Object> {
		match self {
			Value::Object(o) => Some(o),
			_ => None,
		}
	}

	pub fn as_function(&self) -> Option<&Function> {
		match self {
			Value::Function(f) => Some(f),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Value::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_host(&self) -> Option<&HostRef> {
		match self {
			Value::Host(h) => Some(h),
			_ => None,
		}
	}

	/// `typeof` result
	pub fn type_of(&self) -> &'static str {
		match self {
			Value::Undefined => "undefined",
			Value::Null | Value::Object(_) | Value::Host(_) => "object",
			Value::Bool(_) => "boolean",
			Value::Number(_) => "number",
			Value::String(_) => "string",
			Value::Function(_) => "function",
		}
	}

	/// Numeric conversion
	pub fn to_number(&self) -> f64 {
		match self {
			Value::Undefined => f64::NAN,
			Value::Null => 0.0,
			Value::Bool(b) => f64::from(u8::from(*b)),
			Value::Number(n) => *n,
			Value::String(s) => parse_number(s),
			Value::Object(_) => parse_number(&self.to_js_string()),
			Value::Function(_) | Value::Host(_) => f64::NAN,
		}
	}

	/// String conversion
	pub fn to_js_string(&self) -> String {
		match self {
			Value::Undefined => "undefined".to_string(),
			Value::Null => "null".to_string(),
			Value::Bool(b) => b.to_string(),
			Value::Number(n) => format_number(*n),
			Value::String(s) => s.to_string(),
			Value::Object(o) if o.is_array() => o
				.items()
				.iter()
				.map(|item| {
					if item.is_nullish() {
						String::new()
					} else {
						item.to_js_string()
					}
				})
				.collect::<Vec<_>>()
				.join(","),
			Value::Object(_) => "[object Object]".to_string(),
			Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
			Value::Host(_) => "[object Host]".to_string(),
		}
	}

	/// Text shown for an interpolation
	///
	/// Nullish values render empty, objects render as indented JSON.
	pub fn to_display_string(&self) -> String {
		match self {
			Value::Undefined | Value::Null => String::new(),
			Value::Object(o) => {
				serde_json::to_string_pretty(&o.to_json()).unwrap_or_else(|_| self.to_js_string())
			}
			other => other.to_js_string(),
		}
	}

	/// Change detection used by writes
	///
	/// Identity for objects, functions and host handles; value equality for
	/// primitives. `NaN` is the same as `NaN` so rewriting it is not a change.
	pub fn same(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
			_ => self.strict_eq(other),
		}
	}

	/// `===`
	pub fn strict_eq(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a == b,
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
			(Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
			(Value::Host(a), Value::Host(b)) => a.identity() == b.identity(),
			_ => false,
		}
	}

	/// `==`
	pub fn loose_eq(&self, other: &Value) -> bool {
		match (self, other) {
			(a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
			(Value::Number(_), Value::String(_))
			| (Value::String(_), Value::Number(_))
			| (Value::Bool(_), _)
			| (_, Value::Bool(_)) => self.to_number() == other.to_number(),
			(Value::Object(_), Value::String(_) | Value::Number(_))
			| (Value::String(_) | Value::Number(_), Value::Object(_)) => {
				self.to_js_string() == other.to_js_string()
			}
			_ => self.strict_eq(other),
		}
	}

	/// Convert JSON into a value
	///
	/// Maps and arrays become observable objects whose nested containers are
	/// wrapped lazily on first read.
	pub fn from_json(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
			serde_json::Value::String(s) => Value::String(Rc::from(s)),
			container => Value::Object(Object::from_json(container)),
		}
	}

	/// Snapshot as JSON
	///
	/// Functions and host handles become `null`; `undefined` becomes `null`.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Undefined | Value::Null | Value::Function(_) | Value::Host(_) => {
				serde_json::Value::Null
			}
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Number(n) => number_to_json(*n),
			Value::String(s) => serde_json::Value::String(s.to_string()),
			Value::Object(o) => o.to_json(),
		}
	}
}

pub(crate) fn number_to_json(n: f64) -> serde_json::Value {
	if n.fract() == 0.0 && n.abs() < 9.0e15 {
		serde_json::Value::Number(Number::from(n as i64))
	} else {
		Number::from_f64(n)
			.map(serde_json::Value::Number)
			.unwrap_or(serde_json::Value::Null)
	}
}

fn parse_number(s: &str) -> f64 {
	let trimmed = s.trim();
	if trimmed.is_empty() {
		return 0.0;
	}
	match trimmed {
		"Infinity" | "+Infinity" => f64::INFINITY,
		"-Infinity" => f64::NEG_INFINITY,
		_ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
	}
}

/// Format a number the way it is displayed in templates
pub fn format_number(n: f64) -> String {
	if n.is_nan() {
		"NaN".to_string()
	} else if n.is_infinite() {
		let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
		text.to_string()
	} else if n == 0.0 {
		"0".to_string()
	} else if n.fract() == 0.0 && n.abs() < 1e21 {
		format!("{n:.0}")
	} else {
		n.to_string()
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Undefined => f.write_str("undefined"),
			Value::Null => f.write_str("null"),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Number(n) => f.write_str(&format_number(*n)),
			Value::String(s) => write!(f, "{s:?}"),
			Value::Object(o) => write!(f, "{o:?}"),
			Value::Function(func) => write!(f, "[Function {}]", func.name()),
			Value::Host(h) => write!(f, "[Host {:#x}]", h.identity()),
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		self.strict_eq(other)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<f64> for Value {
	fn from(n: f64) -> Self {
		Value::Number(n)
	}
}

impl From<i32> for Value {
	fn from(n: i32) -> Self {
		Value::Number(f64::from(n))
	}
}

impl From<u32> for Value {
	fn from(n: u32) -> Self {
		Value::Number(f64::from(n))
	}
}

impl From<usize> for Value {
	fn from(n: usize) -> Self {
		Value::Number(n as f64)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::str(s)
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(Rc::from(s))
	}
}

impl From<Rc<str>> for Value {
	fn from(s: Rc<str>) -> Self {
		Value::String(s)
	}
}

impl From<Object> for Value {
	fn from(o: Object) -> Self {
		Value::Object(o)
	}
}

impl From<Function> for Value {
	fn from(f: Function) -> Self {
		Value::Function(f)
	}
}

impl From<HostRef> for Value {
	fn from(h: HostRef) -> Self {
		Value::Host(h)
	}
}

impl From<serde_json::Value> for Value {
	fn from(json: serde_json::Value) -> Self {
		Value::from_json(json)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		v.map(Into::into).unwrap_or(Value::Null)
	}
}

/// A callable value
///
/// A function can be bound to an object once; later binds keep the first
/// receiver. The binding is weak so a scope holding its own bound methods does
/// not keep itself alive.
#[derive(Clone)]
pub struct Function {
	name: Rc<str>,
	f: Rc<NativeFn>,
	bound: Option<WeakObject>,
}

impl Function {
	/// Wrap a native closure
	pub fn new<F>(name: &str, f: F) -> Self
	where
		F: Fn(&Value, &[Value]) -> Value + 'static,
	{
		Self {
			name: Rc::from(name),
			f: Rc::new(f),
			bound: None,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Whether a receiver has been bound
	pub fn is_bound(&self) -> bool {
		self.bound.is_some()
	}

	/// Bind the receiver, unless one is already bound
	pub fn bind(&self, this: &Object) -> Self {
		if self.bound.is_some() {
			return self.clone();
		}
		Self {
			name: self.name.clone(),
			f: self.f.clone(),
			bound: Some(this.downgrade()),
		}
	}

	/// Call with `this` (ignored when bound) and arguments
	pub fn call(&self, this: &Value, args: &[Value]) -> Value {
		match &self.bound {
			Some(weak) => {
				let receiver = weak.upgrade().map(Value::Object).unwrap_or_default();
				(self.f)(&receiver, args)
			}
			None => (self.f)(this, args),
		}
	}

	/// Identity comparison (same closure, same receiver)
	pub fn ptr_eq(&self, other: &Function) -> bool {
		let same_fn = std::ptr::addr_eq(Rc::as_ptr(&self.f), Rc::as_ptr(&other.f));
		let same_receiver = match (&self.bound, &other.bound) {
			(None, None) => true,
			(Some(a), Some(b)) => a.ptr_eq(b),
			_ => false,
		};
		same_fn && same_receiver
	}
}

impl fmt::Debug for Function {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Function")
			.field("name", &self.name)
			.field("bound", &self.bound.is_some())
			.finish()
	}
}

/// Opaque host handle compared by identity
#[derive(Clone)]
pub struct HostRef {
	value: Rc<dyn Any>,
	identity: usize,
}

impl HostRef {
	/// Wrap a host value; identity is the new allocation
	pub fn new<T: Any>(value: T) -> Self {
		let value: Rc<dyn Any> = Rc::new(value);
		let identity = Rc::as_ptr(&value) as *const () as usize;
		Self { value, identity }
	}

	/// Wrap a host value whose identity is defined by the host
	///
	/// Two handles created for the same DOM node compare equal this way.
	pub fn with_identity<T: Any>(value: T, identity: usize) -> Self {
		Self {
			value: Rc::new(value),
			identity,
		}
	}

	pub fn identity(&self) -> usize {
		self.identity
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.value.downcast_ref::<T>()
	}
}

impl fmt::Debug for HostRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "HostRef({:#x})", self.identity)
	}
}
