//! Observable objects - the Reactive Store.
//!
//! [`Object`] is an explicit observable wrapper around a keyed map or an array.
//! Every consumer goes through its accessors:
//!
//! - [`Object::get`] inside a running effect records a subscription on
//!   `(object, key)`; outside any effect it is a plain read
//! - [`Object::set`] compares against the previous value and, when it changed,
//!   notifies the subscribers of exactly that pair
//! - array mutators ([`push`](Object::push), [`pop`](Object::pop),
//!   [`shift`](Object::shift), [`unshift`](Object::unshift),
//!   [`splice`](Object::splice), [`sort`](Object::sort),
//!   [`reverse`](Object::reverse)) notify the container once per call
//!
//! Nested JSON containers are kept raw until first read, then wrapped and
//! cached in place so repeated reads return the same object.
//!
//! A map may carry a parent object. Reads that miss locally continue in the
//! parent; writes to keys that are not present locally go to the parent. This
//! is how scoped contexts inherit from and hoist into their enclosing scope.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::{ReactiveError, Result};
use crate::runtime::{Key, NodeId, try_with_runtime, with_runtime};
use crate::value::Value;

/// Watcher callback: `(new_value, old_value)`
pub type WatchFn = dyn Fn(&Value, &Value);

#[derive(Clone)]
enum Slot {
	Raw(serde_json::Value),
	Live(Value),
}

impl Slot {
	fn from_json(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Object(_) | serde_json::Value::Array(_) => Slot::Raw(json),
			primitive => Slot::Live(Value::from_json(primitive)),
		}
	}

	/// Materializes a raw nested container, caching the wrapper in place.
	fn resolve(&mut self) -> Value {
		let value = match self {
			Slot::Live(value) => return value.clone(),
			Slot::Raw(json) => Value::from_json(std::mem::take(json)),
		};
		*self = Slot::Live(value.clone());
		value
	}
}

enum ObjectData {
	Map(IndexMap<Rc<str>, Slot>),
	Array(Vec<Slot>),
}

struct ObjectInner {
	id: NodeId,
	data: RefCell<ObjectData>,
	parent: Option<Object>,
	watchers: RefCell<Vec<(Rc<str>, Rc<WatchFn>)>>,
}

impl Drop for ObjectInner {
	fn drop(&mut self) {
		let _ = try_with_runtime(|rt| rt.remove_source(self.id));
	}
}

/// Observable map or array handle; clones share the same object
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

/// Non-owning handle to an [`Object`]
#[derive(Clone)]
pub struct WeakObject(Weak<ObjectInner>);

impl WeakObject {
	pub fn upgrade(&self) -> Option<Object> {
		self.0.upgrade().map(Object)
	}

	pub fn ptr_eq(&self, other: &WeakObject) -> bool {
		Weak::ptr_eq(&self.0, &other.0)
	}
}

fn array_index(key: &str) -> Option<usize> {
	if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	key.parse().ok()
}

impl Object {
	fn from_data(data: ObjectData, parent: Option<Object>) -> Self {
		Self(Rc::new(ObjectInner {
			id: NodeId::new(),
			data: RefCell::new(data),
			parent,
			watchers: RefCell::new(Vec::new()),
		}))
	}

	/// Create an empty map
	pub fn new_map() -> Self {
		Self::from_data(ObjectData::Map(IndexMap::new()), None)
	}

	/// Create an array holding `items`
	pub fn new_array(items: Vec<Value>) -> Self {
		Self::from_data(
			ObjectData::Array(items.into_iter().map(Slot::Live).collect()),
			None,
		)
	}

	/// Create an empty map that reads through to (and hoists new keys into) `parent`
	pub fn with_parent(parent: &Object) -> Self {
		Self::from_data(ObjectData::Map(IndexMap::new()), Some(parent.clone()))
	}

	/// Create a map from key/value pairs
	pub fn from_entries<K, I>(entries: I) -> Self
	where
		K: AsRef<str>,
		I: IntoIterator<Item = (K, Value)>,
	{
		let map = entries
			.into_iter()
			.map(|(k, v)| (Rc::from(k.as_ref()), Slot::Live(v)))
			.collect();
		Self::from_data(ObjectData::Map(map), None)
	}

	/// Wrap a JSON container; nested containers are wrapped on first read
	///
	/// Non-container JSON yields an empty map.
	pub fn from_json(json: serde_json::Value) -> Self {
		let data = match json {
			serde_json::Value::Object(map) => ObjectData::Map(
				map.into_iter()
					.map(|(k, v)| (Rc::from(k.as_str()), Slot::from_json(v)))
					.collect(),
			),
			serde_json::Value::Array(items) => {
				ObjectData::Array(items.into_iter().map(Slot::from_json).collect())
			}
			_ => ObjectData::Map(IndexMap::new()),
		};
		Self::from_data(data, None)
	}

	/// Identity of this object in the dependency graph
	pub fn id(&self) -> NodeId {
		self.0.id
	}

	pub fn downgrade(&self) -> WeakObject {
		WeakObject(Rc::downgrade(&self.0))
	}

	pub fn ptr_eq(&self, other: &Object) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub fn is_array(&self) -> bool {
		matches!(*self.0.data.borrow(), ObjectData::Array(_))
	}

	/// The object reads fall back to
	pub fn parent(&self) -> Option<&Object> {
		self.0.parent.as_ref()
	}

	fn track(&self, key: &Key) {
		with_runtime(|rt| rt.track(self.0.id, key));
	}

	fn trigger(&self, key: &Key) {
		with_runtime(|rt| rt.trigger(self.0.id, key));
	}

	fn read_own(&self, key: &str) -> Option<Value> {
		let mut data = self.0.data.borrow_mut();
		match &mut *data {
			ObjectData::Map(map) => map.get_mut(key).map(Slot::resolve),
			ObjectData::Array(items) => {
				if key == "length" {
					return Some(Value::from(items.len()));
				}
				array_index(key)
					.and_then(|i| items.get_mut(i))
					.map(Slot::resolve)
			}
		}
	}

	/// Tracked read; continues into the parent when the key is not local
	pub fn get(&self, key: &str) -> Value {
		if self.is_array() {
			self.track(&Key::Items);
			return self.read_own(key).unwrap_or_default();
		}
		self.track(&Key::prop(key));
		match self.read_own(key) {
			Some(value) => value,
			None => match &self.0.parent {
				Some(parent) => parent.get(key),
				None => Value::Undefined,
			},
		}
	}

	/// Read without recording a dependency
	pub fn get_untracked(&self, key: &str) -> Value {
		match self.read_own(key) {
			Some(value) => value,
			None => match &self.0.parent {
				Some(parent) => parent.get_untracked(key),
				None => Value::Undefined,
			},
		}
	}

	/// Whether the key is present on this object (parents not consulted, untracked)
	pub fn has_own(&self, key: &str) -> bool {
		match &*self.0.data.borrow() {
			ObjectData::Map(map) => map.contains_key(key),
			ObjectData::Array(items) => {
				key == "length" || array_index(key).is_some_and(|i| i < items.len())
			}
		}
	}

	/// Tracked presence check across the parent chain
	pub fn has(&self, key: &str) -> bool {
		self.track(&Key::prop(key));
		self.has_own(key) || self.0.parent.as_ref().is_some_and(|p| p.has(key))
	}

	/// Write with scope semantics
	///
	/// Keys present locally are written locally; otherwise the write goes to
	/// the parent when there is one.
	pub fn set(&self, key: &str, value: Value) {
		if !self.has_own(key) {
			if let Some(parent) = &self.0.parent {
				parent.set(key, value);
				return;
			}
		}
		self.define(key, value);
	}

	/// Write on this object regardless of the parent chain
	///
	/// Unchanged values (see [`Value::same`]) notify nobody.
	pub fn define(&self, key: &str, value: Value) {
		if self.is_array() {
			self.set_array_key(key, value);
			return;
		}

		let (old, added) = {
			let mut data = self.0.data.borrow_mut();
			let ObjectData::Map(map) = &mut *data else {
				return;
			};
			match map.get_mut(key) {
				Some(slot) => {
					let old = slot.resolve();
					if old.same(&value) {
						return;
					}
					*slot = Slot::Live(value.clone());
					(old, false)
				}
				None => {
					map.insert(Rc::from(key), Slot::Live(value.clone()));
					(Value::Undefined, true)
				}
			}
		};

		self.trigger(&Key::prop(key));
		if added {
			self.trigger(&Key::Items);
		}
		self.notify_watchers(key, &value, &old);
	}

	fn set_array_key(&self, key: &str, value: Value) {
		let changed = {
			let mut data = self.0.data.borrow_mut();
			let ObjectData::Array(items) = &mut *data else {
				return;
			};
			if key == "length" {
				let len = value.to_number();
				if len.is_nan() || len < 0.0 || len.fract() != 0.0 {
					tracing::warn!(length = %value.to_js_string(), "invalid array length");
					return;
				}
				let len = len as usize;
				let changed = len != items.len();
				items.resize_with(len, || Slot::Live(Value::Undefined));
				changed
			} else if let Some(index) = array_index(key) {
				let grew = index >= items.len();
				if grew {
					items.resize_with(index + 1, || Slot::Live(Value::Undefined));
				}
				let old = items[index].resolve();
				if old.same(&value) && !grew {
					false
				} else {
					items[index] = Slot::Live(value);
					true
				}
			} else {
				tracing::debug!(key, "ignoring non-index write on array");
				false
			}
		};

		if changed {
			self.trigger(&Key::Items);
		}
	}

	/// Remove a local key; returns whether it was present
	pub fn delete(&self, key: &str) -> bool {
		let removed = {
			let mut data = self.0.data.borrow_mut();
			match &mut *data {
				ObjectData::Map(map) => map.shift_remove(key).map(|mut slot| slot.resolve()),
				ObjectData::Array(items) => array_index(key)
					.and_then(|i| items.get_mut(i))
					.map(|slot| std::mem::replace(slot, Slot::Live(Value::Undefined)).resolve()),
			}
		};
		let Some(old) = removed else {
			return false;
		};

		if self.is_array() {
			self.trigger(&Key::Items);
		} else {
			self.trigger(&Key::prop(key));
			self.trigger(&Key::Items);
			self.notify_watchers(key, &Value::Undefined, &old);
		}
		true
	}

	/// Own keys in insertion order (indices for arrays); tracks the key set
	pub fn keys(&self) -> Vec<Rc<str>> {
		self.track(&Key::Items);
		match &*self.0.data.borrow() {
			ObjectData::Map(map) => map.keys().cloned().collect(),
			ObjectData::Array(items) => (0..items.len()).map(|i| Rc::from(i.to_string())).collect(),
		}
	}

	/// Own entries; tracks the key set and every value read
	pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
		self.keys()
			.into_iter()
			.map(|key| {
				let value = self.get(&key);
				(key, value)
			})
			.collect()
	}

	/// Number of own entries (array length); tracks the container
	pub fn len(&self) -> usize {
		self.track(&Key::Items);
		match &*self.0.data.borrow() {
			ObjectData::Map(map) => map.len(),
			ObjectData::Array(items) => items.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Values in order; tracks the container
	pub fn items(&self) -> Vec<Value> {
		self.track(&Key::Items);
		self.items_untracked()
	}

	fn items_untracked(&self) -> Vec<Value> {
		match &mut *self.0.data.borrow_mut() {
			ObjectData::Map(map) => map.values_mut().map(Slot::resolve).collect(),
			ObjectData::Array(items) => items.iter_mut().map(Slot::resolve).collect(),
		}
	}

	/// Tracked read of an array element
	pub fn index(&self, index: usize) -> Value {
		self.get(&index.to_string())
	}

	fn mutate_array<R>(&self, f: impl FnOnce(&mut Vec<Slot>) -> R) -> Option<R> {
		let result = {
			let mut data = self.0.data.borrow_mut();
			match &mut *data {
				ObjectData::Array(items) => Some(f(items)),
				ObjectData::Map(_) => None,
			}
		};
		if result.is_some() {
			self.trigger(&Key::Items);
		} else {
			tracing::debug!(object = ?self.0.id, "array mutator called on a map");
		}
		result
	}

	/// Append values; returns the new length
	pub fn push(&self, values: Vec<Value>) -> usize {
		self.mutate_array(|items| {
			items.extend(values.into_iter().map(Slot::Live));
			items.len()
		})
		.unwrap_or(0)
	}

	/// Remove and return the last element
	pub fn pop(&self) -> Value {
		self.mutate_array(|items| items.pop().map(|mut s| s.resolve()))
			.flatten()
			.unwrap_or_default()
	}

	/// Remove and return the first element
	pub fn shift(&self) -> Value {
		self.mutate_array(|items| {
			if items.is_empty() {
				None
			} else {
				Some(items.remove(0).resolve())
			}
		})
		.flatten()
		.unwrap_or_default()
	}

	/// Prepend values; returns the new length
	pub fn unshift(&self, values: Vec<Value>) -> usize {
		self.mutate_array(|items| {
			items.splice(0..0, values.into_iter().map(Slot::Live));
			items.len()
		})
		.unwrap_or(0)
	}

	/// Remove `delete_count` elements at `start` and insert `insert` there
	///
	/// `start` is clamped to the length. Returns the removed elements.
	pub fn splice(&self, start: usize, delete_count: usize, insert: Vec<Value>) -> Vec<Value> {
		self.mutate_array(|items| {
			let start = start.min(items.len());
			let end = start.saturating_add(delete_count).min(items.len());
			items
				.splice(start..end, insert.into_iter().map(Slot::Live))
				.map(|mut s| s.resolve())
				.collect()
		})
		.unwrap_or_default()
	}

	/// Insert one element at `index`
	pub fn insert(&self, index: usize, value: Value) {
		self.splice(index, 0, vec![value]);
	}

	/// Replace all elements at once
	pub fn replace_items(&self, values: Vec<Value>) {
		self.mutate_array(|items| {
			*items = values.into_iter().map(Slot::Live).collect();
		});
	}

	/// Sort with a comparator
	///
	/// The comparator runs outside the object's borrow, so it may read this
	/// array.
	pub fn sort_by<F>(&self, mut compare: F)
	where
		F: FnMut(&Value, &Value) -> Ordering,
	{
		if !self.is_array() {
			return;
		}
		let mut values = self.items_untracked();
		values.sort_by(&mut compare);
		self.replace_items(values);
	}

	/// Default sort: string order, `undefined` last
	pub fn sort(&self) {
		self.sort_by(|a, b| match (a.is_undefined(), b.is_undefined()) {
			(true, true) => Ordering::Equal,
			(true, false) => Ordering::Greater,
			(false, true) => Ordering::Less,
			(false, false) => a.to_js_string().cmp(&b.to_js_string()),
		});
	}

	/// Reverse in place
	pub fn reverse(&self) {
		self.mutate_array(|items| items.reverse());
	}

	/// Register a synchronous watcher for `key`
	///
	/// The callback receives `(new, old)` after every effective change.
	pub fn subscribe<F>(&self, key: &str, callback: F)
	where
		F: Fn(&Value, &Value) + 'static,
	{
		self.0
			.watchers
			.borrow_mut()
			.push((Rc::from(key), Rc::new(callback)));
	}

	fn notify_watchers(&self, key: &str, new: &Value, old: &Value) {
		let watchers: Vec<Rc<WatchFn>> = self
			.0
			.watchers
			.borrow()
			.iter()
			.filter(|(k, _)| &**k == key)
			.map(|(_, w)| w.clone())
			.collect();
		for watcher in watchers {
			if catch_unwind(AssertUnwindSafe(|| watcher(new, old))).is_err() {
				tracing::error!(key, "watcher panicked");
			}
		}
	}

	/// Snapshot as JSON (untracked); cycles become `null`
	pub fn to_json(&self) -> serde_json::Value {
		let mut seen = Vec::new();
		self.to_json_inner(&mut seen)
	}

	fn to_json_inner(&self, seen: &mut Vec<NodeId>) -> serde_json::Value {
		if seen.contains(&self.0.id) {
			return serde_json::Value::Null;
		}
		seen.push(self.0.id);

		fn slot_json(slot: Slot, seen: &mut Vec<NodeId>) -> serde_json::Value {
			match slot {
				Slot::Raw(json) => json,
				Slot::Live(Value::Object(o)) => o.to_json_inner(seen),
				Slot::Live(value) => value.to_json(),
			}
		}

		let json = match &*self.0.data.borrow() {
			ObjectData::Map(map) => {
				let entries: Vec<(Rc<str>, Slot)> = map
					.iter()
					.filter(|(_, slot)| {
						!matches!(slot, Slot::Live(Value::Function(_) | Value::Undefined))
					})
					.map(|(k, s)| (k.clone(), s.clone()))
					.collect();
				Snapshot::Map(entries)
			}
			ObjectData::Array(items) => Snapshot::Array(items.clone()),
		};

		let result = match json {
			Snapshot::Map(entries) => serde_json::Value::Object(
				entries
					.into_iter()
					.map(|(k, s)| (k.to_string(), slot_json(s, seen)))
					.collect(),
			),
			Snapshot::Array(items) => serde_json::Value::Array(
				items.into_iter().map(|s| slot_json(s, seen)).collect(),
			),
		};
		seen.pop();
		result
	}
}

impl TryFrom<Value> for Object {
	type Error = ReactiveError;

	fn try_from(value: Value) -> Result<Self> {
		match value {
			Value::Object(object) => Ok(object),
			other => Err(ReactiveError::NotAnObject(other.type_of())),
		}
	}
}

impl TryFrom<serde_json::Value> for Object {
	type Error = ReactiveError;

	fn try_from(json: serde_json::Value) -> Result<Self> {
		let kind = match &json {
			serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
				return Ok(Object::from_json(json));
			}
			serde_json::Value::Null => "null",
			serde_json::Value::Bool(_) => "boolean",
			serde_json::Value::Number(_) => "number",
			serde_json::Value::String(_) => "string",
		};
		Err(ReactiveError::NotAContainer(kind))
	}
}

enum Snapshot {
	Map(Vec<(Rc<str>, Slot)>),
	Array(Vec<Slot>),
}

impl fmt::Debug for Object {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = if self.is_array() { "Array" } else { "Object" };
		write!(f, "{kind}({:?})", self.0.id)
	}
}

/// Make a value reactive
///
/// Objects are already observable, so wrapping is the identity for them and
/// for primitives alike; JSON input is wrapped.
pub fn reactive<T: Into<Value>>(value: T) -> Value {
	value.into()
}

/// A `{ value }` holder object
pub fn ref_value<T: Into<Value>>(value: T) -> Object {
	Object::from_entries([("value", value.into())])
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Effect, EffectTiming};
	use rstest::rstest;
	use serde_json::json;
	use std::cell::Cell;

	fn counting_effect<F>(f: F) -> (Effect, Rc<Cell<usize>>)
	where
		F: Fn() + 'static,
	{
		let runs = Rc::new(Cell::new(0));
		let r = runs.clone();
		let effect = Effect::new_with_timing(
			move || {
				r.set(r.get() + 1);
				f();
			},
			EffectTiming::Layout,
		);
		(effect, runs)
	}

	#[rstest]
	fn test_same_value_write_does_not_notify() {
		let state = Object::new_map();
		state.set("count", Value::from(1));
		let s = state.clone();
		let (_effect, runs) = counting_effect(move || {
			let _ = s.get("count");
		});

		state.set("count", Value::from(2));
		state.set("count", Value::from(2));

		assert_eq!(runs.get(), 2);
	}

	#[rstest]
	fn test_nested_objects_are_wrapped_once() {
		let state = Object::from_json(json!({ "user": { "name": "Ada" } }));

		let first = state.get("user");
		let second = state.get("user");

		assert!(first.strict_eq(&second));
		assert_eq!(
			first.as_object().unwrap().get("name"),
			Value::from("Ada")
		);
	}

	#[rstest]
	fn test_nested_write_notifies_reader() {
		let state = Object::from_json(json!({ "user": { "name": "Ada" } }));
		let seen = Rc::new(RefCell::new(String::new()));
		let s = state.clone();
		let out = seen.clone();
		let _effect = Effect::new_with_timing(
			move || {
				let user = s.get("user");
				*out.borrow_mut() = user.as_object().unwrap().get("name").to_js_string();
			},
			EffectTiming::Layout,
		);

		state
			.get_untracked("user")
			.as_object()
			.unwrap()
			.set("name", Value::from("Grace"));

		assert_eq!(*seen.borrow(), "Grace");
	}

	#[rstest]
	#[case::push(|a: &Object| { a.push(vec![Value::from(4), Value::from(5)]); })]
	#[case::pop(|a: &Object| { a.pop(); })]
	#[case::shift(|a: &Object| { a.shift(); })]
	#[case::unshift(|a: &Object| { a.unshift(vec![Value::from(0), Value::from(-1)]); })]
	#[case::splice(|a: &Object| { a.splice(1, 1, vec![Value::from(9), Value::from(8)]); })]
	#[case::sort(|a: &Object| a.sort())]
	#[case::reverse(|a: &Object| a.reverse())]
	fn test_array_mutators_trigger_once(#[case] mutate: fn(&Object)) {
		let list = Object::new_array(vec![Value::from(3), Value::from(1), Value::from(2)]);
		let l = list.clone();
		let (_effect, runs) = counting_effect(move || {
			let _ = l.items();
		});

		mutate(&list);

		assert_eq!(runs.get(), 2);
	}

	#[rstest]
	fn test_array_methods_results() {
		let list = Object::new_array(vec![Value::from("b"), Value::from("c"), Value::from("a")]);

		assert_eq!(list.push(vec![Value::from("d")]), 4);
		assert_eq!(list.shift(), Value::from("b"));
		list.sort();
		assert_eq!(
			list.items(),
			vec![Value::from("a"), Value::from("c"), Value::from("d")]
		);
		let removed = list.splice(1, 1, vec![]);
		assert_eq!(removed, vec![Value::from("c")]);
		assert_eq!(list.get("length"), Value::from(2));
	}

	#[rstest]
	fn test_parent_read_through_and_write_through() {
		let parent = Object::new_map();
		parent.set("shared", Value::from(1));
		let child = Object::with_parent(&parent);
		child.define("local", Value::from(2));

		assert_eq!(child.get("shared"), Value::from(1));

		child.set("local", Value::from(3));
		child.set("hoisted", Value::from(4));

		assert_eq!(child.get("local"), Value::from(3));
		assert!(!parent.has_own("local"));
		assert_eq!(parent.get("hoisted"), Value::from(4));
		assert!(!child.has_own("hoisted"));
	}

	#[rstest]
	fn test_watchers_receive_new_and_old() {
		let state = Object::new_map();
		state.set("n", Value::from(1));
		let log = Rc::new(RefCell::new(Vec::new()));
		let l = log.clone();
		state.subscribe("n", move |new, old| {
			l.borrow_mut().push((new.to_number(), old.to_number()));
		});

		state.set("n", Value::from(2));
		state.set("n", Value::from(2));

		assert_eq!(*log.borrow(), vec![(2.0, 1.0)]);
	}

	#[rstest]
	fn test_to_json_breaks_cycles() {
		let a = Object::new_map();
		a.set("self", Value::Object(a.clone()));
		a.set("n", Value::from(1));

		assert_eq!(a.to_json(), json!({ "self": null, "n": 1 }));
		// Break the cycle so the object is released.
		a.delete("self");
	}

	#[rstest]
	fn test_try_from_rejects_primitives() {
		assert_eq!(
			Object::try_from(Value::from(3)).unwrap_err(),
			ReactiveError::NotAnObject("number")
		);
		assert_eq!(
			Object::try_from(json!("text")).unwrap_err(),
			ReactiveError::NotAContainer("string")
		);
		assert!(Object::try_from(json!([1, 2])).unwrap().is_array());
	}

	#[rstest]
	fn test_ref_value() {
		let r = ref_value(5);
		assert_eq!(r.get("value"), Value::from(5));
	}
}
