//! `v-for` list blocks.
//!
//! Supported forms: `item in list`, `item of list`, `(item, index) in list`,
//! `(value, key, index) in object` and `n in 5`.
//!
//! With a `:key` the list is reconciled by key: blocks are reused for keys
//! that survive and moved into the new order, vanished keys are removed.
//! Without one, blocks are reused by position with their loop variables
//! rebound; new items are appended and surplus blocks trimmed from the end.

use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use tendril_dom::Node;
use tendril_reactive::{Object, Value, untrack};

use crate::block::Block;
use crate::context::{Context, create_scoped_context};
use crate::eval::{self, Env, Locals};
use crate::walk::take_attribute;

static FOR_ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*([\s\S]*?)\s+(?:in|of)\s+([\s\S]*?)\s*$").expect("valid regex")
});

/// Largest `n` accepted by `n in N`
const MAX_RANGE: f64 = 65_536.0;

/// Loop variable names: value, then key (or index), then index
#[derive(Debug, Clone, PartialEq, Eq)]
struct Aliases {
	value: String,
	key: Option<String>,
	index: Option<String>,
}

impl Aliases {
	fn parse(raw: &str) -> Option<Self> {
		let trimmed = raw.trim();
		let inner = trimmed
			.strip_prefix('(')
			.and_then(|s| s.strip_suffix(')'))
			.unwrap_or(trimmed);
		let mut names = inner.split(',').map(str::trim);
		let value = names.next().filter(|n| !n.is_empty())?.to_string();
		let mut optional = || names.next().filter(|n| !n.is_empty()).map(str::to_string);
		let key = optional();
		let index = optional();
		Some(Self { value, key, index })
	}

	fn bindings(&self, entry: &Entry) -> Vec<(String, Value)> {
		let mut out = vec![(self.value.clone(), entry.value.clone())];
		if let Some(key) = &self.key {
			out.push((key.clone(), entry.key.clone()));
		}
		if let Some(index) = &self.index {
			out.push((index.clone(), Value::from(entry.index)));
		}
		out
	}
}

struct Entry {
	value: Value,
	key: Value,
	index: usize,
}

/// Values produced by iterating `source`
fn entries_of(source: &Value) -> Vec<Entry> {
	let entry = |value, key, index| Entry { value, key, index };
	match source {
		Value::Object(list) if list.is_array() => list
			.items()
			.into_iter()
			.enumerate()
			.map(|(i, v)| entry(v, Value::from(i), i))
			.collect(),
		Value::Object(map) => map
			.entries()
			.into_iter()
			.enumerate()
			.map(|(i, (k, v))| entry(v, Value::String(k), i))
			.collect(),
		Value::Number(n) if *n > MAX_RANGE => {
			crate::warn_log!(count = *n, "v-for range too large");
			Vec::new()
		}
		Value::Number(n) if *n >= 1.0 => (0..*n as usize)
			.map(|i| entry(Value::from(i + 1), Value::from(i), i))
			.collect(),
		Value::String(s) => s
			.chars()
			.enumerate()
			.map(|(i, c)| entry(Value::from(c.to_string()), Value::from(i), i))
			.collect(),
		_ => Vec::new(),
	}
}

struct Item {
	key: Option<String>,
	scope: Object,
	block: Block,
}

impl Item {
	fn rebind(&self, bindings: Vec<(String, Value)>) {
		for (name, value) in bindings {
			self.scope.set(&name, value);
		}
	}
}

struct List {
	template: Node,
	parent: Node,
	anchor: Node,
	ctx: Context,
	env: Env,
	aliases: Aliases,
	key_exp: Option<String>,
	items: Vec<Item>,
}

impl List {
	fn mount(&self, bindings: Vec<(String, Value)>, key: Option<String>) -> Item {
		let data = Object::from_entries(bindings);
		let scoped = create_scoped_context(&self.ctx, &data);
		let block = Block::new(&self.template, &scoped, false);
		block.insert(&self.parent, Some(&self.anchor));
		Item {
			key,
			scope: scoped.scope().clone(),
			block,
		}
	}

	fn key_of(&self, bindings: &[(String, Value)]) -> Option<String> {
		let key_exp = self.key_exp.as_deref()?;
		let env = Locals::new(bindings.iter().cloned(), self.env.clone());
		Some(eval::evaluate(&env, key_exp).to_js_string())
	}

	fn reconcile_positional(&mut self, entries: Vec<Entry>) {
		let count = entries.len();
		for (position, entry) in entries.iter().enumerate() {
			let bindings = self.aliases.bindings(entry);
			match self.items.get(position) {
				Some(item) => item.rebind(bindings),
				None => {
					let item = self.mount(bindings, None);
					self.items.push(item);
				}
			}
		}
		while self.items.len() > count {
			if let Some(item) = self.items.pop() {
				item.block.remove();
			}
		}
	}

	fn reconcile_keyed(&mut self, entries: Vec<Entry>) {
		// Rows sharing a key queue up under it and are reused in order
		let mut previous: IndexMap<String, VecDeque<Item>> = IndexMap::new();
		for item in self.items.drain(..) {
			match item.key.clone() {
				Some(key) => previous.entry(key).or_default().push_back(item),
				None => item.block.remove(),
			}
		}
		let mut seen = HashSet::new();
		let mut next = Vec::with_capacity(entries.len());
		for entry in &entries {
			let bindings = self.aliases.bindings(entry);
			let key = self.key_of(&bindings);
			if let Some(key) = key.as_ref().filter(|k| !seen.insert((*k).clone())) {
				crate::warn_log!(key = %key, "duplicate v-for key");
			}
			let reused = key
				.as_ref()
				.and_then(|k| previous.get_mut(k))
				.and_then(VecDeque::pop_front);
			let item = match reused {
				Some(item) => {
					item.rebind(bindings);
					item.block.insert(&self.parent, Some(&self.anchor));
					item
				}
				None => self.mount(bindings, key),
			};
			next.push(item);
		}
		for stale in previous.into_values().flatten() {
			stale.block.remove();
		}
		self.items = next;
	}
}

/// Set up the list rooted at `el`; returns where the walk resumes
pub fn process(el: &Node, exp: &str, ctx: &Context) -> Option<Node> {
	let Some(caps) = FOR_ALIAS_RE.captures(exp) else {
		crate::warn_log!(expression = exp, "invalid v-for expression");
		return None;
	};
	let Some(aliases) = Aliases::parse(&caps[1]) else {
		crate::warn_log!(expression = exp, "v-for is missing its loop variable");
		return None;
	};
	let source = caps[2].to_string();
	let Some(parent) = el.parent() else {
		crate::warn_log!(expression = exp, "v-for on a detached element");
		return None;
	};

	let key_exp = [":key", "v-bind:key", "key"]
		.into_iter()
		.find_map(|name| take_attribute(el, name));
	let next = el.next_sibling();
	let anchor = Node::text("");
	if let Err(err) = parent.insert_before(&anchor, Some(el)) {
		crate::error_log!(error = %err, "failed to place v-for anchor");
		return None;
	}
	el.remove();

	let mut list = List {
		template: el.clone(),
		parent,
		anchor,
		ctx: ctx.clone(),
		env: ctx.env(),
		aliases,
		key_exp,
		items: Vec::new(),
	};
	ctx.effect(move || {
		let entries = entries_of(&eval::evaluate(&list.env, &source));
		untrack(|| {
			if list.key_exp.is_some() {
				list.reconcile_keyed(entries);
			} else {
				list.reconcile_positional(entries);
			}
		});
	});

	next
}
