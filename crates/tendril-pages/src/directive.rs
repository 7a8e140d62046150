//! Directive dispatch - maps directive attributes to handlers.
//!
//! Attribute names take the forms `v-name`, `v-name:arg`, `:arg` (bind) and
//! `@arg` (on), each optionally followed by `.modifier`s. The `c-` prefix is
//! accepted wherever `v-` is.
//!
//! ## Key Features
//!
//! - **Built-ins first**: `bind`, `on`, `text`, `html`, `show`, `model`,
//!   `effect` and `ref` resolve before the context's custom registry
//! - **Custom directives**: anything implementing [`Directive`], including
//!   plain closures, can be registered on an app
//! - **Cleanup**: a directive may return a callback run on teardown
//!
//! ## Example
//!
//! ```ignore
//! app.directive("focus", Rc::new(|binding: &DirectiveBinding<'_>| {
//!     binding.el.set_attribute("data-focused", "");
//!     None
//! }));
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;
use tendril_dom::Node;
use tendril_reactive::Value;

use crate::context::Context;
use crate::directives;
use crate::eval::{self, Env, Locals};
use crate::host::node_value;

static MODIFIER_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\.([\w-]+)").expect("valid regex"));

/// Callback run when the owning context is torn down
pub type Cleanup = Box<dyn FnOnce()>;

/// Modifiers parsed from an attribute name, in source order
pub type Modifiers = IndexSet<String>;

/// A directive handler
pub trait Directive {
	fn apply(&self, binding: &DirectiveBinding<'_>) -> Option<Cleanup>;
}

impl<F> Directive for F
where
	F: Fn(&DirectiveBinding<'_>) -> Option<Cleanup>,
{
	fn apply(&self, binding: &DirectiveBinding<'_>) -> Option<Cleanup> {
		self(binding)
	}
}

type BuiltinFn = fn(&DirectiveBinding<'_>) -> Option<Cleanup>;

/// Everything a directive receives for one attribute
pub struct DirectiveBinding<'a> {
	pub el: &'a Node,
	pub ctx: &'a Context,
	pub exp: &'a str,
	pub arg: Option<&'a str>,
	pub modifiers: &'a Modifiers,
}

impl DirectiveBinding<'_> {
	/// Evaluate the directive expression now
	pub fn get(&self) -> Value {
		self.getter().get()
	}

	/// An owned evaluator for the expression, for use inside effects
	pub fn getter(&self) -> Getter {
		Getter::new(self.el, self.ctx, self.exp)
	}

	/// Run `f` as an effect owned by the directive's context
	pub fn effect<F>(&self, f: F)
	where
		F: FnMut() + 'static,
	{
		self.ctx.effect(f);
	}

	pub fn has_modifier(&self, name: &str) -> bool {
		self.modifiers.contains(name)
	}
}

/// Evaluates one expression with `$el` bound to the directive's element
#[derive(Clone)]
pub struct Getter {
	env: Env,
	exp: Rc<str>,
}

impl Getter {
	pub fn new(el: &Node, ctx: &Context, exp: &str) -> Self {
		Self {
			env: Locals::new([("$el", node_value(el))], ctx.env()),
			exp: Rc::from(exp),
		}
	}

	pub fn get(&self) -> Value {
		eval::evaluate(&self.env, &self.exp)
	}

	/// Evaluate another expression in the same environment
	pub fn get_exp(&self, exp: &str) -> Value {
		eval::evaluate(&self.env, exp)
	}

	pub fn env(&self) -> &Env {
		&self.env
	}

	pub fn expression(&self) -> &str {
		&self.exp
	}
}

fn builtin(name: &str) -> Option<BuiltinFn> {
	Some(match name {
		"bind" => directives::bind::bind,
		"on" => directives::on::on,
		"text" => directives::text::text,
		"html" => directives::html::html,
		"show" => directives::show::show,
		"model" => directives::model::model,
		"effect" => directives::effect::effect,
		"ref" => directives::reference::reference,
		_ => return None,
	})
}

/// Split `name.mod1.mod2` into the bare name and its modifiers
pub fn parse_modifiers(raw: &str) -> (String, Modifiers) {
	let modifiers = MODIFIER_RE
		.captures_iter(raw)
		.map(|caps| caps[1].to_string())
		.collect();
	let name = MODIFIER_RE.replace_all(raw, "").into_owned();
	(name, modifiers)
}

/// Attribute names handled by the walker (as opposed to by dispatch)
pub fn is_directive_attribute(name: &str) -> bool {
	name.starts_with(':') || name.starts_with('@') || name.starts_with("v-") || name.starts_with("c-")
}

/// Dispatch the directive attribute `raw` on `el`, then remove the attribute
pub fn process_directive(el: &Node, raw: &str, exp: &str, ctx: &Context) {
	let (name, modifiers) = parse_modifiers(raw);
	let (dir_name, arg): (String, Option<String>) = if let Some(arg) = name.strip_prefix(':') {
		if arg == "ref" {
			("ref".to_string(), None)
		} else {
			("bind".to_string(), Some(arg.to_string()))
		}
	} else if let Some(arg) = name.strip_prefix('@') {
		("on".to_string(), Some(arg.to_string()))
	} else {
		let bare = name
			.strip_prefix("v-")
			.or_else(|| name.strip_prefix("c-"))
			.unwrap_or(&name);
		match bare.split_once(':') {
			Some((dir, arg)) => (dir.to_string(), Some(arg.to_string())),
			None => (bare.to_string(), None),
		}
	};

	match builtin(&dir_name) {
		Some(f) => apply_directive(el, &f, exp, ctx, arg.as_deref(), &modifiers),
		None => match ctx.directive(&dir_name) {
			Some(custom) => apply_directive(el, &*custom, exp, ctx, arg.as_deref(), &modifiers),
			None => crate::warn_log!(directive = dir_name, "unknown custom directive"),
		},
	}
	el.remove_attribute(raw);
}

/// Run `directive` for `el`; a returned cleanup is registered on `ctx`
pub fn apply_directive(
	el: &Node,
	directive: &dyn Directive,
	exp: &str,
	ctx: &Context,
	arg: Option<&str>,
	modifiers: &Modifiers,
) {
	let binding = DirectiveBinding {
		el,
		ctx,
		exp,
		arg,
		modifiers,
	};
	crate::debug_log!(exp, arg = ?arg, "applying directive");
	match catch_unwind(AssertUnwindSafe(|| directive.apply(&binding))) {
		Ok(Some(cleanup)) => ctx.add_cleanup(cleanup),
		Ok(None) => {}
		Err(_) => crate::error_log!(exp, "directive panicked"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("@click.prevent.stop", "@click", &["prevent", "stop"])]
	#[case(":title", ":title", &[])]
	#[case("v-model.lazy", "v-model", &["lazy"])]
	#[case("v-on:update-value.once", "v-on:update-value", &["once"])]
	fn test_parse_modifiers(#[case] raw: &str, #[case] name: &str, #[case] expected: &[&str]) {
		let (parsed, modifiers) = parse_modifiers(raw);
		assert_eq!(parsed, name);
		assert_eq!(modifiers.iter().map(String::as_str).collect::<Vec<_>>(), expected);
	}

	#[rstest]
	#[case(":class", true)]
	#[case("@click", true)]
	#[case("v-text", true)]
	#[case("c-if", true)]
	#[case("class", false)]
	#[case("data-v", false)]
	fn test_directive_attribute_names(#[case] name: &str, #[case] expected: bool) {
		assert_eq!(is_directive_attribute(name), expected);
	}
}
