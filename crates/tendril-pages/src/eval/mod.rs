//! Expression evaluator - compiles template expressions once and runs them
//! against a scope chain.
//!
//! Expressions come from attribute values and text interpolations. Each
//! distinct source text is parsed once and cached per thread; failed
//! compilations are cached as well so a broken expression is reported but
//! never re-parsed.
//!
//! ## Key Features
//!
//! - **Scope chain**: identifiers resolve through [`Scope`] implementations,
//!   reactive reads are tracked by whichever effect is running
//! - **Statements**: `;`-separated bodies with `return` for event handlers
//! - **Failure isolation**: [`evaluate`] and [`execute`] log and yield
//!   `undefined`; [`try_evaluate`] surfaces the [`EvalError`]
//!
//! ## Example
//!
//! ```ignore
//! use tendril_pages::eval::{evaluate, object_env};
//!
//! let scope = Object::from_json(json!({ "a": 2, "b": 3 }));
//! assert_eq!(evaluate(&object_env(&scope), "a + b"), Value::from(5));
//! ```

mod ast;
mod builtins;
mod interp;
mod parser;
mod scope;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tendril_reactive::Value;

pub use ast::{Expr, Program, Stmt};
pub use parser::{parse_expression, parse_program};
pub use scope::{Env, Locals, Scope, object_env};

use crate::error::{EvalError, EvalResult};

type Compiled = Rc<EvalResult<Program>>;

thread_local! {
	static CACHE: RefCell<HashMap<Rc<str>, Compiled>> = RefCell::new(HashMap::new());
}

/// Compile a statement body, reusing the cached result for identical source
pub fn compile(source: &str) -> Compiled {
	if let Some(hit) = CACHE.with(|cache| cache.borrow().get(source).cloned()) {
		return hit;
	}
	let compiled = Rc::new(parse_program(source));
	CACHE.with(|cache| {
		cache
			.borrow_mut()
			.insert(Rc::from(source), compiled.clone());
	});
	compiled
}

/// Number of distinct sources compiled on this thread
pub fn cache_len() -> usize {
	CACHE.with(|cache| cache.borrow().len())
}

pub fn clear_cache() {
	CACHE.with(|cache| cache.borrow_mut().clear());
}

/// Run a statement body, surfacing failures
pub fn try_execute(env: &Env, source: &str) -> EvalResult<Value> {
	match &*compile(source) {
		Ok(program) => interp::run(program, env),
		Err(err) => Err(err.clone()),
	}
}

/// Evaluate one expression, surfacing failures
pub fn try_evaluate(env: &Env, expression: &str) -> EvalResult<Value> {
	try_execute(env, &format!("return({expression})"))
}

/// Run a statement body; failures are logged and yield `undefined`
pub fn execute(env: &Env, source: &str) -> Value {
	try_execute(env, source).unwrap_or_else(|err| {
		crate::warn_log!(expression = source, error = %err, "error when evaluating expression");
		Value::Undefined
	})
}

/// Evaluate one expression; failures are logged and yield `undefined`
pub fn evaluate(env: &Env, expression: &str) -> Value {
	try_evaluate(env, expression).unwrap_or_else(|err| {
		crate::warn_log!(expression, error = %err, "error when evaluating expression");
		Value::Undefined
	})
}

/// Write `value` to the place named by `target` (`a`, `a.b`, `list[i]`)
pub fn assign(env: &Env, target: &str, value: Value) -> EvalResult<()> {
	let expr = parse_expression(target)?;
	interp::assign_expr(&expr, value, env)
}

/// Whether `source` names a place rather than computing a value
///
/// Event handlers written as a bare path are called with the event.
pub fn is_simple_path(source: &str) -> bool {
	fn is_path(expr: &Expr) -> bool {
		match expr {
			Expr::Ident(_) => true,
			Expr::Member {
				object,
				optional: false,
				..
			} => is_path(object),
			Expr::Index { object, index } => {
				is_path(object) && matches!(**index, Expr::Number(_) | Expr::Str(_) | Expr::Ident(_))
			}
			_ => false,
		}
	}
	parse_expression(source).is_ok_and(|expr| is_path(&expr))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use serial_test::serial;
	use tendril_reactive::{Effect, Object, run_microtasks};

	fn env(data: serde_json::Value) -> (Object, Env) {
		let scope = Object::from_json(data);
		let env = object_env(&scope);
		(scope, env)
	}

	#[rstest]
	#[case("a + b", json!(5))]
	#[case("a * b - 1", json!(5))]
	#[case("a > b ? 'big' : 'small'", json!("small"))]
	#[case("`${a}-${b}`", json!("2-3"))]
	#[case("name.toUpperCase()", json!("ADA"))]
	#[case("list.filter(x => x > 1).length", json!(2))]
	#[case("list.map((x, i) => x * i).join(',')", json!("0,2,6"))]
	#[case("missing ?? 'fallback'", json!("fallback"))]
	#[case("nested.inner.value", json!(7))]
	#[case("typeof nothing", json!("undefined"))]
	#[case("'n' + 1", json!("n1"))]
	#[case("Math.max(a, b, 1)", json!(3))]
	#[case("!a || b", json!(3))]
	#[case("list.includes(3) && name === 'Ada'", json!(true))]
	fn test_evaluate_expressions(#[case] source: &str, #[case] expected: serde_json::Value) {
		let (_, env) = env(json!({
			"a": 2, "b": 3, "name": "Ada", "list": [1, 2, 3],
			"nested": { "inner": { "value": 7 } }, "missing": null
		}));
		assert_eq!(evaluate(&env, source), Value::from_json(expected));
	}

	#[rstest]
	fn test_syntax_error_yields_undefined() {
		let (_, env) = env(json!({ "a": 1 }));
		assert_eq!(evaluate(&env, "a +"), Value::Undefined);
		assert!(matches!(try_evaluate(&env, "a +"), Err(EvalError::Syntax { .. })));
	}

	#[rstest]
	fn test_reference_error_is_reported() {
		let (_, env) = env(json!({}));
		assert_eq!(
			try_evaluate(&env, "nope + 1"),
			Err(EvalError::Reference("nope".to_string()))
		);
	}

	#[rstest]
	fn test_reading_through_null_is_a_type_error() {
		let (_, env) = env(json!({ "user": null }));
		assert!(matches!(try_evaluate(&env, "user.name"), Err(EvalError::Type(_))));
		assert_eq!(evaluate(&env, "user?.name"), Value::Undefined);
	}

	#[rstest]
	fn test_statements_mutate_scope() {
		let (scope, env) = env(json!({ "count": 1, "list": [] }));
		execute(&env, "count++; count += 10; list.push(count)");
		assert_eq!(scope.get("count"), Value::from(12));
		assert_eq!(scope.get("list").to_js_string(), "12");
	}

	#[rstest]
	fn test_assign_nested_path() {
		let (scope, env) = env(json!({ "form": { "name": "" } }));
		assign(&env, "form.name", Value::from("x")).unwrap();
		assert_eq!(evaluate(&env, "form.name"), Value::from("x"));
		assert!(assign(&env, "1 + 1", Value::Null).is_err());
		assert!(scope.has_own("form"));
	}

	#[rstest]
	fn test_compiled_sources_are_cached_including_failures() {
		clear_cache();
		let (_, env) = env(json!({ "a": 1 }));
		evaluate(&env, "a + 1");
		evaluate(&env, "a + 1");
		evaluate(&env, "a +");
		evaluate(&env, "a +");
		assert_eq!(cache_len(), 2);
	}

	#[rstest]
	fn test_locals_shadow_scope_and_write_through() {
		let (scope, env) = env(json!({ "x": 1, "y": 1 }));
		let local = Locals::new([("x", Value::from(100))], env);
		assert_eq!(evaluate(&local, "x + y"), Value::from(101));
		execute(&local, "y = 5; x = 0");
		assert_eq!(scope.get("y"), Value::from(5));
		assert_eq!(scope.get("x"), Value::from(1));
	}

	#[rstest]
	#[case("increment", true)]
	#[case("handlers.save", true)]
	#[case("items[0]", true)]
	#[case("increment()", false)]
	#[case("count++", false)]
	fn test_simple_path_detection(#[case] source: &str, #[case] expected: bool) {
		assert_eq!(is_simple_path(source), expected);
	}

	#[rstest]
	#[serial]
	fn test_effect_tracks_identifiers_read_by_expression() {
		let (scope, env) = env(json!({ "a": 1, "b": 2 }));
		let seen = Rc::new(RefCell::new(Vec::new()));
		let out = seen.clone();
		let _effect = Effect::new(move || {
			out.borrow_mut().push(evaluate(&env, "a + b").to_number());
		});

		scope.set("b", Value::from(10));
		run_microtasks();

		assert_eq!(*seen.borrow(), vec![3.0, 11.0]);
	}

	#[rstest]
	fn test_methods_receive_their_object_as_this() {
		let (scope, env) = env(json!({ "count": 0 }));
		scope.define(
			"bump",
			Value::Function(tendril_reactive::Function::new("bump", |this, _| {
				if let Some(obj) = this.as_object() {
					obj.set("count", Value::from(obj.get("count").to_number() + 1.0));
				}
				Value::Undefined
			})),
		);
		execute(&env, "bump(); bump()");
		assert_eq!(scope.get("count"), Value::from(2));
	}
}
