//! Tree-walking interpreter over compiled expressions.

use std::rc::Rc;

use tendril_reactive::{Function, Object, Value};

use super::ast::{AssignOp, BinaryOp, Expr, LogicalOp, Program, Stmt, TemplatePart, UnaryOp};
use super::builtins;
use super::scope::{Env, Locals};
use crate::error::{EvalError, EvalResult};
use crate::host;

/// Run a statement body; the value of the first `return`, else `undefined`
pub(crate) fn run(program: &Program, env: &Env) -> EvalResult<Value> {
	for statement in &program.statements {
		match statement {
			Stmt::Expr(expr) => {
				eval(expr, env)?;
			}
			Stmt::Return(Some(expr)) => return eval(expr, env),
			Stmt::Return(None) => return Ok(Value::Undefined),
		}
	}
	Ok(Value::Undefined)
}

pub(crate) fn eval(expr: &Expr, env: &Env) -> EvalResult<Value> {
	match expr {
		Expr::Number(n) => Ok(Value::Number(*n)),
		Expr::Str(s) => Ok(Value::String(s.clone())),
		Expr::Bool(b) => Ok(Value::Bool(*b)),
		Expr::Null => Ok(Value::Null),
		Expr::Undefined => Ok(Value::Undefined),
		Expr::This => Ok(env.this_value()),
		Expr::Ident(name) => lookup(name, env),
		Expr::Template(parts) => {
			let mut out = String::new();
			for part in parts {
				match part {
					TemplatePart::Text(text) => out.push_str(text),
					TemplatePart::Expr(expr) => out.push_str(&eval(expr, env)?.to_js_string()),
				}
			}
			Ok(Value::from(out))
		}
		Expr::Array(items) => {
			let values = items
				.iter()
				.map(|item| eval(item, env))
				.collect::<EvalResult<Vec<_>>>()?;
			Ok(Value::Object(Object::new_array(values)))
		}
		Expr::Object(entries) => {
			let mut values = Vec::with_capacity(entries.len());
			for (key, value) in entries {
				values.push((key.clone(), eval(value, env)?));
			}
			Ok(Value::Object(Object::from_entries(values)))
		}
		Expr::Member {
			object,
			property,
			optional,
		} => {
			let target = eval(object, env)?;
			if *optional && target.is_nullish() {
				return Ok(Value::Undefined);
			}
			get_property(&target, property)
		}
		Expr::Index { object, index } => {
			let target = eval(object, env)?;
			let key = eval(index, env)?;
			get_property(&target, &key.to_js_string())
		}
		Expr::Call { callee, args } => call(callee, args, env),
		Expr::Unary(op, operand) => unary(*op, operand, env),
		Expr::Binary(op, left, right) => {
			let left = eval(left, env)?;
			let right = eval(right, env)?;
			Ok(binary(*op, &left, &right))
		}
		Expr::Logical(op, left, right) => {
			let left = eval(left, env)?;
			let short_circuit = match op {
				LogicalOp::And => !left.is_truthy(),
				LogicalOp::Or => left.is_truthy(),
				LogicalOp::Nullish => !left.is_nullish(),
			};
			if short_circuit { Ok(left) } else { eval(right, env) }
		}
		Expr::Conditional(test, consequent, alternate) => {
			if eval(test, env)?.is_truthy() {
				eval(consequent, env)
			} else {
				eval(alternate, env)
			}
		}
		Expr::Assign(op, target, value) => {
			let value = match op {
				AssignOp::Assign => eval(value, env)?,
				AssignOp::Compound(binary_op) => {
					let current = eval(target, env)?;
					binary(*binary_op, &current, &eval(value, env)?)
				}
			};
			assign(target, value.clone(), env)?;
			Ok(value)
		}
		Expr::Update {
			increment,
			prefix,
			target,
		} => {
			let old = eval(target, env)?.to_number();
			let new = if *increment { old + 1.0 } else { old - 1.0 };
			assign(target, Value::Number(new), env)?;
			Ok(Value::Number(if *prefix { new } else { old }))
		}
		Expr::Arrow(params, body) => Ok(Value::Function(arrow(params.clone(), body.clone(), env))),
	}
}

fn lookup(name: &str, env: &Env) -> EvalResult<Value> {
	env.lookup(name)
		.or_else(|| builtins::global(name))
		.ok_or_else(|| EvalError::Reference(name.to_string()))
}

fn arrow(params: Rc<[Rc<str>]>, body: Rc<Expr>, env: &Env) -> Function {
	let captured = env.clone();
	Function::new("anonymous", move |_this, args| {
		let vars = params
			.iter()
			.enumerate()
			.map(|(i, name)| (name.clone(), args.get(i).cloned().unwrap_or_default()));
		let local = Locals::new(vars, captured.clone());
		eval(&body, &local).unwrap_or_else(|err| {
			crate::warn_log!(error = %err, "arrow function failed");
			Value::Undefined
		})
	})
}

/// Property read with the receiver's kind deciding the lookup
pub(crate) fn get_property(target: &Value, name: &str) -> EvalResult<Value> {
	match target {
		Value::Undefined | Value::Null => Err(EvalError::Type(format!(
			"cannot read properties of {} (reading '{name}')",
			target.to_js_string()
		))),
		Value::Object(object) => Ok(object.get(name)),
		Value::String(s) => Ok(match name {
			"length" => Value::from(s.chars().count()),
			_ => name
				.parse::<usize>()
				.ok()
				.and_then(|i| s.chars().nth(i))
				.map(|c| Value::from(c.to_string()))
				.unwrap_or_default(),
		}),
		Value::Function(f) if name == "name" => Ok(Value::from(f.name())),
		Value::Host(handle) => Ok(host::get(handle, name).unwrap_or_default()),
		_ => Ok(Value::Undefined),
	}
}

fn set_property(target: &Value, name: &str, value: Value) -> EvalResult<()> {
	match target {
		Value::Undefined | Value::Null => Err(EvalError::Type(format!(
			"cannot set properties of {} (setting '{name}')",
			target.to_js_string()
		))),
		Value::Object(object) => {
			object.set(name, value);
			Ok(())
		}
		Value::Host(handle) => {
			if host::set(handle, name, &value) {
				Ok(())
			} else {
				Err(EvalError::Type(format!("cannot set '{name}' on host value")))
			}
		}
		// Writes to primitives are silently dropped.
		_ => Ok(()),
	}
}

fn assign(target: &Expr, value: Value, env: &Env) -> EvalResult<()> {
	match target {
		Expr::Ident(name) => {
			if env.assign(name, value) {
				Ok(())
			} else {
				Err(EvalError::Reference(name.to_string()))
			}
		}
		Expr::Member {
			object, property, ..
		} => set_property(&eval(object, env)?, property, value),
		Expr::Index { object, index } => {
			let target = eval(object, env)?;
			let key = eval(index, env)?.to_js_string();
			set_property(&target, &key, value)
		}
		_ => Err(EvalError::Type("invalid assignment target".to_string())),
	}
}

/// Assign through an already compiled target expression
pub(crate) fn assign_expr(target: &Expr, value: Value, env: &Env) -> EvalResult<()> {
	if !target.is_assignable() {
		return Err(EvalError::Type("invalid assignment target".to_string()));
	}
	assign(target, value, env)
}

fn call(callee: &Expr, args: &[Expr], env: &Env) -> EvalResult<Value> {
	let (receiver, name, optional) = match callee {
		Expr::Member {
			object,
			property,
			optional,
		} => (eval(object, env)?, property.to_string(), *optional),
		Expr::Index { object, index } => {
			(eval(object, env)?, eval(index, env)?.to_js_string(), false)
		}
		_ => {
			let function = eval(callee, env)?;
			let args = eval_args(args, env)?;
			return match function {
				Value::Function(f) => Ok(f.call(&env.this_value(), &args)),
				other => Err(not_a_function(callee, &other)),
			};
		}
	};
	if optional && receiver.is_nullish() {
		return Ok(Value::Undefined);
	}
	let method = get_property(&receiver, &name)?;
	let args = eval_args(args, env)?;
	if let Value::Function(f) = &method {
		return Ok(f.call(&receiver, &args));
	}
	if let Some(result) = builtins::call_method(&receiver, &name, &args) {
		return result;
	}
	if let Value::Host(handle) = &receiver {
		if let Some(result) = host::call(handle, &name, &args) {
			return Ok(result);
		}
	}
	Err(EvalError::Type(format!("{name} is not a function")))
}

fn eval_args(args: &[Expr], env: &Env) -> EvalResult<Vec<Value>> {
	args.iter().map(|arg| eval(arg, env)).collect()
}

fn not_a_function(callee: &Expr, value: &Value) -> EvalError {
	let name = match callee {
		Expr::Ident(name) => name.to_string(),
		_ => value.type_of().to_string(),
	};
	EvalError::Type(format!("{name} is not a function"))
}

fn unary(op: UnaryOp, operand: &Expr, env: &Env) -> EvalResult<Value> {
	if op == UnaryOp::TypeOf {
		// `typeof` on an undeclared name is not an error.
		if let Expr::Ident(name) = operand {
			return Ok(Value::str(
				lookup(name, env).map_or("undefined", |v| v.type_of()),
			));
		}
		return Ok(Value::str(eval(operand, env)?.type_of()));
	}
	let value = eval(operand, env)?;
	Ok(match op {
		UnaryOp::Not => Value::Bool(!value.is_truthy()),
		UnaryOp::Neg => Value::Number(-value.to_number()),
		UnaryOp::Plus => Value::Number(value.to_number()),
		UnaryOp::TypeOf => Value::str(value.type_of()),
	})
}

fn is_stringy(value: &Value) -> bool {
	matches!(value, Value::String(_) | Value::Object(_) | Value::Host(_) | Value::Function(_))
}

pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
	let numbers = || (left.to_number(), right.to_number());
	match op {
		BinaryOp::Add => {
			if is_stringy(left) || is_stringy(right) {
				Value::from(format!("{}{}", left.to_js_string(), right.to_js_string()))
			} else {
				let (a, b) = numbers();
				Value::Number(a + b)
			}
		}
		BinaryOp::Sub => {
			let (a, b) = numbers();
			Value::Number(a - b)
		}
		BinaryOp::Mul => {
			let (a, b) = numbers();
			Value::Number(a * b)
		}
		BinaryOp::Div => {
			let (a, b) = numbers();
			Value::Number(a / b)
		}
		BinaryOp::Rem => {
			let (a, b) = numbers();
			Value::Number(a % b)
		}
		BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
			let ordering = match (left, right) {
				(Value::String(a), Value::String(b)) => Some(a.cmp(b)),
				_ => {
					let (a, b) = numbers();
					a.partial_cmp(&b)
				}
			};
			let Some(ordering) = ordering else {
				return Value::Bool(false);
			};
			Value::Bool(match op {
				BinaryOp::Lt => ordering.is_lt(),
				BinaryOp::Le => ordering.is_le(),
				BinaryOp::Gt => ordering.is_gt(),
				_ => ordering.is_ge(),
			})
		}
		BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
		BinaryOp::Ne => Value::Bool(!left.loose_eq(right)),
		BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
		BinaryOp::StrictNe => Value::Bool(!left.strict_eq(right)),
	}
}
