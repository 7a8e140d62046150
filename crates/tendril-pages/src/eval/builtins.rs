//! Built-in globals and methods on strings, numbers and arrays.

use std::cmp::Ordering;

use tendril_reactive::{Function, Object, Value, format_number};

use crate::error::{EvalError, EvalResult};

/// Longest string `repeat` and the padding methods will build, in chars
pub(crate) const MAX_STRING_LENGTH: usize = 1 << 28;

thread_local! {
	static GLOBALS: Object = build_globals();
}

/// Resolve a global name not declared in any scope
pub(crate) fn global(name: &str) -> Option<Value> {
	match name {
		"NaN" => return Some(Value::Number(f64::NAN)),
		"Infinity" => return Some(Value::Number(f64::INFINITY)),
		_ => {}
	}
	GLOBALS
		.try_with(|globals| globals.has_own(name).then(|| globals.get_untracked(name)))
		.ok()
		.flatten()
}

fn arg(args: &[Value], index: usize) -> Value {
	args.get(index).cloned().unwrap_or_default()
}

fn func(name: &str, f: impl Fn(&[Value]) -> Value + 'static) -> (String, Value) {
	(
		name.to_string(),
		Value::Function(Function::new(name, move |_, args| f(args))),
	)
}

fn namespace(entries: Vec<(String, Value)>) -> Value {
	Value::Object(Object::from_entries(entries))
}

fn build_globals() -> Object {
	let math = namespace(vec![
		func("floor", |a| Value::Number(arg(a, 0).to_number().floor())),
		func("ceil", |a| Value::Number(arg(a, 0).to_number().ceil())),
		func("round", |a| Value::Number((arg(a, 0).to_number() + 0.5).floor())),
		func("abs", |a| Value::Number(arg(a, 0).to_number().abs())),
		func("sqrt", |a| Value::Number(arg(a, 0).to_number().sqrt())),
		func("pow", |a| Value::Number(arg(a, 0).to_number().powf(arg(a, 1).to_number()))),
		func("min", |a| {
			Value::Number(a.iter().map(Value::to_number).fold(f64::INFINITY, f64::min))
		}),
		func("max", |a| {
			Value::Number(a.iter().map(Value::to_number).fold(f64::NEG_INFINITY, f64::max))
		}),
	]);
	let json = namespace(vec![
		func("stringify", |a| match a.first() {
			None | Some(Value::Undefined) | Some(Value::Function(_)) => Value::Undefined,
			Some(v) => {
				let pretty = a.get(2).is_some_and(Value::is_truthy);
				let text = if pretty {
					serde_json::to_string_pretty(&v.to_json())
				} else {
					serde_json::to_string(&v.to_json())
				};
				text.map(Value::from).unwrap_or_default()
			}
		}),
		func("parse", |a| {
			serde_json::from_str::<serde_json::Value>(&arg(a, 0).to_js_string())
				.map(Value::from_json)
				.unwrap_or_default()
		}),
	]);
	let object = namespace(vec![
		func("keys", |a| match a.first() {
			Some(Value::Object(o)) if o.is_array() => {
				Value::Object(Object::new_array((0..o.len()).map(|i| Value::from(i.to_string())).collect()))
			}
			Some(Value::Object(o)) => Value::Object(Object::new_array(
				o.keys().into_iter().map(Value::String).collect(),
			)),
			_ => Value::Object(Object::new_array(Vec::new())),
		}),
		func("values", |a| match a.first() {
			Some(Value::Object(o)) if o.is_array() => Value::Object(Object::new_array(o.items())),
			Some(Value::Object(o)) => Value::Object(Object::new_array(
				o.entries().into_iter().map(|(_, v)| v).collect(),
			)),
			_ => Value::Object(Object::new_array(Vec::new())),
		}),
		func("entries", |a| match a.first() {
			Some(Value::Object(o)) if !o.is_array() => Value::Object(Object::new_array(
				o.entries()
					.into_iter()
					.map(|(k, v)| Value::Object(Object::new_array(vec![Value::String(k), v])))
					.collect(),
			)),
			_ => Value::Object(Object::new_array(Vec::new())),
		}),
		func("assign", |a| {
			let Some(Value::Object(target)) = a.first() else {
				return arg(a, 0);
			};
			for source in a.iter().skip(1) {
				if let Value::Object(source) = source {
					for (k, v) in source.entries() {
						target.define(&k, v);
					}
				}
			}
			Value::Object(target.clone())
		}),
	]);
	let array = namespace(vec![func("isArray", |a| {
		Value::Bool(matches!(a.first(), Some(Value::Object(o)) if o.is_array()))
	})]);
	let console = namespace(vec![
		func("log", |a| {
			tracing::info!(target: "tendril::console", "{}", join_display(a));
			Value::Undefined
		}),
		func("warn", |a| {
			tracing::warn!(target: "tendril::console", "{}", join_display(a));
			Value::Undefined
		}),
		func("error", |a| {
			tracing::error!(target: "tendril::console", "{}", join_display(a));
			Value::Undefined
		}),
	]);

	Object::from_entries(vec![
		("Math".to_string(), math),
		("JSON".to_string(), json),
		("Object".to_string(), object),
		("Array".to_string(), array),
		("console".to_string(), console),
		func("$s", |a| Value::from(arg(a, 0).to_display_string())),
		func("String", |a| Value::from(arg(a, 0).to_js_string())),
		func("Number", |a| Value::Number(a.first().map_or(0.0, Value::to_number))),
		func("Boolean", |a| Value::Bool(arg(a, 0).is_truthy())),
		func("isNaN", |a| Value::Bool(arg(a, 0).to_number().is_nan())),
		func("parseFloat", |a| Value::Number(parse_float_prefix(&arg(a, 0).to_js_string()))),
		func("parseInt", |a| {
			let radix = a.get(1).map_or(10.0, Value::to_number) as u32;
			Value::Number(parse_int_prefix(&arg(a, 0).to_js_string(), radix))
		}),
	])
}

fn join_display(args: &[Value]) -> String {
	args.iter()
		.map(Value::to_display_string)
		.collect::<Vec<_>>()
		.join(" ")
}

fn parse_float_prefix(text: &str) -> f64 {
	let text = text.trim_start();
	let mut end = 0;
	let mut seen_dot = false;
	let mut seen_exp = false;
	for (i, c) in text.char_indices() {
		let accept = match c {
			'0'..='9' => true,
			'+' | '-' => i == 0 || text[..i].ends_with(['e', 'E']),
			'.' if !seen_dot && !seen_exp => {
				seen_dot = true;
				true
			}
			'e' | 'E' if !seen_exp && i > 0 => {
				seen_exp = true;
				true
			}
			_ => false,
		};
		if !accept {
			break;
		}
		end = i + c.len_utf8();
	}
	let mut candidate = &text[..end];
	while !candidate.is_empty() {
		if let Ok(n) = candidate.parse::<f64>() {
			return n;
		}
		candidate = &candidate[..candidate.len() - 1];
	}
	f64::NAN
}

fn parse_int_prefix(text: &str, radix: u32) -> f64 {
	let radix = if (2..=36).contains(&radix) { radix } else { 10 };
	let text = text.trim_start();
	let (negative, digits) = match text.strip_prefix('-') {
		Some(rest) => (true, rest),
		None => (false, text.strip_prefix('+').unwrap_or(text)),
	};
	let digits: String = digits.chars().take_while(|c| c.is_digit(radix)).collect();
	if digits.is_empty() {
		return f64::NAN;
	}
	let value = digits
		.chars()
		.filter_map(|c| c.to_digit(radix))
		.fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
	if negative { -value } else { value }
}

/// Index relative to `len`; negative counts from the end
fn relative(index: &Value, len: usize, default: usize) -> usize {
	if index.is_undefined() {
		return default;
	}
	let n = index.to_number();
	if n.is_nan() {
		return 0;
	}
	let n = n.trunc();
	if n < 0.0 {
		(len as f64 + n).max(0.0) as usize
	} else {
		(n as usize).min(len)
	}
}

/// Call a built-in method; `None` when the receiver has no such method
pub(crate) fn call_method(receiver: &Value, name: &str, args: &[Value]) -> Option<EvalResult<Value>> {
	match receiver {
		Value::Object(o) if o.is_array() => array_method(o, name, args).map(Ok),
		Value::Object(o) => match name {
			"hasOwnProperty" => Some(Ok(Value::Bool(o.has_own(&arg(args, 0).to_js_string())))),
			"toString" => Some(Ok(Value::from(receiver.to_js_string()))),
			_ => None,
		},
		Value::String(s) => string_method(s, name, args),
		Value::Number(n) => number_method(*n, name, args).map(Ok),
		Value::Bool(_) if name == "toString" => Some(Ok(Value::from(receiver.to_js_string()))),
		_ => None,
	}
}

/// Length in chars of `count` copies of a `unit`-char string
fn repeated_length(count: f64, unit: usize) -> EvalResult<usize> {
	if count.is_nan() {
		return Ok(0);
	}
	if count < 0.0 || count.is_infinite() {
		return Err(EvalError::Range("invalid count value".to_string()));
	}
	if unit == 0 {
		return Ok(0);
	}
	let total = count.trunc() * unit as f64;
	if total > MAX_STRING_LENGTH as f64 {
		return Err(EvalError::Range("invalid string length".to_string()));
	}
	Ok(total as usize)
}

fn callback(args: &[Value]) -> Option<Function> {
	args.first().and_then(Value::as_function).cloned()
}

fn array_method(array: &Object, name: &str, args: &[Value]) -> Option<Value> {
	let receiver = Value::Object(array.clone());
	let each = |f: &Function, item: &Value, index: usize| {
		f.call(&Value::Undefined, &[item.clone(), Value::from(index), receiver.clone()])
	};
	let result = match name {
		"push" => Value::from(array.push(args.to_vec())),
		"pop" => array.pop(),
		"shift" => array.shift(),
		"unshift" => Value::from(array.unshift(args.to_vec())),
		"splice" => {
			let len = array.len();
			let start = relative(&arg(args, 0), len, 0);
			let count = match args.get(1) {
				Some(count) => (count.to_number().max(0.0) as usize).min(len - start),
				None => len - start,
			};
			let inserted = args.iter().skip(2).cloned().collect();
			Value::Object(Object::new_array(array.splice(start, count, inserted)))
		}
		"slice" => {
			let items = array.items();
			let start = relative(&arg(args, 0), items.len(), 0);
			let end = relative(&arg(args, 1), items.len(), items.len());
			Value::Object(Object::new_array(
				items.get(start..end.max(start)).map(<[Value]>::to_vec).unwrap_or_default(),
			))
		}
		"concat" => {
			let mut items = array.items();
			for extra in args {
				match extra {
					Value::Object(o) if o.is_array() => items.extend(o.items()),
					other => items.push(other.clone()),
				}
			}
			Value::Object(Object::new_array(items))
		}
		"join" => {
			let sep = args.first().map_or_else(|| ",".to_string(), Value::to_js_string);
			Value::from(
				array
					.items()
					.iter()
					.map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
					.collect::<Vec<_>>()
					.join(&sep),
			)
		}
		"indexOf" => {
			let needle = arg(args, 0);
			Value::Number(
				array
					.items()
					.iter()
					.position(|v| v.strict_eq(&needle))
					.map_or(-1.0, |i| i as f64),
			)
		}
		"includes" => {
			let needle = arg(args, 0);
			Value::Bool(array.items().iter().any(|v| v.same(&needle)))
		}
		"reverse" => {
			array.reverse();
			receiver.clone()
		}
		"sort" => {
			match callback(args) {
				Some(compare) => array.sort_by(|a, b| {
					let n = compare
						.call(&Value::Undefined, &[a.clone(), b.clone()])
						.to_number();
					n.partial_cmp(&0.0).unwrap_or(Ordering::Equal)
				}),
				None => array.sort(),
			}
			receiver.clone()
		}
		"at" => {
			let len = array.len() as f64;
			let n = arg(args, 0).to_number().trunc();
			let index = if n < 0.0 { len + n } else { n };
			if index < 0.0 || index >= len {
				Value::Undefined
			} else {
				array.index(index as usize)
			}
		}
		"map" => {
			let f = callback(args)?;
			let items = array.items();
			Value::Object(Object::new_array(
				items.iter().enumerate().map(|(i, v)| each(&f, v, i)).collect(),
			))
		}
		"filter" => {
			let f = callback(args)?;
			let items = array.items();
			Value::Object(Object::new_array(
				items
					.iter()
					.enumerate()
					.filter(|(i, v)| each(&f, v, *i).is_truthy())
					.map(|(_, v)| v.clone())
					.collect(),
			))
		}
		"find" => {
			let f = callback(args)?;
			let items = array.items();
			items
				.iter()
				.enumerate()
				.find(|(i, v)| each(&f, v, *i).is_truthy())
				.map(|(_, v)| v.clone())
				.unwrap_or_default()
		}
		"findIndex" => {
			let f = callback(args)?;
			let items = array.items();
			Value::Number(
				items
					.iter()
					.enumerate()
					.position(|(i, v)| each(&f, v, i).is_truthy())
					.map_or(-1.0, |i| i as f64),
			)
		}
		"some" => {
			let f = callback(args)?;
			let items = array.items();
			Value::Bool(items.iter().enumerate().any(|(i, v)| each(&f, v, i).is_truthy()))
		}
		"every" => {
			let f = callback(args)?;
			let items = array.items();
			Value::Bool(items.iter().enumerate().all(|(i, v)| each(&f, v, i).is_truthy()))
		}
		"forEach" => {
			let f = callback(args)?;
			for (i, v) in array.items().iter().enumerate() {
				each(&f, v, i);
			}
			Value::Undefined
		}
		"reduce" => {
			let f = callback(args)?;
			let mut items = array.items().into_iter().enumerate();
			let mut acc = match args.get(1) {
				Some(initial) => initial.clone(),
				None => items.next().map(|(_, v)| v).unwrap_or_default(),
			};
			for (i, v) in items {
				acc = f.call(
					&Value::Undefined,
					&[acc, v, Value::from(i), receiver.clone()],
				);
			}
			acc
		}
		"toString" => Value::from(receiver.to_js_string()),
		_ => return None,
	};
	Some(result)
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
	s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Option<EvalResult<Value>> {
	let text = |i: usize| args.get(i).map(Value::to_js_string).unwrap_or_default();
	let len = s.chars().count();
	let result = match name {
		"toUpperCase" => Value::from(s.to_uppercase()),
		"toLowerCase" => Value::from(s.to_lowercase()),
		"trim" => Value::from(s.trim()),
		"trimStart" => Value::from(s.trim_start()),
		"trimEnd" => Value::from(s.trim_end()),
		"includes" => Value::Bool(s.contains(&text(0))),
		"startsWith" => Value::Bool(s.starts_with(&text(0))),
		"endsWith" => Value::Bool(s.ends_with(&text(0))),
		"indexOf" => Value::Number(
			s.find(&text(0))
				.map_or(-1.0, |byte| s[..byte].chars().count() as f64),
		),
		"charAt" => Value::from(char_slice(s, relative(&arg(args, 0), len, 0), relative(&arg(args, 0), len, 0) + 1)),
		"slice" => {
			let start = relative(&arg(args, 0), len, 0);
			let end = relative(&arg(args, 1), len, len);
			Value::from(char_slice(s, start, end))
		}
		"substring" => {
			let clamp = |v: &Value, default: usize| {
				if v.is_undefined() {
					default
				} else {
					(v.to_number().max(0.0) as usize).min(len)
				}
			};
			let a = clamp(&arg(args, 0), 0);
			let b = clamp(&arg(args, 1), len);
			Value::from(char_slice(s, a.min(b), a.max(b)))
		}
		"split" => {
			let parts: Vec<Value> = match args.first() {
				None | Some(Value::Undefined) => vec![Value::from(s)],
				Some(sep) => {
					let sep = sep.to_js_string();
					if sep.is_empty() {
						s.chars().map(|c| Value::from(c.to_string())).collect()
					} else {
						s.split(sep.as_str()).map(Value::from).collect()
					}
				}
			};
			Value::Object(Object::new_array(parts))
		}
		"replace" => Value::from(s.replacen(&text(0), &text(1), 1)),
		"replaceAll" => Value::from(s.replace(&text(0), &text(1))),
		"repeat" => match repeated_length(arg(args, 0).to_number(), len) {
			Ok(0) => Value::from(""),
			Ok(total) => Value::from(s.repeat(total / len)),
			Err(err) => return Some(Err(err)),
		},
		"padStart" | "padEnd" => {
			let target = match repeated_length(arg(args, 0).to_number().max(0.0), 1) {
				Ok(target) => target,
				Err(err) => return Some(Err(err)),
			};
			let fill = args.get(1).map_or_else(|| " ".to_string(), Value::to_js_string);
			if target <= len || fill.is_empty() {
				Value::from(s)
			} else {
				let padding: String = fill.chars().cycle().take(target - len).collect();
				if name == "padStart" {
					Value::from(format!("{padding}{s}"))
				} else {
					Value::from(format!("{s}{padding}"))
				}
			}
		}
		"concat" => Value::from(
			std::iter::once(s.to_string())
				.chain(args.iter().map(Value::to_js_string))
				.collect::<String>(),
		),
		"toString" => Value::from(s),
		_ => return None,
	};
	Some(Ok(result))
}

fn number_method(n: f64, name: &str, args: &[Value]) -> Option<Value> {
	match name {
		"toFixed" => {
			let digits = arg(args, 0).to_number();
			let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 100.0) as usize };
			Some(Value::from(format!("{n:.digits$}")))
		}
		"toString" => Some(Value::from(format_number(n))),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("42px", 42.0)]
	#[case("  -3.5e2 ", -350.0)]
	#[case(".5", 0.5)]
	fn test_parse_float_prefix(#[case] input: &str, #[case] expected: f64) {
		assert_eq!(parse_float_prefix(input), expected);
	}

	#[rstest]
	fn test_parse_int_prefix() {
		assert_eq!(parse_int_prefix("12abc", 10), 12.0);
		assert_eq!(parse_int_prefix("ff", 16), 255.0);
		assert!(parse_int_prefix("x1", 10).is_nan());
	}

	#[rstest]
	fn test_array_slice_with_negative_start() {
		let array = Object::new_array(vec![Value::from(1), Value::from(2), Value::from(3)]);
		let sliced = call_method(&Value::Object(array), "slice", &[Value::from(-2)]).unwrap();
		assert_eq!(sliced.unwrap().to_js_string(), "2,3");
	}

	#[rstest]
	fn test_string_pad_start() {
		let padded = string_method("7", "padStart", &[Value::from(3), Value::from("0")]).unwrap();
		assert_eq!(padded.unwrap().to_js_string(), "007");
	}

	#[rstest]
	#[case("repeat", 1e300)]
	#[case("repeat", f64::INFINITY)]
	#[case("repeat", -1.0)]
	#[case("padStart", 1e13)]
	#[case("padEnd", f64::INFINITY)]
	fn test_oversized_counts_are_range_errors(#[case] method: &str, #[case] count: f64) {
		let result = string_method("ab", method, &[Value::Number(count)]).unwrap();
		assert!(matches!(result, Err(EvalError::Range(_))));
	}

	#[rstest]
	fn test_repeat_within_bounds() {
		let repeated = string_method("ab", "repeat", &[Value::from(3)]).unwrap().unwrap();
		assert_eq!(repeated.to_js_string(), "ababab");
		let empty = string_method("", "repeat", &[Value::Number(1e300)]).unwrap().unwrap();
		assert_eq!(empty.to_js_string(), "");
	}

	#[rstest]
	fn test_globals_include_display_helper() {
		let s = global("$s").unwrap();
		let f = s.as_function().unwrap();
		assert_eq!(f.call(&Value::Undefined, &[Value::Null]).to_js_string(), "");
	}
}
