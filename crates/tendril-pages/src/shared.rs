//! String and value helpers shared by directives and components.

use std::sync::LazyLock;

use regex::Regex;
use tendril_reactive::{Object, Value};

static CAMELIZE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-(\w)").expect("valid regex"));
static STYLE_COMMENT_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"/\*[\s\S]*?\*/").expect("valid regex"));
static LEADING_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("valid regex")
});

/// Tags that are never resolved as components
pub const NATIVE_TAGS: &[&str] = &[
	"html", "head", "meta", "link", "script", "body", "div", "span", "p", "a", "img", "ul", "li",
	"ol", "table", "thead", "tbody", "tr", "th", "td", "button", "input", "select", "option",
	"textarea", "form", "header", "footer", "article", "section", "main", "nav", "aside", "h1",
	"h2", "h3", "h4", "h5", "h6", "iframe", "video", "audio", "canvas", "br", "hr", "label",
	"strong", "em", "b", "i", "u", "small", "template", "style", "svg", "path", "pre", "slot",
];

pub fn is_native_tag(tag: &str) -> bool {
	NATIVE_TAGS.contains(&tag)
}

/// `my-prop` -> `myProp`
pub fn camelize(s: &str) -> String {
	CAMELIZE_RE
		.replace_all(s, |caps: &regex::Captures<'_>| caps[1].to_uppercase())
		.into_owned()
}

/// `myProp` -> `my-prop`
pub fn hyphenate(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 4);
	let mut previous: Option<char> = None;
	for c in s.chars() {
		if c.is_ascii_uppercase() && previous.is_some_and(|p| p.is_alphanumeric() || p == '_') {
			out.push('-');
		}
		out.extend(c.to_lowercase());
		previous = Some(c);
	}
	out
}

pub fn capitalize(s: &str) -> String {
	let mut chars = s.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

/// Flatten a class binding into a space separated list
///
/// Strings pass through, arrays are flattened recursively, and maps
/// contribute the keys whose values are truthy.
pub fn normalize_class(value: &Value) -> String {
	let mut classes: Vec<String> = Vec::new();
	match value {
		Value::String(s) => return s.trim().to_string(),
		Value::Object(list) if list.is_array() => {
			for item in list.items() {
				let normalized = normalize_class(&item);
				if !normalized.is_empty() {
					classes.push(normalized);
				}
			}
		}
		Value::Object(map) => {
			for (name, enabled) in map.entries() {
				if enabled.is_truthy() {
					classes.push(name.to_string());
				}
			}
		}
		_ => {}
	}
	classes.join(" ")
}

/// Declarations of a CSS text, comments stripped
pub fn parse_string_style(css: &str) -> Vec<(String, String)> {
	let stripped = STYLE_COMMENT_RE.replace_all(css, "");
	split_declarations(&stripped)
		.into_iter()
		.filter_map(|item| {
			let (name, value) = item.split_once(':')?;
			let name = name.trim();
			(!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
		})
		.collect()
}

/// Split on `;` outside parentheses (`url(a;b)` stays whole)
fn split_declarations(css: &str) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut depth = 0usize;
	let mut start = 0;
	for (i, c) in css.char_indices() {
		match c {
			'(' => depth += 1,
			')' => depth = depth.saturating_sub(1),
			';' if depth == 0 => {
				parts.push(&css[start..i]);
				start = i + 1;
			}
			_ => {}
		}
	}
	parts.push(&css[start..]);
	parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

/// Flatten a style binding into ordered declarations
///
/// Keys of map bindings are hyphenated; custom properties (`--x`) are kept.
pub fn normalize_style(value: &Value) -> Vec<(String, String)> {
	let mut out: Vec<(String, String)> = Vec::new();
	let mut merge = |declarations: Vec<(String, String)>| {
		for (name, value) in declarations {
			out.retain(|(n, _)| *n != name);
			out.push((name, value));
		}
	};
	match value {
		Value::String(css) => merge(parse_string_style(css)),
		Value::Object(list) if list.is_array() => {
			for item in list.items() {
				merge(normalize_style(&item));
			}
		}
		Value::Object(map) => merge(
			map.entries()
				.into_iter()
				.filter(|(_, v)| !v.is_nullish())
				.map(|(k, v)| {
					let name = if k.starts_with("--") { k.to_string() } else { hyphenate(&k) };
					(name, v.to_js_string())
				})
				.collect(),
		),
		_ => {}
	}
	out
}

/// Structural equality used by form bindings
///
/// Arrays compare element-wise, maps key-wise; anything else compares by
/// string form.
pub fn loose_equal(a: &Value, b: &Value) -> bool {
	if a.strict_eq(b) {
		return true;
	}
	match (a.as_object(), b.as_object()) {
		(Some(x), Some(y)) if x.is_array() && y.is_array() => {
			let (xs, ys) = (x.items(), y.items());
			xs.len() == ys.len() && xs.iter().zip(&ys).all(|(p, q)| loose_equal(p, q))
		}
		(Some(x), Some(y)) if !x.is_array() && !y.is_array() => objects_loose_equal(x, y),
		(None, None) => a.to_js_string() == b.to_js_string(),
		_ => false,
	}
}

fn objects_loose_equal(a: &Object, b: &Object) -> bool {
	let (ak, bk) = (a.keys(), b.keys());
	ak.len() == bk.len()
		&& ak
			.iter()
			.all(|k| b.has_own(k) && loose_equal(&a.get(k), &b.get(k)))
}

/// Position of the first loosely equal item, if any
pub fn loose_index_of(items: &[Value], value: &Value) -> Option<usize> {
	items.iter().position(|item| loose_equal(item, value))
}

/// Leading-number parse; the input is returned unchanged when there is none
pub fn loose_to_number(value: &Value) -> Value {
	let text = value.to_js_string();
	LEADING_NUMBER_RE
		.find(&text)
		.and_then(|m| m.as_str().trim().parse::<f64>().ok())
		.map_or_else(|| value.clone(), Value::Number)
}

/// Strict numeric parse of strings; the input is returned unchanged otherwise
pub fn to_number(value: &Value) -> Value {
	match value {
		Value::String(s) => {
			let n = value.to_number();
			if n.is_nan() || s.trim().is_empty() { value.clone() } else { Value::Number(n) }
		}
		_ => value.clone(),
	}
}
