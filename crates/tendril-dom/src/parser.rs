//! HTML fragment parser using nom parser combinators
//!
//! Markup is split into tokens (start tags, end tags, text, comments) by nom
//! parsers, then a small tree builder assembles the tokens into live nodes.
//! The builder is forgiving the way browsers are: stray end tags are
//! ignored, unclosed elements are closed at the end of input, and a `<` that
//! does not start a tag is plain text (so `{{ a < b }}` survives).
//!
//! Tag and attribute names are lower-cased. Attribute values and text have
//! character references decoded; `script` and `style` contents are kept
//! verbatim.

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, tag_no_case, take_until, take_while, take_while1},
	character::complete::{char, multispace0, multispace1},
	combinator::{map, opt, recognize},
	multi::many0,
	sequence::{delimited, pair, preceded},
};

use crate::error::{ParseError, Result};
use crate::node::Node;

/// Elements that never have children or an end tag
pub const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

/// Elements whose content is raw text up to the matching end tag
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
	StartTag {
		name: String,
		attributes: Vec<(String, String)>,
		self_closing: bool,
	},
	EndTag(String),
	Text(&'a str),
	Comment(&'a str),
	Doctype,
}

// ============================================================================
// Nom Parsers
// ============================================================================

fn tag_name(input: &str) -> IResult<&str, &str> {
	recognize(pair(
		take_while1(|c: char| c.is_ascii_alphabetic()),
		take_while(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':' || c == '.'),
	))
	.parse(input)
}

fn attribute_name(input: &str) -> IResult<&str, &str> {
	take_while1(|c: char| {
		!c.is_whitespace() && !matches!(c, '/' | '>' | '=' | '"' | '\'' | '<')
	})
	.parse(input)
}

fn attribute_value(input: &str) -> IResult<&str, &str> {
	alt((
		delimited(char('"'), take_until("\""), char('"')),
		delimited(char('\''), take_until("'"), char('\'')),
		take_while1(|c: char| !c.is_whitespace() && !matches!(c, '>' | '"' | '\'' | '`')),
	))
	.parse(input)
}

fn attribute(input: &str) -> IResult<&str, (String, String)> {
	map(
		preceded(
			multispace1,
			pair(
				attribute_name,
				opt(preceded(
					(multispace0, char('='), multispace0),
					attribute_value,
				)),
			),
		),
		|(name, value)| {
			(
				name.to_ascii_lowercase(),
				value.map(decode_entities).unwrap_or_default(),
			)
		},
	)
	.parse(input)
}

fn start_tag(input: &str) -> IResult<&str, Token<'_>> {
	map(
		(
			char('<'),
			tag_name,
			many0(attribute),
			multispace0,
			opt(char('/')),
			char('>'),
		),
		|(_, name, attributes, _, slash, _)| Token::StartTag {
			name: name.to_ascii_lowercase(),
			attributes,
			self_closing: slash.is_some(),
		},
	)
	.parse(input)
}

fn end_tag(input: &str) -> IResult<&str, Token<'_>> {
	map(
		delimited(tag("</"), tag_name, pair(multispace0, char('>'))),
		|name: &str| Token::EndTag(name.to_ascii_lowercase()),
	)
	.parse(input)
}

fn comment(input: &str) -> IResult<&str, Token<'_>> {
	map(
		delimited(tag("<!--"), take_until("-->"), tag("-->")),
		Token::Comment,
	)
	.parse(input)
}

fn doctype(input: &str) -> IResult<&str, Token<'_>> {
	map(
		delimited(tag_no_case("<!doctype"), take_until(">"), char('>')),
		|_| Token::Doctype,
	)
	.parse(input)
}

fn text(input: &str) -> IResult<&str, Token<'_>> {
	map(take_while1(|c: char| c != '<'), Token::Text).parse(input)
}

fn markup(input: &str) -> IResult<&str, Token<'_>> {
	alt((comment, doctype, end_tag, start_tag)).parse(input)
}

// ============================================================================
// Tree building
// ============================================================================

struct TreeBuilder {
	root: Node,
	stack: Vec<Node>,
}

impl TreeBuilder {
	fn new() -> Self {
		let root = Node::fragment();
		Self {
			stack: vec![root.clone()],
			root,
		}
	}

	fn current(&self) -> &Node {
		// The root is never popped.
		&self.stack[self.stack.len() - 1]
	}

	fn append(&self, node: &Node) {
		if let Err(err) = self.current().append_child(node) {
			tracing::debug!(error = %err, "dropping node the tree builder could not place");
		}
	}

	fn open(&mut self, name: &str, attributes: Vec<(String, String)>) -> Node {
		// An <li>, <option> or <p> implicitly closes an open sibling of the same kind.
		if matches!(name, "li" | "option" | "p")
			&& self.current().local_name().as_deref() == Some(name)
		{
			self.stack.pop();
		}
		let element = Node::element(name);
		for (key, value) in attributes {
			if !element.has_attribute(&key) {
				element.set_attribute(&key, &value);
			}
		}
		self.append(&element);
		element
	}

	fn close(&mut self, name: &str) {
		let position = self
			.stack
			.iter()
			.rposition(|n| n.local_name().as_deref() == Some(name));
		match position {
			Some(index) if index > 0 => self.stack.truncate(index),
			_ => tracing::trace!(tag = name, "ignoring stray end tag"),
		}
	}
}

/// Parse `html` into a fragment of live nodes
pub fn parse_fragment(html: &str) -> Result<Node> {
	let mut builder = TreeBuilder::new();
	let mut input = html;

	while !input.is_empty() {
		let offset = html.len() - input.len();

		if input.starts_with("<!--") && !input.contains("-->") {
			return Err(ParseError::UnterminatedComment(offset).into());
		}

		if let Ok((rest, token)) = markup(input) {
			input = rest;
			match token {
				Token::StartTag {
					name,
					attributes,
					self_closing,
				} => {
					let element = builder.open(&name, attributes);
					if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !self_closing {
						input = raw_text(&element, &name, input, html.len() - input.len())?;
					} else if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
						builder.stack.push(element);
					}
				}
				Token::EndTag(name) => builder.close(&name),
				Token::Comment(data) => builder.append(&Node::comment(data)),
				Token::Doctype => {}
				Token::Text(_) => {}
			}
			continue;
		}

		match text(input) {
			Ok((rest, Token::Text(data))) => {
				builder.append(&Node::text(&decode_entities(data)));
				input = rest;
			}
			_ => {
				// A '<' that does not open any markup is literal text.
				builder.append(&Node::text("<"));
				input = &input[1..];
			}
		}
	}

	merge_adjacent_text(&builder.root);
	Ok(builder.root)
}

fn raw_text<'a>(element: &Node, name: &str, input: &'a str, offset: usize) -> Result<&'a str> {
	let lowered = input.to_ascii_lowercase();
	let close = format!("</{name}");
	let Some(end) = lowered.find(&close) else {
		return Err(ParseError::UnterminatedRawText {
			tag: name.to_string(),
			offset,
		}
		.into());
	};
	let content = &input[..end];
	if !content.is_empty() {
		let decoded = if matches!(name, "script" | "style") {
			content.to_string()
		} else {
			decode_entities(content)
		};
		element.append_child(&Node::text(&decoded))?;
	}
	let rest = &input[end..];
	let rest = match rest.find('>') {
		Some(gt) => &rest[gt + 1..],
		None => "",
	};
	Ok(rest)
}

fn merge_adjacent_text(node: &Node) {
	let mut previous: Option<Node> = None;
	for child in node.children() {
		if child.is_text() {
			if let Some(prev) = &previous {
				let merged = format!(
					"{}{}",
					prev.data().unwrap_or_default(),
					child.data().unwrap_or_default()
				);
				prev.set_data(&merged);
				child.remove();
				continue;
			}
			previous = Some(child);
		} else {
			previous = None;
			merge_adjacent_text(&child);
		}
	}
}

/// Decode character references (`&amp;`, `&#39;`, `&#x2F;`, ...)
///
/// Unknown references are left untouched.
pub fn decode_entities(input: &str) -> String {
	if !input.contains('&') {
		return input.to_string();
	}
	let mut out = String::with_capacity(input.len());
	let mut rest = input;
	while let Some(amp) = rest.find('&') {
		out.push_str(&rest[..amp]);
		rest = &rest[amp..];
		let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
			let entity = &rest[1..semi];
			let ch = match entity {
				"amp" => Some('&'),
				"lt" => Some('<'),
				"gt" => Some('>'),
				"quot" => Some('"'),
				"apos" => Some('\''),
				"nbsp" => Some('\u{a0}'),
				_ => entity
					.strip_prefix("#x")
					.or_else(|| entity.strip_prefix("#X"))
					.and_then(|hex| u32::from_str_radix(hex, 16).ok())
					.or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
					.and_then(char::from_u32),
			}?;
			Some((ch, semi))
		});
		match decoded {
			Some((ch, semi)) => {
				out.push(ch);
				rest = &rest[semi + 1..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::DomError;
	use rstest::rstest;

	#[rstest]
	fn test_start_tag_attributes() {
		let (rest, token) = start_tag(r#"<input :value="a > b" @input='go()' disabled/>x"#).unwrap();

		assert_eq!(rest, "x");
		assert_eq!(
			token,
			Token::StartTag {
				name: "input".to_string(),
				attributes: vec![
					(":value".to_string(), "a > b".to_string()),
					("@input".to_string(), "go()".to_string()),
					("disabled".to_string(), String::new()),
				],
				self_closing: true,
			}
		);
	}

	#[rstest]
	fn test_nested_elements_and_text() {
		let fragment = parse_fragment("<div id=app><p>{{ message }}</p><br><span>x</span></div>").unwrap();

		let div = fragment.first_child().unwrap();
		assert_eq!(div.get_attribute("id").as_deref(), Some("app"));
		assert_eq!(div.children().len(), 3);
		assert_eq!(div.first_child().unwrap().text_content(), "{{ message }}");
	}

	#[rstest]
	fn test_lone_angle_bracket_is_text() {
		let fragment = parse_fragment("<p>{{ a < b }}</p>").unwrap();

		let p = fragment.first_child().unwrap();
		assert_eq!(p.children().len(), 1);
		assert_eq!(p.text_content(), "{{ a < b }}");
	}

	#[rstest]
	fn test_names_are_lowercased() {
		let fragment = parse_fragment("<MyButton :Label=\"x\"></MyButton>").unwrap();

		let el = fragment.first_child().unwrap();
		assert_eq!(el.local_name().as_deref(), Some("mybutton"));
		assert!(el.has_attribute(":label"));
	}

	#[rstest]
	fn test_stray_end_tag_is_ignored() {
		let fragment = parse_fragment("<div>a</span>b</div>").unwrap();

		assert_eq!(fragment.first_child().unwrap().text_content(), "ab");
	}

	#[rstest]
	fn test_style_content_is_raw() {
		let fragment = parse_fragment("<style>.a > .b { color: red }</style>").unwrap();

		assert_eq!(fragment.first_child().unwrap().text_content(), ".a > .b { color: red }");
	}

	#[rstest]
	fn test_unterminated_comment_is_an_error() {
		assert_eq!(
			parse_fragment("<p></p><!-- open").unwrap_err(),
			DomError::Parse(ParseError::UnterminatedComment(7))
		);
	}

	#[rstest]
	#[case("a &amp; b", "a & b")]
	#[case("&lt;p&gt;", "<p>")]
	#[case("&#39;q&#x27;", "'q'")]
	#[case("fish & chips", "fish & chips")]
	#[case("&unknown;", "&unknown;")]
	fn test_decode_entities(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(decode_entities(input), expected);
	}
}
