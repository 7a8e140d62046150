//! Simple CSS selectors using nom parser combinators
//!
//! Supported: type (`div`), universal (`*`), id (`#app`), class (`.item`),
//! attribute presence and equality (`[scope]`, `[type="text"]`), compound
//! selectors, descendant (` `) and child (`>`) combinators, and comma lists.

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, take_until, take_while1},
	character::complete::{char, multispace0, multispace1},
	combinator::{all_consuming, map, opt, value, verify},
	multi::{many0, separated_list1},
	sequence::{delimited, pair, preceded},
};

use crate::error::ParseError;
use crate::node::Node;

#[derive(Debug, Clone, PartialEq)]
enum Simple {
	Id(String),
	Class(String),
	Attribute { name: String, value: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
	tag: Option<String>,
	simples: Vec<Simple>,
}

impl Compound {
	fn matches(&self, node: &Node) -> bool {
		let Some(local) = node.local_name() else {
			return false;
		};
		if let Some(tag) = &self.tag {
			if **tag != *local {
				return false;
			}
		}
		self.simples.iter().all(|simple| match simple {
			Simple::Id(id) => node.id().as_deref() == Some(id.as_str()),
			Simple::Class(class) => node.has_class(class),
			Simple::Attribute { name, value: None } => node.has_attribute(name),
			Simple::Attribute {
				name,
				value: Some(expected),
			} => node.get_attribute(name).as_deref() == Some(expected.as_str()),
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
	Descendant,
	Child,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
	compounds: Vec<Compound>,
	combinators: Vec<Combinator>,
}

fn match_from(compounds: &[Compound], combinators: &[Combinator], node: &Node) -> bool {
	let Some((last, leading)) = compounds.split_last() else {
		return false;
	};
	if !last.matches(node) {
		return false;
	}
	let Some((combinator, leading_combinators)) = combinators.split_last() else {
		return true;
	};
	match combinator {
		Combinator::Child => node
			.parent()
			.is_some_and(|p| match_from(leading, leading_combinators, &p)),
		Combinator::Descendant => {
			let mut current = node.parent();
			while let Some(ancestor) = current {
				if match_from(leading, leading_combinators, &ancestor) {
					return true;
				}
				current = ancestor.parent();
			}
			false
		}
	}
}

/// A parsed, comma-separated selector list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(Vec<Complex>);

impl SelectorList {
	pub fn parse(selector: &str) -> Result<Self, ParseError> {
		all_consuming(delimited(multispace0, selector_list, multispace0))
			.parse(selector)
			.map(|(_, list)| list)
			.map_err(|_| ParseError::InvalidSelector(selector.to_string()))
	}

	/// Whether `node` matches any selector in the list
	pub fn matches(&self, node: &Node) -> bool {
		self.0
			.iter()
			.any(|c| match_from(&c.compounds, &c.combinators, node))
	}
}

// ============================================================================
// Nom Parsers
// ============================================================================

fn ident(input: &str) -> IResult<&str, &str> {
	take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_').parse(input)
}

fn attribute_selector(input: &str) -> IResult<&str, Simple> {
	let quoted = alt((
		delimited(char('"'), take_until("\""), char('"')),
		delimited(char('\''), take_until("'"), char('\'')),
		take_while1(|c: char| c != ']' && !c.is_whitespace()),
	));
	map(
		delimited(
			pair(char('['), multispace0),
			pair(
				take_while1(|c: char| c != '=' && c != ']' && !c.is_whitespace()),
				opt(preceded((multispace0, char('='), multispace0), quoted)),
			),
			pair(multispace0, char(']')),
		),
		|(name, value): (&str, Option<&str>)| Simple::Attribute {
			name: name.to_ascii_lowercase(),
			value: value.map(str::to_string),
		},
	)
	.parse(input)
}

fn simple(input: &str) -> IResult<&str, Simple> {
	alt((
		map(preceded(char('#'), ident), |id| Simple::Id(id.to_string())),
		map(preceded(char('.'), ident), |c| Simple::Class(c.to_string())),
		attribute_selector,
	))
	.parse(input)
}

fn compound(input: &str) -> IResult<&str, Compound> {
	let type_selector = alt((
		map(tag("*"), |_| None),
		map(ident, |t: &str| Some(t.to_ascii_lowercase())),
	));
	verify(
		map(pair(opt(type_selector), many0(simple)), |(tag, simples)| Compound {
			tag: tag.flatten(),
			simples,
		}),
		|c: &Compound| c.tag.is_some() || !c.simples.is_empty() || input.starts_with('*'),
	)
	.parse(input)
}

fn combinator(input: &str) -> IResult<&str, Combinator> {
	alt((
		value(
			Combinator::Child,
			delimited(multispace0, char('>'), multispace0),
		),
		value(Combinator::Descendant, multispace1),
	))
	.parse(input)
}

fn complex(input: &str) -> IResult<&str, Complex> {
	map(
		pair(compound, many0(pair(combinator, compound))),
		|(first, rest)| {
			let mut compounds = vec![first];
			let mut combinators = Vec::with_capacity(rest.len());
			for (comb, comp) in rest {
				combinators.push(comb);
				compounds.push(comp);
			}
			Complex {
				compounds,
				combinators,
			}
		},
	)
	.parse(input)
}

fn selector_list(input: &str) -> IResult<&str, SelectorList> {
	map(
		separated_list1(delimited(multispace0, char(','), multispace0), complex),
		SelectorList,
	)
	.parse(input)
}
