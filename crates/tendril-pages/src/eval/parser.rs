//! Expression parser built on nom.
//!
//! Operator precedence, from loosest to tightest:
//! assignment and arrows, `?:`, `||` `??`, `&&`, equality, relational,
//! additive, multiplicative, unary, postfix `++`/`--`, member access and calls.

use std::rc::Rc;

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, take_while},
	character::complete::{char, digit0, digit1, multispace0, one_of, satisfy},
	combinator::{all_consuming, map, map_res, not, opt, recognize, value, verify},
	error::{Error, ErrorKind},
	multi::separated_list0,
	sequence::{delimited, pair, preceded, terminated},
};

use super::ast::{AssignOp, BinaryOp, Expr, LogicalOp, Program, Stmt, TemplatePart, UnaryOp};
use crate::error::EvalError;

type PResult<'a, T> = IResult<&'a str, T>;

const RESERVED: &[&str] = &[
	"true",
	"false",
	"null",
	"undefined",
	"this",
	"typeof",
	"return",
	"new",
	"function",
	"var",
	"let",
	"const",
	"if",
	"else",
];

/// Parse a statement body: expressions and `return` separated by `;`
pub fn parse_program(source: &str) -> Result<Program, EvalError> {
	let mut parser = all_consuming(delimited(
		separators,
		separated_list0(statement_separator, statement),
		separators,
	));
	match parser.parse(source) {
		Ok((_, statements)) => Ok(Program { statements }),
		Err(err) => Err(syntax_error(source, err)),
	}
}

fn separators(input: &str) -> PResult<'_, &str> {
	take_while(|c: char| c == ';' || c.is_whitespace()).parse(input)
}

fn statement_separator(input: &str) -> PResult<'_, ()> {
	value((), (multispace0, char(';'), separators)).parse(input)
}

/// Parse a single expression
pub fn parse_expression(source: &str) -> Result<Expr, EvalError> {
	match all_consuming(delimited(multispace0, expression, multispace0)).parse(source) {
		Ok((_, expr)) => Ok(expr),
		Err(err) => Err(syntax_error(source, err)),
	}
}

fn syntax_error(source: &str, err: nom::Err<Error<&str>>) -> EvalError {
	let offset = match &err {
		nom::Err::Error(e) | nom::Err::Failure(e) => source.len() - e.input.len(),
		nom::Err::Incomplete(_) => source.len(),
	};
	EvalError::Syntax {
		expression: source.to_string(),
		offset,
	}
}

fn fail<T>(input: &str, kind: ErrorKind) -> PResult<'_, T> {
	Err(nom::Err::Error(Error::new(input, kind)))
}

fn ws<'a, O, P>(parser: P) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
	P: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
	delimited(multispace0, parser, multispace0)
}

fn is_ident_start(c: char) -> bool {
	c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
	c.is_alphanumeric() || c == '_' || c == '$'
}

fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
	terminated(tag(word), not(satisfy(is_ident_char)))
}

/// Any identifier-shaped word, reserved or not (property names)
fn identifier_name(input: &str) -> PResult<'_, &str> {
	recognize(pair(satisfy(is_ident_start), take_while(is_ident_char))).parse(input)
}

fn identifier(input: &str) -> PResult<'_, &str> {
	verify(identifier_name, |name: &str| !RESERVED.contains(&name)).parse(input)
}

// ----------------------------------------------------------------------
// Statements
// ----------------------------------------------------------------------

fn statement(input: &str) -> PResult<'_, Stmt> {
	alt((
		map(
			preceded(keyword("return"), opt(preceded(multispace0, expression))),
			Stmt::Return,
		),
		map(expression, Stmt::Expr),
	))
	.parse(input)
}

pub(crate) fn expression(input: &str) -> PResult<'_, Expr> {
	assignment(input)
}

// ----------------------------------------------------------------------
// Assignment and arrows
// ----------------------------------------------------------------------

fn assignment(input: &str) -> PResult<'_, Expr> {
	if let Ok(result) = arrow(input) {
		return Ok(result);
	}
	let (rest, target) = conditional(input)?;
	let (after_op, op) = match ws(assign_op).parse(rest) {
		Ok(found) => found,
		Err(_) => return Ok((rest, target)),
	};
	if !target.is_assignable() {
		return fail(rest, ErrorKind::Verify);
	}
	let (rest, value) = assignment(after_op)?;
	Ok((rest, Expr::Assign(op, Box::new(target), Box::new(value))))
}

fn assign_op(input: &str) -> PResult<'_, AssignOp> {
	alt((
		value(AssignOp::Compound(BinaryOp::Add), tag("+=")),
		value(AssignOp::Compound(BinaryOp::Sub), tag("-=")),
		value(AssignOp::Compound(BinaryOp::Mul), tag("*=")),
		value(AssignOp::Compound(BinaryOp::Div), tag("/=")),
		value(AssignOp::Compound(BinaryOp::Rem), tag("%=")),
		value(AssignOp::Assign, terminated(char('='), not(one_of("=>")))),
	))
	.parse(input)
}

fn arrow(input: &str) -> PResult<'_, Expr> {
	let params = alt((
		map(identifier, |name| vec![Rc::<str>::from(name)]),
		delimited(
			char('('),
			separated_list0(ws(char(',')), map(ws(identifier), Rc::<str>::from)),
			preceded(multispace0, char(')')),
		),
	));
	let (rest, (params, _, body)) = (params, ws(tag("=>")), assignment).parse(input)?;
	Ok((rest, Expr::Arrow(Rc::from(params), Rc::new(body))))
}

// ----------------------------------------------------------------------
// Conditional and binary levels
// ----------------------------------------------------------------------

fn conditional(input: &str) -> PResult<'_, Expr> {
	let (rest, test) = logical_or(input)?;
	let question = ws(terminated(char('?'), not(one_of("?."))));
	match (question, assignment, ws(char(':')), assignment).parse(rest) {
		Ok((rest, (_, consequent, _, alternate))) => Ok((
			rest,
			Expr::Conditional(Box::new(test), Box::new(consequent), Box::new(alternate)),
		)),
		Err(_) => Ok((rest, test)),
	}
}

/// Try each operator in order; an operator must not be followed by a
/// character that would make it a different token.
fn operator<'a, T: Copy>(input: &'a str, ops: &[(&'static str, &'static str, T)]) -> Option<(&'a str, T)> {
	let trimmed = input.trim_start();
	ops.iter().find_map(|(token, forbidden_next, op)| {
		let rest = trimmed.strip_prefix(*token)?;
		match rest.chars().next() {
			Some(c) if forbidden_next.contains(c) => None,
			_ => Some((rest.trim_start(), *op)),
		}
	})
}

fn logical_or(input: &str) -> PResult<'_, Expr> {
	let ops = [("||", "=", LogicalOp::Or), ("??", "=", LogicalOp::Nullish)];
	let (mut rest, mut left) = logical_and(input)?;
	while let Some((after, op)) = operator(rest, &ops) {
		let Ok((next, right)) = logical_and(after) else { break };
		left = Expr::Logical(op, Box::new(left), Box::new(right));
		rest = next;
	}
	Ok((rest, left))
}

fn logical_and(input: &str) -> PResult<'_, Expr> {
	let ops = [("&&", "=", LogicalOp::And)];
	let (mut rest, mut left) = equality(input)?;
	while let Some((after, op)) = operator(rest, &ops) {
		let Ok((next, right)) = equality(after) else { break };
		left = Expr::Logical(op, Box::new(left), Box::new(right));
		rest = next;
	}
	Ok((rest, left))
}

fn binary_level<'a>(
	input: &'a str,
	ops: &[(&'static str, &'static str, BinaryOp)],
	next: fn(&'a str) -> PResult<'a, Expr>,
) -> PResult<'a, Expr> {
	let (mut rest, mut left) = next(input)?;
	while let Some((after, op)) = operator(rest, ops) {
		let Ok((following, right)) = next(after) else { break };
		left = Expr::Binary(op, Box::new(left), Box::new(right));
		rest = following;
	}
	Ok((rest, left))
}

fn equality(input: &str) -> PResult<'_, Expr> {
	binary_level(
		input,
		&[
			("===", "", BinaryOp::StrictEq),
			("!==", "", BinaryOp::StrictNe),
			("==", "", BinaryOp::Eq),
			("!=", "", BinaryOp::Ne),
		],
		relational,
	)
}

fn relational(input: &str) -> PResult<'_, Expr> {
	binary_level(
		input,
		&[
			("<=", "", BinaryOp::Le),
			(">=", "", BinaryOp::Ge),
			("<", "=", BinaryOp::Lt),
			(">", "=", BinaryOp::Gt),
		],
		additive,
	)
}

fn additive(input: &str) -> PResult<'_, Expr> {
	binary_level(input, &[("+", "+=", BinaryOp::Add), ("-", "-=", BinaryOp::Sub)], multiplicative)
}

fn multiplicative(input: &str) -> PResult<'_, Expr> {
	binary_level(
		input,
		&[("*", "=", BinaryOp::Mul), ("/", "=", BinaryOp::Div), ("%", "=", BinaryOp::Rem)],
		unary,
	)
}

// ----------------------------------------------------------------------
// Unary and postfix
// ----------------------------------------------------------------------

fn unary(input: &str) -> PResult<'_, Expr> {
	let input = input.trim_start();
	if let Some(rest) = input.strip_prefix("++") {
		return update_prefix(rest, true);
	}
	if let Some(rest) = input.strip_prefix("--") {
		return update_prefix(rest, false);
	}
	let mut prefix = alt((
		value(UnaryOp::Not, char('!')),
		value(UnaryOp::Neg, char('-')),
		value(UnaryOp::Plus, char('+')),
		value(UnaryOp::TypeOf, keyword("typeof")),
	));
	match prefix.parse(input) {
		Ok((rest, op)) => {
			let (rest, operand) = unary(rest)?;
			Ok((rest, Expr::Unary(op, Box::new(operand))))
		}
		Err(_) => postfix(input),
	}
}

fn update_prefix(input: &str, increment: bool) -> PResult<'_, Expr> {
	let (rest, target) = unary(input)?;
	if !target.is_assignable() {
		return fail(input, ErrorKind::Verify);
	}
	Ok((
		rest,
		Expr::Update {
			increment,
			prefix: true,
			target: Box::new(target),
		},
	))
}

fn postfix(input: &str) -> PResult<'_, Expr> {
	let (rest, expr) = call_member(input)?;
	if !expr.is_assignable() {
		return Ok((rest, expr));
	}
	let mut update = preceded(
		multispace0::<&str, Error<&str>>,
		alt((value(true, tag("++")), value(false, tag("--")))),
	);
	match update.parse(rest) {
		Ok((rest, increment)) => Ok((
			rest,
			Expr::Update {
				increment,
				prefix: false,
				target: Box::new(expr),
			},
		)),
		Err(_) => Ok((rest, expr)),
	}
}

enum Access<'a> {
	Member(&'a str, bool),
	Index(Expr),
	Call(Vec<Expr>),
}

fn arguments(input: &str) -> PResult<'_, Vec<Expr>> {
	delimited(
		char('('),
		terminated(
			separated_list0(ws(char(',')), ws(expression)),
			opt(ws(char(','))),
		),
		preceded(multispace0, char(')')),
	)
	.parse(input)
}

fn access(input: &str) -> PResult<'_, Access<'_>> {
	preceded(
		multispace0,
		alt((
			map(preceded(tag("?."), ws(identifier_name)), |name| Access::Member(name, true)),
			map(
				preceded(terminated(char('.'), not(char('.'))), ws(identifier_name)),
				|name| Access::Member(name, false),
			),
			map(delimited(char('['), ws(expression), char(']')), Access::Index),
			map(arguments, Access::Call),
		)),
	)
	.parse(input)
}

fn call_member(input: &str) -> PResult<'_, Expr> {
	let (mut rest, mut expr) = primary(input)?;
	while let Ok((next, step)) = access(rest) {
		expr = match step {
			Access::Member(name, optional) => Expr::Member {
				object: Box::new(expr),
				property: Rc::from(name),
				optional,
			},
			Access::Index(index) => Expr::Index {
				object: Box::new(expr),
				index: Box::new(index),
			},
			Access::Call(args) => Expr::Call {
				callee: Box::new(expr),
				args,
			},
		};
		rest = next;
	}
	Ok((rest, expr))
}

// ----------------------------------------------------------------------
// Primaries
// ----------------------------------------------------------------------

fn primary(input: &str) -> PResult<'_, Expr> {
	preceded(
		multispace0,
		alt((
			map(number, Expr::Number),
			map(string_literal, Expr::Str),
			map(template_literal, Expr::Template),
			value(Expr::Bool(true), keyword("true")),
			value(Expr::Bool(false), keyword("false")),
			value(Expr::Null, keyword("null")),
			value(Expr::Undefined, keyword("undefined")),
			value(Expr::This, keyword("this")),
			map(identifier, |name| Expr::Ident(Rc::from(name))),
			delimited(char('('), ws(expression), char(')')),
			array_literal,
			object_literal,
		)),
	)
	.parse(input)
}

fn number(input: &str) -> PResult<'_, f64> {
	let exponent = || recognize((one_of("eE"), opt(one_of("+-")), digit1));
	terminated(
		map_res(
			alt((
				recognize((digit1, opt((char('.'), digit0)), opt(exponent()))),
				recognize((char('.'), digit1, opt(exponent()))),
			)),
			str::parse::<f64>,
		),
		not(satisfy(is_ident_char)),
	)
	.parse(input)
}

fn read_escape(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> Option<char> {
	let (_, escaped) = chars.next()?;
	Some(match escaped {
		'n' => '\n',
		't' => '\t',
		'r' => '\r',
		'b' => '\u{8}',
		'f' => '\u{c}',
		'v' => '\u{b}',
		'0' => '\0',
		'u' => {
			let mut code = String::new();
			if chars.peek().is_some_and(|(_, c)| *c == '{') {
				chars.next();
				for (_, c) in chars.by_ref() {
					if c == '}' {
						break;
					}
					code.push(c);
				}
			} else {
				for _ in 0..4 {
					code.push(chars.next()?.1);
				}
			}
			u32::from_str_radix(&code, 16).ok().and_then(char::from_u32)?
		}
		other => other,
	})
}

fn string_literal(input: &str) -> PResult<'_, Rc<str>> {
	let mut chars = input.char_indices().peekable();
	let quote = match chars.next() {
		Some((_, q @ ('\'' | '"'))) => q,
		_ => return fail(input, ErrorKind::Char),
	};
	let mut out = String::new();
	while let Some((i, c)) = chars.next() {
		if c == quote {
			return Ok((&input[i + 1..], Rc::from(out)));
		}
		if c == '\\' {
			match read_escape(&mut chars) {
				Some(decoded) => out.push(decoded),
				None => return fail(input, ErrorKind::Escaped),
			}
		} else {
			out.push(c);
		}
	}
	fail(input, ErrorKind::Char)
}

fn template_literal(input: &str) -> PResult<'_, Vec<TemplatePart>> {
	let Some(mut rest) = input.strip_prefix('`') else {
		return fail(input, ErrorKind::Char);
	};
	let mut parts = Vec::new();
	let mut text = String::new();
	loop {
		let mut chars = rest.char_indices().peekable();
		let Some((_, c)) = chars.next() else {
			return fail(input, ErrorKind::Char);
		};
		match c {
			'`' => {
				if !text.is_empty() {
					parts.push(TemplatePart::Text(Rc::from(text)));
				}
				return Ok((&rest[1..], parts));
			}
			'\\' => {
				let Some(decoded) = read_escape(&mut chars) else {
					return fail(rest, ErrorKind::Escaped);
				};
				text.push(decoded);
				rest = chars.peek().map_or("", |(i, _)| &rest[*i..]);
			}
			'$' if rest.starts_with("${") => {
				if !text.is_empty() {
					parts.push(TemplatePart::Text(Rc::from(std::mem::take(&mut text))));
				}
				let (after, expr) = terminated(ws(expression), char('}')).parse(&rest[2..])?;
				parts.push(TemplatePart::Expr(expr));
				rest = after;
			}
			other => {
				text.push(other);
				rest = &rest[other.len_utf8()..];
			}
		}
	}
}

fn array_literal(input: &str) -> PResult<'_, Expr> {
	map(
		delimited(
			char('['),
			terminated(
				separated_list0(ws(char(',')), ws(expression)),
				opt(ws(char(','))),
			),
			preceded(multispace0, char(']')),
		),
		Expr::Array,
	)
	.parse(input)
}

fn property_key(input: &str) -> PResult<'_, Rc<str>> {
	alt((
		map(identifier_name, Rc::from),
		string_literal,
		map(number, |n| Rc::from(tendril_reactive::format_number(n))),
	))
	.parse(input)
}

fn object_property(input: &str) -> PResult<'_, (Rc<str>, Expr)> {
	alt((
		map((property_key, ws(char(':')), expression), |(key, _, value)| (key, value)),
		map(identifier, |name| {
			let key: Rc<str> = Rc::from(name);
			(key.clone(), Expr::Ident(key))
		}),
	))
	.parse(input)
}

fn object_literal(input: &str) -> PResult<'_, Expr> {
	map(
		delimited(
			char('{'),
			terminated(
				separated_list0(ws(char(',')), ws(object_property)),
				opt(ws(char(','))),
			),
			preceded(multispace0, char('}')),
		),
		Expr::Object,
	)
	.parse(input)
}
