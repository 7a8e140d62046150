//! Abstract syntax tree for template expressions.

use std::rc::Rc;

/// A compiled statement body
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
	pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
	Expr(Expr),
	Return(Option<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
	Not,
	Neg,
	Plus,
	TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Add,
	Sub,
	Mul,
	Div,
	Rem,
	Lt,
	Le,
	Gt,
	Ge,
	Eq,
	Ne,
	StrictEq,
	StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
	And,
	Or,
	Nullish,
}

/// `=`, or a compound assignment carrying its binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
	Assign,
	Compound(BinaryOp),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
	Text(Rc<str>),
	Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	Number(f64),
	Str(Rc<str>),
	Bool(bool),
	Null,
	Undefined,
	Template(Vec<TemplatePart>),
	Ident(Rc<str>),
	This,
	Array(Vec<Expr>),
	Object(Vec<(Rc<str>, Expr)>),
	Member {
		object: Box<Expr>,
		property: Rc<str>,
		optional: bool,
	},
	Index {
		object: Box<Expr>,
		index: Box<Expr>,
	},
	Call {
		callee: Box<Expr>,
		args: Vec<Expr>,
	},
	Unary(UnaryOp, Box<Expr>),
	Binary(BinaryOp, Box<Expr>, Box<Expr>),
	Logical(LogicalOp, Box<Expr>, Box<Expr>),
	Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
	Assign(AssignOp, Box<Expr>, Box<Expr>),
	Update {
		increment: bool,
		prefix: bool,
		target: Box<Expr>,
	},
	Arrow(Rc<[Rc<str>]>, Rc<Expr>),
}

impl Expr {
	/// Whether the expression can be assigned to
	pub fn is_assignable(&self) -> bool {
		matches!(
			self,
			Expr::Ident(_)
				| Expr::Member {
					optional: false,
					..
				} | Expr::Index { .. }
		)
	}
}
