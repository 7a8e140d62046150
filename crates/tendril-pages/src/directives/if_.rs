//! `v-if` / `v-else-if` / `v-else` conditional blocks.
//!
//! The chain's elements leave the DOM at setup and a `c-if` comment marks
//! the spot. One effect picks the first branch whose condition holds and
//! mounts it as a block before the marker; it remounts only when the
//! chosen branch changes.

use tendril_dom::Node;
use tendril_reactive::untrack;

use crate::block::Block;
use crate::context::Context;
use crate::eval;
use crate::walk::take_attribute;

struct Branch {
	condition: Option<String>,
	el: Node,
}

/// Set up the conditional rooted at `el`; returns where the walk resumes
pub fn process(el: &Node, exp: &str, ctx: &Context) -> Option<Node> {
	let Some(parent) = el.parent() else {
		crate::warn_log!(expression = exp, "v-if on a detached element");
		return None;
	};
	let anchor = Node::comment("c-if");
	if let Err(err) = parent.insert_before(&anchor, Some(el)) {
		crate::error_log!(error = %err, "failed to place v-if marker");
		return None;
	}

	let mut branches = vec![Branch {
		condition: Some(exp.to_string()),
		el: el.clone(),
	}];
	while let Some(sibling) = el.next_element_sibling() {
		let Some(condition) = else_condition(&sibling) else {
			break;
		};
		sibling.remove();
		branches.push(Branch {
			condition,
			el: sibling,
		});
	}

	let next = el.next_sibling();
	el.remove();

	let owner = ctx.clone();
	let env = ctx.env();
	let mut active: Option<(usize, Block)> = None;
	ctx.effect(move || {
		let chosen = branches.iter().position(|branch| {
			branch
				.condition
				.as_deref()
				.is_none_or(|condition| eval::evaluate(&env, condition).is_truthy())
		});
		if chosen == active.as_ref().map(|(index, _)| *index) {
			return;
		}
		if let Some((_, block)) = active.take() {
			block.remove();
		}
		if let Some(index) = chosen {
			let block = untrack(|| {
				let block = Block::new(&branches[index].el, &owner, false);
				block.insert(&parent, Some(&anchor));
				block
			});
			active = Some((index, block));
		}
	});

	next
}

/// `Some(None)` for `v-else`, `Some(Some(exp))` for `v-else-if`
fn else_condition(el: &Node) -> Option<Option<String>> {
	for name in ["v-else-if", "c-else-if"] {
		if let Some(exp) = take_attribute(el, name) {
			return Some(Some(exp));
		}
	}
	["v-else", "c-else"]
		.into_iter()
		.find_map(|name| take_attribute(el, name))
		.map(|_| None)
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serial_test::serial;
	use tendril_dom::Node;
	use tendril_reactive::{Value, run_microtasks};

	use crate::context::create_context;
	use crate::walk::walk;

	fn root(html: &str) -> Node {
		let root = Node::element("div");
		root.set_inner_html(html).unwrap();
		root
	}

	#[rstest]
	#[serial]
	fn test_switches_between_branches() {
		let ctx = create_context(None);
		ctx.scope().set("n", Value::from(1));
		let el = root(r#"<p v-if="n === 1">one</p><p v-else-if="n === 2">two</p><p v-else>many</p>"#);

		walk(&el, &ctx);
		assert_eq!(el.inner_html(), "<p>one</p><!--c-if-->");

		ctx.scope().set("n", Value::from(2));
		run_microtasks();
		assert_eq!(el.inner_html(), "<p>two</p><!--c-if-->");

		ctx.scope().set("n", Value::from(9));
		run_microtasks();
		assert_eq!(el.text_content(), "many");
	}

	#[rstest]
	#[serial]
	fn test_no_branch_mounts_nothing() {
		let ctx = create_context(None);
		ctx.scope().set("show", Value::Bool(true));
		let el = root(r#"<span v-if="show">x</span>"#);

		walk(&el, &ctx);
		assert_eq!(ctx.block_count(), 1);

		ctx.scope().set("show", Value::Bool(false));
		run_microtasks();
		assert_eq!(el.inner_html(), "<!--c-if-->");
		assert_eq!(ctx.block_count(), 0);
	}

	#[rstest]
	#[serial]
	fn test_inactive_branch_bindings_stop_updating() {
		let ctx = create_context(None);
		ctx.scope().set("on", Value::Bool(true));
		ctx.scope().set("label", Value::from("a"));
		let el = root(r#"<b v-if="on" v-text="label"></b><i v-else>off</i>"#);
		walk(&el, &ctx);
		let first = el.query_selector("b").unwrap().unwrap();

		ctx.scope().set("on", Value::Bool(false));
		run_microtasks();
		ctx.scope().set("label", Value::from("b"));
		run_microtasks();

		assert_eq!(first.text_content(), "a");
		assert!(el.query_selector("b").unwrap().is_none());
	}

	#[rstest]
	#[serial]
	fn test_same_branch_is_not_remounted() {
		let ctx = create_context(None);
		ctx.scope().set("n", Value::from(1));
		let el = root(r#"<p v-if="n > 0">pos</p>"#);
		walk(&el, &ctx);
		let mounted = el.query_selector("p").unwrap().unwrap();

		ctx.scope().set("n", Value::from(5));
		run_microtasks();

		assert!(el.query_selector("p").unwrap().unwrap().ptr_eq(&mounted));
	}
}
