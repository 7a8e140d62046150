//! Parse, query, mutate and dispatch against one live tree.

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;
use tendril_dom::{Document, Event, Node};

#[rstest]
fn text_node_identity_survives_updates() {
	let document = Document::with_body("<div scope><p>Hello</p></div>").unwrap();
	let p = document.query_selector("p").unwrap().unwrap();
	let text = p.first_child().unwrap();

	text.set_data("World");

	assert!(p.first_child().unwrap().ptr_eq(&text));
	assert_eq!(document.body().inner_html(), "<div scope=\"\"><p>World</p></div>");
}

#[rstest]
fn anchored_insertion_keeps_sibling_order() {
	let document = Document::with_body("<ul><li>a</li><!--anchor--><li>z</li></ul>").unwrap();
	let ul = document.query_selector("ul").unwrap().unwrap();
	let anchor = ul.children()[1].clone();

	for label in ["b", "c"] {
		let li = Node::element("li");
		li.set_text_content(label);
		anchor.before(&li).unwrap();
	}

	assert_eq!(ul.text_content(), "abcz");
}

#[rstest]
fn delegated_listener_sees_original_target() {
	let document = Document::with_body("<form><button id=\"go\">Go</button></form>").unwrap();
	let form = document.query_selector("form").unwrap().unwrap();
	let seen = Rc::new(RefCell::new(Vec::new()));
	let s = seen.clone();
	form.add_event_listener("click", move |event: &Event| {
		let target = event.target().unwrap();
		s.borrow_mut().push(target.id().unwrap_or_default());
		event.prevent_default();
	});

	let button = document.get_element_by_id("go").unwrap();
	let not_prevented = button.click();

	assert!(!not_prevented);
	assert_eq!(*seen.borrow(), vec!["go".to_string()]);
}
