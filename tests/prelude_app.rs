//! The facade prelude is enough to build and drive an app.

use rstest::rstest;
use serde_json::json;
use serial_test::serial;
use tendril::prelude::*;

#[rstest]
#[serial]
fn todo_list_through_the_prelude() {
	let document = Document::with_body(
		r#"<div id="app"><input v-model="draft"><button @click="add">add</button><ul><li v-for="t in todos">{{ t }}</li></ul><p>{{ todos.length }} left</p></div>"#,
	)
	.unwrap();
	let app = create_app(
		AppOptions::new()
			.data(json!({ "draft": "", "todos": ["milk"] }))
			.method("add", |this, _| {
				if let Some(scope) = this.as_object() {
					let draft = scope.get("draft");
					if let Some(todos) = scope.get("todos").as_object() {
						todos.push(vec![draft]);
					}
					scope.set("draft", Value::from(""));
				}
				Value::Undefined
			})
			.document(document.clone()),
	);
	app.mount(MountTarget::Selector("#app".to_string())).unwrap();

	let input = document.query_selector("input").unwrap().unwrap();
	input.set_property("value", json!("eggs"));
	input.dispatch_event(&Event::new("input"));
	document.query_selector("button").unwrap().unwrap().click();
	run_microtasks();

	let list = document.query_selector("ul").unwrap().unwrap();
	assert_eq!(list.inner_html(), "<li>milk</li><li>eggs</li>");
	assert_eq!(document.query_selector("p").unwrap().unwrap().text_content(), "2 left");
	assert_eq!(input.value(), "");
}

#[rstest]
#[serial]
fn effects_from_the_prelude_follow_objects() {
	let state = Object::new_map();
	state.set("n", Value::from(1));
	let seen = Object::new_array(Vec::new());
	let (s, log) = (state.clone(), seen.clone());
	let _effect = Effect::new(move || {
		let n = s.get("n");
		untrack(|| log.push(vec![n]));
	});

	state.set("n", Value::from(2));
	state.set("n", Value::from(3));
	run_microtasks();

	assert_eq!(seen.to_json(), json!([1, 3]));
}
