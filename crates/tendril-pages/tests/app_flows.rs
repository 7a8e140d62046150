//! Whole-app behaviour: documents mounted through `create_app` and driven
//! by writes to the root scope.

use std::rc::Rc;

use rstest::rstest;
use serde_json::json;
use serial_test::serial;
use tendril_dom::Document;
use tendril_pages::eval::{evaluate, object_env};
use tendril_pages::{App, AppOptions, ComponentDefinition, MountTarget, create_app};
use tendril_reactive::{Object, Value, run_microtasks};

fn mounted(body: &str, options: AppOptions) -> (App, Document) {
	let document = Document::with_body(body).unwrap();
	let app = create_app(options.document(document.clone()));
	app.mount(MountTarget::Element(document.body().clone())).unwrap();
	(app, document)
}

#[rstest]
#[serial]
fn text_updates_reuse_the_rendered_node() {
	let (app, doc) = mounted(
		r#"<h1 :title="message">{{ message }}</h1>"#,
		AppOptions::new().data(json!({ "message": "Hello" })),
	);
	let heading = doc.body().first_child().unwrap();
	let text = heading.first_child().unwrap();

	app.scope().set("message", Value::from("World"));
	run_microtasks();

	assert_eq!(doc.body().inner_html(), r#"<h1 title="World">World</h1>"#);
	assert!(doc.body().first_child().unwrap().ptr_eq(&heading));
	assert!(heading.first_child().unwrap().ptr_eq(&text));
}

#[rstest]
#[serial]
fn conditional_switches_branches_and_releases_the_old_one() {
	let (app, doc) = mounted(
		r#"<p v-if="mode === 'a'">{{ label }} A</p><p v-else-if="mode === 'b'">B</p><p v-else>other</p>"#,
		AppOptions::new().data(json!({ "mode": "a", "label": "first" })),
	);
	assert_eq!(doc.body().text_content(), "first A");

	app.scope().set("mode", Value::from("b"));
	run_microtasks();
	assert_eq!(doc.body().text_content(), "B");
	assert_eq!(app.context().block_count(), 1);

	app.scope().set("mode", Value::from("zzz"));
	run_microtasks();
	assert_eq!(doc.body().text_content(), "other");

	// the torn down branch no longer reacts
	app.scope().set("label", Value::from("second"));
	run_microtasks();
	assert_eq!(doc.body().text_content(), "other");
}

#[rstest]
#[serial]
fn keyed_list_moves_existing_nodes() {
	let (app, doc) = mounted(
		r#"<ul><li v-for="item in items" :key="item.id">{{ item.name }}</li></ul>"#,
		AppOptions::new().data(json!({
			"items": [
				{ "id": 1, "name": "one" },
				{ "id": 2, "name": "two" },
				{ "id": 3, "name": "three" }
			]
		})),
	);
	let list = doc.body().first_child().unwrap();
	let before = list.element_children();
	assert_eq!(list.text_content(), "onetwothree");

	let items = app.scope().get("items").as_object().unwrap().clone();
	items.reverse();
	run_microtasks();

	let after = list.element_children();
	assert_eq!(list.text_content(), "threetwoone");
	assert!(after[0].ptr_eq(&before[2]));
	assert!(after[2].ptr_eq(&before[0]));

	items.pop();
	items.push(vec![Value::from_json(json!({ "id": 4, "name": "four" }))]);
	run_microtasks();
	assert_eq!(list.text_content(), "threetwofour");
	assert!(list.element_children()[0].ptr_eq(&before[2]));
}

#[rstest]
#[serial]
fn positional_list_follows_length_changes() {
	let (app, doc) = mounted(
		r#"<ol><li v-for="(n, i) in nums">{{ i }}:{{ n }}</li></ol>"#,
		AppOptions::new().data(json!({ "nums": [10, 20] })),
	);
	let nums = app.scope().get("nums").as_object().unwrap().clone();

	nums.push(vec![Value::from(30)]);
	run_microtasks();
	assert_eq!(doc.body().text_content(), "0:101:202:30");

	nums.splice(0, 2, Vec::new());
	run_microtasks();
	assert_eq!(doc.body().inner_html(), "<ol><li>0:30</li></ol>");
}

#[rstest]
#[serial]
fn props_flow_down_and_write_back_through_emit() {
	let counter = ComponentDefinition::new(
		r#"<span><b>{{ value }}</b><button @click="emit('value', value + step)">+</button></span>"#,
	)
	.prop("value", 0)
	.prop("step", 1);
	let (app, doc) = mounted(
		r#"<p>{{ total }}</p><step-counter :value="total" step="5" ref="c"></step-counter>"#,
		AppOptions::new()
			.data(json!({ "total": 1 }))
			.component("step-counter", counter),
	);
	assert_eq!(doc.body().text_content(), "11+");

	let instance = app.scope().get("$refs").as_object().unwrap().get("c");
	let instance = instance.as_object().unwrap().clone();
	assert_eq!(instance.get("step"), Value::from(5));
	assert_eq!(
		instance.get("$props").as_object().unwrap().get("$root_value"),
		Value::from("total")
	);

	doc.body().query_selector("button").unwrap().unwrap().click();
	run_microtasks();
	assert_eq!(app.scope().get("total"), Value::from(6));
	assert_eq!(doc.body().text_content(), "66+");

	app.scope().set("total", Value::from(0));
	run_microtasks();
	assert_eq!(doc.body().text_content(), "00+");
}

#[rstest]
#[serial]
fn component_slots_events_and_nesting() {
	let item = ComponentDefinition::new(r#"<li @click="emit('chosen', label)">{{ label }}</li>"#)
		.prop("label", "");
	let menu = ComponentDefinition::new(r#"<nav><h3><slot name="title">Menu</slot></h3><ul><slot></slot></ul></nav>"#);
	let (app, doc) = mounted(
		r#"<side-menu><menu-item v-for="l in labels" :label="l" @chosen="picked = $event"></menu-item></side-menu><em>{{ picked }}</em>"#,
		AppOptions::new()
			.data(json!({ "labels": ["a", "b"], "picked": "" }))
			.component("side-menu", menu)
			.component("menu-item", item),
	);
	assert_eq!(
		doc.body().inner_html(),
		"<nav><h3>Menu</h3><ul><li>a</li><li>b</li></ul></nav><em></em>"
	);

	let second = doc.body().query_selector_all("li").unwrap()[1].clone();
	second.click();
	run_microtasks();

	assert_eq!(app.scope().get("picked"), Value::from("b"));
	assert_eq!(doc.body().query_selector("em").unwrap().unwrap().text_content(), "b");
}

#[rstest]
#[serial]
fn model_and_show_share_state() {
	let (app, doc) = mounted(
		r#"<input v-model="name"><p v-show="name">Hi {{ name }}</p>"#,
		AppOptions::new().data(json!({ "name": "" })),
	);
	let input = doc.body().first_child().unwrap();
	let paragraph = input.next_sibling().unwrap();
	assert_eq!(paragraph.style_property("display").as_deref(), Some("none"));

	input.set_property("value", json!("Ann"));
	input.dispatch_event(&tendril_dom::Event::new("input"));
	run_microtasks();

	assert_eq!(app.scope().get("name"), Value::from("Ann"));
	assert_eq!(paragraph.style_property("display"), None);
	assert_eq!(paragraph.text_content(), "Hi Ann");
}

#[rstest]
#[serial]
fn custom_directives_receive_arguments_and_clean_up() {
	let (app, doc) = {
		let document = Document::with_body(r#"<div v-mark:color.loud="tone"></div>"#).unwrap();
		let app = create_app(AppOptions::new().data(json!({ "tone": "red" })).document(document.clone()));
		app.directive(
			"mark",
			Rc::new(|binding: &tendril_pages::DirectiveBinding<'_>| {
				let getter = binding.getter();
				let el = binding.el.clone();
				let name = format!("data-{}", binding.arg.unwrap_or("mark"));
				let loud = binding.has_modifier("loud");
				binding.effect(move || {
					let value = getter.get().to_js_string();
					let value = if loud { value.to_uppercase() } else { value };
					el.set_attribute(&name, &value);
				});
				let el = binding.el.clone();
				Some(Box::new(move || el.set_attribute("data-released", "")) as tendril_pages::Cleanup)
			}),
		);
		app.mount(MountTarget::Element(document.body().clone())).unwrap();
		(app, document)
	};
	let div = doc.body().first_child().unwrap();
	assert_eq!(div.get_attribute("data-color").as_deref(), Some("RED"));

	app.scope().set("tone", Value::from("blue"));
	run_microtasks();
	assert_eq!(div.get_attribute("data-color").as_deref(), Some("BLUE"));

	app.unmount();
	assert!(div.has_attribute("data-released"));
}

#[rstest]
#[case("a + b", Value::from(5))]
#[case("a * b - 1", Value::from(5))]
#[case("`${a}-${b}`", Value::from("2-3"))]
#[case("list.length", Value::from(2))]
#[case("a +", Value::Undefined)]
#[case("missing.deep", Value::Undefined)]
#[case("'ab'.repeat(1e300)", Value::Undefined)]
#[case("'x'.padStart(1e13)", Value::Undefined)]
#[case("'ab'.repeat(2)", Value::from("abab"))]
#[serial]
fn evaluator_results_and_failures(#[case] expression: &str, #[case] expected: Value) {
	let scope = Object::from_json(json!({ "a": 2, "b": 3, "list": [1, 2] }));
	assert_eq!(evaluate(&object_env(&scope), expression), expected);
}
