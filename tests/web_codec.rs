#![cfg(target_arch = "wasm32")]

mod common;

use common::{init_logging, Fixture};
use reactables_dom::{
	codec::{Control, ControlValue},
	ModelPath,
};
use serde_json::{json, Value};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::HtmlInputElement;

wasm_bindgen_test_configure!(run_in_browser);

fn control(fixture: &Fixture, selector: &str) -> Control {
	Control::classify(&fixture.find(selector)).unwrap()
}

fn model(value: ControlValue) -> Value {
	match value {
		ControlValue::Model(value) => value,
		ControlValue::Files(_) => panic!("expected a model value"),
	}
}

#[wasm_bindgen_test]
fn allowlist_decides_participation() {
	init_logging();
	let fixture = Fixture::new(
		r#"<form>
			<input id="text"><input id="email" type="email"><input id="button" type="button">
			<textarea id="area"></textarea><input id="box" type="checkbox"><input id="upload" type="file">
			<div id="div"></div>
		</form>"#,
	);

	assert!(control(&fixture, "#text").is_text_like());
	assert!(control(&fixture, "#email").is_text_like());
	assert!(control(&fixture, "#area").is_text_like());
	assert!(matches!(control(&fixture, "#box"), Control::Check { custom: None, .. }));
	assert!(matches!(control(&fixture, "#upload"), Control::File(_)));
	assert!(Control::classify(&fixture.find("#button")).is_none());
	assert!(Control::classify(&fixture.find("#div")).is_none());
}

#[wasm_bindgen_test]
fn multi_select_projects_and_reads_arrays() {
	init_logging();
	let fixture = Fixture::new(r#"<select multiple><option value="a">A</option><option value="b">B</option><option value="c">C</option></select>"#);
	let select = control(&fixture, "select");
	let path = ModelPath::parse("picked[]");

	select.write(&path, Some(&json!(["c", "b"])));
	assert_eq!(model(select.read(&path, None)), json!(["b", "c"]));

	select.write(&path, None);
	assert_eq!(model(select.read(&path, None)), json!([]));
}

#[wasm_bindgen_test]
fn grouped_checkbox_matches_loosely() {
	init_logging();
	let fixture = Fixture::new(r#"<input type="checkbox" value="2">"#);
	let member = control(&fixture, "input");
	let input = fixture.root().dyn_into::<HtmlInputElement>().unwrap();
	let path = ModelPath::parse("ids[]");

	member.write(&path, Some(&json!([1, 2])));
	assert!(input.checked());

	input.set_checked(false);
	assert_eq!(model(member.read(&path, Some(&json!([1, 2])))), json!([1]));
}

#[wasm_bindgen_test]
fn radios_with_values_select_one() {
	init_logging();
	let fixture = Fixture::new(r#"<form><input id="s" type="radio" name="size" value="s"><input id="m" type="radio" name="size" value="m"></form>"#);
	let (small, medium) = (control(&fixture, "#s"), control(&fixture, "#m"));
	let path = ModelPath::parse("size");

	small.write(&path, Some(&json!("m")));
	medium.write(&path, Some(&json!("m")));
	assert_eq!(model(medium.read(&path, None)), json!("m"));
	assert_eq!(model(small.read(&path, None)), json!(false));
}

#[wasm_bindgen_test]
fn missing_value_leaves_text_untouched() {
	init_logging();
	let fixture = Fixture::new(r#"<input value="typed">"#);
	let text = control(&fixture, "input");
	let path = ModelPath::parse("profile.name");

	text.write(&path, None);
	assert_eq!(model(text.read(&path, None)), json!("typed"));

	text.write(&path, Some(&json!(42)));
	assert_eq!(model(text.read(&path, None)), json!("42"));
}
