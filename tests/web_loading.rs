#![cfg(target_arch = "wasm32")]

mod common;

use common::{init_logging, Fixture};
use reactables_dom::loading::toggle_loads;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::HtmlElement;

wasm_bindgen_test_configure!(run_in_browser);

const MARKUP: &str = r#"<div r:id="loads">
	<span id="spinner" r:loading>…</span>
	<span id="content" r:ready="block">done</span>
	<b id="busy" r:loading-class="busy dim" r:ready-class="ok"></b>
	<button id="send" r:loading-attr="disabled">send</button>
	<div r:id="nested"><span id="nested-spinner" r:loading>…</span></div>
</div>"#;

fn display(fixture: &Fixture, selector: &str) -> String {
	fixture.find(selector).dyn_into::<HtmlElement>().unwrap().style().get_property_value("display").unwrap()
}

fn snapshot(fixture: &Fixture) -> (String, String, String, bool) {
	(
		display(fixture, "#spinner"),
		display(fixture, "#content"),
		fixture.find("#busy").class_name(),
		fixture.find("#send").has_attribute("disabled"),
	)
}

#[wasm_bindgen_test]
fn loading_and_ready_are_idempotent_inverses() {
	init_logging();
	let fixture = Fixture::new(MARKUP);
	let root = fixture.root();

	toggle_loads(&root, false);
	let loading = snapshot(&fixture);
	assert_eq!(loading, ("inline-block".to_owned(), "none".to_owned(), "busy dim".to_owned(), true));
	toggle_loads(&root, false);
	assert_eq!(snapshot(&fixture), loading);

	toggle_loads(&root, true);
	let ready = snapshot(&fixture);
	assert_eq!(ready, ("none".to_owned(), "block".to_owned(), "ok".to_owned(), false));
	toggle_loads(&root, true);
	assert_eq!(snapshot(&fixture), ready);

	assert_eq!(display(&fixture, "#nested-spinner"), "");
}
