#![cfg(target_arch = "wasm32")]

mod common;

use common::{init_logging, sleep, Fixture, ScriptedTransport};
use js_sys::{Function, Reflect};
use reactables_dom::Render;
use serde_json::json;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Event, EventInit, HtmlElement, HtmlInputElement};

wasm_bindgen_test_configure!(run_in_browser);

const COUNTER: &str = r#"<div r:id="counter" r:checksum="x" r:data='{"count":0}'><button id="increment" r:click="increment">+</button></div>"#;

#[wasm_bindgen_test]
async fn one_click_one_request_after_rebinds() {
	init_logging();
	let fixture = Fixture::new(COUNTER);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	let component = runtime.mount(fixture.root()).unwrap();

	for _ in 0..3 {
		component.apply(Render {
			html: Some(COUNTER.to_owned()),
			..Render::default()
		});
	}
	assert_eq!(component.binding_count(), 1);
	assert_eq!(transport.count(), 0);

	fixture.find("#increment").dyn_into::<HtmlElement>().unwrap().click();
	sleep(10).await;

	let requests = transport.requests();
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].call.as_ref().unwrap().method, "increment");
}

#[wasm_bindgen_test]
async fn consumed_attributes_are_stripped() {
	init_logging();
	let fixture = Fixture::new(
		r#"<div r:id="stripped" r:checksum="x" r:data='{}'><button r:click="go" r:follow r:debounce="0">go</button></div>"#,
	);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	runtime.mount(fixture.root()).unwrap();

	let root = fixture.root();
	assert!(!root.has_attribute("r:checksum"));
	assert!(!root.has_attribute("r:data"));
	assert!(root.has_attribute("r:id"));
	let button = fixture.find("button");
	for attribute in ["r:click", "r:follow", "r:debounce"] {
		assert!(!button.has_attribute(attribute), "{} was left behind", attribute);
	}
}

#[wasm_bindgen_test]
async fn text_model_projects_then_debounces() {
	init_logging();
	let fixture = Fixture::new(r#"<div r:id="greeter" r:checksum="x" r:data='{"name":"Alice"}'><input type="text" r:model="name"></div>"#);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	let component = runtime.mount(fixture.root()).unwrap();

	let input = fixture.find("input").dyn_into::<HtmlInputElement>().unwrap();
	assert_eq!(input.value(), "Alice");

	for value in ["B", "Bo", "Bob"] {
		input.set_value(value);
		input.dispatch_event(&Event::new("input").unwrap()).unwrap();
	}
	assert_eq!(component.data(), json!({"name": "Bob"}));
	assert_eq!(transport.count(), 0);

	sleep(80).await;
	let requests = transport.requests();
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].data, json!({"name": "Bob"}));
	assert!(requests[0].call.is_none());
}

#[wasm_bindgen_test]
async fn lazy_model_updates_without_syncing() {
	init_logging();
	let fixture = Fixture::new(r#"<div r:id="lazy" r:checksum="x" r:data='{"q":""}'><input type="search" r:model="q" r:lazy></div>"#);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	let component = runtime.mount(fixture.root()).unwrap();

	let input = fixture.find("input").dyn_into::<HtmlInputElement>().unwrap();
	input.set_value("rust");
	input.dispatch_event(&Event::new("input").unwrap()).unwrap();

	sleep(60).await;
	assert_eq!(component.data(), json!({"q": "rust"}));
	assert_eq!(transport.count(), 0);
}

#[wasm_bindgen_test]
async fn checkbox_group_toggles_its_member() {
	init_logging();
	let fixture = Fixture::new(r#"<div r:id="tags" r:checksum="x" r:data='{"tags":["a"]}'><input type="checkbox" value="b" r:model="tags[]"></div>"#);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	let component = runtime.mount(fixture.root()).unwrap();

	let checkbox = fixture.find("input").dyn_into::<HtmlInputElement>().unwrap();
	assert!(!checkbox.checked());

	checkbox.click();
	assert_eq!(component.data(), json!({"tags": ["a", "b"]}));
	checkbox.click();
	assert_eq!(component.data(), json!({"tags": ["a"]}));

	sleep(10).await;
	assert_eq!(transport.count(), 2);
}

#[wasm_bindgen_test]
async fn debounced_action_collapses_bursts() {
	init_logging();
	let fixture = Fixture::new(r#"<div r:id="burst" r:checksum="x" r:data='{}'><button r:click="save('draft', 2)" r:debounce="40">save</button></div>"#);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	runtime.mount(fixture.root()).unwrap();

	let button = fixture.find("button").dyn_into::<HtmlElement>().unwrap();
	for _ in 0..5 {
		button.click();
	}
	sleep(10).await;
	assert_eq!(transport.count(), 0);

	sleep(100).await;
	let requests = transport.requests();
	assert_eq!(requests.len(), 1);
	let call = requests[0].call.as_ref().unwrap();
	assert_eq!(call.method, "save");
	assert_eq!(call.params, vec![json!("draft"), json!(2)]);
}

#[wasm_bindgen_test]
async fn key_filtered_action() {
	init_logging();
	let fixture = Fixture::new(r#"<div r:id="keys" r:checksum="x" r:data='{}'><input type="text" r:enter="submit"></div>"#);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	runtime.mount(fixture.root()).unwrap();

	let input = fixture.find("input");
	for key in ["a", "Enter"] {
		let init = web_sys::KeyboardEventInit::new();
		init.set_key(key);
		let event = web_sys::KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
		input.dispatch_event(&event).unwrap();
	}

	sleep(10).await;
	let requests = transport.requests();
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].call.as_ref().unwrap().method, "submit");
}

#[wasm_bindgen_test]
async fn repeat_ticks_until_disposed() {
	init_logging();
	let fixture = Fixture::new(r#"<div r:id="poller" r:checksum="x" r:data='{}'><span r:repeat="poll" r:interval="100"></span></div>"#);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	let component = runtime.mount(fixture.root()).unwrap();

	sleep(50).await;
	assert_eq!(transport.count(), 0);
	sleep(100).await;
	assert_eq!(transport.count(), 1);
	sleep(100).await;
	assert_eq!(transport.count(), 2);
	assert!(transport.requests().iter().all(|request| request.call.as_ref().unwrap().method == "poll"));

	component.dispose();
	sleep(250).await;
	assert_eq!(transport.count(), 2);
}

#[wasm_bindgen_test]
async fn init_fires_once() {
	init_logging();
	let markup = r#"<div r:id="loader" r:checksum="x" r:data='{}'><span id="load" r:init="load"></span></div>"#;
	let fixture = Fixture::new(markup);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	let component = runtime.mount(fixture.root()).unwrap();

	sleep(10).await;
	assert_eq!(transport.count(), 1);
	assert!(!fixture.find("#load").has_attribute("r:init"));

	component.apply(Render {
		html: Some(markup.to_owned()),
		..Render::default()
	});
	sleep(10).await;
	assert_eq!(transport.count(), 1);
	assert!(!fixture.find("#load").has_attribute("r:init"));
}

fn cancelable_click() -> Event {
	let init = EventInit::new();
	init.set_bubbles(true);
	init.set_cancelable(true);
	Event::new_with_event_init_dict("click", &init).unwrap()
}

/// Answers `window.confirm` with `answer` until dropped.
struct ConfirmAnswer(JsValue);

impl ConfirmAnswer {
	fn new(answer: bool) -> Self {
		let window = window().unwrap();
		let original = Reflect::get(&window, &"confirm".into()).unwrap();
		let confirm = Function::new_with_args("message", &format!("return {};", answer));
		Reflect::set(&window, &"confirm".into(), &confirm).unwrap();
		Self(original)
	}
}

impl Drop for ConfirmAnswer {
	fn drop(&mut self) {
		Reflect::set(&window().unwrap(), &"confirm".into(), &self.0).unwrap();
	}
}

#[wasm_bindgen_test]
async fn confirmation_gates_the_action() {
	init_logging();
	let fixture = Fixture::new(r##"<div r:id="gated" r:checksum="x" r:data='{}'><a href="#gone" r:click="remove" r:confirm="Really?">remove</a></div>"##);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	runtime.mount(fixture.root()).unwrap();
	let link = fixture.find("a");
	assert!(!link.has_attribute("r:confirm"));

	let declined = {
		let _answer = ConfirmAnswer::new(false);
		link.dispatch_event(&cancelable_click()).unwrap()
	};
	sleep(10).await;
	assert!(!declined, "a declined action must not follow the link");
	assert_eq!(transport.count(), 0);

	let accepted = {
		let _answer = ConfirmAnswer::new(true);
		link.dispatch_event(&cancelable_click()).unwrap()
	};
	sleep(10).await;
	assert!(!accepted);
	assert_eq!(transport.count(), 1);
	assert_eq!(transport.requests()[0].call.as_ref().unwrap().method, "remove");
}

#[wasm_bindgen_test]
async fn follow_keeps_the_default_action() {
	init_logging();
	let fixture = Fixture::new(
		r#"<div r:id="following" r:checksum="x" r:data='{}'><span id="kept" r:click="track" r:follow>kept</span><span id="prevented" r:click="track">prevented</span></div>"#,
	);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	runtime.mount(fixture.root()).unwrap();

	assert!(fixture.find("#kept").dispatch_event(&cancelable_click()).unwrap());
	assert!(!fixture.find("#prevented").dispatch_event(&cancelable_click()).unwrap());
	sleep(10).await;
	assert_eq!(transport.count(), 2);
}

#[wasm_bindgen_test]
async fn delayed_repeat_waits_for_timeout_and_interval() {
	init_logging();
	let fixture = Fixture::new(r#"<div r:id="delayed" r:checksum="x" r:data='{}'><span r:repeat="poll" r:interval="100" r:timeout="100"></span></div>"#);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	let component = runtime.mount(fixture.root()).unwrap();

	sleep(150).await;
	assert_eq!(transport.count(), 0);
	sleep(100).await;
	assert_eq!(transport.count(), 1);
	sleep(100).await;
	assert_eq!(transport.count(), 2);
	component.dispose();
}
