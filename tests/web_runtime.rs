#![cfg(target_arch = "wasm32")]

mod common;

use common::{document, init_logging, sleep, Fixture, ScriptedTransport};
use js_sys::{Array, Reflect};
use reactables_dom::{error::InitError, sync::PageResponse, EventContext, Runtime};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

const TWICE: &str = r#"<div r:id="twice" r:checksum="x" r:data='{}'><button r:click="go">go</button></div>"#;

/// Puts back the test page's body, address and title after a navigation replaced them.
struct PageRestore {
	body: HtmlElement,
	href: String,
	title: String,
}

impl PageRestore {
	fn new() -> Self {
		let document = document();
		Self {
			body: document.body().unwrap(),
			href: window().unwrap().location().href().unwrap(),
			title: document.title(),
		}
	}
}

impl Drop for PageRestore {
	fn drop(&mut self) {
		let document = document();
		document.set_body(Some(&self.body));
		document.set_title(&self.title);
		window().unwrap().history().unwrap().replace_state_with_url(&JsValue::NULL, "", Some(&self.href)).unwrap();
	}
}

fn record(runtime: &Runtime, log: &Rc<RefCell<Vec<String>>>, names: &[&'static str]) {
	for &name in names {
		let log = Rc::clone(log);
		runtime.on(name, Rc::new(move |_: &EventContext| log.borrow_mut().push(name.to_owned())));
	}
}

#[wasm_bindgen_test]
async fn init_twice_keeps_live_components() {
	init_logging();
	let fixture = Fixture::new(TWICE);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);

	runtime.init();
	let first = runtime.find("twice").unwrap();
	fixture
		.root()
		.insert_adjacent_html("afterend", r#"<div r:id="later" r:checksum="y" r:data='{"n":2}'></div>"#)
		.unwrap();

	runtime.init();
	assert_eq!(runtime.components().len(), 2);
	assert_eq!(runtime.find("twice").unwrap(), first);
	assert!(!first.is_disposed());
	assert_eq!(first.binding_count(), 1);
	assert_eq!(runtime.find("later").unwrap().data(), serde_json::json!({"n": 2}));

	fixture.find("button").dyn_into::<HtmlElement>().unwrap().click();
	sleep(10).await;
	assert_eq!(transport.count(), 1);
	assert_eq!(transport.requests()[0].id, "twice");
}

#[wasm_bindgen_test]
async fn navigation_swaps_body_and_replays_new_scripts() {
	init_logging();
	let marks = Array::new();
	Reflect::set(&window().unwrap(), &"navigationMarks".into(), &marks).unwrap();
	let old = Fixture::new(r#"<div r:id="old" r:checksum="x" r:data='{}'></div><script>navigationMarks.push('present')</script>"#);

	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	runtime.init();
	let previous = runtime.find("old").unwrap();

	let log = Rc::new(RefCell::new(Vec::new()));
	record(&runtime, &log, &["navigating", "ready", "navigated"]);

	transport.page(Ok(PageResponse::Document(
		r#"<!DOCTYPE html><html><head><title>Next page</title><script>navigationMarks.push('head')</script></head><body>
			<div r:id="next" r:checksum="x" r:data='{"page":2}'></div>
			<script>navigationMarks.push('present')</script>
			<script>navigationMarks.push('fresh')</script>
			<script r:once>navigationMarks.push('once')</script>
		</body></html>"#
			.to_owned(),
	)));

	let restore = PageRestore::new();
	runtime.navigate("?page=2").await;

	let document = document();
	let swapped = document.body().unwrap();
	let title = document.title();
	let href = window().unwrap().location().href().unwrap();
	drop(restore);

	assert_eq!(transport.fetched(), vec!["?page=2".to_owned()]);
	assert!(swapped.query_selector(r#"[r\:id="next"]"#).unwrap().is_some());
	assert!(swapped.query_selector(r#"[r\:id="old"]"#).unwrap().is_none());
	assert!(old.root().is_connected());
	assert_eq!(title, "Next page");
	assert!(href.ends_with("?page=2"));
	assert_eq!(marks.iter().map(|mark| mark.as_string().unwrap()).collect::<Vec<_>>(), ["head", "fresh"]);
	assert_eq!(*log.borrow(), ["navigating", "ready", "navigated"]);

	assert!(previous.is_disposed());
	assert_eq!(runtime.components().len(), 1);
	assert_eq!(runtime.find("next").unwrap().data(), serde_json::json!({"page": 2}));
	runtime.dispose();
}

#[wasm_bindgen_test]
async fn navigation_redirect_leaves_the_page_alone() {
	init_logging();
	let fixture = Fixture::new(r#"<div r:id="stays" r:checksum="x" r:data='{}'></div>"#);
	let transport = ScriptedTransport::new();
	let runtime = common::runtime(&transport);
	runtime.init();

	let log = Rc::new(RefCell::new(Vec::new()));
	record(&runtime, &log, &["navigating", "ready", "navigated"]);
	let redirects = Rc::new(RefCell::new(Vec::new()));
	{
		let redirects = Rc::clone(&redirects);
		runtime.on_redirect(Rc::new(move |url: &str| redirects.borrow_mut().push(url.to_owned())));
	}

	transport.page(Ok(PageResponse::Redirect("/login".to_owned())));
	runtime.navigate("/account").await;

	assert_eq!(*redirects.borrow(), ["/login"]);
	assert_eq!(*log.borrow(), ["navigating"]);
	assert!(fixture.root().is_connected());
	assert!(!runtime.find("stays").unwrap().is_disposed());
}

#[wasm_bindgen_test]
fn second_install_is_rejected() {
	init_logging();
	let _fixture = Fixture::new(r#"<div r:id="installed" r:checksum="x" r:data='{}'></div>"#);

	let installed = Runtime::install(common::options()).unwrap();
	assert!(installed.find("installed").is_some());
	assert_eq!(Runtime::install(common::options()).unwrap_err(), InitError::AlreadyInitialized);
	assert_eq!(Runtime::installed().unwrap().components().len(), 1);
	assert!(!installed.find("installed").unwrap().is_disposed());

	Runtime::uninstall();
	assert!(Runtime::installed().is_none());
	assert!(installed.find("installed").is_none());

	Runtime::install(common::options()).unwrap();
	assert!(Runtime::installed().is_some());
	Runtime::uninstall();
}
