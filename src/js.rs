//! The JavaScript surface, exposed as `window.reactables` once [`start`] ran.

use crate::{
	action::ActionCall,
	component::{Component, EventContext, Listener},
	error::{InitError, SyncError},
	interop::{from_js, to_js},
	options::Options,
	path::ModelPath,
	runtime::Runtime,
};
use js_sys::{Array, Function, Object, Promise, Reflect};
use serde_json::Value;
use std::rc::Rc;
use tracing::error;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::Element;

fn set(object: &Object, key: &str, value: &JsValue) {
	if let Err(error) = Reflect::set(object, &JsValue::from_str(key), value) {
		error!("Failed to set {:?}: {:?}", key, error)
	}
}

fn component_value(component: Option<&Component>) -> JsValue {
	component.map_or(JsValue::NULL, |component| ComponentHandle { component: component.clone() }.into())
}

/// `{target, params}`, as received by JavaScript listeners.
fn context_value(context: &EventContext) -> JsValue {
	let object = Object::new();
	set(&object, "target", &component_value(context.target.as_ref()));
	set(&object, "params", &to_js(&context.params));
	object.into()
}

fn listener(callback: Function) -> Listener {
	Rc::new(move |context: &EventContext| {
		if let Err(error) = callback.call1(&JsValue::NULL, &context_value(context)) {
			error!("Event listener threw: {:?}", error)
		}
	})
}

/// Installs the runtime once the document is parsed (or right away, if it already is).
///
/// # Errors
///
/// Iff there is no document to install into or listening for it fails.
#[wasm_bindgen]
pub fn start() -> Result<(), JsValue> {
	let document = web_sys::window().and_then(|window| window.document()).ok_or_else(|| JsValue::from_str("no document"))?;
	if document.ready_state() == "loading" {
		let install = Closure::once_into_js(install);
		document.add_event_listener_with_callback("DOMContentLoaded", install.unchecked_ref())?;
	} else {
		install();
	}
	Ok(())
}

fn install() {
	match Runtime::install(Options::default()) {
		Ok(runtime) => {
			if let Some(window) = web_sys::window() {
				set(&window, "reactables", &ReactablesHandle { runtime }.into());
			}
		}
		// Already logged.
		Err(InitError::AlreadyInitialized) => (),
		Err(error) => error!("Reactables could not start: {}", error),
	}
}

#[wasm_bindgen(js_name = Reactables)]
pub struct ReactablesHandle {
	runtime: Runtime,
}

#[wasm_bindgen(js_class = Reactables)]
impl ReactablesHandle {
	/// The installed runtime, if any.
	pub fn current() -> Option<ReactablesHandle> {
		Runtime::installed().map(|runtime| Self { runtime })
	}

	pub fn init(&self) {
		self.runtime.init();
	}

	pub fn on(&self, name: &str, callback: Function) {
		self.runtime.on(name, listener(callback));
	}

	/// `callback(content, component)`. `content` is the raw response body when there is one.
	#[wasm_bindgen(js_name = onError)]
	pub fn on_error(&self, callback: Function) {
		self.runtime.on_error(Rc::new(move |error: &SyncError, component: Option<&Component>| {
			let content = error.body().map_or_else(|| error.to_string(), str::to_owned);
			if let Err(error) = callback.call2(&JsValue::NULL, &JsValue::from_str(&content), &component_value(component)) {
				error!("Error handler threw: {:?}", error)
			}
		}));
	}

	/// `callback(component)`.
	#[wasm_bindgen(js_name = onPageExpired)]
	pub fn on_page_expired(&self, callback: Function) {
		self.runtime.on_page_expired(Rc::new(move |component: Option<&Component>| {
			if let Err(error) = callback.call1(&JsValue::NULL, &component_value(component)) {
				error!("Page expired handler threw: {:?}", error)
			}
		}));
	}

	pub fn find(&self, id: &str) -> Option<ComponentHandle> {
		self.runtime.find(id).map(|component| ComponentHandle { component })
	}

	pub fn components(&self) -> Array {
		self.runtime.components().into_iter().map(|component| JsValue::from(ComponentHandle { component })).collect()
	}

	pub fn navigate(&self, url: String) -> Promise {
		let runtime = self.runtime.clone();
		future_to_promise(async move {
			runtime.navigate(&url).await;
			Ok(JsValue::UNDEFINED)
		})
	}
}

#[wasm_bindgen(js_name = ReactablesComponent)]
pub struct ComponentHandle {
	component: Component,
}

#[wasm_bindgen(js_class = ReactablesComponent)]
impl ComponentHandle {
	#[wasm_bindgen(getter)]
	pub fn id(&self) -> String {
		self.component.id().to_owned()
	}

	#[wasm_bindgen(getter)]
	pub fn name(&self) -> String {
		self.component.name().to_owned()
	}

	/// A copy of the data model.
	#[wasm_bindgen(getter)]
	pub fn data(&self) -> JsValue {
		to_js(&self.component.data())
	}

	#[wasm_bindgen(getter)]
	pub fn element(&self) -> Element {
		self.component.element().clone()
	}

	/// Writes into the data model without syncing.
	pub fn set(&self, path: &str, value: &JsValue) -> bool {
		self.component.set(&ModelPath::parse(path), from_js(value))
	}

	pub fn on(&self, name: &str, callback: Function) {
		self.component.on(name, listener(callback));
	}

	pub fn call(&self, method: String, params: Option<Array>) -> Promise {
		let params = match params.map(|params| from_js(&params)) {
			Some(Value::Array(params)) => params,
			_ => Vec::new(),
		};
		let component = self.component.clone();
		future_to_promise(async move {
			component.call(ActionCall { method, params }).await;
			Ok(JsValue::UNDEFINED)
		})
	}

	pub fn refresh(&self) -> Promise {
		let component = self.component.clone();
		future_to_promise(async move {
			component.refresh(None, None).await;
			Ok(JsValue::UNDEFINED)
		})
	}
}
