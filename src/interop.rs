use serde_json::Value;
use tracing::error;
use wasm_bindgen::JsValue;
use web_sys::{CustomEvent, CustomEventInit, EventTarget};

/// Prefix of every DOM event this runtime dispatches itself.
pub const EVENT_PREFIX: &str = "reactables:";

/// Converts JSON into an equivalent JavaScript value. Unrepresentable input becomes `undefined`.
#[must_use]
pub fn to_js(value: &Value) -> JsValue {
	match serde_json::to_string(value).map(|json| js_sys::JSON::parse(&json)) {
		Ok(Ok(value)) => value,
		_ => {
			error!("Could not convert JSON into a JavaScript value.");
			JsValue::UNDEFINED
		}
	}
}

/// Converts a JavaScript value into JSON. Unrepresentable input (functions, cycles) becomes `null`.
#[must_use]
pub fn from_js(value: &JsValue) -> Value {
	let json = match js_sys::JSON::stringify(value) {
		Ok(json) => json,
		Err(_) => return Value::Null,
	};
	json.as_string().and_then(|json| serde_json::from_str(&json).ok()).unwrap_or(Value::Null)
}

/// Dispatches a bubbling [***CustomEvent***](https://developer.mozilla.org/en-US/docs/Web/API/CustomEvent) named exactly `name`.
pub fn dispatch_raw(target: &EventTarget, name: &str, detail: &JsValue) {
	let init = CustomEventInit::new();
	init.set_bubbles(true);
	init.set_detail(detail);
	match CustomEvent::new_with_event_init_dict(name, &init) {
		Ok(event) => {
			if let Err(error) = target.dispatch_event(&event) {
				error!("Dispatching {:?} failed: {:?}", name, error)
			}
		}
		Err(error) => error!("Creating event {:?} failed: {:?}", name, error),
	}
}

/// Dispatches `reactables:<name>` on `target`.
pub fn dispatch(target: &EventTarget, name: &str, detail: &Value) {
	dispatch_raw(target, &format!("{}{}", EVENT_PREFIX, name), &to_js(detail))
}
