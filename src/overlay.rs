//! Default failure presentation.

use crate::runtime::WeakRuntime;
use tracing::{error, info};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event, HtmlIFrameElement, KeyboardEvent};

const CONTAINER_STYLE: &str = "position: fixed; top: 0; left: 0; width: 100vw; height: 100vh; padding: 50px; box-sizing: border-box; \
	background-color: rgba(0, 0, 0, 0.6); z-index: 200000;";
const FRAME_STYLE: &str = "width: 100%; height: 100%; border: 0; border-radius: 5px; background-color: #fff;";

const EXPIRED_MESSAGE: &str = "This page has expired.\nWould you like to refresh the page?";

/// A full-viewport overlay showing raw response content in an `<iframe>`, so its styles and scripts stay away from the page.
///
/// Dismissed by clicking outside the frame or pressing Escape. Dropping it removes it from the document.
pub struct Overlay {
	document: Document,
	container: Element,
	_click: Closure<dyn FnMut(Event)>,
	keydown: Closure<dyn FnMut(KeyboardEvent)>,
}

fn dismiss(runtime: &WeakRuntime) {
	let runtime = runtime.clone();
	// Deferred, since this drops the listener that is currently running.
	spawn_local(async move {
		if let Some(runtime) = runtime.upgrade() {
			runtime.dismiss_overlay()
		}
	});
}

impl Overlay {
	/// # Errors
	///
	/// Iff the browser refuses to build or insert the overlay.
	pub fn show(document: &Document, content: &str, runtime: WeakRuntime) -> Result<Self, JsValue> {
		let body = document.body().ok_or_else(|| JsValue::from_str("the document has no body"))?;
		let container = document.create_element("div")?;
		container.set_attribute("style", CONTAINER_STYLE)?;

		let frame = document.create_element("iframe")?.dyn_into::<HtmlIFrameElement>()?;
		frame.set_attribute("style", FRAME_STYLE)?;
		frame.set_srcdoc(content);
		container.append_child(&frame)?;

		let target = container.clone();
		let on_click = runtime.clone();
		let click = Closure::wrap(Box::new(move |event: Event| {
			let clicked = event.target().and_then(|target| target.dyn_into::<Element>().ok());
			if clicked.as_ref() == Some(&target) {
				dismiss(&on_click)
			}
		}) as Box<dyn FnMut(Event)>);
		container.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;

		body.append_child(&container)?;

		let keydown = Closure::wrap(Box::new(move |event: KeyboardEvent| {
			if event.key() == "Escape" {
				dismiss(&runtime)
			}
		}) as Box<dyn FnMut(KeyboardEvent)>);
		if let Err(error) = document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref()) {
			container.remove();
			return Err(error);
		}

		Ok(Self {
			document: document.clone(),
			container,
			_click: click,
			keydown,
		})
	}

	#[must_use]
	pub fn element(&self) -> &Element {
		&self.container
	}
}

impl Drop for Overlay {
	fn drop(&mut self) {
		if let Err(error) = self.document.remove_event_listener_with_callback("keydown", self.keydown.as_ref().unchecked_ref()) {
			error!("Failed to remove the overlay's keydown listener: {:?}", error)
		}
		self.container.remove();
	}
}

/// Asks whether to reload after the session expired, and does so if accepted.
pub fn offer_reload() {
	let window = match web_sys::window() {
		Some(window) => window,
		None => return error!("No window to offer a reload in."),
	};
	match window.confirm_with_message(EXPIRED_MESSAGE) {
		Ok(true) => {
			info!("Reloading expired page.");
			if let Err(error) = window.location().reload() {
				error!("Reload failed: {:?}", error)
			}
		}
		Ok(false) => (),
		Err(error) => error!("Could not show the reload prompt: {:?}", error),
	}
}
