use crate::{attributes, scope::owned_elements};
use tracing::{error, instrument};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

const DEFAULT_DISPLAY: &str = "inline-block";

/// Applies the loading (`ready == false`) or ready state to every element in `root`'s scope that declares one.
///
/// Both directions are exact inverses of each other and applying the same state twice changes nothing.
#[instrument(skip(root))]
pub fn toggle_loads(root: &Element, ready: bool) {
	for element in owned_elements(root, attributes::LOADING) {
		let display = display_value(&element, attributes::LOADING);
		set_display(&element, if ready { "none" } else { display.as_str() });
	}
	for element in owned_elements(root, attributes::READY) {
		let display = display_value(&element, attributes::READY);
		set_display(&element, if ready { display.as_str() } else { "none" });
	}

	for element in owned_elements(root, attributes::LOADING_CLASS) {
		toggle_class(&element, attributes::LOADING_CLASS, !ready);
	}
	for element in owned_elements(root, attributes::READY_CLASS) {
		toggle_class(&element, attributes::READY_CLASS, ready);
	}

	for element in owned_elements(root, attributes::LOADING_ATTR) {
		toggle_attribute(&element, attributes::LOADING_ATTR, !ready);
	}
	for element in owned_elements(root, attributes::READY_ATTR) {
		toggle_attribute(&element, attributes::READY_ATTR, ready);
	}
}

fn display_value(element: &Element, attribute: &str) -> String {
	match element.get_attribute(attribute) {
		Some(value) if !value.trim().is_empty() => value.trim().to_owned(),
		_ => DEFAULT_DISPLAY.to_owned(),
	}
}

fn set_display(element: &Element, display: &str) {
	match element.dyn_ref::<HtmlElement>() {
		Some(html) => {
			if let Err(error) = html.style().set_property("display", display) {
				error!("Failed to set display: {:?}", error)
			}
		}
		None => error!("<{}> has no inline style to toggle.", element.tag_name()),
	}
}

fn toggle_class(element: &Element, attribute: &str, on: bool) {
	let classes = element.get_attribute(attribute).unwrap_or_default();
	for class in classes.split_whitespace() {
		let result = if on { element.class_list().add_1(class) } else { element.class_list().remove_1(class) };
		if let Err(error) = result {
			error!("Failed to toggle class {:?}: {:?}", class, error)
		}
	}
}

fn toggle_attribute(element: &Element, attribute: &str, on: bool) {
	let target = element.get_attribute(attribute).unwrap_or_default();
	let target = target.trim();
	if target.is_empty() {
		return;
	}
	let result = if on { element.set_attribute(target, "true") } else { element.remove_attribute(target) };
	if let Err(error) = result {
		error!("Failed to toggle attribute {:?}: {:?}", target, error)
	}
}
