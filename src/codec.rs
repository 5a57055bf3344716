//! Moves values between form controls and the component model.
//!
//! Only the controls in the allowlist below participate; anything else carrying `r:model` is ignored by the binder.

use crate::{
	attributes::TEXT_INPUT_TYPES,
	path::{display_string, loose_eq, toggle_member, truthy, ModelPath},
};
use serde_json::Value;
use wasm_bindgen::JsCast;
use web_sys::{Element, FileList, HtmlInputElement, HtmlOptionElement, HtmlSelectElement, HtmlTextAreaElement};

/// A model-bound form control.
#[derive(Debug, Clone)]
pub enum Control {
	Input(HtmlInputElement),
	TextArea(HtmlTextAreaElement),
	/// Checkbox or radio. `custom` is its `value` attribute, if any.
	Check { input: HtmlInputElement, custom: Option<String> },
	Select(HtmlSelectElement),
	File(HtmlInputElement),
}

/// What a control produced when read.
#[derive(Debug, Clone)]
pub enum ControlValue {
	Model(Value),
	Files(FileList),
}

impl Control {
	/// Classifies `element` against the control allowlist.
	#[must_use]
	pub fn classify(element: &Element) -> Option<Self> {
		if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
			return Some(Self::TextArea(textarea.clone()));
		}
		if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
			return Some(Self::Select(select.clone()));
		}
		let input = element.dyn_ref::<HtmlInputElement>()?;
		let kind = input.type_().to_ascii_lowercase();
		match kind.as_str() {
			"checkbox" | "radio" => Some(Self::Check {
				input: input.clone(),
				custom: input.get_attribute("value").filter(|custom| !custom.is_empty()),
			}),
			"file" => Some(Self::File(input.clone())),
			kind if TEXT_INPUT_TYPES.contains(&kind) => Some(Self::Input(input.clone())),
			_ => None,
		}
	}

	/// Whether model writes from this control are debounced by default.
	#[must_use]
	pub fn is_text_like(&self) -> bool {
		matches!(self, Self::Input(_) | Self::TextArea(_))
	}

	/// Projects the model value at `path` onto the control.
	///
	/// A missing value leaves the control untouched, except for grouped controls which are always synchronized with the array.
	pub fn write(&self, path: &ModelPath, value: Option<&Value>) {
		match self {
			Self::Input(input) => {
				if let Some(value) = value {
					input.set_value(&display_string(value))
				}
			}
			Self::TextArea(textarea) => {
				if let Some(value) = value {
					textarea.set_value(&display_string(value))
				}
			}
			Self::Check { input, custom } => {
				if path.is_grouped() {
					if let Some(custom) = custom {
						let checked = matches!(value, Some(Value::Array(items)) if items.iter().any(|item| loose_eq(item, custom)));
						input.set_checked(checked)
					}
				} else if let Some(value) = value {
					match custom {
						Some(custom) => input.set_checked(loose_eq(value, custom)),
						None => input.set_checked(truthy(value)),
					}
				}
			}
			Self::Select(select) => {
				if path.is_grouped() {
					let items = match value {
						Some(Value::Array(items)) => items.as_slice(),
						_ => &[],
					};
					for option in options(select) {
						option.set_selected(items.iter().any(|item| loose_eq(item, &option.value())))
					}
				} else if let Some(value) = value {
					select.set_value(&display_string(value))
				}
			}
			// File inputs cannot be written to.
			Self::File(_) => (),
		}
	}

	/// Captures the control's current value. `current` is the model value at the bound path, used by checkbox groups.
	#[must_use]
	pub fn read(&self, path: &ModelPath, current: Option<&Value>) -> ControlValue {
		ControlValue::Model(match self {
			Self::Input(input) => Value::String(input.value()),
			Self::TextArea(textarea) => Value::String(textarea.value()),
			Self::Check { input, custom } => match (path.is_grouped(), custom) {
				(true, Some(custom)) => toggle_member(current, custom, input.checked()),
				// A group member without a value cannot contribute anything.
				(true, None) => current.cloned().unwrap_or_else(|| Value::Array(Vec::new())),
				(false, Some(custom)) => {
					if input.checked() {
						Value::String(custom.clone())
					} else {
						Value::Bool(false)
					}
				}
				(false, None) => Value::Bool(input.checked()),
			},
			Self::Select(select) => {
				if path.is_grouped() {
					Value::Array(options(select).filter(HtmlOptionElement::selected).map(|option| Value::String(option.value())).collect())
				} else {
					Value::String(select.value())
				}
			}
			Self::File(input) => {
				return match input.files() {
					Some(files) => ControlValue::Files(files),
					None => ControlValue::Model(current.cloned().unwrap_or(Value::Null)),
				}
			}
		})
	}
}

fn options(select: &HtmlSelectElement) -> impl Iterator<Item = HtmlOptionElement> {
	let options = select.options();
	(0..options.length()).filter_map(move |i| options.item(i)).filter_map(|option| option.dyn_into::<HtmlOptionElement>().ok())
}
