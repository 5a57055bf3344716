//! Loads the server-rendered description of a component from its root element.

use crate::{attributes, error::MarkupError};
use serde::Deserialize;
use serde_json::Value;
use web_sys::Element;

/// Identity and initial state of a component, as rendered by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentMarkup {
	pub id: String,
	pub name: String,
	pub checksum: String,
	pub route: String,
	pub base_url: String,
	pub data: Value,
}

/// The nested form of `r:data`.
#[derive(Debug, Deserialize)]
struct Envelope {
	#[serde(default)]
	name: String,
	/// JSON-encoded model.
	data: String,
	checksum: String,
	#[serde(default)]
	base_url: String,
	#[serde(default)]
	route: String,
}

impl ComponentMarkup {
	/// Reads `element`'s component attributes. They are left in place, see [`attributes::TRANSIENT`].
	///
	/// # Errors
	///
	/// If `r:id` is missing, or the payload is neither the nested JSON form nor accompanied by `r:checksum`.
	pub fn load(element: &Element) -> Result<Self, MarkupError> {
		let id = element.get_attribute(attributes::COMPONENT_ID).ok_or(MarkupError::MissingAttribute(attributes::COMPONENT_ID))?;
		let raw = element.get_attribute(attributes::COMPONENT_DATA).unwrap_or_default();
		let attribute = |name: &'static str| element.get_attribute(name).unwrap_or_default();
		Self::from_parts(id, &raw, attribute)
	}

	/// Builds the markup from already extracted attributes. `attribute` returns an empty string for absent ones.
	///
	/// # Errors
	///
	/// See [`ComponentMarkup::load`].
	pub fn from_parts(id: String, raw_data: &str, attribute: impl Fn(&'static str) -> String) -> Result<Self, MarkupError> {
		let invalid = |name: &'static str| move |source: serde_json::Error| MarkupError::InvalidJson { attribute: name, message: source.to_string() };

		let parsed: Value = if raw_data.trim().is_empty() {
			Value::Object(serde_json::Map::new())
		} else {
			serde_json::from_str(raw_data).map_err(invalid(attributes::COMPONENT_DATA))?
		};

		let checksum = attribute(attributes::COMPONENT_CHECKSUM);
		if checksum.is_empty() && parsed.get("checksum").is_some() {
			let envelope: Envelope = serde_json::from_value(parsed).map_err(invalid(attributes::COMPONENT_DATA))?;
			let data = if envelope.data.trim().is_empty() {
				Value::Object(serde_json::Map::new())
			} else {
				serde_json::from_str(&envelope.data).map_err(invalid(attributes::COMPONENT_DATA))?
			};
			return Ok(Self {
				id,
				name: envelope.name,
				checksum: envelope.checksum,
				route: envelope.route,
				base_url: envelope.base_url,
				data,
			});
		}

		if checksum.is_empty() {
			return Err(MarkupError::MissingAttribute(attributes::COMPONENT_CHECKSUM));
		}
		Ok(Self {
			id,
			name: attribute(attributes::COMPONENT_NAME),
			checksum,
			route: attribute(attributes::COMPONENT_ROUTE),
			base_url: attribute(attributes::COMPONENT_BASE_URL),
			data: parsed,
		})
	}
}
