//! JSON shapes exchanged with the server.

use crate::path::truthy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A server-declared event, `{name, params}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
	pub name: String,
	#[serde(default = "empty_params")]
	pub params: Value,
}

fn empty_params() -> Value {
	Value::Array(Vec::new())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerEvents {
	#[serde(default)]
	pub component: Vec<ServerEvent>,
	#[serde(default)]
	pub global: Vec<ServerEvent>,
	#[serde(default)]
	pub browser: Vec<ServerEvent>,
}

impl ServerEvents {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.component.is_empty() && self.global.is_empty() && self.browser.is_empty()
	}
}

/// The body of a sync response, before classification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseBody {
	#[serde(default)]
	pub status: Value,
	#[serde(default)]
	pub redirect: Option<String>,
	#[serde(default)]
	pub html: Option<String>,
	/// Usually a JSON string, an inline object is accepted as well.
	#[serde(default)]
	pub data: Option<Value>,
	#[serde(default)]
	pub query: Option<String>,
	/// PHP encodes an empty event map as `[]`, which is why this isn't deserialized directly.
	#[serde(default)]
	pub events: Value,
}

/// A successful render: everything a component needs to update itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Render {
	pub html: Option<String>,
	pub data: Option<Value>,
	pub query: Option<String>,
	pub events: ServerEvents,
}

/// A classified successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
	Redirect(String),
	Render(Render),
}

impl ResponseBody {
	#[must_use]
	pub fn is_ok(&self) -> bool {
		truthy(&self.status)
	}

	/// Splits a successful body into its outcome. Call only if [`ResponseBody::is_ok`].
	///
	/// # Errors
	///
	/// If `data` is a string that does not contain JSON.
	pub fn into_outcome(self) -> Result<SyncOutcome, serde_json::Error> {
		if let Some(redirect) = self.redirect.filter(|redirect| !redirect.is_empty()) {
			return Ok(SyncOutcome::Redirect(redirect));
		}

		let data = match self.data {
			Some(Value::String(json)) => Some(serde_json::from_str(&json)?),
			Some(Value::Null) | None => None,
			Some(inline) => Some(inline),
		};

		let events = match self.events {
			Value::Object(_) => serde_json::from_value(self.events)?,
			_ => ServerEvents::default(),
		};

		Ok(SyncOutcome::Render(Render {
			html: self.html,
			data,
			query: self.query,
			events,
		}))
	}
}
