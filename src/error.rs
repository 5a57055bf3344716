use thiserror::Error;
use wasm_bindgen::JsValue;

/// Why a remote sync (or a navigation fetch) did not produce a usable response.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
	/// HTTP 403. The checksum no longer matches the session.
	#[error("the page has expired")]
	SessionExpired,
	/// HTTP 200 whose `status` was falsy or missing.
	#[error("the server rejected the request")]
	Rejected { body: String },
	#[error("unexpected HTTP status {status}")]
	Status { status: u16, body: String },
	#[error("malformed response: {message}")]
	Malformed { message: String, body: String },
	#[error("network error")]
	Network,
	#[error("browser API failure: {0}")]
	Js(String),
}

impl SyncError {
	/// The raw response content to show in an error overlay, if the server sent any.
	#[must_use]
	pub fn body(&self) -> Option<&str> {
		match self {
			Self::Rejected { body } | Self::Status { body, .. } | Self::Malformed { body, .. } => Some(body),
			Self::SessionExpired | Self::Network | Self::Js(_) => None,
		}
	}
}

impl From<JsValue> for SyncError {
	fn from(value: JsValue) -> Self {
		Self::Js(format!("{:?}", value))
	}
}

/// Component markup that couldn't be turned into a component.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarkupError {
	#[error("missing attribute `{0}`")]
	MissingAttribute(&'static str),
	#[error("invalid JSON in `{attribute}`: {message}")]
	InvalidJson { attribute: &'static str, message: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InitError {
	#[error("the runtime is already initialized for this document")]
	AlreadyInitialized,
	#[error("no document is available")]
	NoDocument,
}
