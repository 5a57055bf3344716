//! The remote sync channel: serializes component state into a request and classifies the response.
//!
//! This is a pure transport layer, applying a [`SyncOutcome`] is up to the component.

use crate::{
	action::ActionCall,
	error::SyncError,
	interop,
	wire::{ResponseBody, SyncOutcome},
};
use core::cell::Cell;
use futures_channel::oneshot;
use futures_util::future::LocalBoxFuture;
use serde_json::{json, Value};
use std::rc::Rc;
use tracing::{debug, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{EventTarget, FileList, FormData, ProgressEvent, XmlHttpRequest};

/// Marks requests as originating from this runtime.
pub const REQUEST_HEADER: &str = "X-Reactables";
/// Sent by the server on navigation responses that must become a plain page load.
pub const REDIRECT_HEADER: &str = "X-Reactables-Redirect";

/// Everything sent for one component refresh.
#[derive(Debug, Clone)]
pub struct SyncRequest {
	pub url: String,
	pub id: String,
	pub name: String,
	pub data: Value,
	pub checksum: String,
	pub route: String,
	pub call: Option<ActionCall>,
	/// Staged file selections by model name.
	pub files: Vec<(String, FileList)>,
}

impl SyncRequest {
	/// The multipart fields, in the order they are appended.
	#[must_use]
	pub fn fields(&self) -> Vec<(&'static str, String)> {
		let mut fields = vec![
			("id", self.id.clone()),
			("name", self.name.clone()),
			("data", self.data.to_string()),
			("checksum", self.checksum.clone()),
			("route", self.route.clone()),
		];
		if let Some(call) = &self.call {
			fields.push(("method", call.method.clone()));
			fields.push(("params", Value::Array(call.params.clone()).to_string()));
		}
		fields
	}

	/// Builds the multipart body.
	///
	/// # Errors
	///
	/// If the browser refuses to build the [`FormData`].
	pub fn form_data(&self) -> Result<FormData, SyncError> {
		let form = FormData::new()?;
		for (name, value) in self.fields() {
			form.append_with_str(name, &value)?;
		}
		for (model, files) in &self.files {
			let field = format!("{}[]", model);
			for file in (0..files.length()).filter_map(|i| files.get(i)) {
				form.append_with_blob(&field, &file)?;
			}
		}
		Ok(form)
	}
}

/// The response to a navigation fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResponse {
	Document(String),
	Redirect(String),
}

/// Carries requests to the server.
///
/// [`XhrTransport`] is the browser implementation. Others are mainly useful for tests.
pub trait Transport {
	/// Sends one sync request. Transport events are dispatched on `target`.
	fn send(&self, request: SyncRequest, target: EventTarget) -> LocalBoxFuture<'static, Result<SyncOutcome, SyncError>>;

	/// Fetches a whole page for [`Runtime::navigate`](`crate::Runtime::navigate`).
	fn fetch_page(&self, url: &str) -> LocalBoxFuture<'static, Result<PageResponse, SyncError>>;
}

/// Maps an HTTP status and body onto the sync contract.
///
/// # Errors
///
/// Every case but HTTP 200 with a truthy `status`.
pub fn classify(status: u16, body: String) -> Result<SyncOutcome, SyncError> {
	match status {
		200 => {
			let parsed: ResponseBody = match serde_json::from_str(&body) {
				Ok(parsed) => parsed,
				Err(error) => return Err(SyncError::Malformed { message: error.to_string(), body }),
			};
			if !parsed.is_ok() {
				return Err(SyncError::Rejected { body });
			}
			parsed.into_outcome().map_err(|error| SyncError::Malformed { message: error.to_string(), body })
		}
		403 => Err(SyncError::SessionExpired),
		0 => Err(SyncError::Network),
		status => Err(SyncError::Status { status, body }),
	}
}

/// `floor(loaded / total * 100)`, or [`None`] if the total is unknown.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percent(loaded: f64, total: f64) -> Option<u32> {
	if total > 0.0 {
		Some((loaded / total * 100.0).floor().clamp(0.0, 100.0) as u32)
	} else {
		None
	}
}

/// Sends requests through [`XmlHttpRequest`], which (unlike `fetch`) reports upload progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct XhrTransport;

impl Transport for XhrTransport {
	fn send(&self, request: SyncRequest, target: EventTarget) -> LocalBoxFuture<'static, Result<SyncOutcome, SyncError>> {
		Box::pin(send(request, target))
	}

	fn fetch_page(&self, url: &str) -> LocalBoxFuture<'static, Result<PageResponse, SyncError>> {
		Box::pin(fetch_page(url.to_owned()))
	}
}

type ProgressClosure = Closure<dyn FnMut(ProgressEvent)>;

/// Resolves once the request has ended in any way. Must be created before `send`.
struct Completion {
	receiver: oneshot::Receiver<()>,
	_listener: ProgressClosure,
}

impl Completion {
	fn attach(xhr: &XmlHttpRequest) -> Result<Self, SyncError> {
		let (sender, receiver) = oneshot::channel();
		let mut sender = Some(sender);
		let listener = Closure::wrap(Box::new(move |_: ProgressEvent| {
			if let Some(sender) = sender.take() {
				// The receiver is only gone if the request future was dropped.
				drop(sender.send(()));
			}
		}) as Box<dyn FnMut(ProgressEvent)>);
		xhr.add_event_listener_with_callback("loadend", listener.as_ref().unchecked_ref())?;
		Ok(Self { receiver, _listener: listener })
	}

	async fn wait(self) -> Result<(), SyncError> {
		let Self { receiver, _listener } = self;
		receiver.await.map_err(|_| SyncError::Network)
	}
}

/// Upload listeners translating XHR progress into `reactables:*` events on the triggering element.
struct TransportEvents {
	target: EventTarget,
	request_started: Rc<Cell<bool>>,
	_listeners: Vec<ProgressClosure>,
}

impl TransportEvents {
	fn attach(xhr: &XmlHttpRequest, target: EventTarget) -> Result<Self, SyncError> {
		let upload = xhr.upload()?;
		let request_started = Rc::new(Cell::new(false));
		let mut listeners = Vec::new();

		let mut listen = |event: &str, handler: Box<dyn FnMut(ProgressEvent)>| -> Result<(), SyncError> {
			let closure = Closure::wrap(handler);
			upload.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
			listeners.push(closure);
			Ok(())
		};

		let dispatch_target = target.clone();
		listen("loadstart", Box::new(move |_: ProgressEvent| interop::dispatch(&dispatch_target, "upload-start", &Value::Null)))?;

		let dispatch_target = target.clone();
		listen(
			"progress",
			Box::new(move |event: ProgressEvent| {
				let detail = json!({
					"loaded": event.loaded(),
					"total": event.total(),
					"percent": percent(event.loaded(), event.total()),
				});
				interop::dispatch(&dispatch_target, "upload-progress", &detail)
			}),
		)?;

		let dispatch_target = target.clone();
		listen("load", Box::new(move |_: ProgressEvent| interop::dispatch(&dispatch_target, "upload-success", &Value::Null)))?;

		for failure in ["error", "abort", "timeout"] {
			let dispatch_target = target.clone();
			listen(failure, Box::new(move |_: ProgressEvent| interop::dispatch(&dispatch_target, "upload-failure", &Value::Null)))?;
		}

		// The upload phase is over: from here on the request waits for its response.
		let dispatch_target = target.clone();
		let started = Rc::clone(&request_started);
		listen(
			"loadend",
			Box::new(move |_: ProgressEvent| {
				if !started.replace(true) {
					interop::dispatch(&dispatch_target, "request-start", &Value::Null)
				}
			}),
		)?;

		Ok(Self {
			target,
			request_started,
			_listeners: listeners,
		})
	}

	fn finish(&self, result: &Result<SyncOutcome, SyncError>) {
		if !self.request_started.replace(true) {
			interop::dispatch(&self.target, "request-start", &Value::Null)
		}
		match result {
			Ok(_) => interop::dispatch(&self.target, "request-success", &Value::Null),
			Err(error) => interop::dispatch(&self.target, "request-error", &json!({ "message": error.to_string() })),
		}
	}
}

#[instrument(skip(request, target), fields(id = request.id.as_str(), method = ?request.call.as_ref().map(|call| call.method.as_str())))]
async fn send(request: SyncRequest, target: EventTarget) -> Result<SyncOutcome, SyncError> {
	let form = request.form_data()?;
	let xhr = XmlHttpRequest::new()?;
	xhr.open_with_async("POST", &request.url, true)?;
	xhr.set_request_header(REQUEST_HEADER, "true")?;

	let completion = Completion::attach(&xhr)?;
	let events = TransportEvents::attach(&xhr, target)?;

	if cfg!(feature = "dangerous-logging") {
		trace!(data = %request.data, "Sending component state.");
	}
	xhr.send_with_opt_form_data(Some(&form))?;
	completion.wait().await?;

	let status = xhr.status()?;
	let body = xhr.response_text()?.unwrap_or_default();
	debug!(status, length = body.len(), "Sync response received.");
	let result = classify(status, body);
	events.finish(&result);
	result
}

#[instrument]
async fn fetch_page(url: String) -> Result<PageResponse, SyncError> {
	let xhr = XmlHttpRequest::new()?;
	xhr.open_with_async("GET", &url, true)?;
	xhr.set_request_header(REQUEST_HEADER, "true")?;
	let completion = Completion::attach(&xhr)?;
	xhr.send()?;
	completion.wait().await?;

	if let Some(redirect) = xhr.get_response_header(REDIRECT_HEADER)?.filter(|redirect| !redirect.is_empty()) {
		return Ok(PageResponse::Redirect(redirect));
	}
	let body = xhr.response_text()?.unwrap_or_default();
	match xhr.status()? {
		200..=299 => Ok(PageResponse::Document(body)),
		403 => Err(SyncError::SessionExpired),
		0 => Err(SyncError::Network),
		status => {
			warn!(status, "Navigation failed.");
			Err(SyncError::Status { status, body })
		}
	}
}
