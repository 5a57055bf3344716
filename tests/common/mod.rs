#![allow(dead_code)]

use futures_channel::oneshot;
use futures_util::future::{ready, LocalBoxFuture};
use gloo_timers::future::TimeoutFuture;
use reactables_dom::{sync::PageResponse, Options, Render, Runtime, SyncError, SyncOutcome, SyncRequest, Transport};
use std::{cell::RefCell, collections::VecDeque, rc::Rc};
use web_sys::{window, Document, Element, EventTarget};

type Response = LocalBoxFuture<'static, Result<SyncOutcome, SyncError>>;

static mut LOG_INITIALIZED: bool = false;

pub fn init_logging() {
	unsafe {
		if !LOG_INITIALIZED {
			tracing_wasm::set_as_global_default();
			LOG_INITIALIZED = true;
		}
	}
}

pub fn document() -> Document {
	window().unwrap().document().unwrap()
}

pub async fn sleep(ms: u32) {
	TimeoutFuture::new(ms).await
}

/// Records every request and answers with queued responses, or an empty render once the queue is exhausted.
#[derive(Default)]
pub struct ScriptedTransport {
	requests: RefCell<Vec<SyncRequest>>,
	responses: RefCell<VecDeque<Response>>,
	pages: RefCell<VecDeque<Result<PageResponse, SyncError>>>,
	fetched: RefCell<Vec<String>>,
}

impl ScriptedTransport {
	pub fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	pub fn respond(&self, result: Result<SyncOutcome, SyncError>) {
		self.responses.borrow_mut().push_back(Box::pin(ready(result)));
	}

	pub fn render(&self, render: Render) {
		self.respond(Ok(SyncOutcome::Render(render)))
	}

	/// Queues a response that arrives once the returned sender is used.
	pub fn defer(&self) -> oneshot::Sender<Result<SyncOutcome, SyncError>> {
		let (sender, receiver) = oneshot::channel();
		self.responses.borrow_mut().push_back(Box::pin(async move { receiver.await.unwrap_or(Err(SyncError::Network)) }));
		sender
	}

	/// Queues the answer to the next page fetch. Unqueued fetches fail with [`SyncError::Network`].
	pub fn page(&self, result: Result<PageResponse, SyncError>) {
		self.pages.borrow_mut().push_back(result);
	}

	pub fn fetched(&self) -> Vec<String> {
		self.fetched.borrow().clone()
	}

	pub fn requests(&self) -> Vec<SyncRequest> {
		self.requests.borrow().clone()
	}

	pub fn count(&self) -> usize {
		self.requests.borrow().len()
	}
}

impl Transport for ScriptedTransport {
	fn send(&self, request: SyncRequest, _target: EventTarget) -> Response {
		self.requests.borrow_mut().push(request);
		let next = self.responses.borrow_mut().pop_front();
		next.unwrap_or_else(|| Box::pin(ready(Ok(SyncOutcome::Render(Render::default())))))
	}

	fn fetch_page(&self, url: &str) -> LocalBoxFuture<'static, Result<PageResponse, SyncError>> {
		self.fetched.borrow_mut().push(url.to_owned());
		let next = self.pages.borrow_mut().pop_front();
		Box::pin(ready(next.unwrap_or(Err(SyncError::Network))))
	}
}

pub fn options() -> Options {
	Options {
		model_debounce_ms: 20,
		observe_removals: false,
		..Options::default()
	}
}

pub fn runtime(transport: &Rc<ScriptedTransport>) -> Runtime {
	Runtime::new(document(), options(), transport.clone())
}

/// Markup appended to `<body>` for the duration of a test.
pub struct Fixture(Element);

impl Fixture {
	pub fn new(html: &str) -> Self {
		let document = document();
		let host = document.create_element("div").unwrap();
		host.set_inner_html(html);
		document.body().unwrap().append_child(&host).unwrap();
		Self(host)
	}

	pub fn root(&self) -> Element {
		self.0.first_element_child().unwrap()
	}

	pub fn find(&self, selector: &str) -> Element {
		self.0.query_selector(selector).unwrap().unwrap()
	}
}

impl Drop for Fixture {
	fn drop(&mut self) {
		self.0.remove()
	}
}
