//! The page-wide registry of components: discovery, the global event bus, failure handlers and navigation.

use crate::{
	attributes::{self, selector},
	component::{Component, EventContext, Listener},
	error::{InitError, SyncError},
	interop,
	options::Options,
	overlay::{self, Overlay},
	sync::{PageResponse, Transport, XhrTransport},
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use serde_json::{json, Value};
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, DomParser, Element, HtmlElement, MutationObserver, MutationObserverInit, Node, NodeList, SupportedType};

pub type ErrorHandler = Rc<dyn Fn(&SyncError, Option<&Component>)>;
pub type ExpiredHandler = Rc<dyn Fn(Option<&Component>)>;
pub type RedirectHandler = Rc<dyn Fn(&str)>;

type ObserverClosure = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

pub(crate) struct RuntimeInner {
	options: Rc<Options>,
	transport: Rc<dyn Transport>,
	document: Document,
	components: RefCell<Vec<Component>>,
	listeners: RefCell<HashMap<String, Vec<Listener>>>,
	error_handler: RefCell<Option<ErrorHandler>>,
	expired_handler: RefCell<Option<ExpiredHandler>>,
	redirect_handler: RefCell<Option<RedirectHandler>>,
	overlay: RefCell<Option<Overlay>>,
	observer: RefCell<Option<(MutationObserver, ObserverClosure)>>,
}

impl Drop for RuntimeInner {
	fn drop(&mut self) {
		if let Some((observer, _)) = self.observer.get_mut().take() {
			observer.disconnect()
		}
	}
}

/// A shared handle to the registry.
///
/// [`Runtime::install`] creates the one registered for the page. [`Runtime::new`] creates free-standing ones, for tests or embedding.
#[derive(Clone)]
pub struct Runtime(Rc<RuntimeInner>);

/// A handle that doesn't keep the runtime alive. Components hold one of these.
#[derive(Clone, Default)]
pub struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
	#[must_use]
	pub fn upgrade(&self) -> Option<Runtime> {
		self.0.upgrade().map(Runtime)
	}
}

impl Debug for Runtime {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Runtime")
			.field("options", &self.0.options)
			.field("components", &self.0.components.borrow().len())
			.finish_non_exhaustive()
	}
}

thread_local! {
	static INSTALLED: RefCell<Option<Runtime>> = RefCell::new(None);
}

fn elements(nodes: Result<NodeList, JsValue>) -> Vec<Element> {
	match nodes {
		Ok(nodes) => (0..nodes.length()).filter_map(|i| nodes.get(i)).filter_map(|node| node.dyn_into::<Element>().ok()).collect(),
		Err(error) => {
			error!("Query failed: {:?}", error);
			Vec::new()
		}
	}
}

impl Runtime {
	/// Creates an unregistered runtime over `document`. Components aren't scanned until [`Runtime::init`].
	#[must_use]
	pub fn new(document: Document, options: Options, transport: Rc<dyn Transport>) -> Self {
		let observe = options.observe_removals;
		let runtime = Self(Rc::new(RuntimeInner {
			options: Rc::new(options),
			transport,
			document,
			components: RefCell::default(),
			listeners: RefCell::default(),
			error_handler: RefCell::default(),
			expired_handler: RefCell::default(),
			redirect_handler: RefCell::default(),
			overlay: RefCell::default(),
			observer: RefCell::default(),
		}));
		if observe {
			runtime.observe_removals();
		}
		runtime
	}

	/// Creates the page's runtime on the current document and runs [`Runtime::init`].
	///
	/// # Errors
	///
	/// [`InitError::AlreadyInitialized`] if a runtime is already installed (which stays in place),
	/// [`InitError::NoDocument`] outside of a browser window.
	#[instrument]
	pub fn install(options: Options) -> Result<Self, InitError> {
		if Self::installed().is_some() {
			error!("Reactables is already initialized on this page. Include its assets only once.");
			return Err(InitError::AlreadyInitialized);
		}
		let document = web_sys::window().and_then(|window| window.document()).ok_or(InitError::NoDocument)?;
		let runtime = Self::new(document, options, Rc::new(XhrTransport));
		INSTALLED.with(|installed| *installed.borrow_mut() = Some(runtime.clone()));
		runtime.init();
		Ok(runtime)
	}

	/// The runtime created by [`Runtime::install`], if any.
	#[must_use]
	pub fn installed() -> Option<Self> {
		INSTALLED.with(|installed| installed.borrow().clone())
	}

	/// Unregisters and disposes the installed runtime, allowing [`Runtime::install`] again.
	pub fn uninstall() {
		if let Some(runtime) = INSTALLED.with(|installed| installed.borrow_mut().take()) {
			runtime.dispose();
		}
	}

	#[must_use]
	pub fn options(&self) -> Rc<Options> {
		Rc::clone(&self.0.options)
	}

	#[must_use]
	pub fn transport(&self) -> Rc<dyn Transport> {
		Rc::clone(&self.0.transport)
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.0.document
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakRuntime {
		WeakRuntime(Rc::downgrade(&self.0))
	}

	/// Rebuilds the component list from the document's marked elements, in document order.
	///
	/// Components whose root is still in the document are kept as they are, their markup was consumed when they were created.
	/// Components whose root is gone are disposed. Emits `ready` once all of them are constructed, then `mounted` on each.
	#[instrument(skip(self))]
	pub fn init(&self) {
		self.sweep();
		let previous = self.0.components.replace(Vec::new());

		let mut components = Vec::new();
		let mut created = 0_usize;
		for element in elements(self.0.document.query_selector_all(&selector(attributes::COMPONENT_ID))) {
			if let Some(existing) = previous.iter().find(|component| component.element() == &element) {
				components.push(existing.clone());
				continue;
			}
			match Component::new(element, self) {
				Ok(component) => {
					created += 1;
					components.push(component);
				}
				Err(error) => error!("Skipping component: {}", error),
			}
		}
		for orphan in previous.iter().filter(|component| !components.contains(component)) {
			orphan.dispose();
		}
		self.0.components.borrow_mut().extend(components.iter().cloned());
		info!(created, kept = components.len() - created, "Components initialized.");

		self.lifecycle("ready", &json!([]), None);
		for component in &components {
			component.lifecycle("mounted");
		}
	}

	/// Creates a component for a root that appeared after [`Runtime::init`].
	///
	/// Returns the existing component if `element` already has one.
	pub fn mount(&self, element: Element) -> Option<Component> {
		if let Some(existing) = self.component_of(&element) {
			trace!(id = existing.id(), "Already mounted.");
			return Some(existing);
		}
		if !element.is_connected() {
			return None;
		}
		match Component::new(element, self) {
			Ok(component) => {
				self.0.components.borrow_mut().push(component.clone());
				component.lifecycle("mounted");
				Some(component)
			}
			Err(error) => {
				error!("Could not mount component: {}", error);
				None
			}
		}
	}

	#[must_use]
	pub fn find(&self, id: &str) -> Option<Component> {
		self.0.components.borrow().iter().find(|component| component.id() == id && !component.is_disposed()).cloned()
	}

	#[must_use]
	pub fn component_of(&self, root: &Element) -> Option<Component> {
		self.0.components.borrow().iter().find(|component| component.element() == root && !component.is_disposed()).cloned()
	}

	/// The live components, in mount order.
	#[must_use]
	pub fn components(&self) -> Vec<Component> {
		self.0.components.borrow().clone()
	}

	/// Subscribes to a global event. Any number of listeners may share a name.
	pub fn on(&self, name: impl Into<String>, listener: Listener) {
		self.0.listeners.borrow_mut().entry(name.into()).or_default().push(listener);
	}

	/// Replaces the failure handler. Without one, failures are shown in an overlay.
	pub fn on_error(&self, handler: ErrorHandler) {
		*self.0.error_handler.borrow_mut() = Some(handler);
	}

	/// Replaces the expired session handler. Without one, a reload is offered.
	pub fn on_page_expired(&self, handler: ExpiredHandler) {
		*self.0.expired_handler.borrow_mut() = Some(handler);
	}

	/// Replaces how server redirects leave the page. Without a handler, the browser navigates to the target.
	pub fn on_redirect(&self, handler: RedirectHandler) {
		*self.0.redirect_handler.borrow_mut() = Some(handler);
	}

	/// Invokes the global listeners for `name`.
	pub fn emit(&self, name: &str, params: &Value, origin: Option<&Component>) {
		let listeners = match self.0.listeners.borrow().get(name) {
			Some(listeners) => listeners.clone(),
			None => return,
		};
		let context = EventContext {
			target: origin.cloned(),
			params: params.clone(),
		};
		for listener in listeners {
			listener(&context);
		}
	}

	fn lifecycle(&self, name: &str, params: &Value, origin: Option<&Component>) {
		self.emit(name, params, origin);
		interop::dispatch(&self.0.document, name, params);
	}

	/// Disposes every component whose root left the document.
	pub fn sweep(&self) {
		let mut removed = Vec::new();
		self.0.components.borrow_mut().retain(|component| {
			let keep = component.element().is_connected() && !component.is_disposed();
			if !keep {
				removed.push(component.clone());
			}
			keep
		});
		for component in &removed {
			component.dispose();
		}
		if !removed.is_empty() {
			debug!("Swept {} detached component(s).", removed.len());
		}
	}

	/// Hands a failure to the registered handler, or shows it.
	pub fn report_error(&self, error: &SyncError, component: Option<&Component>) {
		warn!(component = ?component.map(Component::id), "Request failed: {}", error);
		let handler = self.0.error_handler.borrow().clone();
		match handler {
			Some(handler) => handler(error, component),
			None => self.show_overlay(&error.body().map_or_else(|| error.to_string(), str::to_owned)),
		}
	}

	/// Hands an expired session to the registered handler, or offers a reload.
	pub fn page_expired(&self, component: Option<&Component>) {
		info!(component = ?component.map(Component::id), "Page expired.");
		let handler = self.0.expired_handler.borrow().clone();
		match handler {
			Some(handler) => handler(component),
			None => overlay::offer_reload(),
		}
	}

	/// Leaves the page for `url`, through the redirect handler if there is one.
	pub fn redirect(&self, url: &str) {
		let handler = self.0.redirect_handler.borrow().clone();
		if let Some(handler) = handler {
			return handler(url);
		}
		let result = self.0.document.location().map(|location| location.assign(url));
		match result {
			Some(Ok(())) => (),
			Some(Err(error)) => error!("Redirect failed: {:?}", error),
			None => error!("The document has no location to redirect."),
		}
	}

	/// Shows `content` in the default error overlay, replacing a previous one.
	pub fn show_overlay(&self, content: &str) {
		match Overlay::show(&self.0.document, content, self.downgrade()) {
			Ok(overlay) => *self.0.overlay.borrow_mut() = Some(overlay),
			Err(error) => error!("Could not show the error overlay: {:?}", error),
		}
	}

	#[must_use]
	pub fn has_overlay(&self) -> bool {
		self.0.overlay.borrow().is_some()
	}

	pub fn dismiss_overlay(&self) {
		let overlay = self.0.overlay.borrow_mut().take();
		drop(overlay);
	}

	/// Runs [`Runtime::navigate`] in the background.
	pub fn spawn_navigate(&self, url: String) {
		let runtime = self.clone();
		spawn_local(async move { runtime.navigate(&url).await });
	}

	/// Replaces the page with the one at `url` without a full reload, then re-initializes.
	///
	/// Emits `navigating` before and `navigated` after. Failures go to the usual handlers.
	#[instrument(skip(self))]
	pub async fn navigate(&self, url: &str) {
		let params = json!({ "url": url });
		self.lifecycle("navigating", &params, None);

		let html = match self.0.transport.fetch_page(url).await {
			Ok(PageResponse::Document(html)) => html,
			Ok(PageResponse::Redirect(target)) => return self.redirect(&target),
			Err(SyncError::SessionExpired) => return self.page_expired(None),
			Err(error) => return self.report_error(&error, None),
		};

		if let Err(error) = self.swap_page(&html, url) {
			return self.report_error(&error, None);
		}
		self.init();
		self.lifecycle("navigated", &params, None);
	}

	fn swap_page(&self, html: &str, url: &str) -> Result<(), SyncError> {
		let document = &self.0.document;
		let parsed = DomParser::new()?.parse_from_string(html, SupportedType::TextHtml)?;
		let body = parsed.body().ok_or_else(|| SyncError::Malformed {
			message: "the page has no body".to_owned(),
			body: html.to_owned(),
		})?;
		let body = document
			.import_node_with_deep(&body, true)?
			.dyn_into::<HtmlElement>()
			.map_err(|_| SyncError::Js("the imported body is not an HTML element".to_owned()))?;

		let present = elements(document.query_selector_all("script"));
		self.dispose_components();
		document.set_body(Some(&body));

		let title = parsed.title();
		if !title.is_empty() {
			document.set_title(&title);
		}

		if let (Some(head), Some(parsed_head)) = (document.head(), parsed.head()) {
			for script in elements(parsed_head.query_selector_all("script")) {
				if replayable(&script, &present) {
					let fresh = fresh_script(document, &script)?;
					head.append_child(&fresh)?;
				}
			}
		}
		for script in elements(body.query_selector_all("script")) {
			if replayable(&script, &present) {
				if let Some(parent) = script.parent_node() {
					let fresh = fresh_script(document, &script)?;
					parent.replace_child(&fresh, &script)?;
				}
			}
		}

		if let Some(window) = web_sys::window() {
			window.history()?.push_state_with_url(&JsValue::NULL, "", Some(url))?;
		}
		Ok(())
	}

	fn dispose_components(&self) {
		let components = self.0.components.replace(Vec::new());
		for component in &components {
			component.dispose();
		}
	}

	/// Disposes all components, stops observing the document and removes the overlay.
	pub fn dispose(&self) {
		self.dispose_components();
		if let Some((observer, _)) = self.0.observer.borrow_mut().take() {
			observer.disconnect()
		}
		self.dismiss_overlay();
	}

	fn observe_removals(&self) {
		let runtime = self.downgrade();
		let closure = Closure::wrap(Box::new(move |_: js_sys::Array, _: MutationObserver| {
			if let Some(runtime) = runtime.upgrade() {
				runtime.sweep()
			}
		}) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

		let observer = match MutationObserver::new(closure.as_ref().unchecked_ref()) {
			Ok(observer) => observer,
			Err(error) => return error!("Could not create a MutationObserver: {:?}", error),
		};
		let init = MutationObserverInit::new();
		init.set_child_list(true);
		init.set_subtree(true);
		if let Err(error) = observer.observe_with_options(&self.0.document, &init) {
			return error!("Could not observe the document: {:?}", error);
		}
		*self.0.observer.borrow_mut() = Some((observer, closure));
	}
}

/// Whether a script of a navigated-to page should run.
fn replayable(script: &Element, present: &[Element]) -> bool {
	let node: &Node = script;
	!script.has_attribute(attributes::ONCE) && !present.iter().any(|existing| existing.is_equal_node(Some(node)))
}

/// Scripts inserted by a parser of another document don't execute, copies created here do.
fn fresh_script(document: &Document, script: &Element) -> Result<Element, JsValue> {
	let fresh = document.create_element("script")?;
	let attributes = script.attributes();
	for attribute in (0..attributes.length()).filter_map(|i| attributes.item(i)) {
		fresh.set_attribute(&attribute.name(), &attribute.value())?;
	}
	fresh.set_text_content(script.text_content().as_deref());
	Ok(fresh)
}
