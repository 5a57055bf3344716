//! A bound region of the DOM with its own server-synchronized data model.

use crate::{
	action::ActionCall,
	attributes,
	binder::{BindPass, Binder},
	debounce::Debouncer,
	error::{MarkupError, SyncError},
	interop,
	loading::toggle_loads,
	markup::ComponentMarkup,
	options::Options,
	path::ModelPath,
	reconcile::{parse_root, ReconcileHooks, Reconciler},
	runtime::{Runtime, WeakRuntime},
	scope::marked_subtree,
	sync::SyncRequest,
	wire::{Render, SyncOutcome},
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use serde_json::{json, Value};
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, instrument, trace, warn};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, EventTarget, FileList, Node};

/// What a listener registered with [`Component::on`] or [`Runtime::on`] receives.
#[derive(Debug, Clone)]
pub struct EventContext {
	/// The component the event originated from, if any.
	pub target: Option<Component>,
	pub params: Value,
}

pub type Listener = Rc<dyn Fn(&EventContext)>;

pub(crate) struct ComponentInner {
	id: String,
	name: String,
	checksum: String,
	route: String,
	base_url: String,
	element: Element,
	options: Rc<Options>,
	data: RefCell<Value>,
	files: RefCell<HashMap<String, FileList>>,
	binder: RefCell<Binder>,
	debouncer: Debouncer,
	listeners: RefCell<HashMap<String, Vec<Listener>>>,
	sequence: Cell<u64>,
	disposed: Cell<bool>,
	runtime: WeakRuntime,
}

/// A shared handle to a mounted component.
#[derive(Clone)]
pub struct Component(Rc<ComponentInner>);

/// A handle that doesn't keep the component alive. Held by listeners and timers.
#[derive(Clone)]
pub struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
	#[must_use]
	pub fn upgrade(&self) -> Option<Component> {
		self.0.upgrade().map(Component)
	}
}

impl Debug for Component {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Component")
			.field("id", &self.0.id)
			.field("name", &self.0.name)
			.field("disposed", &self.0.disposed.get())
			.finish_non_exhaustive()
	}
}

impl PartialEq for Component {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for Component {}

fn strip_transient(element: &Element) {
	for name in attributes::TRANSIENT {
		if let Err(error) = element.remove_attribute(name) {
			error!("Failed to remove {}: {:?}", name, error)
		}
	}
}

impl Component {
	/// Reads the component markup on `element`, binds its scope and shows its ready state.
	///
	/// Init actions are dispatched (asynchronously) from here.
	///
	/// # Errors
	///
	/// Iff the markup can't be loaded, in which case `element` is left untouched.
	#[instrument(skip(runtime))]
	pub fn new(element: Element, runtime: &Runtime) -> Result<Self, MarkupError> {
		let markup = ComponentMarkup::load(&element)?;
		strip_transient(&element);

		let ComponentMarkup { id, name, checksum, route, base_url, data } = markup;
		let component = Self(Rc::new(ComponentInner {
			id,
			name,
			checksum,
			route,
			base_url,
			element,
			options: runtime.options(),
			data: RefCell::new(data),
			files: RefCell::default(),
			binder: RefCell::default(),
			debouncer: Debouncer::new(),
			listeners: RefCell::default(),
			sequence: Cell::new(0),
			disposed: Cell::new(false),
			runtime: runtime.downgrade(),
		}));

		component.0.binder.borrow_mut().bind(&component, BindPass::Mount);
		toggle_loads(&component.0.element, true);
		info!(id = component.id(), name = component.name(), "Component created.");
		Ok(component)
	}

	#[must_use]
	pub fn id(&self) -> &str {
		&self.0.id
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.0.name
	}

	#[must_use]
	pub fn checksum(&self) -> &str {
		&self.0.checksum
	}

	#[must_use]
	pub fn route(&self) -> &str {
		&self.0.route
	}

	#[must_use]
	pub fn base_url(&self) -> &str {
		&self.0.base_url
	}

	/// The component root.
	#[must_use]
	pub fn element(&self) -> &Element {
		&self.0.element
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.0.options
	}

	#[must_use]
	pub fn debouncer(&self) -> &Debouncer {
		&self.0.debouncer
	}

	#[must_use]
	pub fn runtime(&self) -> Option<Runtime> {
		self.0.runtime.upgrade()
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakComponent {
		WeakComponent(Rc::downgrade(&self.0))
	}

	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.0.disposed.get()
	}

	/// Number of listeners and timers the component's bindings currently hold.
	#[must_use]
	pub fn binding_count(&self) -> usize {
		self.0.binder.borrow().binding_count()
	}

	/// A snapshot of the data model.
	#[must_use]
	pub fn data(&self) -> Value {
		self.0.data.borrow().clone()
	}

	#[must_use]
	pub fn get(&self, path: &ModelPath) -> Option<Value> {
		path.get(&self.0.data.borrow()).cloned()
	}

	/// Writes into the data model without syncing. Returns whether the write happened, see [`ModelPath::set`].
	pub fn set(&self, path: &ModelPath, value: Value) -> bool {
		path.set(&mut self.0.data.borrow_mut(), value)
	}

	/// Stages a file selection to be uploaded with the next request. Replaces earlier selections for `model`.
	pub fn stage_files(&self, model: String, files: FileList) {
		trace!(model = model.as_str(), count = files.length(), "Staging files.");
		self.0.files.borrow_mut().insert(model, files);
	}

	/// Registers a component-scoped listener for server-declared and lifecycle events.
	pub fn on(&self, name: impl Into<String>, listener: Listener) {
		self.0.listeners.borrow_mut().entry(name.into()).or_default().push(listener);
	}

	/// Invokes this component's listeners for `name`.
	pub fn emit(&self, name: &str, params: &Value) {
		let listeners = match self.0.listeners.borrow().get(name) {
			Some(listeners) => listeners.clone(),
			None => return,
		};
		let context = EventContext {
			target: Some(self.clone()),
			params: params.clone(),
		};
		for listener in listeners {
			listener(&context);
		}
	}

	/// Emits a lifecycle event to component listeners and as `reactables:<name>` on the root.
	pub(crate) fn lifecycle(&self, name: &str) {
		let params = Value::Array(Vec::new());
		self.emit(name, &params);
		interop::dispatch(&self.0.element, name, &json!({ "id": self.0.id }));
	}

	/// Calls a remote method. Same as [`Component::refresh`] without a triggering element.
	pub async fn call(&self, call: ActionCall) {
		self.refresh(None, Some(call)).await;
	}

	/// Runs [`Component::refresh`] in the background.
	pub fn spawn_refresh(&self, trigger: Option<Element>, call: Option<ActionCall>) {
		let component = self.clone();
		spawn_local(async move { component.refresh(trigger, call).await });
	}

	/// Sends the current state (and optionally a method call) to the server and applies the response.
	///
	/// Responses to anything but the latest request of this component are discarded.
	/// Failures are handed to the runtime's handlers and leave the component interactive.
	#[instrument(skip_all, fields(id = %self.0.id))]
	pub async fn refresh(&self, trigger: Option<Element>, call: Option<ActionCall>) {
		if self.is_disposed() {
			return warn!("Refresh requested on a disposed component. Ignoring it.");
		}
		let runtime = match self.runtime() {
			Some(runtime) => runtime,
			None => return warn!("The runtime is gone. Ignoring refresh."),
		};

		let sequence = self.0.sequence.get() + 1;
		self.0.sequence.set(sequence);
		toggle_loads(&self.0.element, false);

		let request = self.request(call);
		let target: EventTarget = trigger.unwrap_or_else(|| self.0.element.clone()).into();
		let response = runtime.transport().send(request, target);
		drop(runtime);
		let result = response.await;

		if self.is_disposed() {
			return debug!("Component was disposed while its request was in flight.");
		}
		if self.0.sequence.get() != sequence {
			return warn!(sequence, latest = self.0.sequence.get(), "Discarding stale response.");
		}
		let runtime = match self.runtime() {
			Some(runtime) => runtime,
			None => return warn!("The runtime is gone. Discarding response."),
		};

		match result {
			Ok(SyncOutcome::Redirect(url)) => {
				info!(url = url.as_str(), "Redirected by the server.");
				runtime.redirect(&url);
			}
			Ok(SyncOutcome::Render(render)) => self.apply(render),
			Err(SyncError::SessionExpired) => {
				toggle_loads(&self.0.element, true);
				runtime.page_expired(Some(self));
			}
			Err(error) => {
				toggle_loads(&self.0.element, true);
				runtime.report_error(&error, Some(self));
			}
		}
	}

	fn request(&self, call: Option<ActionCall>) -> SyncRequest {
		SyncRequest {
			url: self.0.options.endpoint_url(&self.0.base_url),
			id: self.0.id.clone(),
			name: self.0.name.clone(),
			data: self.data(),
			checksum: self.0.checksum.clone(),
			route: self.0.route.clone(),
			call,
			files: self.0.files.borrow().iter().map(|(model, files)| (model.clone(), files.clone())).collect(),
		}
	}

	/// Applies a successful render: reconciles, replaces the data model, rebinds and delivers server events.
	#[instrument(skip_all, fields(id = %self.0.id))]
	pub fn apply(&self, render: Render) {
		let Render { html, data, query, events } = render;
		let document = self.0.element.owner_document();

		let mut added = Vec::new();
		let mut reconciled = false;
		if let (Some(html), Some(document)) = (html.as_deref().filter(|html| !html.trim().is_empty()), document.as_ref()) {
			if cfg!(feature = "dangerous-logging") {
				trace!(html, "Reconciling.");
			}
			if let Some(to) = parse_root(document, html) {
				let mut hooks = ComponentHooks::new(&self.0.id);
				Reconciler::new(document.clone(), &mut hooks, self.0.options.depth_limit).reconcile(&self.0.element, &to);
				added = hooks.added;
				reconciled = true;
			}
		}

		if let Some(data) = data {
			*self.0.data.borrow_mut() = data;
		}
		self.0.files.borrow_mut().clear();
		strip_transient(&self.0.element);
		match self.0.binder.try_borrow_mut() {
			Ok(mut binder) => binder.bind(self, if reconciled { BindPass::Render } else { BindPass::Resync }),
			Err(_) => error!("Bindings are busy. Skipping rebind."),
		}

		if let Some(query) = query {
			update_address(&query);
		}

		for event in &events.component {
			self.emit(&event.name, &event.params);
		}
		let runtime = self.runtime();
		if let Some(runtime) = &runtime {
			for event in &events.global {
				runtime.emit(&event.name, &event.params, Some(self));
			}
		}
		if let Some(document) = &document {
			for event in &events.browser {
				interop::dispatch_raw(document, &event.name, &interop::to_js(&event.params));
			}
		}

		toggle_loads(&self.0.element, true);
		self.lifecycle("updated");

		if let Some(runtime) = runtime {
			for element in added {
				runtime.mount(element);
			}
		}
	}

	/// Cancels every timer and removes every listener. Idempotent.
	pub fn dispose(&self) {
		if self.0.disposed.replace(true) {
			return;
		}
		match self.0.binder.try_borrow_mut() {
			Ok(mut binder) => binder.dispose(),
			Err(_) => error!(id = self.id(), "Bindings are busy while disposing. Timers may outlive the component."),
		}
		self.0.debouncer.cancel_all();
		self.0.listeners.borrow_mut().clear();
		self.0.files.borrow_mut().clear();
		debug!(id = self.id(), "Component disposed.");
	}
}

/// Reconciliation policy of a component refresh.
struct ComponentHooks<'a> {
	id: &'a str,
	/// Component roots that appeared during reconciliation, to be mounted afterwards.
	added: Vec<Element>,
}

impl<'a> ComponentHooks<'a> {
	fn new(id: &'a str) -> Self {
		Self { id, added: Vec::new() }
	}
}

impl ReconcileHooks for ComponentHooks<'_> {
	fn node_key(&self, element: &Element) -> Option<String> {
		let non_empty = |name: &str| element.get_attribute(name).filter(|value| !value.is_empty());
		non_empty(attributes::KEY)
			.or_else(|| non_empty("id"))
			.or_else(|| element.get_attribute(attributes::COMPONENT_ID).map(|id| format!("{}={}", attributes::COMPONENT_ID, id)))
	}

	fn before_element_updated(&mut self, from: &Element, to: &Element) -> bool {
		if let Some(id) = from.get_attribute(attributes::COMPONENT_ID) {
			if id != self.id {
				trace!(id = id.as_str(), "Leaving nested component alone.");
				return false;
			}
		}
		let to: &Node = to;
		!from.is_equal_node(Some(to))
	}

	fn node_added(&mut self, node: &Node) {
		if let Some(element) = node.dyn_ref::<Element>() {
			self.added.extend(marked_subtree(element));
		}
	}
}

/// `pathname[?query]hash`.
#[must_use]
pub(crate) fn address(pathname: &str, query: &str, hash: &str) -> String {
	let query = query.trim_start_matches('?');
	let mut address = pathname.to_owned();
	if !query.is_empty() {
		address.push('?');
		address.push_str(query);
	}
	address.push_str(hash);
	address
}

fn update_address(query: &str) {
	let window = match web_sys::window() {
		Some(window) => window,
		None => return error!("No window to update the address of."),
	};
	let location = window.location();
	let (pathname, search, hash) = match (location.pathname(), location.search(), location.hash()) {
		(Ok(pathname), Ok(search), Ok(hash)) => (pathname, search, hash),
		_ => return error!("Could not read the current location."),
	};

	let next = address(&pathname, query, &hash);
	if next == format!("{}{}{}", pathname, search, hash) {
		return trace!("Address unchanged.");
	}
	match window.history().and_then(|history| history.push_state_with_url(&JsValue::NULL, "", Some(&next))) {
		Ok(()) => debug!(address = next.as_str(), "Address updated."),
		Err(error) => error!("Failed to update the address: {:?}", error),
	}
}

#[cfg(test)]
mod tests {
	use super::address;

	#[test]
	fn address_with_query() {
		assert_eq!(address("/items", "page=2", ""), "/items?page=2");
		assert_eq!(address("/items", "?page=2", "#top"), "/items?page=2#top");
	}

	#[test]
	fn empty_query_drops_search() {
		assert_eq!(address("/items", "", "#top"), "/items#top");
	}
}
