//! Wires declarative `r:*` attributes in a component's own scope to model writes and remote calls.
//!
//! Binding runs after every render. All per-element state lives in side tables keyed by element identity, so binding the same element
//! again replaces its listeners and timers instead of stacking them.

use crate::{
	action::ActionCall,
	attributes::{self, ActionAttribute},
	codec::{Control, ControlValue},
	component::{Component, WeakComponent},
	element_table::{ElementKey, ElementKeys, ElementTable},
	path::ModelPath,
	scope::owned_elements,
};
use gloo_timers::callback::{Interval, Timeout};
use hashbrown::HashSet;
use std::{cell::RefCell, rc::Rc};
use tracing::{debug, error, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Element, Event, KeyboardEvent};

/// Which render a bind pass follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindPass {
	/// The component was just created. Init actions fire.
	Mount,
	/// The component was reconciled against fresh server markup.
	/// Bindings whose attributes did not come back are released and init actions are stripped without firing.
	Render,
	/// The server returned no markup, only attributes still present are (re)bound.
	Resync,
}

struct BoundListener {
	event: &'static str,
	closure: Closure<dyn FnMut(Event)>,
}

impl BoundListener {
	fn detach(&self, element: &Element) {
		if let Err(error) = element.remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref()) {
			error!("Failed to remove {} listener: {:?}", self.event, error)
		}
	}
}

/// A recurring remote call, optionally behind an initial delay.
///
/// Dropping it cancels whichever timer is active.
struct Repeat {
	_delay: Option<Timeout>,
	_interval: Rc<RefCell<Option<Interval>>>,
}

/// Per-component binding state.
#[derive(Default)]
pub struct Binder {
	keys: ElementKeys,
	listeners: ElementTable<&'static str, BoundListener>,
	repeats: ElementTable<(), Repeat>,
	inits: ElementTable<(), Timeout>,
}

impl core::fmt::Debug for Binder {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Binder")
			.field("listeners", &self.listeners.len())
			.field("repeats", &self.repeats.len())
			.field("inits", &self.inits.len())
			.finish()
	}
}

/// Parses a millisecond attribute. Absent, empty or invalid values are [`None`].
fn millis(element: &Element, attribute: &str) -> Option<u32> {
	let raw = element.get_attribute(attribute)?;
	let raw = raw.trim();
	if raw.is_empty() {
		return None;
	}
	match raw.parse() {
		Ok(ms) => Some(ms),
		Err(_) => {
			warn!(attribute, value = raw, "Ignoring invalid duration.");
			None
		}
	}
}

fn strip(element: &Element, names: &[&str]) {
	for name in names {
		if let Err(error) = element.remove_attribute(name) {
			error!("Failed to remove {}: {:?}", name, error)
		}
	}
}

impl Binder {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of live listeners, repeats and pending init timers.
	#[must_use]
	pub fn binding_count(&self) -> usize {
		self.listeners.len() + self.repeats.len() + self.inits.len()
	}

	#[instrument(skip(self, component), fields(id = component.id()))]
	pub fn bind(&mut self, component: &Component, pass: BindPass) {
		let root = component.element().clone();
		let mut bound = HashSet::new();
		let mut modified = Vec::new();

		self.bind_models(component, &root, &mut bound, &mut modified);
		for action in attributes::ACTIONS {
			self.bind_action(component, &root, action, &mut bound, &mut modified);
		}
		self.bind_navigation(component, &root, &mut bound);
		self.bind_repeats(component, &root, &mut bound, &mut modified);
		self.bind_inits(component, &root, pass, &mut modified);

		// Modifiers may be shared by several bindings on one element, so they go last.
		for element in modified {
			strip(&element, &[attributes::LAZY, attributes::DEBOUNCE, attributes::FOLLOW, attributes::CONFIRM, attributes::TIMEOUT]);
		}

		self.release_detached();
		if pass == BindPass::Render {
			self.release_unbound(&bound);
		}
		debug!("Bound {} listener(s) and {} repeat(s).", self.listeners.len(), self.repeats.len());
	}

	/// Cancels every timer and removes every listener.
	pub fn dispose(&mut self) {
		for (element, _, listener) in self.listeners.drain() {
			listener.detach(&element);
		}
		let repeats = self.repeats.drain().count();
		let inits = self.inits.drain().count();
		trace!(repeats, inits, "Binder disposed.");
	}

	fn listen(&mut self, element: &Element, scope: &'static str, event: &'static str, handler: impl 'static + FnMut(Event)) -> ElementKey {
		let key = self.keys.key_of(element);
		let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
		if let Some(previous) = self.listeners.remove(key, scope) {
			previous.detach(element);
		}
		if let Err(error) = element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
			error!("Failed to add {} listener: {:?}", event, error);
			return key;
		}
		self.listeners.replace(key, scope, element, BoundListener { event, closure });
		key
	}

	fn bind_models(&mut self, component: &Component, root: &Element, bound: &mut HashSet<(ElementKey, &'static str)>, modified: &mut Vec<Element>) {
		for element in owned_elements(root, attributes::MODEL) {
			let span = trace_span!("Binding model", tag = %element.tag_name());
			let _enter = span.enter();

			let control = match Control::classify(&element) {
				Some(control) => control,
				None => {
					warn!("`{}` is not supported on this element. Ignoring it.", attributes::MODEL);
					continue;
				}
			};
			let path = ModelPath::parse(&element.get_attribute(attributes::MODEL).unwrap_or_default());
			let lazy = element.has_attribute(attributes::LAZY);
			let delay = millis(&element, attributes::DEBOUNCE).unwrap_or(if control.is_text_like() { component.options().model_debounce_ms } else { 0 });

			control.write(&path, component.get(&path).as_ref());

			let weak = component.downgrade();
			let trigger = element.clone();
			let key = self.keys.key_of(&element);
			let key = self.listen(&element, attributes::MODEL, "input", move |_| {
				let component = match weak.upgrade() {
					Some(component) => component,
					None => return,
				};
				match control.read(&path, component.get(&path).as_ref()) {
					ControlValue::Model(value) => {
						component.set(&path, value);
					}
					ControlValue::Files(files) => component.stage_files(path.key(), files),
				}
				if lazy {
					return;
				}
				schedule_refresh(&component, key, attributes::MODEL, delay, trigger.clone(), None);
			});

			bound.insert((key, attributes::MODEL));
			strip(&element, &[attributes::MODEL]);
			modified.push(element);
		}
	}

	fn bind_action(&mut self, component: &Component, root: &Element, action: ActionAttribute, bound: &mut HashSet<(ElementKey, &'static str)>, modified: &mut Vec<Element>) {
		for element in owned_elements(root, action.attribute) {
			let span = trace_span!("Binding action", attribute = action.attribute, tag = %element.tag_name());
			let _enter = span.enter();

			let expression = element.get_attribute(action.attribute).unwrap_or_default();
			strip(&element, &[action.attribute]);
			let call = match ActionCall::parse(&expression) {
				Some(call) => call,
				None => {
					warn!("Empty action expression. Ignoring it.");
					continue;
				}
			};
			let follow = element.has_attribute(attributes::FOLLOW);
			let confirm = element.get_attribute(attributes::CONFIRM).filter(|message| !message.is_empty());
			let delay = millis(&element, attributes::DEBOUNCE).unwrap_or(0);

			let weak = component.downgrade();
			let trigger = element.clone();
			let key = self.keys.key_of(&element);
			let key = self.listen(&element, action.attribute, action.event, move |event| {
				if let Some(expected) = action.key {
					if event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key).as_deref() != Some(expected) {
						return;
					}
				}
				if let Some(message) = &confirm {
					if !confirmed(message) {
						return event.prevent_default();
					}
				}
				if !follow {
					event.prevent_default();
				}
				if let Some(component) = weak.upgrade() {
					schedule_refresh(&component, key, action.attribute, delay, trigger.clone(), Some(call.clone()));
				}
			});

			bound.insert((key, action.attribute));
			modified.push(element);
		}
	}

	fn bind_navigation(&mut self, component: &Component, root: &Element, bound: &mut HashSet<(ElementKey, &'static str)>) {
		for element in owned_elements(root, attributes::NAVIGATE) {
			strip(&element, &[attributes::NAVIGATE]);
			let target = match element.get_attribute("href").map(|href| href.trim().to_owned()).filter(|href| !href.is_empty()) {
				Some(target) => target,
				None => {
					warn!("`{}` without `href`. Ignoring it.", attributes::NAVIGATE);
					continue;
				}
			};

			let weak = component.downgrade();
			let key = self.listen(&element, attributes::NAVIGATE, "click", move |event| {
				event.prevent_default();
				if let Some(runtime) = weak.upgrade().and_then(|component| component.runtime()) {
					runtime.spawn_navigate(target.clone());
				}
			});
			bound.insert((key, attributes::NAVIGATE));
		}
	}

	fn bind_repeats(&mut self, component: &Component, root: &Element, bound: &mut HashSet<(ElementKey, &'static str)>, modified: &mut Vec<Element>) {
		for element in owned_elements(root, attributes::REPEAT) {
			let interval = match millis(&element, attributes::INTERVAL).filter(|&interval| interval > 0) {
				Some(interval) => interval,
				None => continue,
			};
			let expression = element.get_attribute(attributes::REPEAT).unwrap_or_default();
			strip(&element, &[attributes::REPEAT, attributes::INTERVAL]);
			let call = match ActionCall::parse(&expression) {
				Some(call) => call,
				None => {
					warn!("Empty repeat expression. Ignoring it.");
					continue;
				}
			};
			let delay = millis(&element, attributes::TIMEOUT).unwrap_or(0);

			let weak = component.downgrade();
			let trigger = element.clone();
			let tick = move || {
				if let Some(component) = weak.upgrade() {
					component.spawn_refresh(Some(trigger.clone()), Some(call.clone()));
				}
			};

			let slot = Rc::new(RefCell::new(None));
			let delayed = if delay == 0 {
				*slot.borrow_mut() = Some(Interval::new(interval, tick));
				None
			} else {
				let slot = Rc::downgrade(&slot);
				Some(Timeout::new(delay, move || {
					if let Some(slot) = slot.upgrade() {
						*slot.borrow_mut() = Some(Interval::new(interval, tick));
					}
				}))
			};

			let key = self.keys.key_of(&element);
			// Replacing drops (and thereby cancels) the previous repeat of this element.
			self.repeats.replace(key, (), &element, Repeat { _delay: delayed, _interval: slot });
			bound.insert((key, attributes::REPEAT));
			modified.push(element);
		}
	}

	fn bind_inits(&mut self, component: &Component, root: &Element, pass: BindPass, modified: &mut Vec<Element>) {
		for element in owned_elements(root, attributes::INIT) {
			let expression = element.get_attribute(attributes::INIT).unwrap_or_default();
			strip(&element, &[attributes::INIT]);
			modified.push(element.clone());
			if pass != BindPass::Mount {
				continue;
			}

			let call = match ActionCall::parse(&expression) {
				Some(call) => call,
				None => continue,
			};
			match millis(&element, attributes::TIMEOUT).unwrap_or(0) {
				0 => component.spawn_refresh(Some(element), Some(call)),
				delay => {
					let weak = component.downgrade();
					let trigger = element.clone();
					let timeout = Timeout::new(delay, move || {
						if let Some(component) = weak.upgrade() {
							component.spawn_refresh(Some(trigger), Some(call));
						}
					});
					let key = self.keys.key_of(&element);
					self.inits.replace(key, (), &element, timeout);
				}
			}
		}
	}

	/// Releases state of elements that left the document.
	fn release_detached(&mut self) {
		for (element, _, listener) in self.listeners.drain_detached() {
			listener.detach(&element);
		}
		let repeats = self.repeats.drain_detached().count();
		let inits = self.inits.drain_detached().count();
		if repeats + inits > 0 {
			trace!(repeats, inits, "Released timers of detached elements.");
		}
	}

	/// Releases listeners and repeats whose attributes were not part of the latest render.
	fn release_unbound(&mut self, bound: &HashSet<(ElementKey, &'static str)>) {
		let stale: Vec<_> = self.listeners.keys().filter(|entry| !bound.contains(entry)).collect();
		for (key, scope) in stale {
			if let Some((element, listener)) = self.listeners.remove_with_element(key, scope) {
				listener.detach(&element);
			}
		}
		let stale: Vec<_> = self.repeats.keys().map(|(key, ())| key).filter(|&key| !bound.contains(&(key, attributes::REPEAT))).collect();
		for key in stale {
			self.repeats.remove(key, ());
		}
	}
}

fn schedule_refresh(component: &Component, key: ElementKey, scope: &'static str, delay: u32, trigger: Element, call: Option<ActionCall>) {
	let weak: WeakComponent = component.downgrade();
	component.debouncer().schedule(key, scope, delay, move || {
		if let Some(component) = weak.upgrade() {
			component.spawn_refresh(Some(trigger), call)
		}
	});
}

fn confirmed(message: &str) -> bool {
	match web_sys::window().map(|window| window.confirm_with_message(message)) {
		Some(Ok(accepted)) => accepted,
		_ => {
			error!("Could not show a confirmation prompt. Treating it as declined.");
			false
		}
	}
}
