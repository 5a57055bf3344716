//! In-place reconciliation of a live DOM subtree against freshly rendered markup.
//!
//! Unlike a VDOM differ, both sides are real DOM: the new tree is parsed into an inert `<template>` and the live tree is mutated until
//! it matches, reusing every node that can be matched so that listeners, focus and nested component roots survive.

use hashbrown::HashMap;
use tracing::{error, instrument, trace, trace_span, warn};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlInputElement, HtmlTemplateElement, HtmlTextAreaElement, Node};

/// Customization points of a [`Reconciler`] run.
pub trait ReconcileHooks {
	/// Identity used to match old and new elements among siblings. [`None`] means positional matching.
	fn node_key(&self, element: &Element) -> Option<String>;

	/// Return `false` to leave `from` (including its attributes and children) exactly as it is.
	fn before_element_updated(&mut self, from: &Element, to: &Element) -> bool {
		let _ = (from, to);
		true
	}

	/// Called after a node without a live counterpart was inserted.
	fn node_added(&mut self, node: &Node) {
		let _ = node;
	}
}

/// Parses `html` into an inert fragment and returns its first element.
///
/// Returns [`None`] (and logs) if the markup contains no element.
#[must_use]
pub fn parse_root(document: &Document, html: &str) -> Option<Element> {
	let template = match document.create_element("template").map(|element| element.dyn_into::<HtmlTemplateElement>()) {
		Ok(Ok(template)) => template,
		_ => {
			error!("Could not create a `<template>` to parse server markup.");
			return None;
		}
	};
	template.set_inner_html(html);
	let root = template.content().first_element_child();
	if root.is_none() {
		warn!("Server markup did not contain an element.");
	}
	root
}

/// Mutates a live element in place until it matches another element.
pub struct Reconciler<'a, H: ReconcileHooks> {
	document: Document,
	hooks: &'a mut H,
	depth_limit: usize,
}

impl<'a, H: ReconcileHooks> Reconciler<'a, H> {
	#[must_use]
	pub fn new(document: Document, hooks: &'a mut H, depth_limit: usize) -> Self {
		Self { document, hooks, depth_limit }
	}

	/// Updates `from` (which stays the same node) to match `to`, which is usually an element from [`parse_root`].
	#[instrument(skip(self))]
	pub fn reconcile(&mut self, from: &Element, to: &Element) {
		if from.tag_name() != to.tag_name() {
			error!("Reconciling <{}> against <{}>. The root element can't be replaced, updating it in place anyway.", from.tag_name(), to.tag_name());
		}
		self.update_element(from, to, self.depth_limit);
	}

	fn update_element(&mut self, from: &Element, to: &Element, depth_limit: usize) {
		let span = trace_span!("Updating element", tag = %from.tag_name());
		let _enter = span.enter();

		if !self.hooks.before_element_updated(from, to) {
			trace!("Skipped by hook.");
			return;
		}

		sync_attributes(from, to);

		if let (Some(from), Some(to)) = (from.dyn_ref::<HtmlTextAreaElement>(), to.dyn_ref::<HtmlTextAreaElement>()) {
			if is_focused(from) {
				return;
			}
			match to.default_value() {
				Ok(value) if from.value() != value => from.set_value(&value),
				Ok(_) => (),
				Err(error) => error!("Failed to read the new <textarea> value: {:?}", error),
			}
			return;
		}
		if let (Some(from), Some(to)) = (from.dyn_ref::<HtmlInputElement>(), to.dyn_ref::<HtmlInputElement>()) {
			sync_input(from, to);
		}

		if depth_limit == 0 {
			return error!("Depth limit reached. Children of <{}> are left stale.", from.tag_name());
		}
		self.update_child_nodes(from, to, depth_limit - 1);
	}

	#[allow(clippy::too_many_lines)]
	fn update_child_nodes(&mut self, from_parent: &Element, to_parent: &Element, depth_limit: usize) {
		let to_children = to_parent.child_nodes();
		let from_children = from_parent.child_nodes();

		let mut keyed = HashMap::new();
		for i in 0..from_children.length() {
			if let Some(element) = from_children.get(i).and_then(|node| node.dyn_into::<Element>().ok()) {
				if let Some(key) = self.hooks.node_key(&element) {
					if keyed.insert(key, element).is_some() {
						warn!("Duplicate reconciliation key among siblings. Only the last one will be matched by key.");
					}
				}
			}
		}

		let mut cursor = from_parent.first_child();
		for i in 0..to_children.length() {
			let to_child = match to_children.get(i) {
				Some(node) => node,
				None => {
					error!("Expected a node at index {} of the new markup.", i);
					break;
				}
			};

			let to_key = to_child.dyn_ref::<Element>().and_then(|element| self.hooks.node_key(element));
			let cursor_key = cursor.as_ref().and_then(|node| node.dyn_ref::<Element>()).and_then(|element| self.hooks.node_key(element));

			let matched = match &to_key {
				Some(key) if cursor_key.as_ref() == Some(key) => {
					keyed.remove(key);
					cursor.clone()
				}
				Some(key) => match keyed.remove(key) {
					Some(element) => {
						trace!(key = key.as_str(), "Moving keyed element.");
						match from_parent.insert_before(&element, cursor.as_ref()) {
							Ok(moved) => Some(moved),
							Err(error) => {
								error!("Failed to move keyed element: {:?}", error);
								None
							}
						}
					}
					None => None,
				},
				None => cursor.clone().filter(|node| cursor_key.is_none() && compatible(node, &to_child)),
			};

			match matched {
				Some(node) => {
					if cursor.as_ref() == Some(&node) {
						cursor = node.next_sibling();
					}
					self.update_node(&node, &to_child, depth_limit);
				}
				None => {
					let imported = match self.document.import_node_with_deep(&to_child, true) {
						Ok(imported) => imported,
						Err(error) => {
							error!("Failed to import new node: {:?}", error);
							continue;
						}
					};
					match from_parent.insert_before(&imported, cursor.as_ref()) {
						Ok(inserted) => self.hooks.node_added(&inserted),
						Err(error) => error!("Failed to insert new node: {:?}", error),
					}
				}
			}
		}

		while let Some(node) = cursor {
			cursor = node.next_sibling();
			if let Err(error) = from_parent.remove_child(&node) {
				error!("Failed to remove stale node: {:?}", error)
			}
		}
	}

	fn update_node(&mut self, from: &Node, to: &Node, depth_limit: usize) {
		match (from.dyn_ref::<Element>(), to.dyn_ref::<Element>()) {
			(Some(from), Some(to)) => self.update_element(from, to, depth_limit),
			(None, None) => {
				let value = to.node_value();
				if from.node_value() != value {
					from.set_node_value(value.as_deref())
				}
			}
			_ => error!("Matched an element against a non-element node. Leaving it as is."),
		}
	}
}

fn compatible(from: &Node, to: &Node) -> bool {
	if from.node_type() != to.node_type() {
		return false;
	}
	match (from.dyn_ref::<Element>(), to.dyn_ref::<Element>()) {
		(Some(from), Some(to)) => from.tag_name() == to.tag_name(),
		_ => true,
	}
}

fn sync_attributes(from: &Element, to: &Element) {
	let wanted = to.attributes();
	for attribute in (0..wanted.length()).filter_map(|i| wanted.item(i)) {
		let (name, value) = (attribute.name(), attribute.value());
		if from.get_attribute(&name).as_deref() != Some(value.as_str()) {
			if let Err(error) = from.set_attribute(&name, &value) {
				error!("Failed to set attribute {:?}: {:?}", name, error)
			}
		}
	}

	let present = from.attributes();
	let stale: Vec<String> = (0..present.length())
		.filter_map(|i| present.item(i))
		.map(|attribute| attribute.name())
		.filter(|name| !to.has_attribute(name))
		.collect();
	for name in stale {
		if let Err(error) = from.remove_attribute(&name) {
			error!("Failed to remove attribute {:?}: {:?}", name, error)
		}
	}
}

/// Properties that don't follow their attributes once the user interacted with the control.
///
/// The focused control keeps whatever the user is typing.
/// Whether the user is currently interacting with `element`, whose value then belongs to them.
fn is_focused(element: &Element) -> bool {
	let focused = element.owner_document().and_then(|document| document.active_element());
	focused.as_ref() == Some(element)
}

fn sync_input(from: &HtmlInputElement, to: &HtmlInputElement) {
	if is_focused(from) {
		return;
	}
	if from.checked() != to.default_checked() {
		from.set_checked(to.default_checked())
	}
	if to.type_() != "file" && from.value() != to.default_value() {
		from.set_value(&to.default_value())
	}
}
