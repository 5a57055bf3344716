use crate::attributes::{selector, COMPONENT_ID};
use tracing::error;
use wasm_bindgen::JsCast;
use web_sys::Element;

/// Descendants of `root` carrying `attribute` whose nearest component root is `root` itself.
///
/// Nested component roots also carry the marker, so plain subtree exclusion is not enough: the nearest marked ancestor (or self) decides.
#[must_use]
pub fn owned_elements(root: &Element, attribute: &str) -> Vec<Element> {
	let nodes = match root.query_selector_all(&selector(attribute)) {
		Ok(nodes) => nodes,
		Err(error) => {
			error!("Query for {} failed: {:?}", attribute, error);
			return Vec::new();
		}
	};
	(0..nodes.length())
		.filter_map(|i| nodes.get(i))
		.filter_map(|node| node.dyn_into::<Element>().ok())
		.filter(|element| owner_root(element).as_ref() == Some(root))
		.collect()
}

/// The nearest ancestor-or-self carrying the component marker.
#[must_use]
pub fn owner_root(element: &Element) -> Option<Element> {
	element.closest(&selector(COMPONENT_ID)).ok().flatten()
}

/// Every marked element in `root`'s subtree, including `root`, in document order.
#[must_use]
pub fn marked_subtree(root: &Element) -> Vec<Element> {
	let mut marked = Vec::new();
	if root.has_attribute(COMPONENT_ID) {
		marked.push(root.clone());
	}
	if let Ok(nodes) = root.query_selector_all(&selector(COMPONENT_ID)) {
		marked.extend((0..nodes.length()).filter_map(|i| nodes.get(i)).filter_map(|node| node.dyn_into::<Element>().ok()));
	}
	marked
}
