use core::{
	fmt::{self, Debug, Formatter},
	hash::Hash,
};
use hashbrown::{hash_map::Entry, HashMap};
use js_sys::{Object, WeakMap};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Element;

/// Stable identity of a DOM element for the lifetime of an [`ElementKeys`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(u32);

/// Hands out [`ElementKey`]s without storing anything on the elements themselves.
///
/// The association lives in a [***WeakMap***](https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/WeakMap),
/// so detached elements can still be collected.
pub struct ElementKeys {
	map: WeakMap,
	next: u32,
}

impl Default for ElementKeys {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for ElementKeys {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ElementKeys").field("next", &self.next).finish_non_exhaustive()
	}
}

impl ElementKeys {
	#[must_use]
	pub fn new() -> Self {
		Self { map: WeakMap::new(), next: 0 }
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	pub fn key_of(&mut self, element: &Element) -> ElementKey {
		let object: &Object = element.unchecked_ref();
		if let Some(existing) = self.map.get(object).as_f64() {
			return ElementKey(existing as u32);
		}
		let key = ElementKey(self.next);
		self.next = self.next.wrapping_add(1);
		self.map.set(object, &JsValue::from(key.0));
		key
	}
}

/// Per-element state keyed by [`ElementKey`] and optionally by a sub-scope (such as an event name).
///
/// Dropping an entry drops its value, which is how listeners and timers stored here are released.
pub struct ElementTable<S, V>(HashMap<(ElementKey, S), (Element, V)>)
where
	S: Hash + Eq;

impl<S: Hash + Eq, V> Default for ElementTable<S, V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<S: Hash + Eq + Debug, V> Debug for ElementTable<S, V> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.0.keys()).finish()
	}
}

impl<S: Hash + Eq, V> ElementTable<S, V> {
	#[must_use]
	pub fn new() -> Self {
		Self(HashMap::new())
	}

	/// Stores `value`, returning the previous value for the same element and scope.
	pub fn replace(&mut self, key: ElementKey, scope: S, element: &Element, value: V) -> Option<V> {
		match self.0.entry((key, scope)) {
			Entry::Occupied(mut occupied) => Some(core::mem::replace(&mut occupied.get_mut().1, value)),
			Entry::Vacant(vacant) => {
				vacant.insert((element.clone(), value));
				None
			}
		}
	}

	pub fn remove(&mut self, key: ElementKey, scope: S) -> Option<V> {
		self.0.remove(&(key, scope)).map(|(_, v)| v)
	}

	/// Like [`ElementTable::remove`], but also hands back the element the entry was stored for.
	pub fn remove_with_element(&mut self, key: ElementKey, scope: S) -> Option<(Element, V)> {
		self.0.remove(&(key, scope))
	}

	pub fn keys(&self) -> impl Iterator<Item = (ElementKey, S)> + '_
	where
		S: Copy,
	{
		self.0.keys().copied()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Removes every entry whose element is no longer part of a document.
	pub fn drain_detached(&mut self) -> impl Iterator<Item = (Element, S, V)> + '_ {
		self.0.extract_if(|_, (element, _)| !element.is_connected()).map(|((_, scope), (element, value))| (element, scope, value))
	}

	pub fn drain(&mut self) -> impl Iterator<Item = (Element, S, V)> + '_ {
		self.0.drain().map(|((_, scope), (element, value))| (element, scope, value))
	}
}
