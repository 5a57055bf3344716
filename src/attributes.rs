//! The attribute vocabulary shared between server-rendered markup and this runtime.
//!
//! Every name is prefixed with `r:`. Since `:` is significant in CSS, the selector forms escape it.

/// Marks a component root and carries its instance id.
pub const COMPONENT_ID: &str = "r:id";
/// Initial component payload, either nested JSON or the flattened model object.
pub const COMPONENT_DATA: &str = "r:data";
pub const COMPONENT_NAME: &str = "r:name";
pub const COMPONENT_CHECKSUM: &str = "r:checksum";
pub const COMPONENT_ROUTE: &str = "r:route";
pub const COMPONENT_BASE_URL: &str = "r:base-url";

/// Explicit node identity for reconciliation.
pub const KEY: &str = "r:key";

pub const MODEL: &str = "r:model";
pub const LAZY: &str = "r:lazy";
pub const DEBOUNCE: &str = "r:debounce";

pub const FOLLOW: &str = "r:follow";
pub const CONFIRM: &str = "r:confirm";

pub const REPEAT: &str = "r:repeat";
pub const INTERVAL: &str = "r:interval";
pub const TIMEOUT: &str = "r:timeout";
pub const INIT: &str = "r:init";

pub const NAVIGATE: &str = "r:navigate";

pub const LOADING: &str = "r:loading";
pub const READY: &str = "r:ready";
pub const LOADING_CLASS: &str = "r:loading-class";
pub const READY_CLASS: &str = "r:ready-class";
pub const LOADING_ATTR: &str = "r:loading-attr";
pub const READY_ATTR: &str = "r:ready-attr";

/// Scripts carrying this are never replayed by [`Runtime::navigate`](`crate::Runtime::navigate`).
pub const ONCE: &str = "r:once";

/// A declarative action binding: the attribute naming the remote action, the DOM event it listens to and an optional key filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionAttribute {
	pub attribute: &'static str,
	pub event: &'static str,
	pub key: Option<&'static str>,
}

const fn action(attribute: &'static str, event: &'static str, key: Option<&'static str>) -> ActionAttribute {
	ActionAttribute { attribute, event, key }
}

pub const ACTIONS: [ActionAttribute; 11] = [
	action("r:submit", "submit", None),
	action("r:change", "change", None),
	action("r:focus", "focus", None),
	action("r:blur", "blur", None),
	action("r:click", "click", None),
	action("r:hover", "mouseover", None),
	action("r:move", "mousemove", None),
	action("r:leave", "mouseleave", None),
	action("r:enter", "keydown", Some("Enter")),
	action("r:tab", "keydown", Some("Tab")),
	action("r:esc", "keydown", Some("Escape")),
];

/// Attributes removed from the root after every render since they only carry transport state.
pub const TRANSIENT: [&str; 5] = [COMPONENT_DATA, COMPONENT_NAME, COMPONENT_CHECKSUM, COMPONENT_ROUTE, COMPONENT_BASE_URL];

/// Escapes the namespace colon of an attribute name for use in a CSS attribute selector.
#[must_use]
pub fn selector(attribute: &str) -> String {
	format!("[{}]", attribute.replace(':', "\\:"))
}

/// Text-like `<input type=…>` values bound as plain strings.
pub const TEXT_INPUT_TYPES: [&str; 14] = [
	"text", "date", "datetime-local", "email", "number", "month", "password", "range", "search", "tel", "time", "url", "color", "week",
];
