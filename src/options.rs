/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
	/// Path of the sync endpoint relative to a component's base URL.
	pub endpoint: String,
	/// Debounce applied to text-like model inputs without an explicit `r:debounce`.
	pub model_debounce_ms: u32,
	/// Recursion limit for reconciliation. Children below it are left as they are (and logged).
	pub depth_limit: usize,
	/// Dispose components whose root element leaves the document.
	pub observe_removals: bool,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			endpoint: "reactables/component".to_owned(),
			model_debounce_ms: 250,
			depth_limit: 256,
			observe_removals: true,
		}
	}
}

impl Options {
	/// Joins a component's base URL with [`Options::endpoint`].
	#[must_use]
	pub fn endpoint_url(&self, base_url: &str) -> String {
		let base = base_url.trim_end_matches('/');
		let endpoint = self.endpoint.trim_start_matches('/');
		if base.is_empty() {
			format!("/{}", endpoint)
		} else {
			format!("{}/{}", base, endpoint)
		}
	}
}
