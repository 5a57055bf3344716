//! Action expressions as written in `r:click="save"` or `r:click="select('a', 2)"`.

use serde_json::Value;
use thiserror::Error;
use tracing::error;

/// A remote method call requested by markup.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCall {
	pub method: String,
	pub params: Vec<Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
	#[error("action expression is empty")]
	Empty,
	#[error("invalid arguments for `{method}`: {message}")]
	Arguments { method: String, message: String },
}

impl ActionCall {
	#[must_use]
	pub fn bare(method: impl Into<String>) -> Self {
		Self { method: method.into(), params: Vec::new() }
	}

	/// Parses an action expression.
	///
	/// Argument lists that are not valid JSON (after single-quote normalization) degrade to an empty parameter list.
	/// That failure is logged rather than returned, use [`ActionCall::try_parse`] to observe it.
	#[must_use]
	pub fn parse(expression: &str) -> Option<Self> {
		match Self::try_parse(expression) {
			Ok(call) => Some(call),
			Err(ActionError::Empty) => None,
			Err(ActionError::Arguments { method, message }) => {
				error!(method = method.as_str(), "Invalid action arguments ({}). Calling without parameters.", message);
				Some(Self::bare(method))
			}
		}
	}

	pub fn try_parse(expression: &str) -> Result<Self, ActionError> {
		let expression = expression.trim();
		if expression.is_empty() {
			return Err(ActionError::Empty);
		}

		let (method, arguments) = match split_call(expression) {
			Some(split) => split,
			None => return Ok(Self::bare(expression)),
		};

		let normalized = normalize_quotes(arguments.trim());
		match serde_json::from_str::<Vec<Value>>(&format!("[{}]", normalized)) {
			Ok(params) => Ok(Self { method: method.to_owned(), params }),
			Err(source) => Err(ActionError::Arguments {
				method: method.to_owned(),
				message: source.to_string(),
			}),
		}
	}
}

/// Splits `name(arguments)` where `name` is an identifier (`$` allowed as a first character).
fn split_call(expression: &str) -> Option<(&str, &str)> {
	let open = expression.find('(')?;
	let arguments = expression.strip_suffix(')')?.get(open + 1..)?;
	let name = &expression[..open];
	let mut chars = name.chars();
	let valid = chars.next().map_or(false, |first| first == '$' || first == '_' || first.is_ascii_alphabetic())
		&& chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
	if valid {
		Some((name, arguments))
	} else {
		None
	}
}

/// Rewrites every `'…'` literal into `"…"`.
fn normalize_quotes(arguments: &str) -> String {
	let mut normalized = String::with_capacity(arguments.len());
	let mut rest = arguments;
	while let Some(start) = rest.find('\'') {
		let after = &rest[start + 1..];
		match after.find('\'') {
			Some(end) => {
				normalized.push_str(&rest[..start]);
				normalized.push('"');
				normalized.push_str(&after[..end]);
				normalized.push('"');
				rest = &after[end + 1..];
			}
			None => break,
		}
	}
	normalized.push_str(rest);
	normalized
}
