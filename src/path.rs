//! Dotted model paths into a component's [`serde_json::Value`] data.

use core::fmt::{self, Display, Formatter};
use serde_json::{Map, Value};
use tracing::warn;

/// A parsed `r:model` value such as `"address.city"` or `"tags[]"`.
///
/// The `[]` suffix marks an array-grouped binding (checkbox groups, multi-selects) and is not part of the path itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPath {
	segments: Vec<String>,
	grouped: bool,
}

impl ModelPath {
	#[must_use]
	pub fn parse(raw: &str) -> Self {
		let raw = raw.trim();
		let (raw, grouped) = match raw.strip_suffix("[]") {
			Some(stripped) => (stripped, true),
			None => (raw, false),
		};
		Self {
			segments: raw.split('.').map(str::to_owned).collect(),
			grouped,
		}
	}

	#[must_use]
	pub fn is_grouped(&self) -> bool {
		self.grouped
	}

	/// The dotted path without the group suffix.
	#[must_use]
	pub fn key(&self) -> String {
		self.segments.join(".")
	}

	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.segments.iter().map(String::as_str)
	}

	/// Resolves the path, returning [`None`] if any segment is missing or crosses a scalar.
	///
	/// Numeric segments index into arrays.
	#[must_use]
	pub fn get<'a>(&self, data: &'a Value) -> Option<&'a Value> {
		self.segments.iter().try_fold(data, |value, segment| match value {
			Value::Object(object) => object.get(segment),
			Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
			_ => None,
		})
	}

	/// Writes `value` at the path, creating empty objects for missing (or `null`) intermediate segments.
	///
	/// Numeric segments index into arrays, an index one past the end appends.
	/// Nesting through a scalar (or past the end of an array) is a caller error.
	/// The write is discarded and `false` returned in that case, the existing value is never replaced.
	pub fn set(&self, data: &mut Value, value: Value) -> bool {
		let mut current = data;
		for segment in &self.segments {
			current = match child_mut(current, segment) {
				Some(child) => child,
				None => {
					warn!(path = %self, segment = segment.as_str(), "Discarding model write through a non-container value.");
					return false;
				}
			};
		}
		*current = value;
		true
	}
}

/// The slot for `segment` below `value`, created as `null` if missing.
fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
	if value.is_null() {
		*value = Value::Object(Map::new());
	}
	match value {
		Value::Object(object) => Some(object.entry(segment.to_owned()).or_insert(Value::Null)),
		Value::Array(items) => {
			let index = segment.parse::<usize>().ok()?;
			if index == items.len() {
				items.push(Value::Null);
			}
			items.get_mut(index)
		}
		_ => None,
	}
}

impl Display for ModelPath {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.key())?;
		if self.grouped {
			f.write_str("[]")?;
		}
		Ok(())
	}
}

/// JavaScript-style truthiness.
#[must_use]
pub fn truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0 && !n.is_nan()),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

/// Loose (`==`-like) comparison between a model primitive and a control's string value.
///
/// Compound values never compare equal.
#[must_use]
pub fn loose_eq(value: &Value, text: &str) -> bool {
	let as_number = || {
		let trimmed = text.trim();
		if trimmed.is_empty() {
			Some(0.0)
		} else {
			trimmed.parse::<f64>().ok()
		}
	};
	match value {
		Value::String(s) => s == text,
		Value::Number(n) => n.as_f64().zip(as_number()).map_or(false, |(n, t)| n == t),
		Value::Bool(b) => as_number().map_or(false, |t| t == if *b { 1.0 } else { 0.0 }),
		Value::Null | Value::Array(_) | Value::Object(_) => false,
	}
}

/// The string a text control displays for a model value.
#[must_use]
pub fn display_string(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// Adds `member` to an array-grouped value when `checked` (if absent) or removes its first loose match otherwise.
///
/// Anything but an array is treated as empty.
#[must_use]
pub fn toggle_member(current: Option<&Value>, member: &str, checked: bool) -> Value {
	let mut items = match current {
		Some(Value::Array(items)) => items.clone(),
		_ => Vec::new(),
	};
	let position = items.iter().position(|item| loose_eq(item, member));
	match (checked, position) {
		(true, None) => items.push(Value::String(member.to_owned())),
		(false, Some(position)) => {
			items.remove(position);
		}
		_ => (),
	}
	Value::Array(items)
}
