use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Trimmed query text; the cache and lifecycle key unit.
///
/// Equality is exact on the trimmed form. No case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedQuery(Arc<str>);

impl NormalizedQuery {
	/// Trims `text`, returning `None` when nothing remains.
	pub fn new(text: &str) -> Option<Self> {
		let trimmed = text.trim();
		(!trimmed.is_empty()).then(|| Self(Arc::from(trimmed)))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for NormalizedQuery {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for NormalizedQuery {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

/// Identity of one `start` invocation, independent of the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "req-{}", self.0)
	}
}

/// One provider result row. Never interpreted by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchResult {
	pub id: String,
	pub title: String,
}

impl SearchResult {
	pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			title: title.into(),
		}
	}
}

/// Shared, immutable result set.
pub type Results = Arc<[SearchResult]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
	#[default]
	Idle,
	Loading,
	Success,
	Error,
}

impl Status {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Loading => "loading",
			Self::Success => "success",
			Self::Error => "error",
		}
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Timing and provenance of the last settled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LastMeta {
	pub duration_ms: Option<u64>,
	pub from_cache: Option<bool>,
}
