use std::collections::HashMap;

use crate::types::{NormalizedQuery, Results};

/// Process-lifetime map from normalized query to its last successful result set.
///
/// No eviction, no expiry and no capacity bound. Callers serialize access
/// (see [`crate::SearchService`]).
#[derive(Debug, Default, Clone)]
pub struct ResultCache {
	entries: HashMap<NormalizedQuery, Results>,
}

impl ResultCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, query: &NormalizedQuery) -> Option<Results> {
		self.entries.get(query).cloned()
	}

	/// Stores `results` for `query`, replacing any earlier entry.
	pub fn put(&mut self, query: NormalizedQuery, results: Results) {
		self.entries.insert(query, results);
	}

	pub fn contains(&self, query: &NormalizedQuery) -> bool {
		self.entries.contains_key(query)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Cached query keys, sorted.
	pub fn queries(&self) -> Vec<NormalizedQuery> {
		let mut keys: Vec<_> = self.entries.keys().cloned().collect();
		keys.sort();
		keys
	}
}
