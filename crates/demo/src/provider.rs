//! Simulated remote provider used by the demo.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use sift_search::{CancellationToken, ProviderError, SearchProvider, SearchResult};

use crate::config::ProviderConfig;

/// Waits a random delay, then answers with canned rows or a keyword-triggered failure.
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
	min_delay: Duration,
	max_delay: Duration,
	fail_keyword: String,
	result_count: usize,
}

impl SimulatedProvider {
	pub fn new(config: &ProviderConfig) -> Self {
		Self {
			min_delay: Duration::from_millis(config.min_delay_ms),
			max_delay: Duration::from_millis(config.max_delay_ms),
			fail_keyword: config.fail_keyword.to_lowercase(),
			result_count: config.result_count,
		}
	}

	fn pick_delay(&self) -> Duration {
		if self.max_delay <= self.min_delay {
			return self.min_delay;
		}
		rand::rng().random_range(self.min_delay..self.max_delay)
	}

	fn should_fail(&self, query: &str) -> bool {
		!self.fail_keyword.is_empty() && query.to_lowercase().contains(&self.fail_keyword)
	}

	fn results(&self, query: &str) -> Vec<SearchResult> {
		(1..=self.result_count)
			.map(|i| SearchResult::new(format!("{query}-{i}"), format!("Result {i} for \"{query}\"")))
			.collect()
	}
}

#[async_trait]
impl SearchProvider for SimulatedProvider {
	async fn search(&self, query: &str, cancel: CancellationToken) -> Result<Vec<SearchResult>, ProviderError> {
		let delay = self.pick_delay();
		tracing::trace!(query, delay_ms = delay.as_millis() as u64, "simulated provider waiting");

		tokio::select! {
			_ = cancel.cancelled() => return Err(ProviderError::Cancelled),
			_ = tokio::time::sleep(delay) => {}
		}

		if self.should_fail(query) {
			return Err(ProviderError::failed("Simulated network error"));
		}
		Ok(self.results(query.trim()))
	}
}
