use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::provider::{ProviderError, SearchProvider};
use crate::telemetry::{ChannelSink, Telemetry, TelemetryEvent, TelemetrySink};
use crate::types::SearchResult;
use crate::{SearchService, ServiceConfig};

pub(crate) enum Outcome {
	Results(Vec<SearchResult>),
	Fail(&'static str),
	Other(&'static str),
}

/// Provider whose calls block until the test releases them, per query, in any order.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
	calls: Mutex<Vec<String>>,
	pending: Mutex<HashMap<String, VecDeque<oneshot::Sender<Outcome>>>>,
	/// When set, calls never observe their cancellation token.
	ignore_cancel: bool,
}

impl ScriptedProvider {
	pub(crate) fn new() -> Arc<Self> {
		Arc::default()
	}

	pub(crate) fn ignoring_cancel() -> Arc<Self> {
		Arc::new(Self {
			ignore_cancel: true,
			..Self::default()
		})
	}

	pub(crate) fn calls(&self, query: &str) -> usize {
		self.calls.lock().iter().filter(|call| call.as_str() == query).count()
	}

	pub(crate) fn pending(&self, query: &str) -> usize {
		self.pending.lock().get(query).map_or(0, VecDeque::len)
	}

	/// Settles the oldest pending call for `query`.
	pub(crate) fn release(&self, query: &str, outcome: Outcome) {
		let sender = self.pending.lock().get_mut(query).and_then(VecDeque::pop_front);
		let sender = sender.unwrap_or_else(|| panic!("no pending call for {query}"));
		let _ = sender.send(outcome);
	}

	pub(crate) fn succeed(&self, query: &str) {
		self.release(query, Outcome::Results(rows(query, 5)));
	}
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
	async fn search(&self, query: &str, cancel: CancellationToken) -> Result<Vec<SearchResult>, ProviderError> {
		let (tx, rx) = oneshot::channel();
		self.calls.lock().push(query.to_owned());
		self.pending.lock().entry(query.to_owned()).or_default().push_back(tx);

		let outcome = if self.ignore_cancel {
			Some(rx.await)
		} else {
			tokio::select! {
				_ = cancel.cancelled() => None,
				outcome = rx => Some(outcome),
			}
		};
		let Some(outcome) = outcome else {
			if let Some(queue) = self.pending.lock().get_mut(query) {
				queue.retain(|tx| !tx.is_closed());
			}
			return Err(ProviderError::Cancelled);
		};

		match outcome {
			Ok(Outcome::Results(rows)) => Ok(rows),
			Ok(Outcome::Fail(message)) => Err(ProviderError::failed(message)),
			Ok(Outcome::Other(message)) => Err(ProviderError::Other(message.into())),
			Err(_) => Err(ProviderError::failed("scripted call dropped")),
		}
	}
}

/// Provider that answers every call after one scheduler yield.
pub(crate) struct ImmediateProvider;

#[async_trait]
impl SearchProvider for ImmediateProvider {
	async fn search(&self, query: &str, _cancel: CancellationToken) -> Result<Vec<SearchResult>, ProviderError> {
		tokio::task::yield_now().await;
		Ok(rows(query, 3))
	}
}

/// Provider that panics inside every call.
pub(crate) struct PanickingProvider;

#[async_trait]
impl SearchProvider for PanickingProvider {
	async fn search(&self, query: &str, _cancel: CancellationToken) -> Result<Vec<SearchResult>, ProviderError> {
		panic!("index for {query} is corrupt");
	}
}

/// Service over `provider` whose telemetry lands in the returned channel.
pub(crate) fn channel_service(provider: Arc<dyn SearchProvider>) -> (SearchService, mpsc::UnboundedReceiver<TelemetryEvent>) {
	let (sink, events) = ChannelSink::new();
	let service = SearchService::new(provider, Telemetry::new([Arc::new(sink) as Arc<dyn TelemetrySink>]));
	(service, events)
}

pub(crate) fn rows(query: &str, count: usize) -> Vec<SearchResult> {
	(1..=count)
		.map(|i| SearchResult::new(format!("{query}-{i}"), format!("Result {i} for \"{query}\"")))
		.collect()
}

pub(crate) struct Harness {
	pub(crate) service: SearchService,
	pub(crate) provider: Arc<ScriptedProvider>,
	pub(crate) events: mpsc::UnboundedReceiver<TelemetryEvent>,
}

impl Harness {
	pub(crate) fn new() -> Self {
		Self::with(ScriptedProvider::new(), ServiceConfig::default())
	}

	pub(crate) fn with(provider: Arc<ScriptedProvider>, config: ServiceConfig) -> Self {
		let (sink, events) = ChannelSink::new();
		let service = SearchService::with_config(provider.clone(), Telemetry::new([Arc::new(sink) as Arc<dyn TelemetrySink>]), config);
		Self { service, provider, events }
	}

	/// Waits until the provider has a pending call for `query`.
	pub(crate) async fn wait_pending(&self, query: &str, count: usize) {
		let provider = Arc::clone(&self.provider);
		wait_until(&format!("pending call for {query}"), || provider.pending(query) >= count).await;
	}

	pub(crate) fn drain_events(&mut self) -> Vec<&'static str> {
		let mut names = Vec::new();
		while let Ok(event) = self.events.try_recv() {
			names.push(event.kind.as_str());
		}
		names
	}
}

pub(crate) async fn wait_until<F>(name: &str, mut condition: F)
where
	F: FnMut() -> bool,
{
	timeout(Duration::from_secs(2), async move {
		loop {
			if condition() {
				return;
			}
			sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.unwrap_or_else(|_| panic!("timed out waiting for {name}"));
}
