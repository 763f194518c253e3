use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use futures::FutureExt;
use parking_lot::Mutex;
use sift_worker::{GenerationClock, GenerationToken, TaskClass};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::cache::ResultCache;
use crate::lifecycle::{LifecycleEvent, LifecycleState, RequestLifecycle, Transition};
use crate::provider::{ProviderError, SearchProvider};
use crate::telemetry::{Telemetry, TelemetryEvent, TelemetryKind};
use crate::types::{LastMeta, NormalizedQuery, RequestToken, Results, Status};

/// Tuning knobs for [`SearchService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceConfig {
	/// Trigger the previous in-flight request's cancellation when a new one starts.
	pub cancel_superseded: bool,
}

struct InFlight {
	token: RequestToken,
	cancel: GenerationToken,
}

struct Inner {
	lifecycle: RequestLifecycle,
	cache: ResultCache,
	inflight: Option<InFlight>,
}

struct Shared {
	inner: Mutex<Inner>,
	provider: Arc<dyn SearchProvider>,
	telemetry: Telemetry,
	clock: GenerationClock,
	config: ServiceConfig,
	changed: AtomicBool,
	revision: watch::Sender<u64>,
}

impl Shared {
	fn notify_changed(&self) {
		self.changed.store(true, AtomicOrdering::Release);
		self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
	}
}

/// Search request lifecycle manager.
///
/// Owns the [`LifecycleState`] and [`ResultCache`]. Cloning yields another handle
/// to the same service.
#[derive(Clone)]
pub struct SearchService {
	shared: Arc<Shared>,
}

impl std::fmt::Debug for SearchService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SearchService")
			.field("config", &self.shared.config)
			.field("telemetry", &self.shared.telemetry)
			.finish_non_exhaustive()
	}
}

impl SearchService {
	pub fn new(provider: Arc<dyn SearchProvider>, telemetry: Telemetry) -> Self {
		Self::with_config(provider, telemetry, ServiceConfig::default())
	}

	pub fn with_config(provider: Arc<dyn SearchProvider>, telemetry: Telemetry, config: ServiceConfig) -> Self {
		let (revision, _) = watch::channel(0);
		Self {
			shared: Arc::new(Shared {
				inner: Mutex::new(Inner {
					lifecycle: RequestLifecycle::new(),
					cache: ResultCache::new(),
					inflight: None,
				}),
				provider,
				telemetry,
				clock: GenerationClock::new(),
				config,
				changed: AtomicBool::new(false),
				revision,
			}),
		}
	}

	pub fn config(&self) -> ServiceConfig {
		self.shared.config
	}

	/// Replaces the current query text without issuing a request.
	pub fn set_query(&self, text: impl Into<String>) {
		self.shared.inner.lock().lifecycle.set_query(text);
		self.shared.notify_changed();
	}

	/// Issues a search for `text`, superseding any earlier request.
	///
	/// Returns `None` without side effects when `text` is blank. Otherwise the
	/// returned token is authoritative until the next `start` or `reset`. A cache
	/// hit settles before this returns; a miss spawns the provider call and
	/// returns immediately.
	pub fn start(&self, text: &str) -> Option<RequestToken> {
		let query = NormalizedQuery::new(text)?;
		let started = Instant::now();

		let (generation, hit, superseded) = {
			let mut inner = self.shared.inner.lock();
			let generation = GenerationToken::mint(&self.shared.clock);
			let token = RequestToken(generation.generation());
			inner.lifecycle.apply(LifecycleEvent::Start { query: query.clone(), token });

			let hit = inner.cache.get(&query).map(|results| (results, elapsed_ms(started)));
			let superseded = match &hit {
				Some((results, duration_ms)) => {
					inner.lifecycle.apply(LifecycleEvent::Succeeded {
						token,
						query: query.clone(),
						results: Arc::clone(results),
						duration_ms: *duration_ms,
						from_cache: true,
					});
					inner.inflight.take()
				}
				None => inner.inflight.replace(InFlight {
					token,
					cancel: generation.clone(),
				}),
			};
			(generation, hit, superseded)
		};
		let token = RequestToken(generation.generation());
		self.shared.notify_changed();

		if let Some(previous) = superseded
			&& self.shared.config.cancel_superseded
		{
			tracing::debug!(superseded = %previous.token, by = %token, "search.cancel_superseded");
			previous.cancel.cancel();
		}

		if let Some((results, duration_ms)) = hit {
			self.shared.telemetry.emit(TelemetryEvent::now(
				TelemetryKind::CacheHit {
					duration_ms,
					result_count: results.len(),
				},
				token,
				query,
			));
			return Some(token);
		}

		self.shared.telemetry.emit(TelemetryEvent::now(TelemetryKind::RequestStart, token, query.clone()));
		let shared = Arc::clone(&self.shared);
		sift_worker::spawn(TaskClass::Interactive, async move {
			run_request(shared, token, query, generation, started).await;
		});
		Some(token)
	}

	/// Signals cancellation to the authoritative in-flight provider call.
	///
	/// Returns false when nothing is loading. The state only changes once the
	/// provider observes the signal and settles.
	pub fn cancel(&self) -> bool {
		let inner = self.shared.inner.lock();
		match &inner.inflight {
			Some(inflight) if inner.lifecycle.accepts(inflight.token) => {
				tracing::debug!(request = %inflight.token, "search.cancel");
				inflight.cancel.cancel();
				true
			}
			_ => false,
		}
	}

	/// Returns to idle. The cache is kept and any in-flight call is left to
	/// settle; its completion is dropped as stale.
	pub fn reset(&self) {
		{
			let mut inner = self.shared.inner.lock();
			inner.lifecycle.apply(LifecycleEvent::Reset);
			inner.inflight = None;
		}
		self.shared.notify_changed();
	}

	pub fn current_query(&self) -> String {
		self.shared.inner.lock().lifecycle.state().query.clone()
	}

	pub fn status(&self) -> Status {
		self.shared.inner.lock().lifecycle.state().status
	}

	pub fn error(&self) -> Option<String> {
		self.shared.inner.lock().lifecycle.state().error.clone()
	}

	pub fn aborted(&self) -> bool {
		self.shared.inner.lock().lifecycle.state().aborted
	}

	pub fn active_token(&self) -> Option<RequestToken> {
		self.shared.inner.lock().lifecycle.state().active
	}

	pub fn last_meta(&self) -> LastMeta {
		self.shared.inner.lock().lifecycle.state().last_meta()
	}

	/// Cached results for `query` after normalization.
	pub fn results_for(&self, query: &str) -> Option<Results> {
		let query = NormalizedQuery::new(query)?;
		self.shared.inner.lock().cache.get(&query)
	}

	/// Cached results for the current query text.
	pub fn current_results(&self) -> Option<Results> {
		let inner = self.shared.inner.lock();
		let query = NormalizedQuery::new(&inner.lifecycle.state().query)?;
		inner.cache.get(&query)
	}

	pub fn snapshot(&self) -> LifecycleState {
		self.shared.inner.lock().lifecycle.snapshot()
	}

	/// Completions dropped because their token was no longer authoritative.
	pub fn stale_drops(&self) -> u64 {
		self.shared.inner.lock().lifecycle.stale_drops()
	}

	pub fn cached_queries(&self) -> Vec<NormalizedQuery> {
		self.shared.inner.lock().cache.queries()
	}

	/// Returns and clears the pending change flag.
	pub fn take_changed(&self) -> bool {
		self.shared.changed.swap(false, AtomicOrdering::AcqRel)
	}

	/// Revision counter bumped on every state change.
	pub fn changed(&self) -> watch::Receiver<u64> {
		self.shared.revision.subscribe()
	}
}

async fn run_request(shared: Arc<Shared>, token: RequestToken, query: NormalizedQuery, generation: GenerationToken, started: Instant) {
	let outcome = AssertUnwindSafe(shared.provider.search(query.as_str(), generation.cancellation()))
		.catch_unwind()
		.await
		.unwrap_or_else(|payload| Err(ProviderError::Panicked(panic_message(payload.as_ref()))));
	let duration_ms = elapsed_ms(started);

	let (event, kind) = match outcome {
		Ok(results) => {
			let results: Results = results.into();
			let kind = TelemetryKind::RequestSuccess {
				duration_ms,
				result_count: results.len(),
			};
			let event = LifecycleEvent::Succeeded {
				token,
				query: query.clone(),
				results,
				duration_ms,
				from_cache: false,
			};
			(event, kind)
		}
		Err(error) if is_abort(&error, &generation) => (LifecycleEvent::Aborted { token, duration_ms }, TelemetryKind::RequestAborted { duration_ms }),
		Err(error) => {
			let message = error.to_string();
			let kind = TelemetryKind::RequestError {
				duration_ms,
				error_text: message.clone(),
			};
			(LifecycleEvent::Failed { token, duration_ms, message }, kind)
		}
	};

	let (transition, cached) = {
		let mut inner = shared.inner.lock();
		let cached = match &event {
			LifecycleEvent::Succeeded { results, .. } => {
				inner.cache.put(query.clone(), Arc::clone(results));
				true
			}
			_ => false,
		};
		let transition = inner.lifecycle.apply(event);
		if transition == Transition::Applied && inner.inflight.as_ref().is_some_and(|inflight| inflight.token == token) {
			inner.inflight = None;
		}
		(transition, cached)
	};

	if transition == Transition::Applied || cached {
		shared.notify_changed();
	}
	if transition == Transition::Stale {
		tracing::debug!(request = %token, event = kind.as_str(), "search.stale_completion");
	}
	shared
		.telemetry
		.emit(TelemetryEvent::now(kind, token, query).with_stale(transition == Transition::Stale));
}

/// A panic is a failure even after cancellation; any other error is an abort once the signal fired.
fn is_abort(error: &ProviderError, generation: &GenerationToken) -> bool {
	match error {
		ProviderError::Cancelled => true,
		ProviderError::Panicked(_) => false,
		ProviderError::Failed(_) | ProviderError::Other(_) => generation.is_cancelled(),
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	payload
		.downcast_ref::<&str>()
		.map(|message| (*message).to_string())
		.or_else(|| payload.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Wall time since `started`, rounded to the nearest millisecond.
fn elapsed_ms(started: Instant) -> u64 {
	let micros = started.elapsed().as_micros().saturating_add(500);
	u64::try_from(micros / 1000).unwrap_or(u64::MAX)
}
