//! Structured lifecycle telemetry.
//!
//! The service builds one [`TelemetryEvent`] per lifecycle step and hands it to
//! [`Telemetry`], which fans it out to every registered [`TelemetrySink`].
//! Emission is fire-and-forget: sink failures and panics never reach the caller.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::types::{NormalizedQuery, RequestToken};

/// Per-event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryKind {
	RequestStart,
	CacheHit { duration_ms: u64, result_count: usize },
	RequestSuccess { duration_ms: u64, result_count: usize },
	RequestError { duration_ms: u64, error_text: String },
	RequestAborted { duration_ms: u64 },
}

impl TelemetryKind {
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::RequestStart => "request_start",
			Self::CacheHit { .. } => "cache_hit",
			Self::RequestSuccess { .. } => "request_success",
			Self::RequestError { .. } => "request_error",
			Self::RequestAborted { .. } => "request_aborted",
		}
	}

	pub const fn duration_ms(&self) -> Option<u64> {
		match self {
			Self::RequestStart => None,
			Self::CacheHit { duration_ms, .. }
			| Self::RequestSuccess { duration_ms, .. }
			| Self::RequestError { duration_ms, .. }
			| Self::RequestAborted { duration_ms } => Some(*duration_ms),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryEvent {
	#[serde(flatten)]
	pub kind: TelemetryKind,
	pub request_token: RequestToken,
	pub normalized_query: NormalizedQuery,
	pub timestamp: DateTime<Utc>,
	/// Set when the completion belonged to a superseded or reset request.
	pub stale: bool,
}

impl TelemetryEvent {
	pub fn now(kind: TelemetryKind, request_token: RequestToken, normalized_query: NormalizedQuery) -> Self {
		Self {
			kind,
			request_token,
			normalized_query,
			timestamp: Utc::now(),
			stale: false,
		}
	}

	pub fn with_stale(mut self, stale: bool) -> Self {
		self.stale = stale;
		self
	}

	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}

/// Observer receiving lifecycle telemetry.
pub trait TelemetrySink: Send + Sync {
	fn emit(&self, event: &TelemetryEvent);
}

/// Fan-out hub over registered sinks.
#[derive(Clone, Default)]
pub struct Telemetry {
	sinks: Arc<[Arc<dyn TelemetrySink>]>,
}

impl std::fmt::Debug for Telemetry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Telemetry").field("sinks", &self.sinks.len()).finish()
	}
}

impl Telemetry {
	/// Hub with no sinks; every emission is a no-op.
	pub fn disabled() -> Self {
		Self::default()
	}

	pub fn new(sinks: impl IntoIterator<Item = Arc<dyn TelemetrySink>>) -> Self {
		Self {
			sinks: sinks.into_iter().collect(),
		}
	}

	/// Returns a hub with `sink` appended.
	pub fn with_sink(&self, sink: Arc<dyn TelemetrySink>) -> Self {
		Self::new(self.sinks.iter().cloned().chain(std::iter::once(sink)))
	}

	pub fn len(&self) -> usize {
		self.sinks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sinks.is_empty()
	}

	pub fn emit(&self, event: TelemetryEvent) {
		for sink in self.sinks.iter() {
			if catch_unwind(AssertUnwindSafe(|| sink.emit(&event))).is_err() {
				tracing::warn!(event = event.kind.as_str(), request = %event.request_token, "telemetry sink panicked");
			}
		}
	}
}

/// Writes each event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
	fn emit(&self, event: &TelemetryEvent) {
		let kind = &event.kind;
		match kind {
			TelemetryKind::RequestError { error_text, .. } => tracing::info!(
				target: "sift::telemetry",
				event = kind.as_str(),
				request = %event.request_token,
				query = %event.normalized_query,
				stale = event.stale,
				duration_ms = ?kind.duration_ms(),
				error = %error_text,
			),
			TelemetryKind::CacheHit { result_count, .. } | TelemetryKind::RequestSuccess { result_count, .. } => tracing::info!(
				target: "sift::telemetry",
				event = kind.as_str(),
				request = %event.request_token,
				query = %event.normalized_query,
				stale = event.stale,
				duration_ms = ?kind.duration_ms(),
				result_count,
			),
			TelemetryKind::RequestStart | TelemetryKind::RequestAborted { .. } => tracing::info!(
				target: "sift::telemetry",
				event = kind.as_str(),
				request = %event.request_token,
				query = %event.normalized_query,
				stale = event.stale,
				duration_ms = ?kind.duration_ms(),
			),
		}
	}
}

/// Forwards events into an unbounded channel. A closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
	tx: mpsc::UnboundedSender<TelemetryEvent>,
}

impl ChannelSink {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<TelemetryEvent>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}
}

impl TelemetrySink for ChannelSink {
	fn emit(&self, event: &TelemetryEvent) {
		let _ = self.tx.send(event.clone());
	}
}
