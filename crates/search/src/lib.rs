//! Asynchronous search request lifecycle manager.
//!
//! [`SearchService`] issues queries against an opaque [`SearchProvider`],
//! keeps exactly one request authoritative at a time, serves repeated queries
//! from an in-memory [`ResultCache`], and reports each lifecycle step to a
//! [`Telemetry`] hub.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use sift_search::{SearchProvider, SearchService, Telemetry, TracingSink, TelemetrySink};
//! # fn demo(provider: Arc<dyn SearchProvider>) {
//! let service = SearchService::new(provider, Telemetry::new([Arc::new(TracingSink) as Arc<dyn TelemetrySink>]));
//! service.set_query("cats");
//! service.start("cats");
//! println!("{}", service.status());
//! # }
//! ```

mod cache;
mod lifecycle;
mod provider;
mod service;
mod telemetry;
mod types;

pub use cache::ResultCache;
pub use lifecycle::{LifecycleEvent, LifecycleState, RequestLifecycle, Transition};
pub use provider::{ProviderError, SearchProvider};
pub use service::{SearchService, ServiceConfig};
pub use telemetry::{ChannelSink, Telemetry, TelemetryEvent, TelemetryKind, TelemetrySink, TracingSink};
pub use types::{LastMeta, NormalizedQuery, RequestToken, Results, SearchResult, Status};
pub use tokio_util::sync::CancellationToken;
