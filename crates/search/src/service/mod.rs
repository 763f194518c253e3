//! Search request dispatcher and read surface.
//!
//! # Purpose
//!
//! * Owns the request lifecycle state, the result cache and the in-flight cancel handle.
//! * Runs one logical search per `start`: cache lookup, provider call, stale filtering,
//!   cache write, transition and telemetry.
//! * Exposes read-only accessors for UI observers.
//!
//! # Mental model
//!
//! * Every `start` mints a strictly increasing [`RequestToken`](crate::RequestToken) and
//!   makes it authoritative. Earlier requests are superseded logically; their provider
//!   calls keep running unless cancellation is requested.
//! * A completion mutates visible state only if its token is still authoritative and
//!   the lifecycle is still loading. Arrival order is irrelevant.
//! * The cache records every successful provider result, stale or not, so distinct
//!   queries resolved out of order each keep their own entry.
//!
//! # Key types
//!
//! | Type | Meaning | Constraints | Constructed / mutated in |
//! |---|---|---|---|
//! | [`SearchService`] | Cloneable handle to one manager | Must be the only writer of lifecycle + cache | `dispatch.rs` |
//! | [`ServiceConfig`] | Dispatch tuning | Defaults keep superseding logical | caller |
//! | `Inner` | Lifecycle + cache + in-flight handle | Mutated under one lock per step | `start`, `run_request`, `reset` |
//! | [`RequestLifecycle`](crate::RequestLifecycle) | Token-guarded state machine | Must drop stale completions | `lifecycle` |
//!
//! # Invariants
//!
//! * Must apply at most one outcome per token.
//! * Must never let a superseded or reset token mutate lifecycle state.
//! * Must not write the cache on cancelled or failed completions.
//! * Must keep the cache across `reset`.
//! * Must classify a failure as an abort when the request's cancel signal fired.
//! * Must never hold the state lock across the provider await or while emitting telemetry.
//!
//! # Concurrency & ordering
//!
//! * Token minting, the guard check and the cache + state mutation of one step run under a
//!   single `parking_lot::Mutex`, so the service is safe on a multi-threaded runtime.
//! * Provider calls are spawned through `sift_worker::spawn`; `start` never blocks.
//! * Telemetry is emitted after the lock is released, in step order per request.
//!
//! # Failure modes & recovery
//!
//! * Provider failure: `status=error` with the stringified cause; retry is another `start`.
//! * Provider panic: caught in the request task and settled as a failure.
//! * Cancellation: `status=idle`, `aborted=true`, no error.
//! * Provider never settles: stays `loading` until `cancel`, `start` or `reset`.

mod dispatch;

pub use dispatch::{SearchService, ServiceConfig};

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_support;
