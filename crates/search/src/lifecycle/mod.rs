//! Request lifecycle state machine.
//!
//! [`RequestLifecycle`] owns the observable [`LifecycleState`] and the identity
//! of the one authoritative in-flight request. It is mutated only through
//! [`RequestLifecycle::apply`] over the closed [`LifecycleEvent`] set, plus
//! [`RequestLifecycle::set_query`] for input text edits.
//!
//! # Transitions
//!
//! | From | Event | Guard | To |
//! |---|---|---|---|
//! | any | `Start` | none | `loading` |
//! | `loading` | `Succeeded` | token matches active | `success` |
//! | `loading` | `Failed` | token matches active | `error` |
//! | `loading` | `Aborted` | token matches active | `idle` (aborted) |
//! | any | `Reset` | none | `idle` |
//!
//! A completion failing its guard is stale: it is counted and traced, and the
//! state is left untouched. Because a settled request leaves `loading`, a second
//! completion for the same token is stale as well.

use serde::Serialize;

use crate::types::{LastMeta, NormalizedQuery, RequestToken, Results, Status};

/// Observable lifecycle aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LifecycleState {
	/// Current query text. Normalized by `Start`; raw while being edited.
	pub query: String,
	pub status: Status,
	pub active: Option<RequestToken>,
	pub error: Option<String>,
	pub last_duration_ms: Option<u64>,
	pub last_from_cache: Option<bool>,
	pub aborted: bool,
	/// Query whose results were last accepted.
	#[serde(skip)]
	pub result_query: Option<NormalizedQuery>,
	#[serde(skip)]
	pub results: Option<Results>,
}

impl LifecycleState {
	pub fn last_meta(&self) -> LastMeta {
		LastMeta {
			duration_ms: self.last_duration_ms,
			from_cache: self.last_from_cache,
		}
	}
}

/// Closed set of lifecycle transition events.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
	Start {
		query: NormalizedQuery,
		token: RequestToken,
	},
	Succeeded {
		token: RequestToken,
		query: NormalizedQuery,
		results: Results,
		duration_ms: u64,
		from_cache: bool,
	},
	Failed {
		token: RequestToken,
		duration_ms: u64,
		message: String,
	},
	Aborted {
		token: RequestToken,
		duration_ms: u64,
	},
	Reset,
}

impl LifecycleEvent {
	pub const fn name(&self) -> &'static str {
		match self {
			Self::Start { .. } => "start",
			Self::Succeeded { .. } => "succeeded",
			Self::Failed { .. } => "failed",
			Self::Aborted { .. } => "aborted",
			Self::Reset => "reset",
		}
	}

	/// Token carried by a completion event.
	pub const fn completion_token(&self) -> Option<RequestToken> {
		match self {
			Self::Succeeded { token, .. } | Self::Failed { token, .. } | Self::Aborted { token, .. } => Some(*token),
			Self::Start { .. } | Self::Reset => None,
		}
	}
}

/// Outcome of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
	Applied,
	Stale,
}

#[derive(Debug, Default)]
pub struct RequestLifecycle {
	state: LifecycleState,
	stale_drops: u64,
}

impl RequestLifecycle {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn state(&self) -> &LifecycleState {
		&self.state
	}

	pub fn snapshot(&self) -> LifecycleState {
		self.state.clone()
	}

	/// Number of completions dropped by the token guard.
	pub fn stale_drops(&self) -> u64 {
		self.stale_drops
	}

	/// Returns true when `token` is the authoritative in-flight request.
	pub fn accepts(&self, token: RequestToken) -> bool {
		self.state.status == Status::Loading && self.state.active == Some(token)
	}

	/// Replaces the query text without starting a request.
	pub fn set_query(&mut self, text: impl Into<String>) {
		self.state.query = text.into();
	}

	pub fn apply(&mut self, event: LifecycleEvent) -> Transition {
		let name = event.name();
		if let Some(token) = event.completion_token()
			&& !self.accepts(token)
		{
			self.stale_drops = self.stale_drops.saturating_add(1);
			tracing::debug!(
				event = name,
				%token,
				active = ?self.state.active,
				status = self.state.status.as_str(),
				stale_drops = self.stale_drops,
				"lifecycle.stale"
			);
			return Transition::Stale;
		}

		let state = &mut self.state;
		match event {
			LifecycleEvent::Start { query, token } => {
				state.query = query.as_str().to_owned();
				state.status = Status::Loading;
				state.active = Some(token);
				state.error = None;
				state.last_duration_ms = None;
				state.last_from_cache = None;
				state.aborted = false;
			}
			LifecycleEvent::Succeeded {
				query,
				results,
				duration_ms,
				from_cache,
				..
			} => {
				state.status = Status::Success;
				state.error = None;
				state.last_duration_ms = Some(duration_ms);
				state.last_from_cache = Some(from_cache);
				state.aborted = false;
				state.result_query = Some(query);
				state.results = Some(results);
			}
			LifecycleEvent::Failed { duration_ms, message, .. } => {
				state.status = Status::Error;
				state.error = Some(message);
				state.last_duration_ms = Some(duration_ms);
				state.last_from_cache = Some(false);
				state.aborted = false;
			}
			LifecycleEvent::Aborted { duration_ms, .. } => {
				state.status = Status::Idle;
				state.error = None;
				state.last_duration_ms = Some(duration_ms);
				state.aborted = true;
			}
			LifecycleEvent::Reset => {
				*state = LifecycleState::default();
			}
		}

		tracing::debug!(
			event = name,
			status = state.status.as_str(),
			query = %state.query,
			active = ?state.active,
			duration_ms = ?state.last_duration_ms,
			from_cache = ?state.last_from_cache,
			has_error = state.error.is_some(),
			"lifecycle.applied"
		);
		Transition::Applied
	}
}
