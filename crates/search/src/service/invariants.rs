use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::test_support::{Harness, ImmediateProvider, Outcome, channel_service, wait_until};
use crate::types::{NormalizedQuery, RequestToken, Status};

/// Must serve a repeated successful query from the cache without changing its rows.
///
/// - Enforced in: `SearchService::start` (cache lookup before provider dispatch)
/// - Failure symptom: Repeated searches hit the provider again or report `from_cache=false`.
#[tokio::test]
async fn test_cache_idempotence() {
	let h = Harness::new();
	h.service.start("cats");
	h.wait_pending("cats", 1).await;
	h.provider.succeed("cats");
	wait_until("cats success", || h.service.status() == Status::Success).await;
	let first = h.service.results_for("cats").expect("cats cached");

	h.service.start("  cats ");
	assert_eq!(h.service.status(), Status::Success);
	assert_eq!(h.service.last_meta().from_cache, Some(true));
	assert_eq!(h.service.results_for("cats").unwrap(), first);
	assert_eq!(h.provider.calls("cats"), 1);
}

/// Must accept only the last issued request's outcome, whatever the completion order.
///
/// - Enforced in: `RequestLifecycle::apply` (token guard), `run_request`
/// - Failure symptom: A slow earlier search overwrites the results of a newer one.
#[tokio::test]
async fn test_latest_wins_when_newer_settles_first() {
	let h = Harness::new();
	let a = h.service.start("a").unwrap();
	let b = h.service.start("b").unwrap();
	assert!(b > a);
	h.wait_pending("a", 1).await;
	h.wait_pending("b", 1).await;

	h.provider.succeed("b");
	wait_until("b success", || h.service.status() == Status::Success).await;
	h.provider.succeed("a");
	wait_until("a cached", || h.service.results_for("a").is_some()).await;

	let state = h.service.snapshot();
	assert_eq!(state.query, "b");
	assert_eq!(state.active, Some(b));
	assert_eq!(state.result_query, NormalizedQuery::new("b"));
	assert_eq!(h.service.current_results().unwrap()[0].id, "b-1");
	assert_eq!(h.service.stale_drops(), 1);
}

/// Must keep loading for the newer request while an older one settles first.
///
/// - Enforced in: `RequestLifecycle::accepts`
/// - Failure symptom: The UI flashes the older query's results before the newer request finishes.
#[tokio::test]
async fn test_latest_wins_when_older_settles_first() {
	let h = Harness::new();
	h.service.start("a");
	let b = h.service.start("b").unwrap();
	h.wait_pending("a", 1).await;
	h.wait_pending("b", 1).await;

	h.provider.release("a", Outcome::Fail("slow failure"));
	wait_until("a dropped", || h.service.stale_drops() == 1).await;
	assert_eq!(h.service.status(), Status::Loading);
	assert_eq!(h.service.error(), None);

	h.provider.succeed("b");
	wait_until("b success", || h.service.status() == Status::Success).await;
	assert_eq!(h.service.active_token(), Some(b));
	assert_eq!(h.service.current_query(), "b");
}

/// Must resolve a cancelled request to a neutral idle state with no cache entry.
///
/// - Enforced in: `SearchService::cancel`, `is_abort`
/// - Failure symptom: Cancelling shows an error banner or caches a partial result.
#[tokio::test]
async fn test_cancellation_neutrality() {
	let h = Harness::new();
	h.service.start("x");
	h.wait_pending("x", 1).await;
	assert!(h.service.cancel());

	wait_until("x aborted", || h.service.aborted()).await;
	let state = h.service.snapshot();
	assert_eq!(state.status, Status::Idle);
	assert_eq!(state.error, None);
	assert!(h.service.results_for("x").is_none());
}

/// Must keep cached entries across `reset`.
///
/// - Enforced in: `SearchService::reset` (lifecycle-only reset)
/// - Failure symptom: Resetting the view forces every query back to the provider.
#[tokio::test]
async fn test_cache_survives_reset() {
	let h = Harness::new();
	h.service.start("q");
	h.wait_pending("q", 1).await;
	h.provider.succeed("q");
	wait_until("q success", || h.service.status() == Status::Success).await;

	h.service.reset();
	assert_eq!(h.service.status(), Status::Idle);
	assert_eq!(h.service.current_query(), "");

	h.service.start("q");
	assert_eq!(h.service.last_meta().from_cache, Some(true));
	assert_eq!(h.provider.calls("q"), 1);
}

/// Must not write the cache when the provider fails, so a retry re-runs the call.
///
/// - Enforced in: `run_request` (cache write only on `Succeeded`)
/// - Failure symptom: Retry after an error is served an empty cached result.
#[tokio::test]
async fn test_error_path_writes_no_cache() {
	let h = Harness::new();
	h.service.start("q2");
	h.wait_pending("q2", 1).await;
	h.provider.release("q2", Outcome::Fail("Simulated network error"));
	wait_until("q2 error", || h.service.status() == Status::Error).await;

	assert_eq!(h.service.error().as_deref(), Some("Simulated network error"));
	assert_eq!(h.service.last_meta().from_cache, Some(false));
	assert!(h.service.results_for("q2").is_none());

	h.service.start("q2");
	assert_eq!(h.service.status(), Status::Loading);
	h.wait_pending("q2", 1).await;
	assert_eq!(h.provider.calls("q2"), 2);
}

/// Must cache each distinct query's own results regardless of completion order.
///
/// - Enforced in: `run_request` (cache write precedes the token guard)
/// - Failure symptom: A superseded query's results are lost or filed under the wrong key.
#[tokio::test]
async fn test_cross_query_independence() {
	for older_first in [true, false] {
		let h = Harness::new();
		h.service.start("p");
		let r = h.service.start("r").unwrap();
		h.wait_pending("p", 1).await;
		h.wait_pending("r", 1).await;

		let order = if older_first { ["p", "r"] } else { ["r", "p"] };
		for query in order {
			h.provider.succeed(query);
			wait_until("cache entry", || h.service.results_for(query).is_some()).await;
		}

		assert_eq!(h.service.results_for("p").unwrap()[0].id, "p-1");
		assert_eq!(h.service.results_for("r").unwrap()[0].id, "r-1");
		assert_eq!(h.service.active_token(), Some(r));
		assert_eq!(h.service.current_query(), "r");
		assert_eq!(h.service.status(), Status::Success);
	}
}

/// Must drop completions of a request orphaned by `reset`.
///
/// - Enforced in: `SearchService::reset`, `RequestLifecycle::apply`
/// - Failure symptom: A view reset mid-flight jumps back to `success` when the old call lands.
#[tokio::test]
async fn test_reset_orphans_inflight_request() {
	let h = Harness::new();
	h.service.start("slow");
	h.wait_pending("slow", 1).await;
	h.service.reset();
	assert!(!h.service.cancel());

	h.provider.succeed("slow");
	wait_until("slow cached", || h.service.results_for("slow").is_some()).await;
	assert_eq!(h.service.status(), Status::Idle);
	assert_eq!(h.service.active_token(), None::<RequestToken>);
	assert_eq!(h.service.stale_drops(), 1);
}

/// Must keep latest-wins and stale cache writes intact when starts race from many threads.
///
/// - Enforced in: `SearchService::start` (token minted under the state lock), `run_request`
/// - Failure symptom: The settled state shows an older query's results, or a successful query is missing from the cache.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_latest_wins_under_concurrent_starts() {
	const THREADS: usize = 8;
	const STARTS: usize = 20;

	for round in 0..10 {
		let (service, _events) = channel_service(Arc::new(ImmediateProvider));
		let runtime = tokio::runtime::Handle::current();

		let issued: Vec<(RequestToken, String)> = std::thread::scope(|scope| {
			let workers: Vec<_> = (0..THREADS)
				.map(|thread| {
					let service = &service;
					let runtime = &runtime;
					scope.spawn(move || {
						let _guard = runtime.enter();
						(0..STARTS)
							.map(|i| {
								let query = format!("q{}", (thread + i + round) % 7);
								(service.start(&query).unwrap(), query)
							})
							.collect::<Vec<_>>()
					})
				})
				.collect();
			workers.into_iter().flat_map(|worker| worker.join().unwrap()).collect()
		});

		let (latest, latest_query) = issued.iter().max_by_key(|(token, _)| *token).cloned().unwrap();
		let mut queries: Vec<_> = issued.iter().map(|(_, query)| query.clone()).collect();
		queries.sort();
		queries.dedup();

		wait_until("latest settled", || service.status() == Status::Success).await;
		wait_until("every query cached", || service.cached_queries().len() == queries.len()).await;

		let state = service.snapshot();
		assert_eq!(state.active, Some(latest));
		assert_eq!(state.query, latest_query);
		assert_eq!(state.result_query.as_ref().map(NormalizedQuery::as_str), Some(latest_query.as_str()));
		let cached: Vec<_> = service.cached_queries().iter().map(|query| query.as_str().to_owned()).collect();
		assert_eq!(cached, queries);
	}
}
