mod common;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use serde_json::Value;
use tokio::task::JoinSet;
// self
use common::{PinnedNavigator, RefreshScript, ScriptedTransport, SERVER_ERROR_PATH};
use retail_bi_client::{
	error::{Error, SessionError},
	http::ApiRequest,
	store::{MemorySessionStore, SessionKey, SessionStore},
};

fn stored(store: &MemorySessionStore, key: SessionKey) -> Option<String> {
	store.get(key).expect("Memory store reads should succeed.").map(|token| token.expose().to_owned())
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
	const N: usize = 8;

	let transport = Arc::new(
		ScriptedTransport::new("t2", RefreshScript::rotate("t2", "r2")).hold_refresh_until(N),
	);
	let store = MemorySessionStore::with_tokens("t1", "r1");
	let navigator = Arc::new(PinnedNavigator::at("/dashboard"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let mut tasks = JoinSet::new();

	for i in 0..N {
		let client = client.clone();

		tasks.spawn(async move { client.get_json::<Value>(format!("/analytics/kpi/{i}")).await });
	}

	while let Some(joined) = tasks.join_next().await {
		let body = joined.expect("Request task should not panic.").expect("Replay should succeed.");

		assert!(body["path"].as_str().is_some_and(|path| path.starts_with("/api/v1/analytics/kpi/")));
	}

	assert_eq!(transport.refresh_calls(), 1);
	assert_eq!(client.refresh_metrics().attempts(), 1);
	assert_eq!(client.refresh_metrics().successes(), 1);
	assert_eq!(client.refresh_metrics().queued(), (N - 1) as u64);
	assert!(!client.is_refreshing());

	let protected = transport.protected_requests();

	assert_eq!(protected.len(), 2 * N);

	for i in 0..N {
		let path = format!("/api/v1/analytics/kpi/{i}");
		let bearers = protected
			.iter()
			.filter(|record| record.path == path)
			.map(|record| record.authorization.clone().unwrap_or_default())
			.collect::<Vec<_>>();

		assert_eq!(bearers, vec!["Bearer t1".to_owned(), "Bearer t2".to_owned()]);
	}

	assert_eq!(stored(&store, SessionKey::AccessToken).as_deref(), Some("t2"));
	assert_eq!(stored(&store, SessionKey::RefreshToken).as_deref(), Some("r2"));
	assert!(navigator.navigations().is_empty());
}

#[tokio::test]
async fn two_expired_requests_both_replay_with_rotated_token() {
	let transport = Arc::new(
		ScriptedTransport::new("t2", RefreshScript::rotate("t2", "r2")).hold_refresh_until(2),
	);
	let store = MemorySessionStore::with_tokens("t1", "r1");
	let navigator = Arc::new(PinnedNavigator::at("/rupturas"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let a = client.clone();
	let b = client.clone();
	let (a, b) = tokio::join!(
		a.get_json::<Value>("/reports/daily"),
		b.get_json::<Value>("/transfers/pending"),
	);

	assert_eq!(a.expect("Request A should succeed.")["path"], "/api/v1/reports/daily");
	assert_eq!(b.expect("Request B should succeed.")["path"], "/api/v1/transfers/pending");
	assert_eq!(transport.refresh_calls(), 1);

	let replays = transport
		.protected_requests()
		.into_iter()
		.filter(|record| record.authorization.as_deref() == Some("Bearer t2"))
		.map(|record| record.path)
		.collect::<Vec<_>>();

	assert_eq!(replays.len(), 2);
	assert!(replays.contains(&"/api/v1/reports/daily".to_owned()));
	assert!(replays.contains(&"/api/v1/transfers/pending".to_owned()));
}

#[tokio::test]
async fn failed_refresh_rejects_every_waiter_and_logs_out_once() {
	const N: usize = 5;

	let transport = Arc::new(
		ScriptedTransport::new("t2", RefreshScript::Reject { status: 401 }).hold_refresh_until(N),
	);
	let store = MemorySessionStore::with_tokens("t1", "r1");
	let navigator = Arc::new(PinnedNavigator::at("/dashboard"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let mut tasks = JoinSet::new();

	for i in 0..N {
		let client = client.clone();

		tasks.spawn(async move { client.get_json::<Value>(format!("/admin/users/{i}")).await });
	}

	while let Some(joined) = tasks.join_next().await {
		let err = joined.expect("Request task should not panic.").expect_err("Refresh failed.");

		assert!(
			matches!(&err, Error::Session(SessionError::Rejected { status: 401, message }) if message == "Refresh token revoked"),
			"Unexpected error: {err:?}",
		);
		assert!(err.requires_login());
	}

	assert_eq!(transport.refresh_calls(), 1);
	assert_eq!(client.refresh_metrics().failures(), 1);
	assert_eq!(navigator.navigations(), vec!["/login".to_owned()]);
	assert_eq!(stored(&store, SessionKey::AccessToken), None);
	assert_eq!(stored(&store, SessionKey::RefreshToken), None);
	// Only the original attempts went out; nothing was replayed.
	assert_eq!(transport.protected_requests().len(), N);
}

#[tokio::test]
async fn replayed_request_rejected_again_is_returned_without_second_refresh() {
	let transport = Arc::new(
		ScriptedTransport::new("t2", RefreshScript::rotate("t2", "r2")).always_unauthorized(),
	);
	let store = MemorySessionStore::with_tokens("t1", "r1");
	let navigator = Arc::new(PinnedNavigator::at("/dashboard"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let response = client
		.send(ApiRequest::get("/analytics/summary"))
		.await
		.expect("Transport should not fail.");

	assert_eq!(response.status.as_u16(), 401);
	assert_eq!(transport.refresh_calls(), 1);
	assert_eq!(transport.protected_requests().len(), 2);
	assert!(navigator.navigations().is_empty());

	let err = client
		.get_json::<Value>("/analytics/summary")
		.await
		.expect_err("A rejected replay should surface as an API error.");

	assert_eq!(err.status(), Some(401));
	assert_eq!(transport.refresh_calls(), 2);
}

#[tokio::test]
async fn missing_refresh_token_logs_out_without_calling_refresh() {
	let transport = Arc::new(ScriptedTransport::new("t2", RefreshScript::rotate("t2", "r2")));
	let store = MemorySessionStore::default();

	store.set(SessionKey::AccessToken, "t1".into()).expect("Memory store writes should succeed.");

	let navigator = Arc::new(PinnedNavigator::at("/transfers"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let err = client
		.get_json::<Value>("/transfers/pending")
		.await
		.expect_err("Recovery needs a refresh token.");

	assert!(matches!(err, Error::Session(SessionError::MissingRefreshToken)));
	assert_eq!(transport.refresh_calls(), 0);
	assert_eq!(transport.requests().len(), 1);
	assert_eq!(navigator.navigations(), vec!["/login".to_owned()]);
	assert_eq!(stored(&store, SessionKey::AccessToken), None);
}

#[tokio::test]
async fn logout_does_not_navigate_when_already_on_login_route() {
	let transport = Arc::new(ScriptedTransport::new("t2", RefreshScript::Reject { status: 400 }));
	let store = MemorySessionStore::with_tokens("t1", "r1");
	let navigator = Arc::new(PinnedNavigator::at("/login?next=%2Fdashboard"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let err = client.get_json::<Value>("/auth/me").await.expect_err("Refresh is rejected.");

	assert!(matches!(err, Error::Session(SessionError::Rejected { status: 400, .. })));
	assert!(navigator.navigations().is_empty());
	assert_eq!(stored(&store, SessionKey::RefreshToken), None);
}

#[tokio::test]
async fn request_without_stored_token_carries_no_authorization() {
	let transport = Arc::new(ScriptedTransport::new("t2", RefreshScript::rotate("t2", "r2")));
	let store = MemorySessionStore::default();
	let navigator = Arc::new(PinnedNavigator::at("/"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let _ = client.get_json::<Value>("/analytics/summary").await;
	let first = transport.requests().into_iter().next().expect("One request should be recorded.");

	assert_eq!(first.path, "/api/v1/analytics/summary");
	assert_eq!(first.authorization, None);
}

#[tokio::test]
async fn rotated_tokens_are_stored_before_any_replay() {
	let transport = Arc::new(
		ScriptedTransport::new("t2", RefreshScript::rotate("t2", "r2")).hold_refresh_until(3),
	);
	let store = MemorySessionStore::with_tokens("t1", "r1");

	transport.observe_store(Arc::new(store.clone()));

	let navigator = Arc::new(PinnedNavigator::at("/dashboard"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let (a, b, c) = tokio::join!(
		client.get_json::<Value>("/analytics/a"),
		client.get_json::<Value>("/analytics/b"),
		client.get_json::<Value>("/analytics/c"),
	);

	a.expect("Request a should succeed.");
	b.expect("Request b should succeed.");
	c.expect("Request c should succeed.");

	let requests = transport.requests();
	let refresh = requests
		.iter()
		.find(|record| record.path == common::REFRESH_PATH)
		.expect("Refresh should be recorded.");
	let body: Value = serde_json::from_slice(&refresh.body).expect("Refresh body should be JSON.");

	assert_eq!(body, serde_json::json!({ "refresh_token": "r1" }));
	assert_eq!(refresh.authorization, None);

	for replay in requests.iter().filter(|record| record.authorization.as_deref() == Some("Bearer t2")) {
		assert_eq!(replay.stored_access.as_deref(), Some("t2"));
	}
}

#[tokio::test]
async fn opted_out_request_returns_unauthorized_response_untouched() {
	let transport = Arc::new(ScriptedTransport::new("t2", RefreshScript::rotate("t2", "r2")));
	let store = MemorySessionStore::with_tokens("t1", "r1");
	let navigator = Arc::new(PinnedNavigator::at("/dashboard"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let response = client
		.send(ApiRequest::get("/analytics/summary").without_session_recovery())
		.await
		.expect("Transport should not fail.");

	assert!(response.is_unauthorized());
	assert_eq!(transport.refresh_calls(), 0);
	assert_eq!(stored(&store, SessionKey::AccessToken).as_deref(), Some("t1"));
}

#[tokio::test]
async fn non_unauthorized_errors_pass_through() {
	let transport = Arc::new(ScriptedTransport::new("t1", RefreshScript::rotate("t2", "r2")));
	let store = MemorySessionStore::with_tokens("t1", "r1");
	let navigator = Arc::new(PinnedNavigator::at("/diagnostics"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let err = client
		.get_json::<Value>(SERVER_ERROR_PATH)
		.await
		.expect_err("A 500 should become an API error.");

	assert!(
		matches!(&err, Error::Api { status: 500, message, .. } if message == "Parquet sync failed"),
		"Unexpected error: {err:?}",
	);
	assert_eq!(transport.refresh_calls(), 0);
	assert!(navigator.navigations().is_empty());
}

#[tokio::test]
async fn cancelled_leader_does_not_cancel_the_refresh() {
	// The refresh is held until a third 401 arrives.
	let transport = Arc::new(
		ScriptedTransport::new("t2", RefreshScript::rotate("t2", "r2")).hold_refresh_until(3),
	);
	let store = MemorySessionStore::with_tokens("t1", "r1");
	let navigator = Arc::new(PinnedNavigator::at("/dashboard"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let leader = {
		let client = client.clone();

		tokio::spawn(async move { client.get_json::<Value>("/analytics/a").await })
	};

	tokio::time::timeout(Duration::from_secs(5), async {
		while !client.is_refreshing() {
			tokio::task::yield_now().await;
		}
	})
	.await
	.expect("Leader should start refreshing.");

	let follower = {
		let client = client.clone();

		tokio::spawn(async move { client.get_json::<Value>("/analytics/b").await })
	};

	tokio::time::timeout(Duration::from_secs(5), async {
		while client.refresh_metrics().queued() == 0 {
			tokio::task::yield_now().await;
		}
	})
	.await
	.expect("Follower should queue behind the leader.");

	leader.abort();

	assert!(leader.await.expect_err("Leader was aborted.").is_cancelled());
	assert!(client.is_refreshing());

	let late = tokio::time::timeout(Duration::from_secs(5), client.get_json::<Value>("/analytics/c"))
		.await
		.expect("Late request should complete.")
		.expect("Late request should replay.");
	let follower = tokio::time::timeout(Duration::from_secs(5), follower)
		.await
		.expect("Follower should be released.")
		.expect("Follower task should not panic.")
		.expect("Follower should replay with the rotated token.");

	assert_eq!(follower["path"], "/api/v1/analytics/b");
	assert_eq!(late["path"], "/api/v1/analytics/c");
	assert_eq!(transport.refresh_calls(), 1);
	assert_eq!(stored(&store, SessionKey::AccessToken).as_deref(), Some("t2"));
	assert_eq!(stored(&store, SessionKey::RefreshToken).as_deref(), Some("r2"));
	assert!(navigator.navigations().is_empty());
	assert!(!client.is_refreshing());
}

#[tokio::test]
async fn timed_out_caller_still_persists_rotated_tokens() {
	let transport = Arc::new(
		ScriptedTransport::new("t2", RefreshScript::rotate("t2", "r2")).hold_refresh_until(2),
	);
	let store = MemorySessionStore::with_tokens("t1", "r1");
	let navigator = Arc::new(PinnedNavigator::at("/dashboard"));
	let client = common::scripted_client(&transport, &store, &navigator);
	let abandoned =
		tokio::time::timeout(Duration::from_millis(20), client.get_json::<Value>("/reports/slow"))
			.await;

	assert!(abandoned.is_err());

	let next = client.get_json::<Value>("/reports/fast").await.expect("Second request should replay.");

	assert_eq!(next["path"], "/api/v1/reports/fast");
	assert_eq!(transport.refresh_calls(), 1);
	assert_eq!(stored(&store, SessionKey::RefreshToken).as_deref(), Some("r2"));
}
