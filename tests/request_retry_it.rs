#![cfg(all(feature = "reqwest", feature = "test"))]

// crates.io
use httpmock::prelude::*;
// self
use kypo_client::{
	_preludet::*,
	descriptor::SANDBOX_API_PATH,
	error::ResourceCause,
	request::{ApiRequest, StatusCode},
};

fn pool_path(id: i64) -> String {
	format!("{SANDBOX_API_PATH}/pools/{id}")
}

#[tokio::test]
async fn executor_returns_every_status_as_data() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(pool_path(1))
				.header("authorization", format!("Bearer {TEST_TOKEN}"))
				.header("content-type", "application/json");
			then.status(418).body("teapot");
		})
		.await;
	let client = token_test_client(&server.base_url());
	let url = Url::parse(&server.url(pool_path(1))).expect("Mock URL should parse.");
	let outcome = client
		.execute(&CallContext::new(), &ApiRequest::get(url))
		.await
		.expect("Unexpected statuses should not be executor errors.");

	assert_eq!(outcome.status, StatusCode::IM_A_TEAPOT);
	assert_eq!(outcome.body_text(), "teapot");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn retries_are_exhausted_on_persistent_mismatch() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(pool_path(7));
			then.status(503).body("maintenance");
		})
		.await;
	let client = retrying_test_client(&server.base_url(), 2);
	let err = client
		.get_sandbox_pool(&CallContext::new(), 7)
		.await
		.expect_err("Persistent 503 responses should fail the call.");
	let resource = err.as_resource().expect("Mismatch should surface as a resource error.");

	assert_eq!(resource.resource, "sandbox pool");
	assert_eq!(
		resource.cause,
		ResourceCause::Unexpected { status: 503, body: "maintenance".into() }
	);
	assert_eq!(err.to_string(), "resource sandbox pool 7: status: 503, body: maintenance");

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn not_found_without_retries_is_a_single_attempt() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(pool_path(8));
			then.status(404);
		})
		.await;
	let client = token_test_client(&server.base_url());
	let err = client
		.get_sandbox_pool(&CallContext::new(), 8)
		.await
		.expect_err("A missing pool should fail the call.");

	assert!(err.is_not_found());
	assert_eq!(err.to_string(), "resource sandbox pool 8: not found");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn cancelled_context_sends_nothing() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(pool_path(1));
			then.status(200).body("{}");
		})
		.await;
	let client = token_test_client(&server.base_url());
	let ctx = CallContext::new();

	ctx.cancel();

	let err = client
		.get_sandbox_pool(&ctx, 1)
		.await
		.expect_err("A cancelled context should fail before sending.");

	assert!(err.is_cancellation());

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
	let client = retrying_test_client("http://127.0.0.1:1", 3);
	let err = client
		.get_sandbox_pool(&CallContext::new(), 1)
		.await
		.expect_err("A closed port should fail the call.");

	assert!(matches!(err, Error::Transport(_)));
}
