#![cfg(all(feature = "reqwest", feature = "test"))]

// crates.io
use httpmock::prelude::*;
// self
use kypo_client::{
	_preludet::*,
	descriptor::{ADAPTIVE_TRAINING_API_PATH, SANDBOX_API_PATH, TRAINING_API_PATH},
	request::OCTET_STREAM,
	resources::{StageOutputKind, TrainingKind},
};

const DEFINITION_BODY: &str = r#"{"id":2,"url":"https://gitlab.example.com/kypo/demo.git","name":"demo","rev":"master",
"created_by":{"id":1,"sub":"alice","full_name":"Alice Doe","given_name":"Alice","family_name":"Doe","mail":"alice@example.com"}}"#;

#[tokio::test]
async fn sandbox_definition_lifecycle() {
	let server = MockServer::start_async().await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("{SANDBOX_API_PATH}/definitions"))
				.json_body(serde_json::json!({
					"url": "https://gitlab.example.com/kypo/demo.git",
					"rev": "master",
				}));
			then.status(201).header("content-type", "application/json").body(DEFINITION_BODY);
		})
		.await;
	let get = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{SANDBOX_API_PATH}/definitions/2"));
			then.status(200).header("content-type", "application/json").body(DEFINITION_BODY);
		})
		.await;
	let delete = server
		.mock_async(|when, then| {
			when.method(DELETE).path(format!("{SANDBOX_API_PATH}/definitions/2"));
			then.status(204);
		})
		.await;
	let client = token_test_client(&server.base_url());
	let ctx = CallContext::new();
	let created = client
		.create_sandbox_definition(&ctx, "https://gitlab.example.com/kypo/demo.git", "master")
		.await
		.expect("Definition creation should succeed.");
	let fetched =
		client.get_sandbox_definition(&ctx, 2).await.expect("Definition read should succeed.");

	assert_eq!(created, fetched);
	assert_eq!(fetched.created_by.mail, "alice@example.com");

	client.delete_sandbox_definition(&ctx, 2).await.expect("Definition delete should succeed.");

	create.assert_calls_async(1).await;
	get.assert_calls_async(1).await;
	delete.assert_calls_async(1).await;

	let already_deleted = server
		.mock_async(|when, then| {
			when.method(DELETE).path(format!("{SANDBOX_API_PATH}/definitions/3"));
			then.status(404).body("Not Found");
		})
		.await;

	client
		.delete_sandbox_definition(&ctx, 3)
		.await
		.expect("Deleting a missing definition should be a no-op.");

	already_deleted.assert_calls_async(1).await;
}

#[tokio::test]
async fn sandbox_definition_delete_still_reports_server_errors() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(DELETE).path(format!("{SANDBOX_API_PATH}/definitions/4"));
			then.status(409).body("in use");
		})
		.await;

	let err = token_test_client(&server.base_url())
		.delete_sandbox_definition(&CallContext::new(), 4)
		.await
		.expect_err("A conflicting delete should fail.");

	assert!(!err.is_not_found());
	assert_eq!(err.to_string(), "resource sandbox definition 4: status: 409, body: in use");
}

#[tokio::test]
async fn create_definition_error_has_empty_identifier() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(format!("{SANDBOX_API_PATH}/definitions"));
			then.status(400).body("invalid revision");
		})
		.await;

	let client = token_test_client(&server.base_url());
	let err = client
		.create_sandbox_definition(&CallContext::new(), "https://gitlab.example.com/x.git", "nope")
		.await
		.expect_err("A rejected definition should fail.");

	assert_eq!(err.to_string(), "resource sandbox definition : status: 400, body: invalid revision");
}

#[tokio::test]
async fn sandbox_pool_operations() {
	let server = MockServer::start_async().await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("{SANDBOX_API_PATH}/pools"))
				.json_body(serde_json::json!({ "definition_id": 2, "max_size": 5 }));
			then.status(201).header("content-type", "application/json").body(
				r#"{"id":6,"size":0,"max_size":5,"lock_id":null,"rev":"master","rev_sha":"abc123",
				"hardware_usage":{"vcpu":"0.1","ram":"0.2","instances":"0","network":"0","subnet":"0","port":"0.01"},
				"definition":{"id":2,"name":"demo"}}"#,
			);
		})
		.await;
	let cleanup = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("{SANDBOX_API_PATH}/pools/6/cleanup-requests"))
				.query_param("force", "true");
			then.status(202);
		})
		.await;
	let delete = server
		.mock_async(|when, then| {
			when.method(DELETE).path(format!("{SANDBOX_API_PATH}/pools/6"));
			then.status(204);
		})
		.await;
	let client = token_test_client(&server.base_url());
	let ctx = CallContext::new();
	let pool = client.create_sandbox_pool(&ctx, 2, 5).await.expect("Pool creation should succeed.");

	assert_eq!(pool.id, 6);
	assert_eq!(pool.lock_id, None);
	assert_eq!(pool.hardware_usage.port, "0.01");
	assert_eq!(pool.definition.id, 2);

	client.cleanup_sandbox_pool(&ctx, 6, true).await.expect("Pool cleanup should be accepted.");
	client.delete_sandbox_pool(&ctx, 6).await.expect("Pool delete should succeed.");

	create.assert_calls_async(1).await;
	cleanup.assert_calls_async(1).await;
	delete.assert_calls_async(1).await;
}

#[tokio::test]
async fn malformed_payload_is_a_decode_error() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{SANDBOX_API_PATH}/pools/6"));
			then.status(200).header("content-type", "application/json").body(r#"{"id":"six"}"#);
		})
		.await;

	let client = token_test_client(&server.base_url());
	let err = client
		.get_sandbox_pool(&CallContext::new(), 6)
		.await
		.expect_err("A malformed pool should fail to decode.");

	match err {
		Error::Decode(decode) => {
			assert_eq!(decode.resource, "sandbox pool");
			assert_eq!(decode.source.path().to_string(), "id");
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn allocation_unit_and_request_operations() {
	let server = MockServer::start_async().await;
	let get = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{SANDBOX_API_PATH}/sandbox-allocation-units/5"));
			then.status(200).header("content-type", "application/json").body(
				r#"{"id":5,"pool_id":1,"allocation_request":{"id":8,"allocation_unit_id":5,"stages":["FINISHED"]},
				"cleanup_request":null,"locked":false}"#,
			);
		})
		.await;
	let cancel = server
		.mock_async(|when, then| {
			when.method(PATCH).path(format!("{SANDBOX_API_PATH}/allocation-requests/8/cancel"));
			then.status(200);
		})
		.await;
	let output = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("{SANDBOX_API_PATH}/allocation-requests/8/stages/user-ansible/outputs"))
				.query_param("page", "2")
				.query_param("page_size", "50");
			then.status(200).header("content-type", "application/json").body(
				r#"{"page":2,"page_size":50,"page_count":2,"count":1,"total_count":51,"results":[{"content":"PLAY RECAP"}]}"#,
			);
		})
		.await;
	let client = token_test_client(&server.base_url());
	let ctx = CallContext::new();
	let unit = client.get_sandbox_allocation_unit(&ctx, 5).await.expect("Unit read should succeed.");

	assert_eq!(unit.allocation_request.map(|request| request.id), Some(8));
	assert!(unit.cleanup_request.is_none());

	client
		.cancel_sandbox_allocation_request(&ctx, 8)
		.await
		.expect("Allocation cancel should succeed.");

	let page = client
		.get_sandbox_request_stage_output(&ctx, 8, StageOutputKind::UserAnsible, 2, 50)
		.await
		.expect("Stage output read should succeed.");

	assert_eq!(page.total_count, 51);
	assert_eq!(page.result, "PLAY RECAP\n");

	get.assert_calls_async(1).await;
	cancel.assert_calls_async(1).await;
	output.assert_calls_async(1).await;
}

#[tokio::test]
async fn training_definition_export_import_and_delete() {
	let server = MockServer::start_async().await;
	let content = r#"{"title":"Intro","levels":[]}"#;
	let export = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("{TRAINING_API_PATH}/exports/training-definitions/12"))
				.header("accept", OCTET_STREAM);
			then.status(200).header("content-type", OCTET_STREAM).body(content);
		})
		.await;
	let import = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("{TRAINING_API_PATH}/imports/training-definitions"))
				.body(content);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"id":13,"title":"Intro","state":"UNRELEASED"}"#);
		})
		.await;
	let delete = server
		.mock_async(|when, then| {
			when.method(DELETE).path(format!("{TRAINING_API_PATH}/training-definitions/13"));
			then.status(200);
		})
		.await;
	let client = token_test_client(&server.base_url());
	let ctx = CallContext::new();
	let exported = client
		.get_training_definition(&ctx, TrainingKind::Linear, 12)
		.await
		.expect("Training export should succeed.");

	assert_eq!(exported.id, 12);
	assert_eq!(exported.content, content);

	let imported = client
		.create_training_definition(&ctx, TrainingKind::Linear, exported.content)
		.await
		.expect("Training import should succeed.");

	assert_eq!(imported.id, 13);
	assert_eq!(imported.content, content);

	client
		.delete_training_definition(&ctx, TrainingKind::Linear, 13)
		.await
		.expect("Training delete should succeed.");

	export.assert_calls_async(1).await;
	import.assert_calls_async(1).await;
	delete.assert_calls_async(1).await;
}

#[tokio::test]
async fn adaptive_training_uses_its_own_service() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("{ADAPTIVE_TRAINING_API_PATH}/exports/training-definitions/4"));
			then.status(404);
		})
		.await;

	let client = token_test_client(&server.base_url());
	let err = client
		.get_training_definition(&CallContext::new(), TrainingKind::Adaptive, 4)
		.await
		.expect_err("A missing adaptive definition should fail.");

	assert!(err.is_not_found());
	assert_eq!(err.to_string(), "resource training definition adaptive 4: not found");
}
