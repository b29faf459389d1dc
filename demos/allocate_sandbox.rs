//! Signs in with the password grant, allocates one sandbox in a pool, prints the Terraform output,
//! and cleans the sandbox up again, all against a local mock of the KYPO services.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use kypo_client::{
	client::KypoClient,
	context::CallContext,
	descriptor::{SANDBOX_API_PATH, ServiceDescriptor, TOKEN_PATH},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	resources::StageOutputKind,
	retry::RetryConfig,
	session::Credentials,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(format!("{SANDBOX_API_PATH}/pools/1/sandbox-allocation-units"));
			then.status(201)
				.header("content-type", "application/json")
				.body(r#"[{"id":5,"pool_id":1,"locked":false}]"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("{SANDBOX_API_PATH}/sandbox-allocation-units/5/allocation-request"));
			then.status(200).header("content-type", "application/json").body(
				r#"{"id":8,"allocation_unit_id":5,"stages":["FINISHED","FINISHED","FINISHED"]}"#,
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("{SANDBOX_API_PATH}/allocation-requests/8/stages/terraform/outputs"));
			then.status(200).header("content-type", "application/json").body(
				r#"{"page":1,"page_size":2,"page_count":1,"count":2,"total_count":2,
				"results":[{"content":"Apply complete!"},{"content":"Resources: 4 added."}]}"#,
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("{SANDBOX_API_PATH}/sandbox-allocation-units/5/cleanup-request"));
			then.status(201)
				.header("content-type", "application/json")
				.body(r#"{"id":9,"allocation_unit_id":5,"stages":["IN_QUEUE"]}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("{SANDBOX_API_PATH}/sandbox-allocation-units/5/cleanup-request"));
			then.status(404);
		})
		.await;

	let descriptor = ServiceDescriptor::from_endpoint(&server.base_url())?;
	let ctx = CallContext::new().with_timeout(Duration::from_secs(30));
	let client = <KypoClient<ReqwestHttpClient, ReqwestTransportErrorMapper>>::login_with_http_client(
		&ctx,
		descriptor,
		"KYPO-Client",
		Credentials::new("demo-user", "demo-password"),
		ReqwestHttpClient::default(),
		Arc::new(ReqwestTransportErrorMapper),
	)
	.await?
	.with_retry(RetryConfig::with_retries(3));
	let interval = Duration::from_millis(200);
	let unit = client.create_sandbox_allocation_unit_await(&ctx, 1, interval).await?;
	let request_id = unit.allocation_request.as_ref().map(|request| request.id).unwrap_or_default();

	println!("Allocated sandbox unit {} (request {request_id}).", unit.id);

	let output = client
		.get_sandbox_request_stage_output(&ctx, request_id, StageOutputKind::Terraform, 1, 2)
		.await?;

	print!("{}", output.result);

	client.create_sandbox_cleanup_request_await(&ctx, unit.id, interval).await?;

	println!("Sandbox unit {} cleaned up.", unit.id);

	token_mock.assert_async().await;

	Ok(())
}
