#![cfg(all(feature = "reqwest", feature = "test"))]

// crates.io
use httpmock::prelude::*;
// self
use kypo_client::{
	_preludet::*,
	client::ReqwestKypoClient,
	descriptor::{ISSUER_PATH, TOKEN_PATH},
	error::{AuthError, SignInStage},
	session::AuthStrategy,
};

const AUTHORIZE_PAGE: &str = r#"<html><body><form action="login" method="post">
<input type="hidden" name="_csrf" value="authorize-csrf" />
<input type="text" name="username"/>
</form></body></html>"#;
const CONSENT_PAGE: &str = r#"<html><body><form action="authorize" method="post">
<input type="hidden" name="_csrf" value="consent-csrf" />
</form></body></html>"#;

async fn mock_missing_password_grant(server: &MockServer, status: u16) {
	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(status).body("Not Found");
		})
		.await;
}

async fn mock_landing_page(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/");
			then.status(200).body("<html>KYPO</html>");
		})
		.await;
}

#[tokio::test]
async fn falls_back_to_form_login_when_password_grant_is_missing() {
	let server = MockServer::start_async().await;

	mock_missing_password_grant(&server, 404).await;
	mock_landing_page(&server).await;

	let authorize = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("{ISSUER_PATH}/authorize"))
				.query_param("client_id", TEST_CLIENT_ID);
			then.status(200).header("content-type", "text/html").body(AUTHORIZE_PAGE);
		})
		.await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("{ISSUER_PATH}/login"))
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(302)
				.header("location", server.url("/#access_token=form-token&token_type=Bearer"));
		})
		.await;
	let consent = server
		.mock_async(|when, then| {
			when.method(POST).path(format!("{ISSUER_PATH}/authorize"));
			then.status(500);
		})
		.await;
	let client = ReqwestKypoClient::new(&server.base_url(), TEST_CLIENT_ID, "alice", "s3cret")
		.await
		.expect("Interactive sign-in should succeed.");

	assert_eq!(client.session().strategy(), Some(AuthStrategy::InteractiveLogin));
	assert_eq!(client.session().expires_at(), None);
	assert_eq!(
		client.session().bearer().map(|bearer| bearer.expose().to_owned()),
		Some("form-token".to_owned())
	);

	assert_eq!(client.auth_metrics.fallbacks(), 1);
	assert_eq!(client.auth_metrics.sign_ins(), 1);

	authorize.assert_calls_async(1).await;
	login.assert_calls_async(1).await;
	consent.assert_calls_async(0).await;
}

#[tokio::test]
async fn submits_consent_form_when_login_redirect_has_no_token() {
	let server = MockServer::start_async().await;

	mock_missing_password_grant(&server, 405).await;
	mock_landing_page(&server).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{ISSUER_PATH}/authorize"));
			then.status(200).header("content-type", "text/html").body(AUTHORIZE_PAGE);
		})
		.await;

	let login = server
		.mock_async(|when, then| {
			when.method(POST).path(format!("{ISSUER_PATH}/login"));
			then.status(200).header("content-type", "text/html").body(CONSENT_PAGE);
		})
		.await;
	let consent = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("{ISSUER_PATH}/authorize"))
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(302)
				.header("location", server.url("/#access_token=consent-token&token_type=Bearer"));
		})
		.await;
	let client = ReqwestKypoClient::new(&server.base_url(), TEST_CLIENT_ID, "alice", "s3cret")
		.await
		.expect("Interactive sign-in with consent should succeed.");

	assert_eq!(
		client.session().bearer().map(|bearer| bearer.expose().to_owned()),
		Some("consent-token".to_owned())
	);

	login.assert_calls_async(1).await;
	consent.assert_calls_async(1).await;
}

#[tokio::test]
async fn missing_csrf_fails_the_sign_in() {
	let server = MockServer::start_async().await;

	mock_missing_password_grant(&server, 404).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{ISSUER_PATH}/authorize"));
			then.status(200).body("<html>maintenance</html>");
		})
		.await;

	let login = server
		.mock_async(|when, then| {
			when.method(POST).path(format!("{ISSUER_PATH}/login"));
			then.status(200);
		})
		.await;
	let err = ReqwestKypoClient::new(&server.base_url(), TEST_CLIENT_ID, "alice", "s3cret")
		.await
		.expect_err("A page without CSRF should fail the sign-in.");

	assert!(matches!(
		err,
		Error::Auth(AuthError::MissingCsrf { stage: SignInStage::Authorize })
	));

	login.assert_calls_async(0).await;
}

#[tokio::test]
async fn non_200_issuer_page_fails_the_sign_in() {
	let server = MockServer::start_async().await;

	mock_missing_password_grant(&server, 404).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{ISSUER_PATH}/authorize"));
			then.status(503);
		})
		.await;

	let err = ReqwestKypoClient::new(&server.base_url(), TEST_CLIENT_ID, "alice", "s3cret")
		.await
		.expect_err("An unavailable issuer should fail the sign-in.");

	assert!(matches!(
		err,
		Error::Auth(AuthError::SignInStatus { stage: SignInStage::Authorize, status: 503 })
	));
}
