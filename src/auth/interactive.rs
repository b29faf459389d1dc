// std
use std::sync::LazyLock;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{Method, Request, header::CONTENT_TYPE},
};
use regex::Regex;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	client::KypoClient,
	error::{AuthError, ConfigError, SignInStage},
	http::{HttpTransport, ResponseMetadataSlot},
	oauth::{BasicFacade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, flow_debug},
	session::{Credentials, SessionToken},
};

static CSRF_INPUT: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"<input type="hidden" name="_csrf" value="([^"]+)" */>"#)
		.expect("CSRF input pattern must compile.")
});

/// Extracts the hidden `_csrf` form value from a sign-in page.
pub fn extract_csrf(page: &str) -> Option<&str> {
	CSRF_INPUT.captures(page).and_then(|captures| captures.get(1)).map(|value| value.as_str())
}

/// Reads `access_token` from the fragment of the URL the sign-in redirected to.
pub fn fragment_access_token(url: &Url) -> Option<String> {
	let fragment = url.fragment()?;

	form_urlencoded::parse(fragment.as_bytes())
		.find(|(key, _)| key == "access_token")
		.map(|(_, value)| value.into_owned())
		.filter(|value| !value.is_empty())
}

/// One page fetched during the interactive sign-in.
#[derive(Debug)]
struct SignInPage {
	status: u16,
	final_url: Option<Url>,
	body: String,
}
impl SignInPage {
	fn ensure_ok(self, stage: SignInStage) -> Result<Self> {
		if self.status == 200 {
			Ok(self)
		} else {
			Err(AuthError::SignInStatus { stage, status: self.status }.into())
		}
	}

	fn csrf(&self, stage: SignInStage) -> Result<&str> {
		extract_csrf(&self.body).ok_or_else(|| AuthError::MissingCsrf { stage }.into())
	}

	fn access_token(&self) -> Option<String> {
		self.final_url.as_ref().and_then(fragment_access_token)
	}
}

impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Signs in through the issuer's HTML forms and reads the token from the redirect fragment.
	///
	/// The pages run over a fresh cookie-keeping transport from
	/// [`HttpTransport::sign_in_session`]. The consent form is submitted only when the login
	/// redirect does not already carry a token. Tokens obtained this way have no tracked expiry.
	pub async fn interactive_login(
		&self,
		ctx: &CallContext,
		credentials: &Credentials,
	) -> Result<SessionToken> {
		const KIND: FlowKind = FlowKind::InteractiveLogin;

		let span = FlowSpan::new(KIND, "interactive_login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(ctx.run(self.run_interactive_login(credentials))).await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	async fn run_interactive_login(&self, credentials: &Credentials) -> Result<SessionToken> {
		let browser = self.http_client.sign_in_session()?;
		let facade = <BasicFacade<C, M>>::from_descriptor(
			&self.descriptor,
			self.session.client_id(),
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)?;
		let authorize = self
			.fetch_sign_in_page(&browser, Method::GET, facade.authorization_url(), None)
			.await?
			.ensure_ok(SignInStage::Authorize)?;
		let login_form = form_urlencoded::Serializer::new(String::new())
			.append_pair("username", &credentials.username)
			.append_pair("password", credentials.password.expose())
			.append_pair("_csrf", authorize.csrf(SignInStage::Authorize)?)
			.append_pair("submit", "Login")
			.finish();
		let login = self
			.fetch_sign_in_page(
				&browser,
				Method::POST,
				self.descriptor.endpoints.login.clone(),
				Some(login_form),
			)
			.await?
			.ensure_ok(SignInStage::Login)?;

		if let Some(token) = login.access_token() {
			return Ok(SessionToken::interactive(token));
		}

		flow_debug!("Sign-in redirect carried no token; submitting the consent form.");

		let approve_form = form_urlencoded::Serializer::new(String::new())
			.append_pair("scope_openid", "openid")
			.append_pair("scope_profile", "profile")
			.append_pair("scope_email", "email")
			.append_pair("remember", "until-revoked")
			.append_pair("user_oauth_approval", "true")
			.append_pair("authorize", "Authorize")
			.append_pair("_csrf", login.csrf(SignInStage::Login)?)
			.finish();
		let approval = self
			.fetch_sign_in_page(
				&browser,
				Method::POST,
				self.descriptor.endpoints.authorize.clone(),
				Some(approve_form),
			)
			.await?
			.ensure_ok(SignInStage::Approve)?;

		approval
			.access_token()
			.map(SessionToken::interactive)
			.ok_or_else(|| AuthError::MissingAccessToken.into())
	}

	async fn fetch_sign_in_page(
		&self,
		browser: &C,
		method: Method,
		url: Url,
		form: Option<String>,
	) -> Result<SignInPage> {
		let mut builder = Request::builder().method(method).uri(url.as_str());

		if form.is_some() {
			builder = builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
		}

		let request: HttpRequest = builder
			.body(form.map(String::into_bytes).unwrap_or_default())
			.map_err(ConfigError::from)?;
		let meta = ResponseMetadataSlot::default();
		let handle = browser.with_metadata(meta.clone());
		let response = handle
			.call(request)
			.await
			.map_err(|err| self.transport_mapper.map_transport_error(meta.take().as_ref(), err))?;
		let final_url = meta.take().and_then(|value| value.final_url);

		Ok(SignInPage {
			status: response.status().as_u16(),
			final_url,
			body: String::from_utf8_lossy(response.body()).into_owned(),
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn extracts_csrf_from_login_page() {
		let page = r#"<form method="post">
			<input type="hidden" name="_csrf" value="a1b2-c3d4" />
			<input name="username"/>
		</form>"#;

		assert_eq!(extract_csrf(page), Some("a1b2-c3d4"));
		assert_eq!(
			extract_csrf(r#"<input type="hidden" name="_csrf" value="tight"/>"#),
			Some("tight")
		);
		assert_eq!(extract_csrf("<html>no form</html>"), None);
	}

	#[test]
	fn reads_access_token_from_fragment() {
		let url = Url::parse(
			"https://kypo.example.com/#access_token=eyJ.abc&token_type=Bearer&expires_in=3600",
		)
		.expect("Failed to parse redirect URL.");

		assert_eq!(fragment_access_token(&url), Some("eyJ.abc".into()));

		let bare = Url::parse("https://kypo.example.com/").expect("Failed to parse redirect URL.");

		assert_eq!(fragment_access_token(&bare), None);

		let empty = Url::parse("https://kypo.example.com/#access_token=")
			.expect("Failed to parse redirect URL.");

		assert_eq!(fragment_access_token(&empty), None);
	}
}
