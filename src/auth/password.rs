// self
use crate::{
	_prelude::*,
	client::KypoClient,
	http::HttpTransport,
	oauth::{BasicFacade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{Credentials, SessionToken},
};

impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Requests a token with the resource-owner password grant.
	///
	/// A 404 or 405 from the token endpoint yields
	/// [`AuthError::FlowNotSupported`](crate::error::AuthError::FlowNotSupported); any other
	/// non-2xx answer is fatal and carries the status and body. The returned token expires
	/// `expires_in` seconds from now.
	pub async fn password_grant(
		&self,
		ctx: &CallContext,
		credentials: &Credentials,
	) -> Result<SessionToken> {
		const KIND: FlowKind = FlowKind::PasswordGrant;

		let span = FlowSpan::new(KIND, "password_grant");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(ctx.run(async {
				let facade = <BasicFacade<C, M>>::from_descriptor(
					&self.descriptor,
					self.session.client_id(),
					self.http_client.clone(),
					self.transport_mapper.clone(),
				)?;

				facade.exchange_password(credentials).await
			}))
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}
}
