// self
use crate::{
	_prelude::*,
	client::KypoClient,
	descriptor::SANDBOX_API_PATH,
	error::{ResourceId, decode_json},
	http::HttpTransport,
	oauth::TransportErrorMapper,
	obs::flow_debug,
	request::{ApiRequest, StatusCode},
	resources::User,
};

const RESOURCE: &str = "sandbox definition";

/// Sandbox definition: a Git repository describing the sandbox topology.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxDefinition {
	/// Definition id.
	pub id: i64,
	/// Git repository URL.
	pub url: String,
	/// Definition name.
	pub name: String,
	/// Git revision.
	pub rev: String,
	/// Creator.
	pub created_by: User,
}

#[derive(Serialize)]
struct SandboxDefinitionRequest<'a> {
	url: &'a str,
	rev: &'a str,
}

impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Reads a sandbox definition.
	pub async fn get_sandbox_definition(
		&self,
		ctx: &CallContext,
		definition_id: i64,
	) -> Result<SandboxDefinition> {
		let url = self.descriptor.api_url(&format!("{SANDBOX_API_PATH}/definitions/{definition_id}"))?;
		let body = self
			.execute_with_retry(ctx, &ApiRequest::get(url), StatusCode::OK, RESOURCE, definition_id)
			.await?;

		decode_json(RESOURCE, &body)
	}

	/// Registers a sandbox definition from a Git repository URL and revision.
	pub async fn create_sandbox_definition(
		&self,
		ctx: &CallContext,
		url: &str,
		rev: &str,
	) -> Result<SandboxDefinition> {
		let endpoint = self.descriptor.api_url(&format!("{SANDBOX_API_PATH}/definitions"))?;
		let request =
			ApiRequest::post(endpoint).with_json(&SandboxDefinitionRequest { url, rev })?;
		let body = self
			.execute_with_retry(ctx, &request, StatusCode::CREATED, RESOURCE, ResourceId::none())
			.await?;

		decode_json(RESOURCE, &body)
	}

	/// Deletes a sandbox definition; a definition that is already gone counts as deleted.
	pub async fn delete_sandbox_definition(
		&self,
		ctx: &CallContext,
		definition_id: i64,
	) -> Result<()> {
		let url = self.descriptor.api_url(&format!("{SANDBOX_API_PATH}/definitions/{definition_id}"))?;
		let result = self
			.execute_with_retry(
				ctx,
				&ApiRequest::delete(url),
				StatusCode::NO_CONTENT,
				RESOURCE,
				definition_id,
			)
			.await;

		match result {
			Ok(_) => Ok(()),
			Err(err) if err.is_not_found() => {
				flow_debug!(definition_id, "Sandbox definition already deleted.");

				Ok(())
			},
			Err(err) => Err(err),
		}
	}
}
