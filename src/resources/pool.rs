// self
use crate::{
	_prelude::*,
	client::KypoClient,
	descriptor::SANDBOX_API_PATH,
	error::{ResourceId, decode_json},
	http::HttpTransport,
	oauth::TransportErrorMapper,
	request::{ApiRequest, StatusCode},
	resources::{SandboxDefinition, User},
};

const RESOURCE: &str = "sandbox pool";

/// Pool of sandboxes built from one definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxPool {
	/// Pool id.
	pub id: i64,
	/// Number of allocated sandboxes.
	pub size: i64,
	/// Maximum number of sandboxes.
	pub max_size: i64,
	/// Lock held on the pool, if any.
	pub lock_id: Option<i64>,
	/// Definition revision.
	pub rev: String,
	/// Commit hash of the definition revision.
	pub rev_sha: String,
	/// Creator.
	pub created_by: User,
	/// Resources consumed by the pool.
	pub hardware_usage: HardwareUsage,
	/// Definition the pool is built from.
	pub definition: SandboxDefinition,
}

/// Hardware quota usage reported for a pool, as decimal strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareUsage {
	/// Virtual CPUs.
	pub vcpu: String,
	/// Memory.
	pub ram: String,
	/// Instances.
	pub instances: String,
	/// Networks.
	pub network: String,
	/// Subnets.
	pub subnet: String,
	/// Ports.
	pub port: String,
}

#[derive(Serialize)]
struct SandboxPoolRequest {
	definition_id: i64,
	max_size: i64,
}

impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Reads a sandbox pool.
	pub async fn get_sandbox_pool(&self, ctx: &CallContext, pool_id: i64) -> Result<SandboxPool> {
		let url = self.descriptor.api_url(&format!("{SANDBOX_API_PATH}/pools/{pool_id}"))?;
		let body = self
			.execute_with_retry(ctx, &ApiRequest::get(url), StatusCode::OK, RESOURCE, pool_id)
			.await?;

		decode_json(RESOURCE, &body)
	}

	/// Creates a pool of at most `max_size` sandboxes from a definition.
	pub async fn create_sandbox_pool(
		&self,
		ctx: &CallContext,
		definition_id: i64,
		max_size: i64,
	) -> Result<SandboxPool> {
		let url = self.descriptor.api_url(&format!("{SANDBOX_API_PATH}/pools"))?;
		let request =
			ApiRequest::post(url).with_json(&SandboxPoolRequest { definition_id, max_size })?;
		let body = self
			.execute_with_retry(ctx, &request, StatusCode::CREATED, RESOURCE, ResourceId::none())
			.await?;

		decode_json(RESOURCE, &body)
	}

	/// Deletes a sandbox pool.
	pub async fn delete_sandbox_pool(&self, ctx: &CallContext, pool_id: i64) -> Result<()> {
		let url = self.descriptor.api_url(&format!("{SANDBOX_API_PATH}/pools/{pool_id}"))?;

		self.execute_with_retry(ctx, &ApiRequest::delete(url), StatusCode::NO_CONTENT, RESOURCE, pool_id)
			.await?;

		Ok(())
	}

	/// Requests cleanup of every allocation unit in the pool.
	///
	/// The service only accepts the request; it does not wait for the units to be removed.
	pub async fn cleanup_sandbox_pool(
		&self,
		ctx: &CallContext,
		pool_id: i64,
		force: bool,
	) -> Result<()> {
		let url = self
			.descriptor
			.api_url(&format!("{SANDBOX_API_PATH}/pools/{pool_id}/cleanup-requests?force={force}"))?;

		self.execute_with_retry(ctx, &ApiRequest::post(url), StatusCode::ACCEPTED, RESOURCE, pool_id)
			.await?;

		Ok(())
	}
}
