// self
use crate::{
	_prelude::*,
	client::KypoClient,
	descriptor::SANDBOX_API_PATH,
	error::{ResourceCause, ResourceError, decode_json},
	http::HttpTransport,
	oauth::TransportErrorMapper,
	obs::flow_debug,
	poll::{PollOutcome, RequestKind, STAGE_FAILED, STAGE_IN_QUEUE, STAGE_RUNNING},
	request::{ApiRequest, StatusCode},
	resources::User,
};

const UNIT_RESOURCE: &str = "sandbox allocation unit";
const UNITS_RESOURCE: &str = "sandbox allocation units";
const CLEANUP_RESOURCE: &str = "sandbox cleanup request";
const ALLOCATION_REQUEST_RESOURCE: &str = "sandbox allocation request";
const OUTPUT_RESOURCE: &str = "sandbox request output";

/// One sandbox of a pool together with its allocation and cleanup requests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxAllocationUnit {
	/// Unit id.
	pub id: i64,
	/// Pool the unit belongs to.
	pub pool_id: i64,
	/// Allocation request, once one exists.
	pub allocation_request: Option<SandboxRequest>,
	/// Cleanup request, once one exists.
	pub cleanup_request: Option<SandboxRequest>,
	/// Creator.
	pub created_by: User,
	/// Whether the sandbox is locked for a training run.
	pub locked: bool,
}

/// Asynchronous allocation or cleanup job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxRequest {
	/// Request id.
	pub id: i64,
	/// Allocation unit the request works on.
	pub allocation_unit_id: i64,
	/// Creation timestamp as reported by the service.
	pub created: String,
	/// Stage markers, one per provisioning stage.
	pub stages: Vec<String>,
}
impl SandboxRequest {
	/// Returns `true` once no stage is queued or running.
	pub fn is_finished(&self) -> bool {
		!self.has_stage(STAGE_RUNNING) && !self.has_stage(STAGE_IN_QUEUE)
	}

	/// Returns `true` when any stage failed.
	pub fn has_failed(&self) -> bool {
		self.has_stage(STAGE_FAILED)
	}

	fn has_stage(&self, marker: &str) -> bool {
		self.stages.iter().any(|stage| stage == marker)
	}
}

/// Provisioning stage whose output can be read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageOutputKind {
	/// Ansible run inside the user's machines.
	UserAnsible,
	/// Ansible run configuring the sandbox network.
	NetworkingAnsible,
	/// Terraform stack creation.
	Terraform,
}
impl StageOutputKind {
	/// Returns the path segment used by the service.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::UserAnsible => "user-ansible",
			Self::NetworkingAnsible => "networking-ansible",
			Self::Terraform => "terraform",
		}
	}
}
impl Display for StageOutputKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One page of a stage's output, joined into a single text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxRequestStageOutput {
	/// Page number.
	pub page: i64,
	/// Requested page size.
	pub page_size: i64,
	/// Number of pages.
	pub page_count: i64,
	/// Lines on this page.
	pub count: i64,
	/// Lines across all pages.
	pub total_count: i64,
	/// Every line of the page, each terminated by `\n`.
	pub result: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct StageOutputPage {
	page: i64,
	page_size: i64,
	page_count: i64,
	count: i64,
	total_count: i64,
	results: Vec<OutputLine>,
}
impl From<StageOutputPage> for SandboxRequestStageOutput {
	fn from(page: StageOutputPage) -> Self {
		let result = page.results.into_iter().fold(String::new(), |mut text, line| {
			text.push_str(&line.content);
			text.push('\n');

			text
		});

		Self {
			page: page.page,
			page_size: page.page_size,
			page_count: page.page_count,
			count: page.count,
			total_count: page.total_count,
			result,
		}
	}
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct OutputLine {
	content: String,
}

impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Reads an allocation unit.
	pub async fn get_sandbox_allocation_unit(
		&self,
		ctx: &CallContext,
		unit_id: i64,
	) -> Result<SandboxAllocationUnit> {
		let url = self
			.descriptor
			.api_url(&format!("{SANDBOX_API_PATH}/sandbox-allocation-units/{unit_id}"))?;
		let body = self
			.execute_with_retry(ctx, &ApiRequest::get(url), StatusCode::OK, UNIT_RESOURCE, unit_id)
			.await?;

		decode_json(UNIT_RESOURCE, &body)
	}

	/// Starts the allocation of `count` sandboxes in a pool.
	pub async fn create_sandbox_allocation_units(
		&self,
		ctx: &CallContext,
		pool_id: i64,
		count: i64,
	) -> Result<Vec<SandboxAllocationUnit>> {
		let url = self.descriptor.api_url(&format!(
			"{SANDBOX_API_PATH}/pools/{pool_id}/sandbox-allocation-units?count={count}"
		))?;
		let body = self
			.execute_with_retry(
				ctx,
				&ApiRequest::post(url),
				StatusCode::CREATED,
				UNITS_RESOURCE,
				format!("sandbox pool {pool_id}"),
			)
			.await?;

		decode_json(UNITS_RESOURCE, &body)
	}

	/// Allocates one sandbox and waits until its allocation request finishes.
	///
	/// The request is checked every `interval`. The returned unit carries the finished request,
	/// which may include a `FAILED` stage; callers decide how to treat it.
	pub async fn create_sandbox_allocation_unit_await(
		&self,
		ctx: &CallContext,
		pool_id: i64,
		interval: StdDuration,
	) -> Result<SandboxAllocationUnit> {
		let units = self.create_sandbox_allocation_units(ctx, pool_id, 1).await?;
		let [mut unit]: [SandboxAllocationUnit; 1] = units.try_into().map_err(
			|units: Vec<SandboxAllocationUnit>| {
				ResourceError::new(
					UNITS_RESOURCE,
					format!("sandbox pool {pool_id}"),
					ResourceCause::Failed {
						reason: format!(
							"expected one allocation unit to be created, got {} instead",
							units.len()
						),
					},
				)
			},
		)?;

		flow_debug!(pool_id, unit_id = unit.id, "Awaiting sandbox allocation.");

		match self.poll_request_finished(ctx, unit.id, interval, RequestKind::Allocation).await? {
			PollOutcome::Terminal(request) => unit.allocation_request = Some(request),
			PollOutcome::Removed =>
				return Err(
					ResourceError::new("sandbox request", unit.id, ResourceCause::NotFound).into()
				),
		}

		Ok(unit)
	}

	/// Starts the cleanup of an allocation unit.
	pub async fn create_sandbox_cleanup_request(
		&self,
		ctx: &CallContext,
		unit_id: i64,
	) -> Result<SandboxRequest> {
		let url = self
			.descriptor
			.api_url(&format!("{SANDBOX_API_PATH}/sandbox-allocation-units/{unit_id}/cleanup-request"))?;
		let body = self
			.execute_with_retry(
				ctx,
				&ApiRequest::post(url),
				StatusCode::CREATED,
				CLEANUP_RESOURCE,
				format!("sandbox allocation unit {unit_id}"),
			)
			.await?;

		decode_json(CLEANUP_RESOURCE, &body)
	}

	/// Starts the cleanup of an allocation unit and waits until it finishes.
	///
	/// The service deletes a successful cleanup request, so a request that disappears counts as
	/// done. A request that ends with a `FAILED` stage is reported as a failure.
	pub async fn create_sandbox_cleanup_request_await(
		&self,
		ctx: &CallContext,
		unit_id: i64,
		interval: StdDuration,
	) -> Result<()> {
		self.create_sandbox_cleanup_request(ctx, unit_id).await?;

		match self.poll_request_finished(ctx, unit_id, interval, RequestKind::Cleanup).await? {
			PollOutcome::Removed => Ok(()),
			PollOutcome::Terminal(request) if request.has_failed() => Err(ResourceError::new(
				CLEANUP_RESOURCE,
				format!("sandbox allocation unit {unit_id}"),
				ResourceCause::Failed { reason: "sandbox cleanup request finished with error".into() },
			)
			.into()),
			PollOutcome::Terminal(_) => Ok(()),
		}
	}

	/// Cancels a running allocation request.
	pub async fn cancel_sandbox_allocation_request(
		&self,
		ctx: &CallContext,
		request_id: i64,
	) -> Result<()> {
		let url = self
			.descriptor
			.api_url(&format!("{SANDBOX_API_PATH}/allocation-requests/{request_id}/cancel"))?;

		self.execute_with_retry(
			ctx,
			&ApiRequest::patch(url),
			StatusCode::OK,
			ALLOCATION_REQUEST_RESOURCE,
			request_id,
		)
		.await?;

		Ok(())
	}

	/// Reads one page of a stage's output for an allocation request.
	pub async fn get_sandbox_request_stage_output(
		&self,
		ctx: &CallContext,
		request_id: i64,
		stage: StageOutputKind,
		page: i64,
		page_size: i64,
	) -> Result<SandboxRequestStageOutput> {
		let url = self.descriptor.api_url(&format!(
			"{SANDBOX_API_PATH}/allocation-requests/{request_id}/stages/{stage}/outputs?page={page}&page_size={page_size}"
		))?;
		let body = self
			.execute_with_retry(ctx, &ApiRequest::get(url), StatusCode::OK, OUTPUT_RESOURCE, request_id)
			.await?;
		let raw: StageOutputPage = decode_json(OUTPUT_RESOURCE, &body)?;

		Ok(raw.into())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request(stages: &[&str]) -> SandboxRequest {
		SandboxRequest {
			stages: stages.iter().map(|stage| (*stage).to_owned()).collect(),
			..Default::default()
		}
	}

	#[test]
	fn stage_membership_decides_completion() {
		assert!(!request(&["FINISHED", "RUNNING", "IN_QUEUE"]).is_finished());
		assert!(!request(&["IN_QUEUE"]).is_finished());
		assert!(request(&["FINISHED", "FINISHED", "FINISHED"]).is_finished());
		assert!(request(&[]).is_finished());

		let failed = request(&["FINISHED", "FAILED", "IN_QUEUE"]);

		assert!(!failed.is_finished());
		assert!(failed.has_failed());
	}

	#[test]
	fn stage_output_joins_lines() {
		let raw: StageOutputPage = serde_json::from_str(
			r#"{"page":1,"page_size":2,"page_count":3,"count":2,"total_count":5,
			"results":[{"content":"TASK [setup]"},{"content":"ok: [server]"}]}"#,
		)
		.expect("Stage output page should deserialize.");
		let output = SandboxRequestStageOutput::from(raw);

		assert_eq!(output.page_count, 3);
		assert_eq!(output.total_count, 5);
		assert_eq!(output.result, "TASK [setup]\nok: [server]\n");
	}

	#[test]
	fn unit_tolerates_missing_requests() {
		let unit: SandboxAllocationUnit =
			serde_json::from_str(r#"{"id":7,"pool_id":2,"allocation_request":null,"locked":true}"#)
				.expect("Allocation unit should deserialize.");

		assert_eq!(unit.id, 7);
		assert!(unit.allocation_request.is_none());
		assert!(unit.cleanup_request.is_none());
		assert!(unit.locked);
	}

	#[test]
	fn stage_output_kinds_match_service_paths() {
		assert_eq!(StageOutputKind::UserAnsible.to_string(), "user-ansible");
		assert_eq!(StageOutputKind::NetworkingAnsible.as_str(), "networking-ansible");
		assert_eq!(StageOutputKind::Terraform.as_str(), "terraform");
	}
}
