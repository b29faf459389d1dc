// self
use crate::{
	_prelude::*,
	client::KypoClient,
	descriptor::{ADAPTIVE_TRAINING_API_PATH, TRAINING_API_PATH},
	error::{ResourceId, decode_json},
	http::HttpTransport,
	oauth::TransportErrorMapper,
	request::{ApiRequest, OCTET_STREAM, StatusCode},
};

/// Training service flavour; both expose the same export/import API under different prefixes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingKind {
	/// Linear trainings.
	#[default]
	Linear,
	/// Adaptive trainings.
	Adaptive,
}
impl TrainingKind {
	/// API prefix of the training service.
	pub const fn api_path(self) -> &'static str {
		match self {
			Self::Linear => TRAINING_API_PATH,
			Self::Adaptive => ADAPTIVE_TRAINING_API_PATH,
		}
	}

	/// Resource kind used in errors.
	pub const fn resource(self) -> &'static str {
		match self {
			Self::Linear => "training definition",
			Self::Adaptive => "training definition adaptive",
		}
	}
}

/// Exported training definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingDefinition {
	/// Definition id.
	pub id: i64,
	/// Exported JSON document, verbatim.
	pub content: String,
}

#[derive(Deserialize)]
struct ImportedDefinition {
	id: i64,
}

impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Exports a training definition as its raw JSON document.
	pub async fn get_training_definition(
		&self,
		ctx: &CallContext,
		kind: TrainingKind,
		definition_id: i64,
	) -> Result<TrainingDefinition> {
		let url = self.descriptor.api_url(&format!(
			"{}/exports/training-definitions/{definition_id}",
			kind.api_path()
		))?;
		let request = ApiRequest::get(url).with_accept(OCTET_STREAM);
		let body = self
			.execute_with_retry(ctx, &request, StatusCode::OK, kind.resource(), definition_id)
			.await?;

		Ok(TrainingDefinition {
			id: definition_id,
			content: String::from_utf8_lossy(&body).into_owned(),
		})
	}

	/// Imports a previously exported training definition.
	///
	/// Only the id of the response is read; the returned content is `content` itself.
	pub async fn create_training_definition(
		&self,
		ctx: &CallContext,
		kind: TrainingKind,
		content: impl Into<String>,
	) -> Result<TrainingDefinition> {
		let content = content.into();
		let url = self
			.descriptor
			.api_url(&format!("{}/imports/training-definitions", kind.api_path()))?;
		let request = ApiRequest::post(url).with_body(content.as_bytes());
		let body = self
			.execute_with_retry(ctx, &request, StatusCode::OK, kind.resource(), ResourceId::none())
			.await?;
		let imported: ImportedDefinition = decode_json(kind.resource(), &body)?;

		Ok(TrainingDefinition { id: imported.id, content })
	}

	/// Deletes a training definition.
	pub async fn delete_training_definition(
		&self,
		ctx: &CallContext,
		kind: TrainingKind,
		definition_id: i64,
	) -> Result<()> {
		let url = self
			.descriptor
			.api_url(&format!("{}/training-definitions/{definition_id}", kind.api_path()))?;

		self.execute_with_retry(
			ctx,
			&ApiRequest::delete(url),
			StatusCode::OK,
			kind.resource(),
			definition_id,
		)
		.await?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn kinds_select_service_prefix() {
		assert_eq!(TrainingKind::Linear.api_path(), "/kypo-rest-training/api/v1");
		assert_eq!(TrainingKind::Adaptive.api_path(), "/kypo-adaptive-training/api/v1");
		assert_eq!(TrainingKind::Adaptive.resource(), "training definition adaptive");
		assert_eq!(TrainingKind::default(), TrainingKind::Linear);
	}
}
