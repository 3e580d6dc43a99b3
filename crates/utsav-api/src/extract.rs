use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::{Validate, ValidationErrors};

use crate::ApiError;

const INVALID_BODY_MESSAGE: &str = "Invalid request body.";

/// JSON body that has been deserialized and passed its `Validate` rules.
///
/// Malformed bodies and failed rules both answer 400 with the usual
/// `{ "success": false, "message": ... }` envelope.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state).await.map_err(body_error)?;

        extracted_json.0.validate().map_err(|errors| ApiError::Validation(first_message(&errors)))?;

        Ok(Self(extracted_json.0))
    }
}

pub(crate) fn body_error(rejection: JsonRejection) -> ApiError {
    debug!(status = %rejection.status(), reason = %rejection.body_text(), "Rejected request body");
    ApiError::validation(INVALID_BODY_MESSAGE)
}

/// Message of the first failing field, by field name so the answer is stable.
fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| INVALID_BODY_MESSAGE.to_string())
}
