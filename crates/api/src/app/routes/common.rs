use axum::Json;
use axum::extract::rejection::JsonRejection;
use validator::Validate;

use crate::app::errors::ApiError;

/// Unwrap a JSON body, turning extractor rejections into the standard
/// error envelope.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Decode and field-validate a JSON body.
pub fn validated_body<T: Validate>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let value = json_body(body)?;
    value.validate().map_err(|e| ApiError::Validation(e.into()))?;
    Ok(value)
}
