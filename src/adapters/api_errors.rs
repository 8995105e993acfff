use crate::domain::error::AuditError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

// Newtype so the domain error can implement axum's IntoResponse
pub struct ApiError(pub AuditError);

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            AuditError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            AuditError::Database(err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            AuditError::Store(err) => {
                tracing::error!("audit store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            AuditError::NotPersisted { subject_id, source } => {
                tracing::error!(%subject_id, "audit entry not persisted: {source}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "audit_not_persisted",
                    "audit entry could not be persisted".to_string(),
                )
            }
            AuditError::Transport(err) => {
                tracing::error!("transport error: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "transport_error",
                    "upstream unavailable".to_string(),
                )
            }
            AuditError::Http(err) => {
                tracing::error!("http error: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "transport_error",
                    "upstream unavailable".to_string(),
                )
            }
            AuditError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            AuditError::Config(err) => {
                tracing::error!("configuration error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
