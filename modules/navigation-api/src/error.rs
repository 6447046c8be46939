use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use navigation_config::NavError;
use serde_json::json;
use tracing::warn;

/// A [`NavError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub NavError);

impl From<NavError> for ApiError {
    fn from(err: NavError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            NavError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NavError::DeletionBlocked(_) => StatusCode::CONFLICT,
            NavError::NotFound { .. } => StatusCode::NOT_FOUND,
            NavError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });

        match &self.0 {
            NavError::DeletionBlocked(blocked) => {
                body["remediation"] = json!(blocked.remediation());
            }
            NavError::Persistence(e) => {
                warn!(error = %e, "Navigation store unavailable");
                body["retryable"] = json!(true);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
