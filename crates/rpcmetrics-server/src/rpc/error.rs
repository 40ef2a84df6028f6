//! RPC error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use rpcmetrics_core::error::{ClientCode, MetricsError};

/// `MetricsError` rendered as `{"ok": false, "error": {"code", "msg"}}`.
#[derive(Debug)]
pub struct ApiError(pub MetricsError);

impl From<MetricsError> for ApiError {
    fn from(e: MetricsError) -> Self {
        Self(e)
    }
}

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::NotFound => StatusCode::NOT_FOUND,
        ClientCode::AlreadyExists | ClientCode::RegistrationFailure => StatusCode::CONFLICT,
        ClientCode::UnsupportedOperation => StatusCode::UNPROCESSABLE_ENTITY,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ClientCode::BadRequest
        | ClientCode::InvalidType
        | ClientCode::InvalidDeclaration
        | ClientCode::MissingLabels
        | ClientCode::InvalidValue
        | ClientCode::UnsupportedVersion => StatusCode::BAD_REQUEST,
    }
}

fn error_json(code: &str, msg: &str) -> serde_json::Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "msg": msg
        }
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let body = error_json(code.as_str(), &self.0.to_string());
        (status_for(code), Json(body)).into_response()
    }
}
