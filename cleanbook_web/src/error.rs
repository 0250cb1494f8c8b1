use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cleanbook::domain::dispatch::DispatchError;
use serde_json::json;

pub struct ApiError(DispatchError);

impl From<DispatchError> for ApiError {
    fn from(value: DispatchError) -> Self {
        Self(value)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            DispatchError::ReservationNotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::Reservation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DispatchError::DataAccess(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
