use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::client::ClientError;
use crate::schedule::export::ExportError;
use crate::schedule::session::{QueryError, ViewError};
use crate::utils::session_store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Upstream(#[from] ClientError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Upstream(ClientError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Export(ExportError::Empty) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Export(ExportError::Xlsx(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::View(ViewError::NotLoaded) => StatusCode::CONFLICT,
            ApiError::View(ViewError::Page(_)) => StatusCode::BAD_REQUEST,
            ApiError::Query(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        HttpResponse::build(status).json(json!({ "message": self.to_string() }))
    }
}
