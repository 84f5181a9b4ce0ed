// SPDX-License-Identifier: Apache-2.0
//! Errors surfaced at the http boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dr_types::{DecodeError, DecodeFailureKind, Method, ParseRequestError, WireError};
use thiserror::Error;
use tracing::{debug, error};

/// Result alias for routing services.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors reported by a routing service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service does not implement the method.
    #[error("{0} is not served")]
    NotServed(Method),
    /// The service failed.
    #[error("{0}")]
    Internal(String),
}

/// Reasons a request is rejected before any result is streamed.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The query is not a valid url-escaped string.
    #[error("invalid query escape: {0}")]
    Unescape(String),
    /// The envelope failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The requested key is not a multihash.
    #[error("invalid key: {0}")]
    Key(WireError),
    /// A signed request was rejected.
    #[error("rejected request: {0}")]
    Rejected(#[from] ParseRequestError),
    /// The service failed to start producing results.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl HandlerError {
    /// The http status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(e) => match e.kind() {
                DecodeFailureKind::BadRequest => StatusCode::BAD_REQUEST,
                DecodeFailureKind::NotFound => StatusCode::NOT_FOUND,
            },
            Self::Unescape(_) | Self::Key(_) | Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::Service(ServiceError::NotServed(_)) => StatusCode::NOT_FOUND,
            Self::Service(ServiceError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(target: "dr::server", error = %self, "request failed");
        } else {
            debug!(target: "dr::server", error = %self, %status, "request rejected");
        }
        // the status alone carries the outcome
        status.into_response()
    }
}
