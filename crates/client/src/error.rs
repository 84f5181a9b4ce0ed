// SPDX-License-Identifier: Apache-2.0
//! Client and transport errors.

use dr_types::{DecodeError, Method, WireError};
use std::time::Duration;
use thiserror::Error;

/// Result alias for client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result alias for transport calls and raw result items.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors from a routing transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint url is invalid.
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    /// The request envelope could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    /// The http exchange failed.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    /// No response headers arrived in time.
    #[error("no response within {0:?}")]
    Timeout(Duration),
    /// The router answered with a non-success status.
    #[error("router returned status {0}")]
    Status(reqwest::StatusCode),
    /// A response envelope failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The router answered with a response for a different method.
    #[error("unexpected {0} response")]
    UnexpectedMethod(Method),
}

/// Errors from the routing client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Provide requests must be signed before they are sent.
    #[error("request is not signed")]
    UnsignedRequest,
    /// A value could not be converted to or from its wire form.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
