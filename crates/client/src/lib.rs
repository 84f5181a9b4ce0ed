// SPDX-License-Identifier: Apache-2.0
//! Client for delegated content routing.
//!
//! Requests travel through a [RoutingTransport]. Results come back as a cancellable
//! [ResultStream] with one entry per response item, in the order the router produced them.

mod client;
mod error;
mod stream;
mod transport;

pub use client::*;
pub use error::*;
pub use stream::*;
pub use transport::*;

// re-exports for easier maintainability
pub use tokio_util::sync::CancellationToken;
