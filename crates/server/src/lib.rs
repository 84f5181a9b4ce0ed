// SPDX-License-Identifier: Apache-2.0
//! Http endpoint for delegated content routing.

mod error;
mod handler;
mod service;

pub use error::*;
pub use handler::*;
pub use service::*;
