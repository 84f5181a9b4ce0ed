//! Crate for configuring delegated routing.
//!
//! Client, server and static provider settings.
mod providers;
pub use providers::*;
mod routing;
pub use routing::*;
mod traits;
pub use traits::*;
