//! Command line interface for delegated content routing.
//!
//! `serve` answers routing requests from a static provider table. `find-providers` and
//! `provide` query a router. `keytool` manages the peer identity used to sign advertisements.

pub mod cli;
pub mod keytool;
mod logs;
pub mod query;
pub mod serve;
