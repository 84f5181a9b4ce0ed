//! Integration tests for the delegated routing wire model.

mod envelope_tests;
mod provider_tests;
mod signing_props;
