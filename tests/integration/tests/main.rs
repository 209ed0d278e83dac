//! End-to-End Integration Tests
//!
//! These tests drive the complete service-provider pipeline with generated
//! identity provider responses: signed, unsigned, encrypted and deflated.

mod common;
mod response_validation;
