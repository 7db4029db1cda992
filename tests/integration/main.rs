//! Integration tests for ld-harvest
//!
//! These tests use wiremock to create mock HTTP servers and drive whole
//! harvest runs end-to-end.

mod pipeline_tests;
mod sink_tests;
