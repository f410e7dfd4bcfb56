//! Integration tests for sqlcli.
//!
//! Database-backed tests run against `sqlite::memory:` or temporary files,
//! so no external service is needed.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
