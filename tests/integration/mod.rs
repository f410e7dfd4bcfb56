//! Integration tests for sqlcli.

pub mod config_test;
pub mod render_test;
pub mod session_test;
