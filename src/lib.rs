//! sqlcli - run SQL statements and export result sets.
//!
//! This library exposes the core modules for the binary and for integration
//! tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod render;
pub mod scanner;
pub mod session;
