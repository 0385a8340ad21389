//! FUNDASCREEN — fundamental equity screener
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod screener;
pub mod scores;
pub mod engine;
pub mod storage;
