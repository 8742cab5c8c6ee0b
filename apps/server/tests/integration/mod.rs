//! Integration tests module
//!
//! Contains tests that require a database and exercise the ledger end to end.

#[path = "../common/mod.rs"]
mod common;

mod health_test;
