//! Promptmeter Server Library
//!
//! Monthly prompt-quota ledger and the quota-gated wrapper every billed
//! brand-assistant operation runs through. Exposed as a library so the
//! operation executors and the tests can drive it directly.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
