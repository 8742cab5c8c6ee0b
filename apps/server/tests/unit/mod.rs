//! Unit tests module
//!
//! Contains tests for individual components in isolation.

mod auth_test;
mod billing_period_test;
