//! Test utilities for Touchbase services.
//!
//! Import in `#[cfg(test)]` blocks or integration tests only — never in
//! production code.

pub mod auth;
