//! Cross-cutting service plumbing for Touchbase services: health handlers,
//! tracing setup, request-id middleware, identity extraction, and shared
//! serde helpers.

pub mod health;
pub mod identity;
pub mod middleware;
pub mod serde;
pub mod tracing;
