//! Domain types shared across Touchbase services.
//!
//! This crate contains only pure types and algorithms with no framework
//! dependencies. Import in `usecase/` and `domain/` layers; never in
//! `infra/` or `handlers/`.

pub mod cadence;
pub mod pagination;
pub mod preview;
