//! Core domain primitives shared across aggregates.

pub mod error;
pub mod timestamp;
