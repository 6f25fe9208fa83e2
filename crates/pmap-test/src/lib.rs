//! Test infrastructure for the platform mapping engine
//!
//! Provides:
//! - A builder for platform mapping JSON documents
//! - The canonical sample platform used by scenario tests
//! - A deliberately inconsistent platform for validation tests

pub mod fixtures;

pub use fixtures::*;
