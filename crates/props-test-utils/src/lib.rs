//! Shared test utilities for the props workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`dir`]: [`dir::TestDir`] scratch directory with properties helpers
//! - [`fixtures`]: access to the checked-in `test-fixtures/properties` files

pub mod dir;
pub mod fixtures;

pub use dir::TestDir;
