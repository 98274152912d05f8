//! File helpers for Java `.properties` files
//!
//! Loads files through the props-core parser and saves them with an atomic,
//! locked write so readers never observe a partially written file.

pub mod error;
pub mod io;

pub use error::{Error, Result};
pub use io::{load_file, load_file_or_defaults, load_into, save_file, write_atomic};
