//! Common utilities for the butterfly-osm routing toolkit

pub mod error;

pub use error::{Error, Result};
