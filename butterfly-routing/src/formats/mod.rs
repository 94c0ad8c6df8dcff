//! Binary file formats

pub mod hierarchy;

pub use hierarchy::HierarchyFile;
