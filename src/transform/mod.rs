//! Value-level text transformations used by the cleaning pipelines.

pub mod text;
