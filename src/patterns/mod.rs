//! Marker pattern recognition

pub mod matcher;

pub use matcher::{MarkerMatch, PatternSet};
