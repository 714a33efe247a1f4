//! Rows of the backend's relational store, as the inspection tools read them.
pub mod patient;
pub use patient::*;

pub mod prediction;
pub use prediction::*;

pub mod statistics;
pub use statistics::*;
