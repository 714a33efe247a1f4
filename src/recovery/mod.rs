pub mod attempt;
pub use attempt::*;

pub mod failure;
pub use failure::*;

pub mod recovery;
pub use recovery::*;

pub mod strategy;
pub use strategy::*;
