pub mod artifact;
pub use artifact::*;

pub mod error;
pub use error::*;

pub mod group;
pub use group::*;
