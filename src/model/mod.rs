pub mod activation;
pub use activation::*;

pub mod architecture;
pub use architecture::*;

pub mod config;
pub use config::*;

pub mod error;
pub use error::*;

pub mod layer;
pub use layer::*;

pub mod model;
pub use model::*;

pub mod options;
pub use options::*;

pub mod registry;
pub use registry::*;

pub mod training;
pub use training::*;
