pub mod error;
pub use error::*;

pub mod ops;
pub use ops::*;

pub mod tensor;
pub use tensor::*;
