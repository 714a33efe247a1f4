pub mod predictions;
pub use predictions::*;

pub mod probe;
pub use probe::*;

pub mod samples;
pub use samples::*;

pub mod scheme;
pub use scheme::*;

pub mod sweep;
pub use sweep::*;
