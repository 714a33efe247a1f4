/// Explicit load and inference settings, passed to every call
/// rather than held as process-wide framework state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// restore the stored training configuration alongside the network
    pub compile: bool,
    /// images per forward pass
    pub batch_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            compile: false,
            batch_size: crate::BATCH_SIZE,
        }
    }
}
