/// Failures reading or writing a model container.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Hdf5(#[from] hdf5::Error),
    #[error("attribute `{0}` does not hold text")]
    Text(String),
}
