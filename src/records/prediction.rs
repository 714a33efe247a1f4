use serde::Deserialize;
use serde::Serialize;

/// A stored diagnosis. `confidence` is a probability in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction_id: String,
    pub disease: String,
    pub confidence: f64,
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} ({:.1}%)",
            self.prediction_id,
            self.disease,
            self.confidence * 100.
        )
    }
}

#[cfg(feature = "database")]
impl TryFrom<&tokio_postgres::Row> for Prediction {
    type Error = tokio_postgres::Error;
    fn try_from(row: &tokio_postgres::Row) -> Result<Self, Self::Error> {
        Ok(Self {
            prediction_id: row.try_get("prediction_id")?,
            disease: row.try_get("disease")?,
            confidence: row.try_get("confidence")?,
        })
    }
}
