use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub name: String,
}

impl std::fmt::Display for Patient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.patient_id, self.name)
    }
}

#[cfg(feature = "database")]
impl TryFrom<&tokio_postgres::Row> for Patient {
    type Error = tokio_postgres::Error;
    fn try_from(row: &tokio_postgres::Row) -> Result<Self, Self::Error> {
        Ok(Self {
            patient_id: row.try_get("patient_id")?,
            name: row.try_get("name")?,
        })
    }
}
