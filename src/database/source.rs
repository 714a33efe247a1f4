use super::*;
use crate::records::*;
use const_format::concatcp;
use std::sync::Arc;
use tokio_postgres::Client;

/// Row listings and derived aggregates.
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    async fn patients(&self) -> Result<Vec<Patient>, PgErr>;
    async fn predictions(&self) -> Result<Vec<Prediction>, PgErr>;
    async fn statistics(&self) -> Result<Statistics, PgErr> {
        Ok(Statistics::from(self.predictions().await?.as_slice()))
    }
}

#[rustfmt::skip]
#[async_trait::async_trait]
impl Source for Client {
    async fn patients(&self) -> Result<Vec<Patient>, PgErr> {
        const SQL: &str = concatcp!(
            "SELECT patient_id::TEXT AS patient_id, ",
                   "name::TEXT       AS name ",
            "FROM   ", PATIENTS, " ",
            "ORDER  BY patient_id"
        );
        self.query(SQL, &[])
            .await?
            .iter()
            .map(Patient::try_from)
            .collect()
    }
    async fn predictions(&self) -> Result<Vec<Prediction>, PgErr> {
        const SQL: &str = concatcp!(
            "SELECT prediction_id::TEXT AS prediction_id, ",
                   "disease::TEXT       AS disease, ",
                   "confidence::FLOAT8  AS confidence ",
            "FROM   ", PREDICTIONS, " ",
            "ORDER  BY prediction_id"
        );
        self.query(SQL, &[])
            .await?
            .iter()
            .map(Prediction::try_from)
            .collect()
    }
}

#[async_trait::async_trait]
impl Source for Arc<Client> {
    async fn patients(&self) -> Result<Vec<Patient>, PgErr> {
        self.as_ref().patients().await
    }
    async fn predictions(&self) -> Result<Vec<Prediction>, PgErr> {
        self.as_ref().predictions().await
    }
}
