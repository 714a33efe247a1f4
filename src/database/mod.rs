//! Read-only access to the backend's relational store.
//!
//! The schema belongs to the web backend; nothing here creates or alters tables.
mod check;
mod source;
mod tools;

pub use check::*;
pub use source::*;
pub use tools::*;

use std::sync::Arc;
use tokio_postgres::Client;

/// PostgreSQL error type alias.
pub type PgErr = tokio_postgres::Error;

/// Registered patients.
#[rustfmt::skip]
pub const PATIENTS:    &str = "patients";
/// Stored diagnoses, one per uploaded image.
#[rustfmt::skip]
pub const PREDICTIONS: &str = "predictions";
/// Aggregates maintained by the backend.
#[rustfmt::skip]
pub const STATISTICS:  &str = "statistics";
/// Every table the tools inspect.
pub const TABLES: [&str; 3] = [PATIENTS, PREDICTIONS, STATISTICS];

/// Connection string from `DATABASE_URL`, or the local default.
pub fn url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| crate::DATABASE_URL.to_string())
}

/// Establishes a database connection.
///
/// The connection future runs on its own task; the returned client is
/// shareable across tasks.
pub async fn db() -> Result<Arc<Client>, PgErr> {
    log::info!("connecting to database");
    let tls = tokio_postgres::tls::NoTls;
    let ref url = url();
    let (client, connection) = tokio_postgres::connect(url, tls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            log::error!("database connection closed: {}", e);
        }
    });
    client
        .execute("SET client_min_messages TO WARNING", &[])
        .await?;
    Ok(Arc::new(client))
}
