use super::*;
use crate::records::Statistics;
use colored::Colorize;

const RULE: usize = 50;

/// Connect, report which backend tables exist, and count patients and predictions.
/// Count failures are warnings.
pub async fn init() -> Result<(), PgErr> {
    log::info!("initializing database connection");
    let client = db().await?;
    log::info!("{}", "database connection established".green());
    client.status().await;
    match (client.count(PATIENTS).await, client.count(PREDICTIONS).await) {
        (Ok(patients), Ok(predictions)) => {
            log::info!("current database status");
            log::info!("{:<32}{}", "patients", patients);
            log::info!("{:<32}{}", "predictions", predictions);
        }
        (Err(e), _) | (_, Err(e)) => log::warn!("error testing database: {}", e),
    }
    Ok(())
}

/// List patients and predictions and print the derived statistics.
pub async fn inspect() -> Result<(), PgErr> {
    let client = db().await?;
    log::info!("{}", "=".repeat(RULE));
    log::info!("DATABASE STATUS CHECK");
    log::info!("{}", "=".repeat(RULE));
    let patients = client.patients().await?;
    log::info!("patients in database: {}", patients.len());
    for patient in patients.iter() {
        log::info!("   - {}", patient);
    }
    let predictions = client.predictions().await?;
    log::info!("predictions in database: {}", predictions.len());
    for prediction in predictions.iter() {
        log::info!("   - {}", prediction);
    }
    log::info!("statistics");
    for line in Statistics::from(predictions.as_slice()).to_string().lines() {
        log::info!("   - {}", line);
    }
    log::info!("{}", "=".repeat(RULE));
    if predictions.is_empty() {
        log::warn!("{}", "no predictions in database".yellow());
        log::warn!("make a prediction to test database save");
    } else {
        log::info!("{}", "database has data".green());
    }
    log::info!("{}", "=".repeat(RULE));
    Ok(())
}

/// Numbered connectivity steps. Any failure is reported with a hint, never propagated.
pub async fn smoke() {
    log::info!("testing database connectivity");
    match steps().await {
        Ok(()) => log::info!("{}", "all checks passed".green()),
        Err(e) => {
            log::error!("{} {}", "error:".red(), e);
            log::error!("check that PostgreSQL is running and DATABASE_URL points at it");
        }
    }
}

async fn steps() -> Result<(), PgErr> {
    log::info!("[1/3] connecting");
    let client = db().await?;
    log::info!("      {}", "connected".green());
    log::info!("[2/3] checking tables");
    for table in TABLES {
        let mark = match client.exists(table).await? {
            true => "present".green(),
            false => "missing".yellow(),
        };
        log::info!("      {:<16}{}", table, mark);
    }
    log::info!("[3/3] counting rows");
    log::info!("      {:<16}{}", PATIENTS, client.count(PATIENTS).await?);
    log::info!("      {:<16}{}", PREDICTIONS, client.count(PREDICTIONS).await?);
    Ok(())
}
