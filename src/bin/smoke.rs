//! Database Smoke Test
//!
//! Numbered connectivity steps against the configured database.

#[tokio::main]
async fn main() {
    prognose::log();
    prognose::database::smoke().await;
}
