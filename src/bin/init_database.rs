//! Database Initialization Check
//!
//! Reports which backend tables exist and how many rows they hold.

#[tokio::main]
async fn main() {
    prognose::log();
    if let Err(e) = prognose::database::init().await {
        log::warn!("error testing database: {}", e);
    }
}
