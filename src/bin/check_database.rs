//! Database Contents Check
//!
//! Lists patients and predictions and prints derived statistics.

#[tokio::main]
async fn main() {
    prognose::log();
    if let Err(e) = prognose::database::inspect().await {
        log::error!("database check failed: {}", e);
    }
}
