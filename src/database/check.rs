use super::*;
use const_format::concatcp;
use std::sync::Arc;
use tokio_postgres::Client;

/// Existence and size checks for the backend tables.
#[async_trait::async_trait]
pub trait Check: Send + Sync {
    async fn exists(&self, table: &str) -> Result<bool, PgErr>;
    async fn count(&self, table: &str) -> Result<usize, PgErr>;
    async fn status(&self) {
        log::info!("┌──────────────┬──────────────┐");
        log::info!("│ Table        │ Rows         │");
        log::info!("├──────────────┼──────────────┤");
        for table in TABLES {
            let rows = match self.exists(table).await {
                Ok(true) => match self.count(table).await {
                    Ok(n) => n.to_string(),
                    Err(_) => String::from("error"),
                },
                Ok(false) => String::from("missing"),
                Err(_) => String::from("error"),
            };
            log::info!("│ {:<12} │ {:>12} │", table, rows);
        }
        log::info!("└──────────────┴──────────────┘");
    }
}

#[async_trait::async_trait]
impl Check for Client {
    async fn exists(&self, table: &str) -> Result<bool, PgErr> {
        const SQL: &str = concatcp!(
            "SELECT EXISTS (",
                "SELECT 1 ",
                "FROM   information_schema.tables ",
                "WHERE  table_schema = current_schema() ",
                "AND    table_name   = $1",
            ")"
        );
        Ok(self.query_one(SQL, &[&table]).await?.get::<_, bool>(0))
    }
    async fn count(&self, table: &str) -> Result<usize, PgErr> {
        let ref sql = format!("SELECT COUNT(*) FROM {}", table);
        Ok(self.query_one(sql, &[]).await?.get::<_, i64>(0) as usize)
    }
}

#[async_trait::async_trait]
impl Check for Arc<Client> {
    async fn exists(&self, table: &str) -> Result<bool, PgErr> {
        self.as_ref().exists(table).await
    }
    async fn count(&self, table: &str) -> Result<usize, PgErr> {
        self.as_ref().count(table).await
    }
}
