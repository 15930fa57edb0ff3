use surrealdb::engine::local::{Db, Mem, RocksDb};
use surrealdb::Surreal;

use crate::error::ReportError;

pub type DbConn = Surreal<Db>;

/// Open the history database with the RocksDB backend
pub async fn connect(path: &str) -> Result<DbConn, ReportError> {
    let db = Surreal::new::<RocksDb>(path).await?;
    db.use_ns("hubscan").use_db("history").await?;
    Ok(db)
}

/// In-memory database, used by tests and throwaway runs
pub async fn connect_memory() -> Result<DbConn, ReportError> {
    let db = Surreal::new::<Mem>(()).await?;
    db.use_ns("hubscan").use_db("history").await?;
    Ok(db)
}

/// Initialize the historical fact table. Facts are keyed by
/// (report_date, hub, kind, center, route); a re-run for the same key
/// overwrites the prior row.
pub async fn init_schema(db: &DbConn) -> Result<(), ReportError> {
    db.query(
        r#"
        DEFINE TABLE IF NOT EXISTS scan_fact SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_fact_key ON scan_fact
            FIELDS report_date, hub, kind, center, route UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_fact_center_date ON scan_fact
            FIELDS center, report_date;
        "#,
    )
    .await?;

    Ok(())
}
