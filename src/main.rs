use anyhow::Result;
use chrono::{Duration, Local};
use hub_scan_recon::history::HistoryStore;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let store = HistoryStore::open("data/history.db").await?;

    info!("Connected to history store");

    info!("=== History Store Statistics ===");

    // Total facts
    let totals: Vec<serde_json::Value> = store
        .conn()
        .query("SELECT count() AS cnt FROM scan_fact GROUP ALL")
        .await?
        .take(0)?;
    info!("Facts: {:?}", totals);

    // Facts per hub
    let by_hub: Vec<serde_json::Value> = store
        .conn()
        .query("SELECT hub, count() AS cnt FROM scan_fact GROUP BY hub")
        .await?
        .take(0)?;
    info!("Facts by hub: {:?}", by_hub);

    // Date coverage
    let dates: Vec<serde_json::Value> = store
        .conn()
        .query(
            "SELECT report_date, count() AS cnt FROM scan_fact \
             GROUP BY report_date ORDER BY report_date DESC LIMIT 10",
        )
        .await?
        .take(0)?;
    info!("Most recent report dates: {:?}", dates);

    // Centers with facts over the trailing 30 days
    let today = Local::now().date_naive();
    let centers = store
        .centers_in_range(today - Duration::days(30), today)
        .await?;
    info!("Centers with facts in the last 30 days: {}", centers.len());
    for (center, route_count) in &centers {
        info!("  {} ({} routes)", center, route_count);
    }

    Ok(())
}
