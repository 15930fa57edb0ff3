//! Read-side report for one center: the 30-day route-level history and
//! the 3-day daily trend.
//!
//! Run: ./target/release/center_stats "ALBA IULIA" [as-of-date] [db-path]

use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::env;

use hub_scan_recon::analytics::{daily_stats_last_3_days, last_30_days};
use hub_scan_recon::history::HistoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let Some(center) = args.get(1) else {
        println!("Usage: center_stats <center> [as-of-date] [db-path]");
        return Ok(());
    };
    let as_of: NaiveDate = match args.get(2) {
        Some(s) => s.parse()?,
        None => Local::now().date_naive(),
    };
    let db_path = args.get(3).map(String::as_str).unwrap_or("data/history.db");

    let store = HistoryStore::open(db_path).await?;

    println!("\n{}", "=".repeat(78));
    println!("  SCAN COMPLETION - {} (as of {})", center, as_of);
    println!("{}\n", "=".repeat(78));

    // Route-level rows over the long window
    println!("LAST 30 DAYS BY ROUTE");
    println!("{}", "-".repeat(70));

    let facts = last_30_days(&store, center, as_of).await?;
    if facts.is_empty() {
        println!("  No facts stored for this center in the last 30 days.");
    } else {
        println!(
            "  {:12} {:14} {:>8} {:>10} {:>9} {:>9}",
            "Date", "Route", "Colli", "Weight", "Out%", "In%"
        );
        println!("  {}", "-".repeat(68));
        let mut total_colli = 0i64;
        let mut total_weight = 0f64;
        for fact in &facts {
            total_colli += fact.colli;
            total_weight += fact.weight;
            println!(
                "  {:12} {:14} {:>8} {:>10.2} {:>8.2}% {:>8.2}%",
                fact.report_date.to_string(),
                fact.route,
                fact.colli,
                fact.weight,
                fact.outbound_pct,
                fact.inbound_pct
            );
        }
        let n = facts.len() as f64;
        let avg_out: f64 = facts.iter().map(|f| f.outbound_pct).sum::<f64>() / n;
        let avg_in: f64 = facts.iter().map(|f| f.inbound_pct).sum::<f64>() / n;
        println!("  {}", "-".repeat(68));
        println!(
            "  {:12} {:14} {:>8} {:>10.2} {:>8.2}% {:>8.2}%",
            "TOTAL", "-", total_colli, total_weight, avg_out, avg_in
        );
    }

    // Day-over-day movement over the short window
    println!("\n\nDAILY TREND (LAST 3 DAYS)");
    println!("{}", "-".repeat(70));

    let daily = daily_stats_last_3_days(&store, center, as_of).await?;
    if daily.is_empty() {
        println!("  No facts stored for this center in the last 3 days.");
    } else {
        println!(
            "  {:12} {:>8} {:>10} {:>9} {:>9} {:>8} {:>9} {:>10}",
            "Date", "Colli", "Weight", "Out%", "In%", "Delta", "Change", "Trend"
        );
        println!("  {}", "-".repeat(80));
        for day in &daily {
            let delta = day
                .colli_delta
                .map(|d| format!("{:+}", d))
                .unwrap_or_else(|| "-".to_string());
            let change = day
                .pct_change
                .map(|c| format!("{:+.1}%", c))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:12} {:>8} {:>10.2} {:>8.2}% {:>8.2}% {:>8} {:>9} {:>10}",
                day.date.to_string(),
                day.colli,
                day.weight,
                day.outbound_pct,
                day.inbound_pct,
                delta,
                change,
                day.trend
            );
        }
    }

    println!("\n{}", "=".repeat(78));
    println!();

    Ok(())
}
