//! Daily batch run: slice the master scan export for one report date,
//! reconcile both report kinds per hub, persist the Station-Hub facts.
//!
//! Run: cargo run --release --bin run_report -- --date 2025-08-27 --hub all

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Parser;
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use hub_scan_recon::history::{HistoryStore, UpsertSummary};
use hub_scan_recon::models::{CsvScanRow, ReportKind, RouteAggregate, ScanEvent};
use hub_scan_recon::reconcile::{reconcile, select_slices};
use hub_scan_recon::reference::{EquivalenceTable, ExemptSenders, RouteReference};
use hub_scan_recon::windows::{resolve_windows, HubConfig};

/// Reconcile one report date's scans and persist the aggregates
#[derive(Parser, Debug)]
#[command(name = "run_report")]
#[command(about = "Reconcile scan events for a report date and update history")]
struct Args {
    /// Report date (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,

    /// Hub to process: brasov, sibiu or all
    #[arg(long, default_value = "all")]
    hub: String,

    /// Master scan-event CSV
    #[arg(long, default_value = "raw-data/master_events.csv")]
    events: PathBuf,

    /// Directory holding the reference CSVs
    #[arg(long, default_value = "raw-data/reference")]
    refs: PathBuf,

    /// History database path
    #[arg(long, default_value = "data/history.db")]
    db: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let args = Args::parse();

    let hubs = match args.hub.as_str() {
        "brasov" => vec![HubConfig::brasov()],
        "sibiu" => vec![HubConfig::sibiu()],
        "all" => vec![HubConfig::brasov(), HubConfig::sibiu()],
        other => bail!("unknown hub '{}', expected brasov, sibiu or all", other),
    };

    info!("Reading scan events from {:?}", args.events);
    let events = load_events(&args.events)?;

    let store = HistoryStore::open(&args.db).await?;

    let mut incomplete = 0usize;
    for hub in &hubs {
        match run_hub(&store, hub, args.date, &events, &args.refs).await {
            Ok(summary) => {
                if !summary.is_complete() {
                    warn!(
                        "{}: partial history write ({} ok, {} failed)",
                        hub.name, summary.written, summary.failed
                    );
                    incomplete += 1;
                }
            }
            Err(e) => {
                warn!("{}: run aborted: {}", hub.name, e);
                incomplete += 1;
            }
        }
    }

    if incomplete > 0 {
        bail!("{} of {} hub runs did not complete cleanly", incomplete, hubs.len());
    }
    info!("All hub runs completed");
    Ok(())
}

async fn run_hub(
    store: &HistoryStore,
    hub: &HubConfig,
    date: NaiveDate,
    events: &[ScanEvent],
    refs_dir: &Path,
) -> Result<UpsertSummary> {
    info!("=== {} ({}) report for {} ===", hub.name, hub.code, date);

    let hub_lower = hub.name.to_lowercase();
    let routes = RouteReference::from_csv(&refs_dir.join(format!("routes_{}.csv", hub_lower)))?;
    let equiv =
        EquivalenceTable::from_csv(&refs_dir.join(format!("routes_{}_equivalence.csv", hub_lower)))?;
    let exempt = ExemptSenders::from_csv(&refs_dir.join("exempt_senders.csv"))?;
    info!(
        "Loaded {} routes, {} equivalences, {} exempt senders",
        routes.len(),
        equiv.len(),
        exempt.len()
    );

    let windows = resolve_windows(date, hub)?;

    let (out_sh, in_sh) = select_slices(ReportKind::StationToHub, events, &windows, hub);
    info!(
        "Station-Hub slices: {} outbound, {} inbound",
        out_sh.len(),
        in_sh.len()
    );
    let station_hub = reconcile(ReportKind::StationToHub, &out_sh, &in_sh, &routes, &equiv, &exempt);

    let (out_hs, in_hs) = select_slices(ReportKind::HubToStation, events, &windows, hub);
    info!(
        "Hub-Station slices: {} outbound, {} inbound",
        out_hs.len(),
        in_hs.len()
    );
    let hub_station = reconcile(ReportKind::HubToStation, &out_hs, &in_hs, &routes, &equiv, &exempt);

    print_aggregate(&hub.name, ReportKind::StationToHub, &station_hub.aggregates);
    print_aggregate(&hub.name, ReportKind::HubToStation, &hub_station.aggregates);

    let summary = store
        .upsert_report(
            date,
            hub,
            ReportKind::StationToHub,
            &station_hub.aggregates,
            Some(&hub_station.aggregates),
            &routes,
            &equiv,
        )
        .await?;

    info!(
        "{}: {} facts written, {} failed",
        hub.name, summary.written, summary.failed
    );
    Ok(summary)
}

fn load_events(path: &Path) -> Result<Vec<ScanEvent>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut events = Vec::new();
    let mut error_count = 0;
    for (i, row) in reader.deserialize::<CsvScanRow>().enumerate() {
        let parsed = row.map_err(anyhow::Error::from).and_then(|r| r.to_event());
        match parsed {
            Ok(event) => events.push(event),
            Err(e) => {
                if error_count < 5 {
                    warn!("Failed to parse record {}: {}", i, e);
                }
                error_count += 1;
            }
        }
    }

    info!(
        "Parsed {} events from CSV ({} malformed rows skipped)",
        events.len(),
        error_count
    );
    Ok(events)
}

fn print_aggregate(hub: &str, kind: ReportKind, rows: &[RouteAggregate]) {
    println!("\n{}", "=".repeat(78));
    println!("  {} report - {}", kind, hub);
    println!("{}", "-".repeat(78));
    println!(
        "  {:18} {:>8} {:>10} {:>9} {:>9} {:>9} {:>9}",
        "Route", "Colli", "Weight", "Scan out", "Scan in", "Out%", "In%"
    );
    println!("  {}", "-".repeat(76));
    for row in rows {
        println!(
            "  {:18} {:>8} {:>10.2} {:>9} {:>9} {:>8.2}% {:>8.2}%",
            row.route,
            row.colli,
            row.weight,
            row.outbound_scans,
            row.inbound_scans,
            row.outbound_pct * 100.0,
            row.inbound_pct * 100.0
        );
    }
    println!("{}", "=".repeat(78));
}
