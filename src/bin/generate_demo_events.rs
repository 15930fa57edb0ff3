//! Demo master-CSV generator for exercising the reconciliation pipeline
//! end to end, including the reference tables the reports need.
//!
//! Usage:
//!   cargo run --release --bin generate_demo_events -- [OPTIONS]
//!
//! Options:
//!   --days <N>               Business days to generate, ending at --end-date
//!   --packages-per-route <N> Packages per route per day
//!   --seed <N>               Random seed for reproducibility
//!   --output <PATH>          Master CSV path
//!   --refs <PATH>            Directory for the reference CSVs

use anyhow::Result;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime, Timelike, Weekday};
use clap::Parser;
use csv::WriterBuilder;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use hub_scan_recon::windows::HubConfig;

/// Generate demo scan events and reference tables
#[derive(Parser, Debug)]
#[command(name = "generate_demo_events")]
#[command(about = "Generate a demo master scan export with reference tables")]
struct Args {
    /// Last report date to generate (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Number of business days to generate
    #[arg(long, default_value = "5")]
    days: u32,

    /// Packages per route per day
    #[arg(long, default_value = "40")]
    packages_per_route: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output master CSV path
    #[arg(long, default_value = "raw-data/master_events.csv")]
    output: PathBuf,

    /// Directory for the reference CSVs
    #[arg(long, default_value = "raw-data/reference")]
    refs: PathBuf,
}

/// Output row matching the master-export column layout
#[derive(Debug, Serialize)]
struct DemoRow {
    package_id: String,
    route: String,
    origin_center: String,
    dest_center: String,
    sender: String,
    receiver: String,
    pieces: i64,
    weight: f64,
    category: String,
    scanned_at: String,
    scan_kind: String,
    scanning_center: String,
    operator: String,
}

const SENDERS: &[&str] = &["ACME SRL", "MEGA TRADE", "TRANSCARPAT", "EUROPACK"];
const EXEMPT_SENDER: &str = "NOSCAN LOGISTICS SRL";
const RECEIVERS: &[&str] = &["DEPOZIT CENTRAL", "RETAIL NORD", "RETAIL SUD", "CASH AND CARRY"];

fn stations_for(hub: &HubConfig) -> Vec<(&'static str, &'static str)> {
    match hub.code.as_str() {
        "BVH" => vec![
            ("ALB", "ALBA IULIA"),
            ("CLJ", "CLUJ"),
            ("SFG", "SFANTU GHEORGHE"),
            ("TGM", "TARGU MURES"),
        ],
        _ => vec![
            ("DVA", "DEVA"),
            ("MED", "MEDIAS"),
            ("RVL", "RAMNICU VALCEA"),
            ("SLT", "SLATINA"),
        ],
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let args = Args::parse();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let end_date = args.end_date.unwrap_or_else(|| Local::now().date_naive());
    let hubs = [HubConfig::brasov(), HubConfig::sibiu()];

    // Walk backwards collecting business days; weekends carry no station
    // dispatch in this system.
    let mut dates = Vec::new();
    let mut cursor = end_date;
    while dates.len() < args.days as usize {
        if !matches!(cursor.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(cursor);
        }
        cursor = cursor - Duration::days(1);
    }
    dates.reverse();

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&args.refs)?;

    write_reference_tables(&args.refs, &hubs)?;

    let mut writer = WriterBuilder::new().has_headers(true).from_path(&args.output)?;
    let mut row_count = 0usize;
    let mut seq = 0u64;

    for date in &dates {
        for hub in &hubs {
            for (code, center) in stations_for(hub) {
                for _ in 0..args.packages_per_route {
                    seq += 1;
                    row_count += write_package_legs(
                        &mut writer, &mut rng, *date, hub, code, center, seq,
                    )?;
                }
            }
        }
    }
    writer.flush()?;

    info!(
        "Wrote {} scan events for {} business days to {:?}",
        row_count,
        dates.len(),
        args.output
    );
    info!("Reference tables in {:?}", args.refs);
    Ok(())
}

/// Emit the scans of one package on the station->hub leg and one package
/// on the hub->station leg. Returns the number of rows written.
fn write_package_legs(
    writer: &mut csv::Writer<std::fs::File>,
    rng: &mut StdRng,
    date: NaiveDate,
    hub: &HubConfig,
    code: &str,
    center: &str,
    seq: u64,
) -> Result<usize> {
    let mut rows = 0usize;

    let station_route = format!("{}-{}", code, hub.code);
    let hub_route = format!("{}-{}", hub.code, code);

    let exempt = rng.gen_bool(0.02);
    let sender = if exempt {
        EXEMPT_SENDER.to_string()
    } else {
        SENDERS[rng.gen_range(0..SENDERS.len())].to_string()
    };
    let receiver = RECEIVERS[rng.gen_range(0..RECEIVERS.len())].to_string();
    let pieces = rng.gen_range(1..=3);
    let weight = (rng.gen_range(0.5..25.0) * 100.0_f64).round() / 100.0;
    let category = if rng.gen_bool(0.85) { "Parcel" } else { "Pallet" };

    // Station->hub leg: dispatch during the station day, arrival inside
    // the hub's configured inbound window.
    let package_id = format!("{}{}{:06}", hub.code, date.format("%y%m%d"), seq);
    let skip_outbound = !exempt && rng.gen_bool(0.03);
    let skip_inbound = rng.gen_bool(0.03);

    if !skip_outbound && !exempt {
        rows += 1;
        writer.serialize(DemoRow {
            package_id: package_id.clone(),
            route: station_route.clone(),
            origin_center: center.to_string(),
            dest_center: hub.name.clone(),
            sender: sender.clone(),
            receiver: receiver.clone(),
            pieces,
            weight,
            category: category.to_string(),
            scanned_at: format!(
                "{} {:02}:{:02}:00",
                date,
                rng.gen_range(8..15),
                rng.gen_range(0..60)
            ),
            scan_kind: "Center-Outbound".to_string(),
            scanning_center: center.to_string(),
            operator: format!("op_{}", code.to_lowercase()),
        })?;
    }
    if !skip_inbound {
        rows += 1;
        let offset_min = rng.gen_range(30..240);
        let arrival = date
            .and_time(hub.inbound_start)
            .checked_add_signed(Duration::minutes(offset_min))
            .unwrap_or_else(|| date.and_time(hub.inbound_start));
        writer.serialize(DemoRow {
            package_id,
            route: station_route.clone(),
            origin_center: center.to_string(),
            dest_center: hub.name.clone(),
            sender,
            receiver: receiver.clone(),
            pieces,
            weight,
            category: category.to_string(),
            scanned_at: arrival.format("%Y-%m-%d %H:%M:%S").to_string(),
            scan_kind: "Center-Inbound".to_string(),
            scanning_center: hub.name.clone(),
            operator: format!("op_{}", hub.code.to_lowercase()),
        })?;
    }

    // Hub->station leg: dispatch inside the hub's outbound window,
    // arrival at the station the next morning.
    let package_id = format!("{}{}{:06}R", hub.code, date.format("%y%m%d"), seq);
    let return_sender = SENDERS[rng.gen_range(0..SENDERS.len())].to_string();
    let skip_hub_outbound = rng.gen_bool(0.02);
    let skip_station_inbound = rng.gen_bool(0.04);

    if !skip_hub_outbound {
        rows += 1;
        let offset_min = rng.gen_range(15..150);
        let dispatch = date
            .and_time(hub.outbound_start)
            .checked_add_signed(Duration::minutes(offset_min))
            .unwrap_or_else(|| date.and_time(hub.outbound_start));
        writer.serialize(DemoRow {
            package_id: package_id.clone(),
            route: hub_route.clone(),
            origin_center: hub.name.clone(),
            dest_center: center.to_string(),
            sender: return_sender.clone(),
            receiver: receiver.clone(),
            pieces,
            weight,
            category: category.to_string(),
            scanned_at: dispatch.format("%Y-%m-%d %H:%M:%S").to_string(),
            scan_kind: "Center-Outbound".to_string(),
            scanning_center: hub.name.clone(),
            operator: format!("op_{}", hub.code.to_lowercase()),
        })?;
    }
    if !skip_station_inbound {
        rows += 1;
        let next_day = date + Duration::days(1);
        let arrival_time = NaiveTime::from_hms_opt(rng.gen_range(6..12), rng.gen_range(0..60), 0)
            .unwrap_or(NaiveTime::MIN);
        writer.serialize(DemoRow {
            package_id,
            route: hub_route,
            origin_center: hub.name.clone(),
            dest_center: center.to_string(),
            sender: return_sender,
            receiver,
            pieces,
            weight,
            category: category.to_string(),
            scanned_at: format!(
                "{} {:02}:{:02}:00",
                next_day,
                arrival_time.hour(),
                arrival_time.minute()
            ),
            scan_kind: "Center-Inbound".to_string(),
            scanning_center: center.to_string(),
            operator: format!("op_{}", code.to_lowercase()),
        })?;
    }

    Ok(rows)
}

fn write_reference_tables(refs_dir: &std::path::Path, hubs: &[HubConfig]) -> Result<()> {
    for hub in hubs {
        let hub_lower = hub.name.to_lowercase();

        let mut routes =
            WriterBuilder::new().from_path(refs_dir.join(format!("routes_{}.csv", hub_lower)))?;
        routes.write_record(["route", "center"])?;
        for (code, center) in stations_for(hub) {
            routes.write_record([format!("{}-{}", code, hub.code), center.to_string()])?;
            routes.write_record([format!("{}-{}", hub.code, code), center.to_string()])?;
        }
        routes.flush()?;

        let mut equiv = WriterBuilder::new()
            .from_path(refs_dir.join(format!("routes_{}_equivalence.csv", hub_lower)))?;
        equiv.write_record(["station_route", "hub_route"])?;
        for (code, _) in stations_for(hub) {
            equiv.write_record([
                format!("{}-{}", code, hub.code),
                format!("{}-{}", hub.code, code),
            ])?;
        }
        equiv.flush()?;
    }

    let mut exempt = WriterBuilder::new().from_path(refs_dir.join("exempt_senders.csv"))?;
    exempt.write_record(["sender"])?;
    exempt.write_record([EXEMPT_SENDER])?;
    exempt.flush()?;

    Ok(())
}
