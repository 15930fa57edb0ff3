use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Destination center used when a route has no entry in the route reference.
pub const UNKNOWN_CENTER: &str = "UNKNOWN";

/// Grouping key for reconciled packages whose route could not be resolved.
pub const UNRESOLVED_ROUTE: &str = "UNRESOLVED";

/// Route name of the synthetic summary row appended to every aggregate.
pub const TOTAL_ROUTE: &str = "Total";

/// Raw record from the master scan-event CSV
#[derive(Debug, Deserialize)]
pub struct CsvScanRow {
    pub package_id: String,
    pub route: String,
    pub origin_center: String,
    pub dest_center: String,
    pub sender: String,
    pub receiver: String,
    pub pieces: Option<i64>,
    pub weight: Option<f64>,
    pub category: String,
    pub scanned_at: String,
    pub scan_kind: String,
    pub scanning_center: String,
    pub operator: String,
}

/// Checkpoint at which an event was captured
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScanKind {
    CenterOutbound,
    CenterInbound,
    Other,
}

impl From<&str> for ScanKind {
    fn from(s: &str) -> Self {
        match s {
            "Center-Outbound" => ScanKind::CenterOutbound,
            "Center-Inbound" => ScanKind::CenterInbound,
            _ => ScanKind::Other,
        }
    }
}

/// Package category; only Parcel and Pallet participate in reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Category {
    Parcel,
    Pallet,
    Other,
}

impl Category {
    pub fn is_reportable(self) -> bool {
        matches!(self, Category::Parcel | Category::Pallet)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        match s {
            "Parcel" => Category::Parcel,
            "Pallet" => Category::Pallet,
            _ => Category::Other,
        }
    }
}

/// Direction of flow being measured
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportKind {
    StationToHub,
    HubToStation,
}

impl ReportKind {
    /// Which side's descriptive fields win when both scans carry a value.
    /// The outbound scan is authoritative for Station->Hub, the inbound
    /// scan for Hub->Station. The operator field is exempt from this
    /// policy and always comes from the outbound side.
    pub fn prefers_outbound_fields(self) -> bool {
        matches!(self, ReportKind::StationToHub)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::StationToHub => "Station-Hub",
            ReportKind::HubToStation => "Hub-Station",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed scan event parsed from a CSV row. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub package_id: String,
    pub route: Option<String>,
    pub origin_center: Option<String>,
    pub dest_center: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub pieces: i64,
    pub weight: f64,
    pub category: Category,
    pub scanned_at: NaiveDateTime,
    pub kind: ScanKind,
    pub scanning_center: String,
    pub operator: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

impl CsvScanRow {
    pub fn to_event(&self) -> anyhow::Result<ScanEvent> {
        let scanned_at = NaiveDateTime::parse_from_str(&self.scanned_at, "%Y-%m-%d %H:%M:%S")?;

        Ok(ScanEvent {
            package_id: self.package_id.clone(),
            route: non_empty(&self.route),
            origin_center: non_empty(&self.origin_center),
            dest_center: non_empty(&self.dest_center),
            sender: non_empty(&self.sender),
            receiver: non_empty(&self.receiver),
            pieces: self.pieces.unwrap_or(0),
            weight: self.weight.unwrap_or(0.0),
            category: Category::from(self.category.as_str()),
            scanned_at,
            kind: ScanKind::from(self.scan_kind.as_str()),
            scanning_center: self.scanning_center.trim().to_string(),
            operator: non_empty(&self.operator),
        })
    }
}

/// Outbound-scan state of a reconciled package. `Exempt` marks a package
/// whose sender is known to skip outbound scanning; the absence is
/// accounted for and counts toward the completion percentage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum OutboundScan {
    Scanned(NaiveDateTime),
    Exempt,
    Missing,
}

impl OutboundScan {
    pub fn counts_as_scanned(self) -> bool {
        !matches!(self, OutboundScan::Missing)
    }
}

/// One reconciled package: the outer-join row for a single package
/// identifier across the outbound and inbound slices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub package_id: String,
    /// Primary route, named in the outbound side's convention.
    pub route: Option<String>,
    /// Route as named on the inbound side, kept for equivalence repair.
    pub counterpart_route: Option<String>,
    pub origin_center: Option<String>,
    pub dest_center: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub pieces: i64,
    pub weight: f64,
    pub avg_weight: f64,
    pub category: Category,
    pub outbound_scan: OutboundScan,
    pub inbound_scan: Option<NaiveDateTime>,
    pub operator: Option<String>,
}

impl PackageRecord {
    pub fn has_outbound_scan(&self) -> bool {
        self.outbound_scan.counts_as_scanned()
    }

    pub fn has_inbound_scan(&self) -> bool {
        self.inbound_scan.is_some()
    }
}

/// Per-route aggregate row. Percentages are fractions in 0..=1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteAggregate {
    pub route: String,
    pub colli: i64,
    pub weight: f64,
    pub outbound_scans: i64,
    pub inbound_scans: i64,
    pub outbound_pct: f64,
    pub inbound_pct: f64,
}

impl RouteAggregate {
    pub fn is_total(&self) -> bool {
        self.route == TOTAL_ROUTE
    }

    /// Total row recomputed from summed counts, never from averaged
    /// per-route percentages.
    pub fn total_of(rows: &[RouteAggregate]) -> RouteAggregate {
        let colli: i64 = rows.iter().map(|r| r.colli).sum();
        let weight: f64 = rows.iter().map(|r| r.weight).sum();
        let outbound_scans: i64 = rows.iter().map(|r| r.outbound_scans).sum();
        let inbound_scans: i64 = rows.iter().map(|r| r.inbound_scans).sum();
        RouteAggregate {
            route: TOTAL_ROUTE.to_string(),
            colli,
            weight,
            outbound_scans,
            inbound_scans,
            outbound_pct: ratio(outbound_scans, colli),
            inbound_pct: ratio(inbound_scans, colli),
        }
    }
}

pub(crate) fn ratio(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Historical fact persisted per (date, hub, kind, center, route).
/// Percentages are stored on the 0..=100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanFact {
    pub report_date: NaiveDate,
    pub hub: String,
    pub kind: ReportKind,
    pub center: String,
    pub route: String,
    pub colli: i64,
    pub weight: f64,
    pub outbound_pct: f64,
    pub inbound_pct: f64,
}

/// Day-over-day movement of a center's package volume
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Trend {
    Baseline,
    Growth,
    Decline,
    Flat,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Baseline => "baseline",
            Trend::Growth => "growth",
            Trend::Decline => "decline",
            Trend::Flat => "flat",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day of a center's aggregated facts, with deltas against the
/// previous day in the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCenterStats {
    pub date: NaiveDate,
    pub center: String,
    pub colli: i64,
    pub weight: f64,
    pub outbound_pct: f64,
    pub inbound_pct: f64,
    pub colli_delta: Option<i64>,
    pub pct_change: Option<f64>,
    pub trend: Trend,
}
