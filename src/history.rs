//! Append-only historical store of per-route scan facts.
//!
//! Only Station->Hub aggregates become independent rows. The paired
//! Hub->Station aggregate for the same date is consulted once, at upsert
//! time, to backfill each fact's inbound-completion percentage through
//! the route-equivalence table; it is never stored on its own.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::db::{self, DbConn};
use crate::error::ReportError;
use crate::models::{ReportKind, RouteAggregate, ScanFact, UNKNOWN_CENTER};
use crate::reference::{EquivalenceTable, RouteReference};
use crate::windows::HubConfig;

/// Outcome of one upsert run. A failed route does not abort the rest;
/// the caller decides whether a partial write warrants a retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertSummary {
    pub written: usize,
    pub failed: usize,
}

impl UpsertSummary {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

pub struct HistoryStore {
    db: DbConn,
}

impl HistoryStore {
    /// Open (and if necessary create) the store at the given path.
    pub async fn open(path: &str) -> Result<Self, ReportError> {
        let db = db::connect(path).await?;
        db::init_schema(&db).await?;
        Ok(HistoryStore { db })
    }

    /// In-memory store for tests.
    pub async fn open_memory() -> Result<Self, ReportError> {
        let db = db::connect_memory().await?;
        db::init_schema(&db).await?;
        Ok(HistoryStore { db })
    }

    pub fn conn(&self) -> &DbConn {
        &self.db
    }

    /// Persist one report run's aggregate rows.
    ///
    /// Station->Hub rows (minus the Total row) are upserted one fact per
    /// route, with the destination center resolved through the route
    /// reference and the inbound percentage taken from the equivalent
    /// route in `paired` when available. Hub->Station runs write nothing.
    pub async fn upsert_report(
        &self,
        report_date: NaiveDate,
        hub: &HubConfig,
        kind: ReportKind,
        rows: &[RouteAggregate],
        paired: Option<&[RouteAggregate]>,
        routes: &RouteReference,
        equiv: &EquivalenceTable,
    ) -> Result<UpsertSummary, ReportError> {
        if kind != ReportKind::StationToHub {
            debug!("{} aggregates are not persisted independently", kind);
            return Ok(UpsertSummary::default());
        }

        let mut summary = UpsertSummary::default();
        for row in rows.iter().filter(|r| !r.is_total()) {
            let center = routes.center_for(&row.route).to_string();
            if center == UNKNOWN_CENTER {
                warn!("route {} has no destination center, storing as {}", row.route, center);
            }

            let inbound_pct = lookup_paired_inbound(&row.route, paired, equiv);

            let fact = ScanFact {
                report_date,
                hub: hub.name.clone(),
                kind,
                center,
                route: row.route.clone(),
                colli: row.colli,
                weight: row.weight,
                outbound_pct: row.outbound_pct * 100.0,
                inbound_pct,
            };

            match self.upsert_fact(&fact).await {
                Ok(()) => summary.written += 1,
                Err(e) => {
                    warn!("upsert failed for route {}: {}", row.route, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "history upsert {} {} {}: {} written, {} failed",
            report_date, hub.name, kind, summary.written, summary.failed
        );
        Ok(summary)
    }

    async fn upsert_fact(&self, fact: &ScanFact) -> Result<(), ReportError> {
        let key = format!(
            "{}|{}|{}|{}|{}",
            fact.report_date, fact.hub, fact.kind, fact.center, fact.route
        );
        self.db
            .query("UPSERT type::thing(\"scan_fact\", $key) CONTENT $fact")
            .bind(("key", key))
            .bind(("fact", fact.clone()))
            .await?
            .check()?;
        Ok(())
    }

    /// All facts for a center within the inclusive date range, newest
    /// date first, routes ascending within a date. A center with no
    /// facts yields an empty result.
    pub async fn query_range(
        &self,
        center: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ScanFact>, ReportError> {
        let facts: Vec<ScanFact> = self
            .db
            .query(
                r#"
                SELECT report_date, hub, kind, center, route,
                       colli, weight, outbound_pct, inbound_pct
                FROM scan_fact
                WHERE center = $center
                  AND report_date >= $start
                  AND report_date <= $end
                ORDER BY report_date DESC, route ASC
                "#,
            )
            .bind(("center", center.to_string()))
            .bind(("start", start.to_string()))
            .bind(("end", end.to_string()))
            .await?
            .take(0)?;
        Ok(facts)
    }

    /// Centers having at least one fact in the inclusive range, with
    /// their distinct-route counts.
    pub async fn centers_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(String, usize)>, ReportError> {
        #[derive(serde::Deserialize)]
        struct Row {
            center: String,
            routes: Vec<String>,
        }

        let rows: Vec<Row> = self
            .db
            .query(
                r#"
                SELECT center, array::distinct(array::group(route)) AS routes
                FROM scan_fact
                WHERE report_date >= $start
                  AND report_date <= $end
                  AND center != $unknown
                GROUP BY center
                ORDER BY center
                "#,
            )
            .bind(("start", start.to_string()))
            .bind(("end", end.to_string()))
            .bind(("unknown", UNKNOWN_CENTER.to_string()))
            .await?
            .take(0)?;

        Ok(rows.into_iter().map(|r| (r.center, r.routes.len())).collect())
    }
}

fn lookup_paired_inbound(
    station_route: &str,
    paired: Option<&[RouteAggregate]>,
    equiv: &EquivalenceTable,
) -> f64 {
    let Some(paired_rows) = paired else {
        warn!("no paired Hub-Station aggregate supplied, inbound pct defaults to 0");
        return 0.0;
    };
    let Some(hub_route) = equiv.hub_for(station_route) else {
        warn!("no equivalence for route {}, inbound pct defaults to 0", station_route);
        return 0.0;
    };
    match paired_rows.iter().find(|r| r.route == hub_route) {
        Some(row) => row.inbound_pct * 100.0,
        None => {
            warn!(
                "equivalent route {} absent from Hub-Station aggregate, inbound pct defaults to 0",
                hub_route
            );
            0.0
        }
    }
}
