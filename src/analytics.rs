//! Read-side rolling windows over the historical store: the 30-day
//! route-level distribution and the 3-day daily trend for one center.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::error::ReportError;
use crate::history::HistoryStore;
use crate::models::{DailyCenterStats, ScanFact, Trend};

/// Route-level facts for the trailing 30 days, newest date first.
pub async fn last_30_days(
    store: &HistoryStore,
    center: &str,
    as_of: NaiveDate,
) -> Result<Vec<ScanFact>, ReportError> {
    store
        .query_range(center, as_of - Duration::days(30), as_of)
        .await
}

/// Per-day aggregates with day-over-day deltas for the trailing 3 days.
pub async fn daily_stats_last_3_days(
    store: &HistoryStore,
    center: &str,
    as_of: NaiveDate,
) -> Result<Vec<DailyCenterStats>, ReportError> {
    let facts = store
        .query_range(center, as_of - Duration::days(2), as_of)
        .await?;
    Ok(daily_stats(&facts))
}

/// Group route-level facts by date (ascending), summing volume and
/// averaging the completion percentages, then attach deltas against the
/// previous day. The first day is the baseline and carries no delta.
pub fn daily_stats(facts: &[ScanFact]) -> Vec<DailyCenterStats> {
    #[derive(Default)]
    struct DayAcc {
        center: String,
        colli: i64,
        weight: f64,
        outbound_sum: f64,
        inbound_sum: f64,
        rows: usize,
    }

    let mut days: BTreeMap<NaiveDate, DayAcc> = BTreeMap::new();
    for fact in facts {
        let acc = days.entry(fact.report_date).or_default();
        acc.center = fact.center.clone();
        acc.colli += fact.colli;
        acc.weight += fact.weight;
        acc.outbound_sum += fact.outbound_pct;
        acc.inbound_sum += fact.inbound_pct;
        acc.rows += 1;
    }

    let mut stats = Vec::with_capacity(days.len());
    let mut prev_colli: Option<i64> = None;
    for (date, acc) in days {
        let rows = acc.rows.max(1) as f64;
        let (colli_delta, pct_change, trend) = match prev_colli {
            None => (None, None, Trend::Baseline),
            Some(prev) => {
                let delta = acc.colli - prev;
                let change = if prev == 0 {
                    0.0
                } else {
                    delta as f64 / prev as f64 * 100.0
                };
                let trend = if delta > 0 {
                    Trend::Growth
                } else if delta < 0 {
                    Trend::Decline
                } else {
                    Trend::Flat
                };
                (Some(delta), Some(change), trend)
            }
        };
        prev_colli = Some(acc.colli);

        stats.push(DailyCenterStats {
            date,
            center: acc.center,
            colli: acc.colli,
            weight: acc.weight,
            outbound_pct: acc.outbound_sum / rows,
            inbound_pct: acc.inbound_sum / rows,
            colli_delta,
            pct_change,
            trend,
        });
    }
    stats
}
