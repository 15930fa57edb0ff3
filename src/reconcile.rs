//! Event reconciliation: slice the raw stream per report kind, outer-join
//! the two slices by package identifier, repair missing routes through the
//! equivalence table, and aggregate to per-route completion percentages.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::models::{
    Category, OutboundScan, PackageRecord, ReportKind, RouteAggregate, ScanEvent, ScanKind, ratio,
};
use crate::reference::{EquivalenceTable, ExemptSenders, RouteReference};
use crate::windows::{HubConfig, WindowSet};

/// Pick the outbound and inbound event slices for one report kind.
///
/// Station->Hub pairs the stations' full-day dispatch scans with the
/// hub's arrival window; Hub->Station pairs the hub's dispatch window
/// with next-day arrivals at the stations. Window bounds are inclusive.
pub fn select_slices(
    kind: ReportKind,
    events: &[ScanEvent],
    windows: &WindowSet,
    hub: &HubConfig,
) -> (Vec<ScanEvent>, Vec<ScanEvent>) {
    // Station->Hub measures station dispatch against hub arrival;
    // Hub->Station measures hub dispatch against station arrival.
    let (out_window, in_window, outbound_at_hub) = match kind {
        ReportKind::StationToHub => (&windows.station_outbound, &windows.hub_inbound, false),
        ReportKind::HubToStation => (&windows.hub_outbound, &windows.station_inbound, true),
    };

    let outbound: Vec<ScanEvent> = events
        .iter()
        .filter(|e| e.kind == ScanKind::CenterOutbound)
        .filter(|e| out_window.contains(e.scanned_at))
        .filter(|e| {
            if outbound_at_hub {
                e.scanning_center == hub.name
            } else {
                e.scanning_center != hub.name
            }
        })
        .cloned()
        .collect();
    let inbound: Vec<ScanEvent> = events
        .iter()
        .filter(|e| e.kind == ScanKind::CenterInbound)
        .filter(|e| in_window.contains(e.scanned_at))
        .filter(|e| {
            if outbound_at_hub {
                e.scanning_center != hub.name
            } else {
                e.scanning_center == hub.name
            }
        })
        .cloned()
        .collect();

    (outbound, inbound)
}

/// Result of one reconciliation run: the detail rows and the per-route
/// aggregate with its trailing Total row.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub records: Vec<PackageRecord>,
    pub aggregates: Vec<RouteAggregate>,
}

struct JoinedPair<'a> {
    out: Option<&'a ScanEvent>,
    inb: Option<&'a ScanEvent>,
}

/// Full outer join of the two slices on package identifier, one record
/// per distinct package, then the per-route aggregate. Zero events on
/// both sides produce an aggregate holding only an all-zero Total row.
pub fn reconcile(
    kind: ReportKind,
    outbound: &[ScanEvent],
    inbound: &[ScanEvent],
    routes: &RouteReference,
    equiv: &EquivalenceTable,
    exempt: &ExemptSenders,
) -> Reconciliation {
    let eligible = |e: &&ScanEvent| {
        e.category.is_reportable()
            && e.route.as_deref().is_some_and(|r| routes.contains(r))
    };

    let mut pairs: BTreeMap<String, JoinedPair> = BTreeMap::new();
    for event in outbound.iter().filter(eligible) {
        let pair = pairs
            .entry(event.package_id.clone())
            .or_insert(JoinedPair { out: None, inb: None });
        if pair.out.is_some() {
            debug!("duplicate outbound scan for package {}", event.package_id);
        } else {
            pair.out = Some(event);
        }
    }
    for event in inbound.iter().filter(eligible) {
        let pair = pairs
            .entry(event.package_id.clone())
            .or_insert(JoinedPair { out: None, inb: None });
        if pair.inb.is_some() {
            debug!("duplicate inbound scan for package {}", event.package_id);
        } else {
            pair.inb = Some(event);
        }
    }

    let records: Vec<PackageRecord> = pairs
        .into_iter()
        .map(|(package_id, pair)| build_record(kind, package_id, pair, equiv, exempt))
        .collect();

    let aggregates = aggregate_by_route(&records);

    Reconciliation { records, aggregates }
}

fn build_record(
    kind: ReportKind,
    package_id: String,
    pair: JoinedPair,
    equiv: &EquivalenceTable,
    exempt: &ExemptSenders,
) -> PackageRecord {
    // Field priority is a per-kind policy: the first element of the pair
    // wins, the second fills gaps.
    let (first, second) = if kind.prefers_outbound_fields() {
        (pair.out, pair.inb)
    } else {
        (pair.inb, pair.out)
    };

    let pick = |f: fn(&ScanEvent) -> Option<String>| {
        first.and_then(f).or_else(|| second.and_then(f))
    };

    let origin_center = pick(|e| e.origin_center.clone());
    let dest_center = pick(|e| e.dest_center.clone());
    let sender = pick(|e| e.sender.clone());
    let receiver = pick(|e| e.receiver.clone());
    let pieces = first.or(second).map(|e| e.pieces).unwrap_or(0);
    let weight = first.or(second).map(|e| e.weight).unwrap_or(0.0);
    let category = first
        .or(second)
        .map(|e| e.category)
        .unwrap_or(Category::Other);

    // The primary route is always the outbound side's; the inbound name
    // only enters through the equivalence fallback.
    let counterpart_route = pair.inb.and_then(|e| e.route.clone());
    let mut route = pair.out.and_then(|e| e.route.clone());
    if route.is_none() {
        route = counterpart_route.as_deref().and_then(|c| match kind {
            ReportKind::StationToHub => equiv.station_for(c),
            ReportKind::HubToStation => equiv.hub_for(c),
        })
        .map(str::to_string);
        if route.is_none() {
            warn!(
                "package {}: route unresolved after equivalence lookup ({:?})",
                package_id, counterpart_route
            );
        }
    }

    let outbound_scan = match pair.out {
        Some(e) => OutboundScan::Scanned(e.scanned_at),
        None => {
            let sender_exempt = kind == ReportKind::StationToHub
                && sender.as_deref().is_some_and(|s| exempt.contains(s));
            if sender_exempt {
                OutboundScan::Exempt
            } else {
                OutboundScan::Missing
            }
        }
    };

    let avg_weight = if pieces != 0 {
        round2(weight / pieces as f64)
    } else {
        0.0
    };

    PackageRecord {
        package_id,
        route,
        counterpart_route,
        origin_center,
        dest_center,
        sender,
        receiver,
        pieces,
        weight,
        avg_weight,
        category,
        outbound_scan,
        inbound_scan: pair.inb.map(|e| e.scanned_at),
        operator: pair.out.and_then(|e| e.operator.clone()),
    }
}

fn aggregate_by_route(records: &[PackageRecord]) -> Vec<RouteAggregate> {
    #[derive(Default)]
    struct Acc {
        colli: i64,
        weight: f64,
        outbound_scans: i64,
        inbound_scans: i64,
    }

    let mut by_route: BTreeMap<String, Acc> = BTreeMap::new();
    for record in records {
        let key = record
            .route
            .clone()
            .unwrap_or_else(|| crate::models::UNRESOLVED_ROUTE.to_string());
        let acc = by_route.entry(key).or_default();
        acc.colli += 1;
        acc.weight += record.avg_weight;
        if record.has_outbound_scan() {
            acc.outbound_scans += 1;
        }
        if record.has_inbound_scan() {
            acc.inbound_scans += 1;
        }
    }

    let mut rows: Vec<RouteAggregate> = by_route
        .into_iter()
        .map(|(route, acc)| RouteAggregate {
            route,
            colli: acc.colli,
            weight: acc.weight,
            outbound_scans: acc.outbound_scans,
            inbound_scans: acc.inbound_scans,
            outbound_pct: ratio(acc.outbound_scans, acc.colli),
            inbound_pct: ratio(acc.inbound_scans, acc.colli),
        })
        .collect();

    let total = RouteAggregate::total_of(&rows);
    rows.push(total);
    rows
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TOTAL_ROUTE;
    use crate::windows::resolve_windows;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn event(
        package_id: &str,
        route: Option<&str>,
        kind: ScanKind,
        scanned_at: &str,
        scanning_center: &str,
    ) -> ScanEvent {
        ScanEvent {
            package_id: package_id.to_string(),
            route: route.map(str::to_string),
            origin_center: Some("ALBA IULIA".to_string()),
            dest_center: Some("BRASOV".to_string()),
            sender: Some("Sender SRL".to_string()),
            receiver: Some("Receiver SRL".to_string()),
            pieces: 2,
            weight: 10.0,
            category: Category::Parcel,
            scanned_at: ts(scanned_at),
            kind,
            scanning_center: scanning_center.to_string(),
            operator: Some(format!("op_{}", scanning_center)),
        }
    }

    fn routes() -> RouteReference {
        RouteReference::from_pairs(&[("ALB-BVH", "ALBA IULIA"), ("CLJ-BVH", "CLUJ")])
    }

    fn equiv() -> EquivalenceTable {
        EquivalenceTable::from_pairs(&[("ALB-BVH", "BVH-ALB"), ("CLJ-BVH", "BVH-CLJ")])
    }

    #[test]
    fn test_select_slices_station_to_hub() {
        let hub = HubConfig::brasov();
        let windows = resolve_windows(NaiveDate::from_ymd_opt(2025, 8, 27).unwrap(), &hub).unwrap();
        let events = vec![
            // station dispatch inside the report day
            event("P1", Some("ALB-BVH"), ScanKind::CenterOutbound, "2025-08-27 10:00:00", "ALBA IULIA"),
            // outbound scanned at the hub itself: not a station dispatch
            event("P2", Some("ALB-BVH"), ScanKind::CenterOutbound, "2025-08-27 10:00:00", "BRASOV"),
            // outside the report day
            event("P3", Some("ALB-BVH"), ScanKind::CenterOutbound, "2025-08-26 10:00:00", "ALBA IULIA"),
            // hub arrival inside the configured window
            event("P1", Some("ALB-BVH"), ScanKind::CenterInbound, "2025-08-27 18:00:00", "BRASOV"),
            // arrival at a station, not the hub
            event("P4", Some("ALB-BVH"), ScanKind::CenterInbound, "2025-08-27 18:00:00", "CLUJ"),
        ];

        let (outbound, inbound) =
            select_slices(ReportKind::StationToHub, &events, &windows, &hub);
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].package_id, "P1");
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].package_id, "P1");
    }

    #[test]
    fn test_select_slices_hub_to_station() {
        let hub = HubConfig::brasov();
        let windows = resolve_windows(NaiveDate::from_ymd_opt(2025, 8, 27).unwrap(), &hub).unwrap();
        let events = vec![
            // hub dispatch inside the configured window
            event("P1", Some("BVH-ALB"), ScanKind::CenterOutbound, "2025-08-27 16:00:00", "BRASOV"),
            // dispatch from a station is the other report's concern
            event("P2", Some("ALB-BVH"), ScanKind::CenterOutbound, "2025-08-27 16:00:00", "ALBA IULIA"),
            // next-day station arrival
            event("P1", Some("ALB-BVH"), ScanKind::CenterInbound, "2025-08-28 08:00:00", "ALBA IULIA"),
            // arrival at the hub is the other report's concern
            event("P3", Some("ALB-BVH"), ScanKind::CenterInbound, "2025-08-28 08:00:00", "BRASOV"),
        ];

        let (outbound, inbound) =
            select_slices(ReportKind::HubToStation, &events, &windows, &hub);
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].scanning_center, "BRASOV");
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].scanning_center, "ALBA IULIA");
    }

    #[test]
    fn test_single_sided_records_keep_fields_and_flags() {
        let outbound = vec![event(
            "OUT1", Some("ALB-BVH"), ScanKind::CenterOutbound, "2025-08-27 09:00:00", "ALBA IULIA",
        )];
        let inbound = vec![event(
            "IN1", Some("ALB-BVH"), ScanKind::CenterInbound, "2025-08-27 18:00:00", "BRASOV",
        )];

        let result = reconcile(
            ReportKind::StationToHub,
            &outbound,
            &inbound,
            &routes(),
            &equiv(),
            &ExemptSenders::default(),
        );
        assert_eq!(result.records.len(), 2);

        let out_only = result.records.iter().find(|r| r.package_id == "OUT1").unwrap();
        assert!(out_only.has_outbound_scan());
        assert!(!out_only.has_inbound_scan());
        assert_eq!(out_only.sender.as_deref(), Some("Sender SRL"));

        let in_only = result.records.iter().find(|r| r.package_id == "IN1").unwrap();
        assert!(!in_only.has_outbound_scan());
        assert!(in_only.has_inbound_scan());
        assert_eq!(in_only.receiver.as_deref(), Some("Receiver SRL"));
    }

    #[test]
    fn test_field_priority_flips_per_kind_but_operator_does_not() {
        let mut out_event = event(
            "P1", Some("BVH-ALB"), ScanKind::CenterOutbound, "2025-08-27 16:00:00", "BRASOV",
        );
        out_event.sender = Some("from outbound".to_string());
        out_event.operator = Some("hub_op".to_string());
        let mut in_event = event(
            "P1", Some("ALB-BVH"), ScanKind::CenterInbound, "2025-08-28 08:00:00", "ALBA IULIA",
        );
        in_event.sender = Some("from inbound".to_string());
        in_event.operator = Some("station_op".to_string());

        let hub_routes = RouteReference::from_pairs(&[("BVH-ALB", "ALBA IULIA"), ("ALB-BVH", "ALBA IULIA")]);

        let station_hub = reconcile(
            ReportKind::StationToHub,
            std::slice::from_ref(&out_event),
            std::slice::from_ref(&in_event),
            &hub_routes,
            &equiv(),
            &ExemptSenders::default(),
        );
        assert_eq!(station_hub.records[0].sender.as_deref(), Some("from outbound"));
        assert_eq!(station_hub.records[0].operator.as_deref(), Some("hub_op"));

        let hub_station = reconcile(
            ReportKind::HubToStation,
            std::slice::from_ref(&out_event),
            std::slice::from_ref(&in_event),
            &hub_routes,
            &equiv(),
            &ExemptSenders::default(),
        );
        assert_eq!(hub_station.records[0].sender.as_deref(), Some("from inbound"));
        // operator stays on the first-leg (outbound) side for both kinds
        assert_eq!(hub_station.records[0].operator.as_deref(), Some("hub_op"));
    }

    #[test]
    fn test_equivalence_repair_fills_only_missing_routes() {
        // inbound-only package: hub-facing name repaired to station-facing
        let inbound = vec![event(
            "P1", Some("BVH-ALB"), ScanKind::CenterInbound, "2025-08-27 18:00:00", "BRASOV",
        )];
        let hub_routes = RouteReference::from_pairs(&[("BVH-ALB", "ALBA IULIA")]);
        let result = reconcile(
            ReportKind::StationToHub,
            &[],
            &inbound,
            &hub_routes,
            &equiv(),
            &ExemptSenders::default(),
        );
        assert_eq!(result.records[0].route.as_deref(), Some("ALB-BVH"));

        // both sides present: the outbound name must not be overwritten
        let outbound = vec![event(
            "P2", Some("CLJ-BVH"), ScanKind::CenterOutbound, "2025-08-27 09:00:00", "CLUJ",
        )];
        let inbound = vec![event(
            "P2", Some("BVH-ALB"), ScanKind::CenterInbound, "2025-08-27 18:00:00", "BRASOV",
        )];
        let both_routes =
            RouteReference::from_pairs(&[("CLJ-BVH", "CLUJ"), ("BVH-ALB", "ALBA IULIA")]);
        let result = reconcile(
            ReportKind::StationToHub,
            &outbound,
            &inbound,
            &both_routes,
            &equiv(),
            &ExemptSenders::default(),
        );
        assert_eq!(result.records[0].route.as_deref(), Some("CLJ-BVH"));
    }

    #[test]
    fn test_exempt_sender_counts_as_scanned() {
        let mut in_event = event(
            "P1", Some("ALB-BVH"), ScanKind::CenterInbound, "2025-08-27 18:00:00", "BRASOV",
        );
        in_event.sender = Some("NO SCAN SRL".to_string());
        let exempt = ExemptSenders::from_names(&["NO SCAN SRL"]);

        let result = reconcile(
            ReportKind::StationToHub,
            &[],
            std::slice::from_ref(&in_event),
            &routes(),
            &equiv(),
            &exempt,
        );
        let record = &result.records[0];
        assert_eq!(record.outbound_scan, OutboundScan::Exempt);
        assert!(record.has_outbound_scan());

        // the inbound route has no station-facing equivalent here, so the
        // record aggregates under the placeholder instead of being dropped
        assert!(result
            .aggregates
            .iter()
            .any(|r| r.route == crate::models::UNRESOLVED_ROUTE));

        let total = result.aggregates.last().unwrap();
        assert_eq!(total.outbound_scans, 1);
    }

    #[test]
    fn test_exempt_annotation_is_station_to_hub_only() {
        let mut in_event = event(
            "P1", Some("ALB-BVH"), ScanKind::CenterInbound, "2025-08-28 08:00:00", "ALBA IULIA",
        );
        in_event.sender = Some("NO SCAN SRL".to_string());
        let exempt = ExemptSenders::from_names(&["NO SCAN SRL"]);

        let result = reconcile(
            ReportKind::HubToStation,
            &[],
            std::slice::from_ref(&in_event),
            &routes(),
            &equiv(),
            &exempt,
        );
        assert_eq!(result.records[0].outbound_scan, OutboundScan::Missing);
    }

    #[test]
    fn test_category_and_route_filters() {
        let mut pallet = event(
            "P1", Some("ALB-BVH"), ScanKind::CenterOutbound, "2025-08-27 09:00:00", "ALBA IULIA",
        );
        pallet.category = Category::Pallet;
        let mut other = event(
            "P2", Some("ALB-BVH"), ScanKind::CenterOutbound, "2025-08-27 09:00:00", "ALBA IULIA",
        );
        other.category = Category::Other;
        let unknown_route = event(
            "P3", Some("XXX-YYY"), ScanKind::CenterOutbound, "2025-08-27 09:00:00", "ALBA IULIA",
        );

        let result = reconcile(
            ReportKind::StationToHub,
            &[pallet, other, unknown_route],
            &[],
            &routes(),
            &equiv(),
            &ExemptSenders::default(),
        );
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].package_id, "P1");
    }

    #[test]
    fn test_zero_events_yield_zero_total_only() {
        let result = reconcile(
            ReportKind::StationToHub,
            &[],
            &[],
            &routes(),
            &equiv(),
            &ExemptSenders::default(),
        );
        assert!(result.records.is_empty());
        assert_eq!(result.aggregates.len(), 1);
        let total = &result.aggregates[0];
        assert_eq!(total.route, TOTAL_ROUTE);
        assert_eq!(total.colli, 0);
        assert_eq!(total.outbound_pct, 0.0);
        assert_eq!(total.inbound_pct, 0.0);
    }

    #[test]
    fn test_zero_pieces_does_not_divide() {
        let mut e = event(
            "P1", Some("ALB-BVH"), ScanKind::CenterOutbound, "2025-08-27 09:00:00", "ALBA IULIA",
        );
        e.pieces = 0;
        e.weight = 12.5;
        let result = reconcile(
            ReportKind::StationToHub,
            std::slice::from_ref(&e),
            &[],
            &routes(),
            &equiv(),
            &ExemptSenders::default(),
        );
        assert_eq!(result.records[0].avg_weight, 0.0);
    }

    #[test]
    fn test_aggregate_total_matches_route_sums() {
        let outbound = vec![
            event("P1", Some("ALB-BVH"), ScanKind::CenterOutbound, "2025-08-27 09:00:00", "ALBA IULIA"),
            event("P2", Some("ALB-BVH"), ScanKind::CenterOutbound, "2025-08-27 09:05:00", "ALBA IULIA"),
            event("P3", Some("CLJ-BVH"), ScanKind::CenterOutbound, "2025-08-27 09:10:00", "CLUJ"),
        ];
        let inbound = vec![event(
            "P1", Some("ALB-BVH"), ScanKind::CenterInbound, "2025-08-27 18:00:00", "BRASOV",
        )];

        let result = reconcile(
            ReportKind::StationToHub,
            &outbound,
            &inbound,
            &routes(),
            &equiv(),
            &ExemptSenders::default(),
        );
        let total = result.aggregates.last().unwrap();
        let route_rows: Vec<_> = result.aggregates.iter().filter(|r| !r.is_total()).collect();

        assert_eq!(total.colli, route_rows.iter().map(|r| r.colli).sum::<i64>());
        assert_eq!(total.colli, 3);
        assert_eq!(total.outbound_scans, 3);
        assert_eq!(total.inbound_scans, 1);
        assert!((total.inbound_pct - 1.0 / 3.0).abs() < 1e-9);
    }
}
