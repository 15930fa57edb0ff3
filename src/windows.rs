//! Hub- and calendar-aware time windows.
//!
//! A report date selects four half-open views over the raw event stream:
//! the station outbound day, the configurable hub inbound and hub outbound
//! windows, and the fixed station inbound window. Arrivals skip the
//! weekend (a Friday report reaches into Monday); hub dispatch does not,
//! since the hub also dispatches on Saturdays.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::error::ReportError;

/// One hub's identity and window anchors. The anchors are clock times;
/// the resolver decides which calendar day each lands on.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub name: String,
    pub code: String,
    pub inbound_start: NaiveTime,
    pub inbound_end: NaiveTime,
    pub outbound_start: NaiveTime,
    pub outbound_end: NaiveTime,
}

impl HubConfig {
    pub fn new(
        name: &str,
        code: &str,
        inbound_start: (u32, u32),
        inbound_end: (u32, u32),
        outbound_start: (u32, u32),
        outbound_end: (u32, u32),
    ) -> Self {
        HubConfig {
            name: name.to_string(),
            code: code.to_string(),
            inbound_start: hm(inbound_start),
            inbound_end: hm(inbound_end),
            outbound_start: hm(outbound_start),
            outbound_end: hm(outbound_end),
        }
    }

    pub fn brasov() -> Self {
        HubConfig::new("BRASOV", "BVH", (15, 30), (15, 30), (15, 30), (23, 59))
    }

    /// Sibiu runs a night shift; both windows end on the next calendar day.
    pub fn sibiu() -> Self {
        HubConfig::new("SIBIU", "SBH", (21, 0), (6, 0), (21, 0), (6, 0))
    }
}

fn hm((h, m): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap_or(NaiveTime::MIN)
}

fn with_second(t: NaiveTime, s: u32) -> NaiveTime {
    hms(t.hour(), t.minute(), s)
}

/// Closed interval; both bounds are included when slicing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        t >= self.start && t <= self.end
    }
}

/// The four event slices of one report date.
#[derive(Debug, Clone)]
pub struct WindowSet {
    /// Full report day at the stations.
    pub station_outbound: TimeWindow,
    /// Configured window for arrivals at the hub.
    pub hub_inbound: TimeWindow,
    /// Configured window for dispatch from the hub.
    pub hub_outbound: TimeWindow,
    /// Fixed next-day window for arrivals back at the stations.
    pub station_inbound: TimeWindow,
}

/// Resolve the four windows for a report date under a hub configuration.
///
/// Arrival windows end on the next business day: report date + 3 on a
/// Friday (Monday), + 1 otherwise. Dispatch from the hub always ends the
/// next calendar day. Station arrivals begin at midnight after the report
/// date, which on a Friday is Saturday even though the window runs to
/// Monday 16:59:59.
pub fn resolve_windows(report_date: NaiveDate, cfg: &HubConfig) -> Result<WindowSet, ReportError> {
    let is_friday = report_date.weekday() == Weekday::Fri;
    let arrival_day = if is_friday {
        report_date + Duration::days(3)
    } else {
        report_date + Duration::days(1)
    };
    let dispatch_day = report_date + Duration::days(1);

    let station_outbound = TimeWindow {
        start: report_date.and_time(NaiveTime::MIN),
        end: report_date.and_time(hms(23, 59, 59)),
    };
    let hub_inbound = TimeWindow {
        start: report_date.and_time(with_second(cfg.inbound_start, 0)),
        end: arrival_day.and_time(with_second(cfg.inbound_end, 0)),
    };
    let hub_outbound = TimeWindow {
        start: report_date.and_time(with_second(cfg.outbound_start, 0)),
        end: dispatch_day.and_time(with_second(cfg.outbound_end, 59)),
    };
    let station_inbound = TimeWindow {
        start: (report_date + Duration::days(1)).and_time(NaiveTime::MIN),
        end: arrival_day.and_time(hms(16, 59, 59)),
    };

    for (label, w) in [
        ("station outbound", &station_outbound),
        ("hub inbound", &hub_inbound),
        ("hub outbound", &hub_outbound),
        ("station inbound", &station_inbound),
    ] {
        if w.end < w.start {
            return Err(ReportError::Config {
                hub: cfg.name.clone(),
                detail: format!("{} window ends before it starts ({} > {})", label, w.start, w.end),
            });
        }
    }

    Ok(WindowSet {
        station_outbound,
        hub_inbound,
        hub_outbound,
        station_inbound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        date(y, m, d).and_time(NaiveTime::from_hms_opt(h, min, s).unwrap())
    }

    #[test]
    fn test_midweek_windows_brasov() {
        // 2025-08-27 is a Wednesday
        let w = resolve_windows(date(2025, 8, 27), &HubConfig::brasov()).unwrap();

        assert_eq!(w.station_outbound.start, dt(2025, 8, 27, 0, 0, 0));
        assert_eq!(w.station_outbound.end, dt(2025, 8, 27, 23, 59, 59));

        assert_eq!(w.hub_inbound.start, dt(2025, 8, 27, 15, 30, 0));
        assert_eq!(w.hub_inbound.end, dt(2025, 8, 28, 15, 30, 0));

        assert_eq!(w.hub_outbound.start, dt(2025, 8, 27, 15, 30, 0));
        assert_eq!(w.hub_outbound.end, dt(2025, 8, 28, 23, 59, 59));

        assert_eq!(w.station_inbound.start, dt(2025, 8, 28, 0, 0, 0));
        assert_eq!(w.station_inbound.end, dt(2025, 8, 28, 16, 59, 59));
    }

    #[test]
    fn test_friday_skips_weekend_for_arrivals_only() {
        // 2025-08-29 is a Friday; arrivals run into Monday 2025-09-01
        let w = resolve_windows(date(2025, 8, 29), &HubConfig::brasov()).unwrap();

        assert_eq!(w.hub_inbound.end, dt(2025, 9, 1, 15, 30, 0));
        // hub dispatch still closes on Saturday
        assert_eq!(w.hub_outbound.end, dt(2025, 8, 30, 23, 59, 59));
        // station arrivals: Saturday midnight through Monday afternoon
        assert_eq!(w.station_inbound.start, dt(2025, 8, 30, 0, 0, 0));
        assert_eq!(w.station_inbound.end, dt(2025, 9, 1, 16, 59, 59));
    }

    #[test]
    fn test_sibiu_night_shift_resolves_to_next_day() {
        let w = resolve_windows(date(2025, 8, 27), &HubConfig::sibiu()).unwrap();

        assert_eq!(w.hub_inbound.start, dt(2025, 8, 27, 21, 0, 0));
        assert_eq!(w.hub_inbound.end, dt(2025, 8, 28, 6, 0, 0));
        assert_eq!(w.hub_outbound.end, dt(2025, 8, 28, 6, 0, 59));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let w = resolve_windows(date(2025, 8, 27), &HubConfig::brasov()).unwrap();
        assert!(w.station_outbound.contains(dt(2025, 8, 27, 0, 0, 0)));
        assert!(w.station_outbound.contains(dt(2025, 8, 27, 23, 59, 59)));
        assert!(!w.station_outbound.contains(dt(2025, 8, 28, 0, 0, 0)));
        assert!(w.hub_inbound.contains(w.hub_inbound.end));
    }
}
