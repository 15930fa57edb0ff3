//! Reference tables loaded once per hub per run, read-only afterwards.
//!
//! All three are flat CSV files next to the master export. A missing or
//! unreadable file is fatal for that hub's run; unknown lookups inside a
//! run degrade to defaults and a warning.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use crate::error::ReportError;
use crate::models::UNKNOWN_CENTER;

#[derive(Debug, Deserialize)]
struct RouteRow {
    route: String,
    center: String,
}

/// Route name -> destination center, in the station-facing naming scheme.
/// Also acts as the filter for which routes participate in a report.
#[derive(Debug, Clone, Default)]
pub struct RouteReference {
    routes: HashMap<String, String>,
}

impl RouteReference {
    pub fn from_csv(path: &Path) -> Result<Self, ReportError> {
        let file = open(path)?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut routes = HashMap::new();
        for row in reader.deserialize::<RouteRow>() {
            let row = row.map_err(|source| ReportError::MalformedReference {
                path: path.to_path_buf(),
                source,
            })?;
            routes.insert(row.route.trim().to_string(), row.center.trim().to_string());
        }
        Ok(RouteReference { routes })
    }

    pub fn contains(&self, route: &str) -> bool {
        self.routes.contains_key(route)
    }

    /// Destination center for a route, `UNKNOWN` when unmapped.
    pub fn center_for(&self, route: &str) -> &str {
        self.routes
            .get(route)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CENTER)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        RouteReference {
            routes: pairs
                .iter()
                .map(|(r, c)| (r.to_string(), c.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EquivalenceRow {
    station_route: String,
    hub_route: String,
}

/// Two-way mapping between the station-facing and hub-facing names of the
/// same physical route. Used only as a fallback when one side of a
/// reconciliation is missing its route.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceTable {
    to_station: HashMap<String, String>,
    to_hub: HashMap<String, String>,
}

impl EquivalenceTable {
    pub fn from_csv(path: &Path) -> Result<Self, ReportError> {
        let file = open(path)?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut table = EquivalenceTable::default();
        for row in reader.deserialize::<EquivalenceRow>() {
            let row = row.map_err(|source| ReportError::MalformedReference {
                path: path.to_path_buf(),
                source,
            })?;
            let station = row.station_route.trim().to_string();
            let hub = row.hub_route.trim().to_string();
            table.to_station.insert(hub.clone(), station.clone());
            table.to_hub.insert(station, hub);
        }
        Ok(table)
    }

    /// Station-facing name of a route known by its hub-facing name.
    pub fn station_for(&self, hub_route: &str) -> Option<&str> {
        self.to_station.get(hub_route).map(String::as_str)
    }

    /// Hub-facing name of a route known by its station-facing name.
    pub fn hub_for(&self, station_route: &str) -> Option<&str> {
        self.to_hub.get(station_route).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.to_hub.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_hub.is_empty()
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut table = EquivalenceTable::default();
        for (station, hub) in pairs {
            table.to_station.insert(hub.to_string(), station.to_string());
            table.to_hub.insert(station.to_string(), hub.to_string());
        }
        table
    }
}

#[derive(Debug, Deserialize)]
struct SenderRow {
    sender: String,
}

/// Senders contractually exempt from outbound scanning.
#[derive(Debug, Clone, Default)]
pub struct ExemptSenders {
    senders: HashSet<String>,
}

impl ExemptSenders {
    pub fn from_csv(path: &Path) -> Result<Self, ReportError> {
        let file = open(path)?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut senders = HashSet::new();
        for row in reader.deserialize::<SenderRow>() {
            let row = row.map_err(|source| ReportError::MalformedReference {
                path: path.to_path_buf(),
                source,
            })?;
            let sender = row.sender.trim().to_string();
            if !sender.is_empty() {
                senders.insert(sender);
            }
        }
        Ok(ExemptSenders { senders })
    }

    pub fn contains(&self, sender: &str) -> bool {
        self.senders.contains(sender)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    #[cfg(test)]
    pub fn from_names(names: &[&str]) -> Self {
        ExemptSenders {
            senders: names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn open(path: &Path) -> Result<File, ReportError> {
    File::open(path).map_err(|source| ReportError::MissingReference {
        path: path.to_path_buf(),
        source,
    })
}
