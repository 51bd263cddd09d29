/*
 * This file is part of tfconf.
 *
 * Copyright (C) 2025 tfconf contributors
 *
 * tfconf is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * tfconf is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with tfconf. If not, see <https://www.gnu.org/licenses/>.
 */

//! Selectable sensors: discovered nodes, named and ranked.

use std::path::PathBuf;
use std::thread;

use serde::Serialize;
use tf_error::TfconfError;
use tracing::{debug, warn};

use crate::constants::temperature;
use crate::hwmon::ThermalZoneReader;
use crate::identity;
use crate::model::{Config, ThermalZone};
use crate::report::SensorReportSource;

/// One sensor the operator can pick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub adapter: String,
    pub name: String,
    pub path: PathBuf,
    pub current: f64,
    #[serde(rename = "type")]
    pub zone_type: String,
}

impl From<ThermalZone> for CatalogEntry {
    fn from(zone: ThermalZone) -> Self {
        let name = identity::display_name(&zone);
        let adapter = zone
            .matched
            .as_ref()
            .map(|m| m.adapter.clone())
            .unwrap_or_else(|| zone.zone_type.clone());
        Self {
            adapter,
            name,
            path: zone.path,
            current: zone.current_temp,
            zone_type: zone.zone_type,
        }
    }
}

pub struct SensorCatalog {
    reader: ThermalZoneReader,
    report: Box<dyn SensorReportSource>,
    tolerance: f64,
}

impl SensorCatalog {
    pub fn new(reader: ThermalZoneReader, report: Box<dyn SensorReportSource>) -> Self {
        Self {
            reader,
            report,
            tolerance: temperature::MATCH_TOLERANCE_CELSIUS,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn reader(&self) -> &ThermalZoneReader {
        &self.reader
    }

    /// Enumerate nodes and fetch the report concurrently, then name and rank.
    ///
    /// A failing report only costs the names.
    pub fn discover(&self) -> Vec<CatalogEntry> {
        let (zones, fetched) = thread::scope(|scope| {
            let report = scope.spawn(|| self.report.fetch());
            let zones = self.reader.enumerate();
            let fetched = report
                .join()
                .unwrap_or_else(|_| Err(TfconfError::SensorReport("report thread panicked".into())));
            (zones, fetched)
        });

        let report = match fetched {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Sensor report unavailable, sensors will be unnamed");
                Vec::new()
            }
        };

        let resolved = identity::resolve_within(zones, &report, self.tolerance);
        let entries: Vec<CatalogEntry> = identity::rank(resolved).into_iter().map(CatalogEntry::from).collect();
        debug!(count = entries.len(), named = report.len(), "Sensor discovery finished");
        entries
    }
}

/// Copy catalog names onto the configured sensors they describe
pub fn name_sensors(config: &Config, entries: &[CatalogEntry]) -> Config {
    let mut named = config.clone();
    for sensor in &mut named.sensors {
        if let Some(entry) = entries.iter().find(|e| e.path == sensor.path()) {
            sensor.display_name = Some(entry.name.clone());
        }
    }
    named
}
