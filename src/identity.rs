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

//! Naming and ranking of raw temperature nodes.
//!
//! sysfs nodes carry no useful names, and the sensor report carries no sysfs
//! paths. The two are joined by reading value: a node and a report entry
//! sampled at nearly the same instant that agree to within a fraction of a
//! degree are taken to be the same sensor. Two sensors at the same
//! temperature can be confused; the first report entry wins.

use tracing::trace;

use crate::constants::{ranking, temperature};
use crate::model::{MatchedIdentity, ThermalZone};
use crate::report::ReportEntry;

/// Annotate each zone with the first report entry within the default
/// tolerance. Unmatched zones are returned unannotated.
pub fn resolve(zones: Vec<ThermalZone>, report: &[ReportEntry]) -> Vec<ThermalZone> {
    resolve_within(zones, report, temperature::MATCH_TOLERANCE_CELSIUS)
}

/// [`resolve`] with an explicit tolerance in degrees (exclusive)
pub fn resolve_within(zones: Vec<ThermalZone>, report: &[ReportEntry], tolerance: f64) -> Vec<ThermalZone> {
    zones
        .into_iter()
        .map(|mut zone| {
            zone.matched = report
                .iter()
                .find(|entry| (entry.temp - zone.current_temp).abs() < tolerance)
                .map(|entry| MatchedIdentity {
                    adapter: entry.adapter.clone(),
                    sensor: entry.sensor.clone(),
                    reference_temp: entry.temp,
                });
            trace!(path = %zone.path.display(), matched = zone.matched.is_some(), "Resolved zone");
            zone
        })
        .collect()
}

/// Order zones CPU package first, then other CPU zones, then GPUs, then the
/// rest. Discovery order is kept within each group.
pub fn rank(mut zones: Vec<ThermalZone>) -> Vec<ThermalZone> {
    zones.sort_by_key(tier);
    zones
}

fn tier(zone: &ThermalZone) -> u8 {
    let zone_type = zone.zone_type.to_lowercase();
    let adapter = zone.matched.as_ref().map(|m| m.adapter.to_lowercase()).unwrap_or_default();

    if ranking::CPU_CHIP_MARKERS.iter().any(|m| adapter.contains(m)) {
        0
    } else if zone_type.contains(ranking::CPU_MARKER) || adapter.contains(ranking::CPU_MARKER) {
        1
    } else if ranking::GPU_MARKERS.iter().any(|m| zone_type.contains(m)) {
        2
    } else {
        3
    }
}

/// `"<sensor> (<type>)"` for matched zones, the bare type otherwise
pub fn display_name(zone: &ThermalZone) -> String {
    match &zone.matched {
        Some(m) => format!("{} ({})", m.sensor, zone.zone_type),
        None => zone.zone_type.clone(),
    }
}
