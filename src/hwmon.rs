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

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::thread;

use tf_error::{Result, TfconfError};
use tracing::{debug, trace};

use crate::constants::{paths, temperature};
use crate::model::ThermalZone;

/// Enumerates raw temperature nodes under the hwmon and thermal class trees.
#[derive(Debug, Clone)]
pub struct ThermalZoneReader {
    hwmon_root: PathBuf,
    thermal_root: PathBuf,
}

impl Default for ThermalZoneReader {
    fn default() -> Self {
        Self::new(paths::HWMON_BASE, paths::THERMAL_BASE)
    }
}

impl ThermalZoneReader {
    pub fn new(hwmon_root: impl Into<PathBuf>, thermal_root: impl Into<PathBuf>) -> Self {
        Self {
            hwmon_root: hwmon_root.into(),
            thermal_root: thermal_root.into(),
        }
    }

    /// Every plausible temperature node with its current reading, in discovery
    /// order. Unreadable, non-numeric and implausible nodes are left out.
    /// Never fails; an inaccessible tree just contributes nothing.
    pub fn enumerate(&self) -> Vec<ThermalZone> {
        let candidates = self.candidates();
        debug!(count = candidates.len(), "Reading temperature nodes");

        thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .into_iter()
                .map(|(path, zone_type)| scope.spawn(move || read_candidate(path, zone_type)))
                .collect();
            handles
                .into_iter()
                .filter_map(|handle| handle.join().ok().flatten())
                .collect()
        })
    }

    /// Current reading of one node in Celsius
    pub fn read_one(&self, path: &Path) -> Result<f64> {
        read_one(path)
    }

    fn candidates(&self) -> Vec<(PathBuf, String)> {
        let mut out = Vec::new();

        // hwmon chips: type is the chip name
        for dir in sorted_dirs(&self.hwmon_root, "hwmon") {
            let name = read_trimmed(dir.join("name")).unwrap_or_else(|_| "unknown".into());
            for input in temp_inputs(&dir) {
                out.push((input, name.clone()));
            }
        }

        // thermal zones: type is the zone type, both the zone itself and any
        // hwmon device attached to it
        for zone in sorted_dirs(&self.thermal_root, "thermal_zone") {
            let zone_type = read_trimmed(zone.join("type")).unwrap_or_else(|_| "unknown".into());
            let temp = zone.join("temp");
            if temp.is_file() {
                out.push((temp, zone_type.clone()));
            }
            for hwmon in sorted_dirs(&zone, "hwmon") {
                for input in temp_inputs(&hwmon) {
                    out.push((input, zone_type.clone()));
                }
            }
        }
        out
    }
}

/// Current reading of one node in Celsius.
///
/// Accepts sysfs millidegree files and the `temperatures: 48 0 ...` layout of
/// `/proc/acpi/ibm/thermal` (whole degrees, first value).
pub fn read_one(path: &Path) -> Result<f64> {
    let raw = read_trimmed(path).map_err(|e| TfconfError::sensor_unavailable(path, e.to_string()))?;
    parse_reading(&raw)
        .ok_or_else(|| TfconfError::sensor_unavailable(path, format!("unreadable value {:?}", raw)))
}

fn parse_reading(raw: &str) -> Option<f64> {
    if let Some(rest) = raw.strip_prefix("temperatures:") {
        return rest.split_whitespace().next()?.parse::<i64>().ok().map(|v| v as f64);
    }
    let millis = raw.parse::<f64>().ok()?;
    millis.is_finite().then(|| millis / temperature::MILLIDEGREES_PER_DEGREE)
}

fn is_plausible(celsius: f64) -> bool {
    (temperature::MIN_PLAUSIBLE_CELSIUS..=temperature::MAX_PLAUSIBLE_CELSIUS).contains(&celsius)
}

fn read_candidate(path: PathBuf, zone_type: String) -> Option<ThermalZone> {
    let celsius = match read_one(&path) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping temperature node");
            return None;
        }
    };
    if !is_plausible(celsius) {
        debug!(path = %path.display(), celsius, "Skipping implausible reading");
        return None;
    }
    Some(ThermalZone::new(path, zone_type, celsius))
}

/// Subdirectories named `<prefix><N>`, ordered by N
fn sorted_dirs(root: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        trace!(root = %root.display(), "Directory not accessible");
        return Vec::new();
    };
    let mut dirs: Vec<(usize, PathBuf)> = entries
        .flatten()
        .filter_map(|ent| {
            let fname = ent.file_name();
            let idx = extract_index(&fname.to_string_lossy(), prefix, "")?;
            let path = ent.path();
            path.is_dir().then_some((idx, path))
        })
        .collect();
    dirs.sort_by_key(|(idx, _)| *idx);
    dirs.into_iter().map(|(_, path)| path).collect()
}

/// `temp<N>_input` files in `dir`, ordered by N
fn temp_inputs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut inputs: Vec<(usize, PathBuf)> = entries
        .flatten()
        .filter_map(|ent| {
            let fname = ent.file_name();
            let idx = extract_index(&fname.to_string_lossy(), "temp", "_input")?;
            Some((idx, ent.path()))
        })
        .collect();
    inputs.sort_by_key(|(idx, _)| *idx);
    inputs.into_iter().map(|(_, path)| path).collect()
}

fn read_trimmed<P: AsRef<Path>>(p: P) -> io::Result<String> {
    let mut s = String::new();
    fs::File::open(p)?.read_to_string(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn extract_index(fname: &str, prefix: &str, suffix: &str) -> Option<usize> {
    if fname.starts_with(prefix) && fname.ends_with(suffix) && fname.len() >= prefix.len() + suffix.len() {
        let mid = &fname[prefix.len()..fname.len() - suffix.len()];
        mid.parse().ok()
    } else {
        None
    }
}
