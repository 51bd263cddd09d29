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

//! In-memory model of a thinkfan configuration.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{paths, temperature};

/// Where a sensor reading comes from. The path is the sensor's identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorIdentifier {
    Hwmon(PathBuf),
    Tpacpi(PathBuf),
}

impl SensorIdentifier {
    pub fn path(&self) -> &Path {
        match self {
            SensorIdentifier::Hwmon(p) | SensorIdentifier::Tpacpi(p) => p,
        }
    }

    /// Key used by the structured format (`- hwmon: /sys/...`)
    pub fn structured_key(&self) -> &'static str {
        match self {
            SensorIdentifier::Hwmon(_) => "hwmon",
            SensorIdentifier::Tpacpi(_) => "tpacpi",
        }
    }

    /// Keyword used by the legacy format (`hwmon /sys/...`)
    pub fn legacy_keyword(&self) -> &'static str {
        match self {
            SensorIdentifier::Hwmon(_) => "hwmon",
            SensorIdentifier::Tpacpi(_) => "tp_thermal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sensor {
    #[serde(flatten)]
    pub identifier: SensorIdentifier,
    /// Derived from discovery; never written to disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Sensor {
    pub fn hwmon(path: impl Into<PathBuf>) -> Self {
        Self {
            identifier: SensorIdentifier::Hwmon(path.into()),
            display_name: None,
        }
    }

    pub fn tpacpi(path: impl Into<PathBuf>) -> Self {
        Self {
            identifier: SensorIdentifier::Tpacpi(path.into()),
            display_name: None,
        }
    }

    pub fn path(&self) -> &Path {
        self.identifier.path()
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FanKind {
    Hwmon,
    Tpacpi,
}

impl FanKind {
    pub fn structured_key(self) -> &'static str {
        match self {
            FanKind::Hwmon => "hwmon",
            FanKind::Tpacpi => "tpacpi",
        }
    }

    pub fn legacy_keyword(self) -> &'static str {
        match self {
            FanKind::Hwmon => "pwm_fan",
            FanKind::Tpacpi => "tp_fan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fan {
    pub path: PathBuf,
    pub kind: FanKind,
}

impl Fan {
    pub fn new(kind: FanKind, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// One fan-speed band. `lower_limit` is absent only on the lowest level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub speed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_limit: Option<Vec<i32>>,
    pub upper_limit: Vec<i32>,
}

impl Level {
    pub fn new(speed: u32, lower_limit: Option<Vec<i32>>, upper_limit: Vec<i32>) -> Self {
        Self {
            speed,
            lower_limit,
            upper_limit,
        }
    }

    /// Level with the same bounds for all `columns` sensors
    pub fn uniform(speed: u32, lower: Option<i32>, upper: i32, columns: usize) -> Self {
        Self {
            speed,
            lower_limit: lower.map(|l| vec![l; columns]),
            upper_limit: vec![upper; columns],
        }
    }

    pub fn lower(&self, column: usize) -> Option<i32> {
        self.lower_limit.as_ref().and_then(|l| l.get(column).copied())
    }

    pub fn upper(&self, column: usize) -> Option<i32> {
        self.upper_limit.get(column).copied()
    }

    pub fn has_lower_limit(&self) -> bool {
        self.lower_limit.as_ref().is_some_and(|l| !l.is_empty())
    }
}

/// On-disk grammar a configuration was read from or will be written in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    #[serde(alias = "yaml")]
    Structured,
    Legacy,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Structured => write!(f, "yaml"),
            ConfigFormat::Legacy => write!(f, "legacy"),
        }
    }
}

/// Aggregate root: sensors define the columns of every level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub sensors: Vec<Sensor>,
    pub fans: Vec<Fan>,
    pub levels: Vec<Level>,
    #[serde(rename = "format")]
    pub source_format: ConfigFormat,
}

impl Config {
    pub fn new(sensors: Vec<Sensor>, fans: Vec<Fan>, levels: Vec<Level>, source_format: ConfigFormat) -> Self {
        Self {
            sensors,
            fans,
            levels,
            source_format,
        }
    }

    /// Configuration written when no thinkfan configuration exists yet:
    /// one sensor, the ThinkPad fan, five ascending levels up to "unbounded".
    pub fn default_config() -> Self {
        let bands: [(u32, Option<i32>, i32); 5] = [
            (0, None, 55),
            (1, Some(55), 60),
            (3, Some(60), 70),
            (5, Some(70), 80),
            (7, Some(80), temperature::UNBOUNDED_UPPER_LIMIT),
        ];
        Self {
            sensors: vec![Sensor::hwmon(paths::DEFAULT_SENSOR)],
            fans: vec![Fan::new(FanKind::Tpacpi, paths::TPACPI_FAN)],
            levels: bands
                .iter()
                .map(|&(speed, lower, upper)| Level::uniform(speed, lower, upper, 1))
                .collect(),
            source_format: ConfigFormat::Structured,
        }
    }

    /// Column index of the sensor with `path`
    pub fn sensor_index(&self, path: &Path) -> Option<usize> {
        self.sensors.iter().position(|s| s.path() == path)
    }

    pub fn has_sensor(&self, path: &Path) -> bool {
        self.sensor_index(path).is_some()
    }

    /// True when every level has exactly one entry per sensor
    pub fn columns_consistent(&self) -> bool {
        let n = self.sensors.len();
        self.levels.iter().all(|level| {
            level.upper_limit.len() == n && level.lower_limit.as_ref().map_or(true, |l| l.len() == n)
        })
    }

    /// True when each level's upper bounds equal the next level's lower bounds
    pub fn is_contiguous(&self) -> bool {
        self.levels.windows(2).all(|pair| match &pair[1].lower_limit {
            Some(lower) => *lower == pair[0].upper_limit,
            None => false,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty() && self.fans.is_empty() && self.levels.is_empty()
    }
}

/// Report entry a zone was correlated with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedIdentity {
    pub adapter: String,
    pub sensor: String,
    pub reference_temp: f64,
}

/// A raw temperature node found on the system. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermalZone {
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub zone_type: String,
    pub current_temp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<MatchedIdentity>,
}

impl ThermalZone {
    pub fn new(path: impl Into<PathBuf>, zone_type: impl Into<String>, current_temp: f64) -> Self {
        Self {
            path: path.into(),
            zone_type: zone_type.into(),
            current_temp,
            matched: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_shape() {
        let config = Config::default_config();
        assert_eq!(config.sensors.len(), 1);
        assert_eq!(config.fans.len(), 1);
        assert_eq!(config.levels.len(), 5);
        assert!(config.levels[0].lower_limit.is_none());
        assert_eq!(config.levels[4].upper_limit, vec![temperature::UNBOUNDED_UPPER_LIMIT]);
        assert!(config.columns_consistent());
        assert!(config.is_contiguous());
        assert!(config.levels.windows(2).all(|w| w[0].speed < w[1].speed));
    }

    #[test]
    fn test_sensor_index_by_path() {
        let mut config = Config::default_config();
        config.sensors.push(Sensor::tpacpi("/proc/acpi/ibm/thermal"));
        assert_eq!(config.sensor_index(Path::new(paths::DEFAULT_SENSOR)), Some(0));
        assert_eq!(config.sensor_index(Path::new("/proc/acpi/ibm/thermal")), Some(1));
        assert_eq!(config.sensor_index(Path::new("/nope")), None);
    }

    #[test]
    fn test_contiguity_check() {
        let config = Config::new(
            vec![Sensor::hwmon("/a")],
            vec![],
            vec![Level::uniform(0, None, 60, 1), Level::uniform(7, Some(60), 255, 1)],
            ConfigFormat::Structured,
        );
        assert!(config.is_contiguous());

        let mut gapped = config.clone();
        gapped.levels[1].lower_limit = Some(vec![58]);
        assert!(!gapped.is_contiguous());
    }

    #[test]
    fn test_json_shape() {
        let config = Config::new(
            vec![Sensor::hwmon("/sys/x")],
            vec![Fan::new(FanKind::Tpacpi, "/proc/acpi/ibm/fan")],
            vec![Level::uniform(0, None, 60, 1)],
            ConfigFormat::Legacy,
        );
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["sensors"][0]["hwmon"], "/sys/x");
        assert_eq!(json["fans"][0]["kind"], "tpacpi");
        assert_eq!(json["format"], "legacy");
        assert!(json["levels"][0].get("lower_limit").is_none());
    }

    #[test]
    fn test_format_display() {
        assert_eq!(ConfigFormat::Structured.to_string(), "yaml");
        assert_eq!(ConfigFormat::Legacy.to_string(), "legacy");
    }
}
