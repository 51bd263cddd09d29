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

//! User settings for tfconf
//!
//! Stored as JSON at `~/.config/tfconf/settings.json`. Every field has a
//! default, so a partial file (or none at all) is fine.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tf_error::{Result, TfconfError};
use tracing::debug;

use crate::catalog::SensorCatalog;
use crate::config::ConfigReconciler;
use crate::constants::{apply, monitor, paths, report, temperature};
use crate::hwmon::ThermalZoneReader;
use crate::monitor::TemperatureMonitor;
use crate::report::LmSensors;
use crate::service::PkexecApplier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Structured thinkfan configuration, probed first
    pub structured_config: PathBuf,
    /// Legacy thinkfan configuration
    pub legacy_config: PathBuf,
    /// Unit restarted after an apply; empty skips the restart
    pub service_name: String,
    /// Elevation helper and its leading arguments
    pub elevation_command: Vec<String>,
    pub apply_timeout_secs: u64,
    pub sensors_command: String,
    pub sensors_timeout_ms: u64,
    pub hwmon_root: PathBuf,
    pub thermal_root: PathBuf,
    pub poll_interval_ms: u64,
    /// Degrees within which a node and a report entry are the same sensor
    pub match_tolerance: f64,
    pub history_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            structured_config: PathBuf::from(paths::STRUCTURED_CONFIG),
            legacy_config: PathBuf::from(paths::LEGACY_CONFIG),
            service_name: apply::SERVICE_NAME.to_string(),
            elevation_command: vec![apply::ELEVATE_COMMAND.to_string()],
            apply_timeout_secs: apply::TIMEOUT_SECS,
            sensors_command: report::SENSORS_COMMAND.to_string(),
            sensors_timeout_ms: report::TIMEOUT_MS,
            hwmon_root: PathBuf::from(paths::HWMON_BASE),
            thermal_root: PathBuf::from(paths::THERMAL_BASE),
            poll_interval_ms: monitor::POLL_INTERVAL_MS,
            match_tolerance: temperature::MATCH_TOLERANCE_CELSIUS,
            history_len: monitor::HISTORY_LEN,
        }
    }
}

impl Settings {
    /// Reject values that would make the tool misbehave
    pub fn validate(&self) -> Result<()> {
        if self.apply_timeout_secs == 0 {
            return Err(TfconfError::config("apply_timeout_secs must be positive"));
        }
        if self.sensors_timeout_ms == 0 {
            return Err(TfconfError::config("sensors_timeout_ms must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(TfconfError::config("poll_interval_ms must be positive"));
        }
        if self.history_len == 0 {
            return Err(TfconfError::config("history_len must be positive"));
        }
        if !(self.match_tolerance.is_finite() && self.match_tolerance > 0.0) {
            return Err(TfconfError::config("match_tolerance must be a positive number"));
        }
        if self.structured_config == self.legacy_config {
            return Err(TfconfError::config("structured_config and legacy_config must differ"));
        }
        Ok(())
    }

    pub fn applier(&self) -> PkexecApplier {
        PkexecApplier::new(
            self.elevation_command.clone(),
            self.service_name.clone(),
            Duration::from_secs(self.apply_timeout_secs),
        )
    }

    pub fn reconciler(&self) -> ConfigReconciler {
        ConfigReconciler::new(&self.structured_config, &self.legacy_config, Box::new(self.applier()))
    }

    pub fn reader(&self) -> ThermalZoneReader {
        ThermalZoneReader::new(&self.hwmon_root, &self.thermal_root)
    }

    pub fn catalog(&self) -> SensorCatalog {
        let report = LmSensors::new(&self.sensors_command, Duration::from_millis(self.sensors_timeout_ms));
        SensorCatalog::new(self.reader(), Box::new(report)).with_tolerance(self.match_tolerance)
    }

    pub fn monitor(&self, sensors: Vec<PathBuf>) -> TemperatureMonitor {
        TemperatureMonitor::with_timing(sensors, Duration::from_millis(self.poll_interval_ms), self.history_len)
    }
}

/// `~/.config/tfconf/settings.json`
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(paths::APP_DIR).join(paths::SETTINGS_FILE))
}

/// Load settings from `path`, or from the default location when `None`.
/// A missing file yields defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_settings_path() {
            Some(p) => p,
            None => return Ok(Settings::default()),
        },
    };

    if !path.exists() {
        debug!(path = %path.display(), "No settings file, using defaults");
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| TfconfError::config(format!("Failed to read settings file {}: {}", path.display(), e)))?;
    let settings: Settings = serde_json::from_str(&content)
        .map_err(|e| TfconfError::config(format!("Failed to parse settings JSON {}: {}", path.display(), e)))?;
    settings.validate()?;
    Ok(settings)
}

/// Save settings as pretty JSON (temp file + rename)
pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    settings.validate()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| TfconfError::config(format!("Failed to create config directory: {}", e)))?;
    }

    let json = serde_json::to_string_pretty(settings)?;
    let temp_path = path.with_extension("json.tmp");

    let mut file = fs::File::create(&temp_path)
        .map_err(|e| TfconfError::FileWrite {
            path: temp_path.clone(),
            source: e,
        })?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| TfconfError::FileWrite {
            path: temp_path.clone(),
            source: e,
        })?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| TfconfError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), "Settings saved");
    Ok(())
}
