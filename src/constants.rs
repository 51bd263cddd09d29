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

//! Constants and defaults for tfconf
//!
//! Paths, sensor plausibility limits and timing defaults. Anything a user may
//! want to change is also exposed through [`crate::settings::Settings`].

/// System paths
pub mod paths {
    /// Structured (YAML) thinkfan configuration, probed first
    pub const STRUCTURED_CONFIG: &str = "/etc/thinkfan.yaml";

    /// Legacy line-oriented thinkfan configuration
    pub const LEGACY_CONFIG: &str = "/etc/thinkfan.conf";

    /// Base path for hwmon devices
    pub const HWMON_BASE: &str = "/sys/class/hwmon";

    /// Base path for ACPI/virtual thermal zones
    pub const THERMAL_BASE: &str = "/sys/class/thermal";

    /// ThinkPad ACPI fan interface, used by the default configuration
    pub const TPACPI_FAN: &str = "/proc/acpi/ibm/fan";

    /// Sensor used by the default configuration
    pub const DEFAULT_SENSOR: &str = "/sys/class/hwmon/hwmon0/temp1_input";

    /// Directory name under the user's config dir
    pub const APP_DIR: &str = "tfconf";

    /// Settings file name
    pub const SETTINGS_FILE: &str = "settings.json";
}

/// Temperature sensor limits
pub mod temperature {
    /// Lowest plausible reading in Celsius; anything below is a broken sensor
    pub const MIN_PLAUSIBLE_CELSIUS: f64 = -50.0;

    /// Highest plausible reading in Celsius
    pub const MAX_PLAUSIBLE_CELSIUS: f64 = 150.0;

    /// sysfs reports millidegrees
    pub const MILLIDEGREES_PER_DEGREE: f64 = 1000.0;

    /// Maximum distance between a zone reading and a report reading for the
    /// two to be considered the same sensor
    pub const MATCH_TOLERANCE_CELSIUS: f64 = 0.5;

    /// Upper bound used by thinkfan for "no upper limit"
    pub const UNBOUNDED_UPPER_LIMIT: i32 = 32767;
}

/// Sensor ranking markers
pub mod ranking {
    /// Adapter names of drivers that report the CPU package temperature
    pub const CPU_CHIP_MARKERS: &[&str] = &["coretemp", "k10temp", "k8temp", "zenpower", "cpu_thermal"];

    /// Generic marker for CPU zones
    pub const CPU_MARKER: &str = "cpu";

    /// Markers for GPU zones
    pub const GPU_MARKERS: &[&str] = &["gpu", "nouveau", "radeon"];
}

/// Privileged apply defaults
pub mod apply {
    /// Elevation helper
    pub const ELEVATE_COMMAND: &str = "pkexec";

    /// thinkfan service unit
    pub const SERVICE_NAME: &str = "thinkfan";

    /// Bound on how long the operator may take to answer the prompt
    pub const TIMEOUT_SECS: u64 = 120;

    /// pkexec exit code when the authentication dialog was dismissed
    pub const EXIT_DECLINED: i32 = 126;

    /// pkexec exit code when authorization failed
    pub const EXIT_NOT_AUTHORIZED: i32 = 127;

    /// Apply script exit code when installing the file failed
    pub const EXIT_INSTALL_FAILED: i32 = 10;

    /// Apply script exit code when restarting the daemon failed
    pub const EXIT_RESTART_FAILED: i32 = 11;
}

/// Sensor report (lm-sensors) defaults
pub mod report {
    /// Command producing the JSON sensor report
    pub const SENSORS_COMMAND: &str = "sensors";

    /// Arguments for JSON output
    pub const SENSORS_ARGS: &[&str] = &["-j"];

    /// How long `sensors -j` may take
    pub const TIMEOUT_MS: u64 = 5000;
}

/// Monitoring defaults
pub mod monitor {
    /// Interval between polls of the active sensors
    pub const POLL_INTERVAL_MS: u64 = 1000;

    /// Readings kept per sensor
    pub const HISTORY_LEN: usize = 10;
}
