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

//! Named sensor readings from lm-sensors.
//!
//! `sensors -j` prints an object of adapters, each mapping metric names to
//! either a number or an object of `<kind><N>_<field>` values:
//!
//! ```text
//! { "coretemp-isa-0000": { "Adapter": "ISA adapter",
//!                          "Package id 0": { "temp1_input": 62.0, "temp1_max": 100.0 } } }
//! ```
//!
//! The report only supplies names and ranking hints; it is never required.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tf_error::{Result, TfconfError};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::constants::report;

/// One named reading from the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub adapter: String,
    pub sensor: String,
    pub temp: f64,
}

impl ReportEntry {
    pub fn new(adapter: impl Into<String>, sensor: impl Into<String>, temp: f64) -> Self {
        Self {
            adapter: adapter.into(),
            sensor: sensor.into(),
            temp,
        }
    }
}

/// Source of named sensor readings
#[cfg_attr(test, mockall::automock)]
pub trait SensorReportSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<ReportEntry>>;
}

/// Runs `sensors -j` with a bounded wait
#[derive(Debug, Clone)]
pub struct LmSensors {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for LmSensors {
    fn default() -> Self {
        Self::new(report::SENSORS_COMMAND, Duration::from_millis(report::TIMEOUT_MS))
    }
}

impl LmSensors {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args: report::SENSORS_ARGS.iter().map(|s| s.to_string()).collect(),
            timeout,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    fn run(&self) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TfconfError::SensorReport(format!("could not start {}: {}", self.command, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| TfconfError::SensorReport("no stdout from sensors".into()))?;
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            stdout.read_to_string(&mut buf).map(|_| buf)
        });

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TfconfError::Timeout(format!(
                    "{} did not finish within {:?}",
                    self.command, self.timeout
                )));
            }
        };

        let output = reader
            .join()
            .map_err(|_| TfconfError::SensorReport("report reader panicked".into()))??;

        if !status.success() {
            if output.trim().is_empty() {
                return Err(TfconfError::SensorReport(format!("{} exited with {}", self.command, status)));
            }
            // sensors exits non-zero when a single chip fails but still
            // prints the rest
            warn!(command = %self.command, %status, "Sensor report incomplete");
        }
        Ok(output)
    }
}

impl SensorReportSource for LmSensors {
    fn fetch(&self) -> Result<Vec<ReportEntry>> {
        let output = self.run()?;
        let entries = parse_report(&output)?;
        debug!(count = entries.len(), "Sensor report parsed");
        Ok(entries)
    }
}

/// Flatten a `sensors -j` document into entries, in document order
pub fn parse_report(json: &str) -> Result<Vec<ReportEntry>> {
    let doc: Value = serde_json::from_str(json)?;
    let Value::Object(adapters) = doc else {
        return Err(TfconfError::SensorReport("report is not a JSON object".into()));
    };

    let mut entries = Vec::new();
    for (adapter, metrics) in adapters {
        let Value::Object(metrics) = metrics else {
            continue;
        };
        for (sensor, value) in metrics {
            if sensor == "Adapter" {
                continue;
            }
            if let Some(temp) = metric_value(&value) {
                entries.push(ReportEntry::new(adapter.clone(), sensor, temp));
            }
        }
    }
    Ok(entries)
}

/// First `temp*_input` reading of a metric. Fans, voltages and power
/// readings carry other `*_input` keys and are not temperatures.
fn metric_value(value: &Value) -> Option<f64> {
    let Value::Object(fields) = value else {
        return None;
    };
    fields
        .iter()
        .find(|(key, _)| key.starts_with("temp") && key.ends_with("_input"))
        .and_then(|(_, v)| v.as_f64())
}
