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

//! Reading and writing thinkfan configuration text.
//!
//! Two grammars exist on disk:
//!
//! - **Structured** (`/etc/thinkfan.yaml`): YAML with `sensors`, `fans` and
//!   `levels` lists. Levels are either `{speed, lower_limit?, upper_limit}`
//!   mappings or the short `[speed, lower, upper]` form.
//! - **Legacy** (`/etc/thinkfan.conf`): one declaration per line
//!   (`hwmon <path>`, `tp_fan <path>`, `(speed, lower, upper)`). Unknown lines
//!   are skipped, as thinkfan itself does.
//!
//! [`parse`] tries the structured grammar first and falls back to the legacy
//! one. [`serialize`] always writes the structured grammar.

use std::fmt::Write as _;
use std::path::Path;

use serde::Deserialize;
use tf_error::{Result, TfconfError};
use tracing::{debug, trace};

use crate::model::{Config, ConfigFormat, Fan, FanKind, Level, Sensor, SensorIdentifier};

#[derive(Debug, Deserialize)]
struct RawConfig {
    sensors: Vec<RawEntry>,
    #[serde(default)]
    fans: Vec<RawEntry>,
    levels: Vec<RawLevel>,
}

/// `- hwmon: <path>` or `- tpacpi: <path>`; other thinkfan keys are tolerated.
#[derive(Debug, Deserialize)]
struct RawEntry {
    hwmon: Option<String>,
    tpacpi: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLevel {
    Detailed {
        speed: u32,
        #[serde(default)]
        lower_limit: Option<Vec<i32>>,
        upper_limit: Vec<i32>,
    },
    Simple(u32, i32, i32),
}

/// Parse configuration text in either grammar.
///
/// Fails with [`TfconfError::Format`] when the text is not structured YAML of
/// the expected shape and the legacy grammar finds nothing in it either.
pub fn parse(content: &str) -> Result<Config> {
    let structured_err = match parse_structured(content) {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };
    debug!(error = %structured_err, "Not a structured thinkfan config, trying legacy grammar");

    let config = parse_legacy(content);
    if config.is_empty() {
        return Err(TfconfError::format(format!(
            "no sensors, fans or levels found (structured parse: {})",
            structured_err
        )));
    }
    Ok(config)
}

fn parse_structured(content: &str) -> std::result::Result<Config, String> {
    let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| e.to_string())?;

    let sensors = raw
        .sensors
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match (entry.hwmon, entry.tpacpi) {
            (Some(path), _) => Ok(Sensor::hwmon(path)),
            (None, Some(path)) => Ok(Sensor::tpacpi(path)),
            (None, None) => Err(format!("sensor #{} has neither hwmon nor tpacpi path", i + 1)),
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let fans = raw
        .fans
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match (entry.tpacpi, entry.hwmon) {
            (Some(path), _) => Ok(Fan::new(FanKind::Tpacpi, path)),
            (None, Some(path)) => Ok(Fan::new(FanKind::Hwmon, path)),
            (None, None) => Err(format!("fan #{} has neither tpacpi nor hwmon path", i + 1)),
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let columns = sensors.len();
    let levels = raw
        .levels
        .into_iter()
        .enumerate()
        .map(|(i, level)| match level {
            RawLevel::Detailed { speed, lower_limit, upper_limit } => Level {
                speed,
                lower_limit: lower_limit.filter(|l| !l.is_empty()),
                upper_limit,
            },
            // The short form applies one band to every sensor
            RawLevel::Simple(speed, lower, upper) => {
                Level::uniform(speed, (i > 0).then_some(lower), upper, columns)
            }
        })
        .collect();

    Ok(Config::new(sensors, fans, levels, ConfigFormat::Structured))
}

fn parse_legacy(content: &str) -> Config {
    let mut sensors = Vec::new();
    let mut fans = Vec::new();
    let mut levels: Vec<Level> = Vec::new();

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((speed, lower, upper)) = parse_level_tuple(line) {
            // The first level is the lowest band and has no lower limit
            let lower_limit = if levels.is_empty() { None } else { Some(vec![lower]) };
            levels.push(Level::new(speed, lower_limit, vec![upper]));
            continue;
        }

        let Some((keyword, rest)) = line.split_once(char::is_whitespace) else {
            trace!(line, "Skipping legacy line");
            continue;
        };
        let Some(path) = rest.split_whitespace().next() else {
            continue;
        };

        match keyword {
            "tp_fan" => fans.push(Fan::new(FanKind::Tpacpi, path)),
            "pwm_fan" => fans.push(Fan::new(FanKind::Hwmon, path)),
            _ => match sensor_from_keyword(keyword, path) {
                Some(identifier) => sensors.push(Sensor { identifier, display_name: None }),
                None => trace!(line, "Skipping legacy line"),
            },
        }
    }

    Config::new(sensors, fans, levels, ConfigFormat::Legacy)
}

/// `(speed, lower, upper)` with exactly three integers
fn parse_level_tuple(line: &str) -> Option<(u32, i32, i32)> {
    let inner = line.strip_prefix('(')?.strip_suffix(')')?;
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return None;
    }
    let speed = parts[0].parse::<u32>().ok()?;
    let lower = parts[1].parse::<i32>().ok()?;
    let upper = parts[2].parse::<i32>().ok()?;
    Some((speed, lower, upper))
}

/// Write the structured grammar.
///
/// Layout: sensors, blank line, fans, blank line, levels. Each level has a
/// `speed` line, a `lower_limit` line when it has lower limits and an
/// `upper_limit` line.
pub fn serialize(config: &Config) -> String {
    let mut out = String::new();

    write_list_header(&mut out, "sensors", config.sensors.is_empty());
    for sensor in &config.sensors {
        let _ = writeln!(out, "  - {}: {}", sensor.identifier.structured_key(), yaml_path(sensor.path()));
    }
    out.push('\n');

    write_list_header(&mut out, "fans", config.fans.is_empty());
    for fan in &config.fans {
        let _ = writeln!(out, "  - {}: {}", fan.kind.structured_key(), yaml_path(&fan.path));
    }
    out.push('\n');

    write_list_header(&mut out, "levels", config.levels.is_empty());
    for level in &config.levels {
        let _ = writeln!(out, "  - speed: {}", level.speed);
        if let Some(lower) = level.lower_limit.as_ref().filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "    lower_limit: {}", yaml_list(lower));
        }
        let _ = writeln!(out, "    upper_limit: {}", yaml_list(&level.upper_limit));
    }

    out
}

/// Write the legacy grammar. Only single-sensor configurations fit in it.
pub fn serialize_legacy(config: &Config) -> Result<String> {
    if config.sensors.len() > 1 {
        return Err(TfconfError::format(format!(
            "the legacy format supports one sensor, configuration has {}",
            config.sensors.len()
        )));
    }

    let mut out = String::new();
    for sensor in &config.sensors {
        let _ = writeln!(out, "{} {}", sensor.identifier.legacy_keyword(), sensor.path().display());
    }
    for fan in &config.fans {
        let _ = writeln!(out, "{} {}", fan.kind.legacy_keyword(), fan.path.display());
    }
    out.push('\n');
    for level in &config.levels {
        let lower = level.lower(0).unwrap_or(0);
        let upper = level.upper(0).unwrap_or(0);
        let _ = writeln!(out, "({}, {}, {})", level.speed, lower, upper);
    }
    Ok(out)
}

/// Grammar a configuration should be written in.
///
/// Legacy files stay legacy while they have a single sensor; multi-sensor
/// tables can only be expressed in the structured grammar.
pub fn target_format(config: &Config) -> ConfigFormat {
    match config.source_format {
        ConfigFormat::Legacy if config.sensors.len() <= 1 => ConfigFormat::Legacy,
        _ => ConfigFormat::Structured,
    }
}

/// Serialize in the requested grammar
pub fn render(config: &Config, format: ConfigFormat) -> Result<String> {
    match format {
        ConfigFormat::Structured => Ok(serialize(config)),
        ConfigFormat::Legacy => serialize_legacy(config),
    }
}

fn write_list_header(out: &mut String, key: &str, empty: bool) {
    if empty {
        let _ = writeln!(out, "{}: []", key);
    } else {
        let _ = writeln!(out, "{}:", key);
    }
}

fn yaml_list(values: &[i32]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

fn yaml_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    let plain = !s.is_empty()
        && !s.starts_with('-')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '.' | '-' | '+' | '@'));
    // Words like `null`, `true` or `1e3` are plain but read back as other types
    let reads_back = matches!(
        serde_yaml::from_str::<serde_yaml::Value>(&s),
        Ok(serde_yaml::Value::String(ref v)) if *v == *s
    );
    if plain && reads_back {
        return s.into_owned();
    }
    serde_yaml::to_string(s.as_ref())
        .map(|quoted| quoted.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", s))
}

/// Sensor identifier for a legacy sensor keyword, if it is one
pub fn sensor_from_keyword(keyword: &str, path: &str) -> Option<SensorIdentifier> {
    match keyword {
        "hwmon" => Some(SensorIdentifier::Hwmon(path.into())),
        "tp_thermal" => Some(SensorIdentifier::Tpacpi(path.into())),
        _ => None,
    }
}
