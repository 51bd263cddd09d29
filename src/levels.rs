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

//! Level table maintenance.
//!
//! Every level holds one upper (and, except for the lowest level, one lower)
//! bound per configured sensor, in sensor order. The functions here keep that
//! shape intact while sensors come and go, and keep adjacent levels touching:
//! `levels[i].upper_limit[c] == levels[i + 1].lower_limit[c]` after every
//! boundary edit.
//!
//! All operations validate first and return a new [`Config`]. A rejected call
//! never touches its input.

use std::path::Path;

use tf_error::{Result, TfconfError};
use tracing::debug;

use crate::model::{Config, Level, Sensor};

/// Which side of a level's band an edit targets
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

/// Add `sensor` as a new last column.
///
/// The new column starts as a copy of column 0 in every level; the operator is
/// expected to tune it afterwards.
pub fn add_sensor_column(config: &Config, sensor: Sensor) -> Result<Config> {
    if config.has_sensor(sensor.path()) {
        return Err(TfconfError::DuplicateSensor(sensor.path().display().to_string()));
    }

    let mut next = config.clone();
    debug!(path = %sensor.path().display(), column = next.sensors.len(), "Adding sensor column");
    next.sensors.push(sensor);

    for level in &mut next.levels {
        let seed = level.upper_limit.first().copied().unwrap_or(0);
        level.upper_limit.push(seed);
        if let Some(lower) = level.lower_limit.as_mut() {
            let seed = lower.first().copied().unwrap_or(0);
            lower.push(seed);
        }
    }
    Ok(next)
}

/// Remove the sensor at `path` and its column from every level
pub fn remove_sensor_column(config: &Config, path: &Path) -> Result<Config> {
    if config.sensors.len() <= 1 {
        return Err(TfconfError::LastSensor);
    }
    let index = config
        .sensor_index(path)
        .ok_or_else(|| TfconfError::SensorNotFound(path.display().to_string()))?;

    let mut next = config.clone();
    debug!(path = %path.display(), column = index, "Removing sensor column");
    next.sensors.remove(index);

    for level in &mut next.levels {
        if index < level.upper_limit.len() {
            level.upper_limit.remove(index);
        }
        if let Some(lower) = level.lower_limit.as_mut() {
            if index < lower.len() {
                lower.remove(index);
            }
        }
    }
    Ok(next)
}

/// Swap the sensor at `old` for `sensor`, keeping its column and thresholds
pub fn replace_sensor(config: &Config, old: &Path, sensor: Sensor) -> Result<Config> {
    let index = config
        .sensor_index(old)
        .ok_or_else(|| TfconfError::SensorNotFound(old.display().to_string()))?;
    if sensor.path() != old && config.has_sensor(sensor.path()) {
        return Err(TfconfError::DuplicateSensor(sensor.path().display().to_string()));
    }

    let mut next = config.clone();
    next.sensors[index] = sensor;
    Ok(next)
}

/// Set one boundary and mirror it into the adjacent level.
///
/// An upper edit must stay between the level's own lower bound and the next
/// level's upper bound and is copied into the next level's lower bound. A
/// lower edit must stay between the previous level's lower bound and the
/// level's own upper bound and is copied into the previous level's upper
/// bound.
///
/// The neighbour checks are stricter than ordering the edited band alone:
/// a value that is valid for its own level is still rejected with
/// [`TfconfError::BoundaryOrder`] when mirroring it would leave the adjacent
/// band with its lower bound above its upper bound.
pub fn edit_boundary(config: &Config, level: usize, column: usize, bound: Bound, value: i32) -> Result<Config> {
    if value < 0 {
        return Err(TfconfError::InvalidTemperature { value });
    }
    check_level(config, level)?;
    check_column(config, column)?;

    let current = &config.levels[level];
    let mut next = config.clone();

    match bound {
        Bound::Upper => {
            if let Some(lower) = current.lower(column) {
                if value < lower {
                    return Err(TfconfError::boundary(
                        level,
                        column,
                        value,
                        format!("below this level's lower limit {}", lower),
                    ));
                }
            }
            if let Some(ceiling) = config.levels.get(level + 1).and_then(|l| l.upper(column)) {
                if value > ceiling {
                    return Err(TfconfError::boundary(
                        level,
                        column,
                        value,
                        format!("above the next level's upper limit {}", ceiling),
                    ));
                }
            }

            *upper_slot(&mut next.levels[level], level, column)? = value;
            if let Some(following) = next.levels.get_mut(level + 1) {
                if let Some(slot) = following.lower_limit.as_mut().and_then(|l| l.get_mut(column)) {
                    *slot = value;
                }
            }
        }
        Bound::Lower => {
            if !current.has_lower_limit() {
                return Err(TfconfError::MissingLowerLimit(level));
            }
            if let Some(upper) = current.upper(column) {
                if value > upper {
                    return Err(TfconfError::boundary(
                        level,
                        column,
                        value,
                        format!("above this level's upper limit {}", upper),
                    ));
                }
            }
            if let Some(floor) = level.checked_sub(1).and_then(|i| config.levels[i].lower(column)) {
                if value < floor {
                    return Err(TfconfError::boundary(
                        level,
                        column,
                        value,
                        format!("below the previous level's lower limit {}", floor),
                    ));
                }
            }

            let slot = next.levels[level]
                .lower_limit
                .as_mut()
                .and_then(|l| l.get_mut(column))
                .ok_or(TfconfError::MissingLowerLimit(level))?;
            *slot = value;
            if let Some(previous) = level.checked_sub(1) {
                if let Some(slot) = next.levels[previous].upper_limit.get_mut(column) {
                    *slot = value;
                }
            }
        }
    }

    debug!(level, column, ?bound, value, "Boundary updated");
    Ok(next)
}

/// Set a level's fan speed. Speeds are not required to ascend.
pub fn edit_speed(config: &Config, level: usize, speed: u32) -> Result<Config> {
    check_level(config, level)?;
    let mut next = config.clone();
    next.levels[level].speed = speed;
    Ok(next)
}

/// Give a level one speed and the same `low`..`high` band for every sensor.
///
/// Each bound goes through [`edit_boundary`], so neighbours are updated and
/// ordering is checked the same way. `low` is ignored on the lowest level.
pub fn set_level(config: &Config, level: usize, speed: u32, low: i32, high: i32) -> Result<Config> {
    check_level(config, level)?;
    let has_lower = config.levels[level].has_lower_limit();
    if has_lower && low > high {
        return Err(TfconfError::boundary(level, 0, low, format!("above the requested upper limit {}", high)));
    }

    let mut next = edit_speed(config, level, speed)?;
    for column in 0..next.sensors.len() {
        if !has_lower {
            next = edit_boundary(&next, level, column, Bound::Upper, high)?;
            continue;
        }
        // Move whichever side keeps the band valid in between
        let current_upper = next.levels[level].upper(column).unwrap_or(high);
        if low <= current_upper {
            next = edit_boundary(&next, level, column, Bound::Lower, low)?;
            next = edit_boundary(&next, level, column, Bound::Upper, high)?;
        } else {
            next = edit_boundary(&next, level, column, Bound::Upper, high)?;
            next = edit_boundary(&next, level, column, Bound::Lower, low)?;
        }
    }
    Ok(next)
}

/// Replace the whole level table, then fit it to the sensor count
pub fn replace_levels(config: &Config, levels: Vec<Level>) -> Config {
    let mut next = config.clone();
    next.levels = levels;
    adjust_column_widths(&next)
}

/// Make every level's arrays exactly one entry per sensor.
///
/// Short arrays are padded with their lowest value (0 when empty), long ones
/// truncated. An empty lower array becomes "no lower limit".
pub fn adjust_column_widths(config: &Config) -> Config {
    let columns = config.sensors.len();
    let mut next = config.clone();

    for level in &mut next.levels {
        fit_width(&mut level.upper_limit, columns);
        level.lower_limit = match level.lower_limit.take() {
            Some(mut lower) if !lower.is_empty() => {
                fit_width(&mut lower, columns);
                (!lower.is_empty()).then_some(lower)
            }
            _ => None,
        };
    }
    next
}

/// Human-readable problems with a level table; empty when it is sound.
pub fn diagnose(config: &Config) -> Vec<String> {
    let columns = config.sensors.len();
    let mut problems = Vec::new();

    if config.sensors.is_empty() {
        problems.push("no sensors configured".to_string());
    }
    if config.levels.is_empty() {
        problems.push("no levels configured".to_string());
    }

    for (i, level) in config.levels.iter().enumerate() {
        if level.upper_limit.len() != columns {
            problems.push(format!(
                "level {} has {} upper limits for {} sensors",
                i,
                level.upper_limit.len(),
                columns
            ));
        }
        match &level.lower_limit {
            Some(lower) if lower.len() != columns => problems.push(format!(
                "level {} has {} lower limits for {} sensors",
                i,
                lower.len(),
                columns
            )),
            None if i > 0 => problems.push(format!("level {} has no lower limits", i)),
            _ => {}
        }
        for column in 0..columns {
            if let (Some(lower), Some(upper)) = (level.lower(column), level.upper(column)) {
                if lower > upper {
                    problems.push(format!(
                        "level {} sensor {}: lower limit {} above upper limit {}",
                        i, column, lower, upper
                    ));
                }
            }
        }
    }

    for (i, pair) in config.levels.windows(2).enumerate() {
        for column in 0..columns {
            if let (Some(upper), Some(lower)) = (pair[0].upper(column), pair[1].lower(column)) {
                if upper != lower {
                    problems.push(format!(
                        "sensor {}: level {} ends at {} but level {} starts at {}",
                        column,
                        i,
                        upper,
                        i + 1,
                        lower
                    ));
                }
            }
        }
    }
    problems
}

fn fit_width(values: &mut Vec<i32>, columns: usize) {
    let fill = values.iter().min().copied().unwrap_or(0);
    values.resize(columns, fill);
}

fn check_level(config: &Config, level: usize) -> Result<()> {
    if level >= config.levels.len() {
        return Err(TfconfError::LevelOutOfRange { index: level, len: config.levels.len() });
    }
    Ok(())
}

fn check_column(config: &Config, column: usize) -> Result<()> {
    if column >= config.sensors.len() {
        return Err(TfconfError::ColumnOutOfRange { column, len: config.sensors.len() });
    }
    Ok(())
}

fn upper_slot(level: &mut Level, index: usize, column: usize) -> Result<&mut i32> {
    let len = level.upper_limit.len();
    level.upper_limit.get_mut(column).ok_or_else(|| {
        debug!(level = index, column, len, "Upper limit array narrower than sensor list");
        TfconfError::ColumnOutOfRange { column, len }
    })
}
