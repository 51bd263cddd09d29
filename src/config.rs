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

//! Reading, changing and applying the thinkfan configuration.
//!
//! Every change follows the same pipeline: read the file from disk, apply an
//! in-memory edit, normalize the level table, write it to a scratch file and
//! hand that to the [`PrivilegedApplier`], then read the installed file back.
//! Nothing is cached between calls.
//!
//! Two processes editing at once are not coordinated; the last apply wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tf_error::{Result, TfconfError};
use tracing::{debug, info, warn};

use crate::codec;
use crate::constants::paths;
use crate::levels::{self, Bound};
use crate::model::{Config, ConfigFormat, Level, Sensor};
use crate::service::PrivilegedApplier;

pub struct ConfigReconciler {
    structured_path: PathBuf,
    legacy_path: PathBuf,
    applier: Box<dyn PrivilegedApplier>,
}

impl ConfigReconciler {
    pub fn new(
        structured_path: impl Into<PathBuf>,
        legacy_path: impl Into<PathBuf>,
        applier: Box<dyn PrivilegedApplier>,
    ) -> Self {
        Self {
            structured_path: structured_path.into(),
            legacy_path: legacy_path.into(),
            applier,
        }
    }

    /// Reconciler for `/etc/thinkfan.yaml` and `/etc/thinkfan.conf`
    pub fn system(applier: Box<dyn PrivilegedApplier>) -> Self {
        Self::new(paths::STRUCTURED_CONFIG, paths::LEGACY_CONFIG, applier)
    }

    /// File a configuration in `format` is written to
    pub fn path_for(&self, format: ConfigFormat) -> &Path {
        match format {
            ConfigFormat::Structured => &self.structured_path,
            ConfigFormat::Legacy => &self.legacy_path,
        }
    }

    /// The configuration file currently in use, structured path first
    pub fn existing_path(&self) -> Option<&Path> {
        [self.structured_path.as_path(), self.legacy_path.as_path()]
            .into_iter()
            .find(|p| p.exists())
    }

    /// Load the active configuration.
    ///
    /// When neither file exists, the default configuration is installed
    /// through the applier and returned.
    pub fn read_config(&self) -> Result<Config> {
        if let Some(path) = self.existing_path() {
            debug!(path = %path.display(), "Reading thinkfan configuration");
            return read_file(path);
        }

        info!(
            structured = %self.structured_path.display(),
            legacy = %self.legacy_path.display(),
            "No thinkfan configuration found, installing defaults"
        );
        let defaults = Config::default_config();
        self.apply_config(&codec::serialize(&defaults), ConfigFormat::Structured)
    }

    /// Validate `text`, install it in `format` and restart the daemon.
    ///
    /// Returns the configuration as read back from the installed file. The
    /// scratch file is removed whatever the outcome.
    pub fn apply_config(&self, text: &str, format: ConfigFormat) -> Result<Config> {
        let parsed = codec::parse(text)?;
        let normalized = levels::adjust_column_widths(&parsed);
        let rendered = codec::render(&normalized, format)?;
        let target = self.path_for(format);

        let mut scratch = tempfile::Builder::new()
            .prefix("tfconf-")
            .suffix(scratch_suffix(format))
            .tempfile()
            .map_err(|e| TfconfError::FileWrite {
                path: std::env::temp_dir(),
                source: e,
            })?;
        scratch
            .write_all(rendered.as_bytes())
            .and_then(|_| scratch.as_file().sync_all())
            .map_err(|e| TfconfError::FileWrite {
                path: scratch.path().to_path_buf(),
                source: e,
            })?;

        let scratch_path = scratch.path().to_path_buf();
        debug!(scratch = %scratch_path.display(), target = %target.display(), %format, "Scratch file written");
        let applied = self.applier.apply(&scratch_path, target);

        if let Err(e) = scratch.close() {
            warn!(path = %scratch_path.display(), error = %e, "Could not remove scratch file");
        }
        applied?;

        info!(target = %target.display(), %format, "Configuration applied");
        read_file(target)
    }

    /// Install an edited configuration in the grammar it should be kept in
    pub fn commit(&self, config: &Config) -> Result<Config> {
        let format = codec::target_format(config);
        if format != config.source_format {
            info!(from = %config.source_format, to = %format, "Migrating configuration format");
        }
        let text = codec::render(config, format)?;
        self.apply_config(&text, format)
    }

    /// Read, edit with `op`, commit. A rejected edit writes nothing.
    pub fn mutate<F>(&self, op: F) -> Result<Config>
    where
        F: FnOnce(&Config) -> Result<Config>,
    {
        let current = self.read_config()?;
        let next = op(&current)?;
        self.commit(&next)
    }

    pub fn add_sensor(&self, sensor: Sensor) -> Result<Config> {
        self.mutate(|c| levels::add_sensor_column(c, sensor))
    }

    pub fn remove_sensor(&self, path: &Path) -> Result<Config> {
        self.mutate(|c| levels::remove_sensor_column(c, path))
    }

    pub fn replace_sensor(&self, old: &Path, sensor: Sensor) -> Result<Config> {
        self.mutate(|c| levels::replace_sensor(c, old, sensor))
    }

    pub fn edit_boundary(&self, level: usize, column: usize, bound: Bound, value: i32) -> Result<Config> {
        self.mutate(|c| levels::edit_boundary(c, level, column, bound, value))
    }

    pub fn edit_speed(&self, level: usize, speed: u32) -> Result<Config> {
        self.mutate(|c| levels::edit_speed(c, level, speed))
    }

    pub fn set_level(&self, level: usize, speed: u32, low: i32, high: i32) -> Result<Config> {
        self.mutate(|c| levels::set_level(c, level, speed, low, high))
    }

    pub fn replace_levels(&self, table: Vec<Level>) -> Result<Config> {
        self.mutate(|c| Ok(levels::replace_levels(c, table)))
    }
}

/// Parse a configuration file in either grammar
pub fn read_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .map_err(|e| TfconfError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
    codec::parse(&content)
}

fn scratch_suffix(format: ConfigFormat) -> &'static str {
    match format {
        ConfigFormat::Structured => ".yaml",
        ConfigFormat::Legacy => ".conf",
    }
}
