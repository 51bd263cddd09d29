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

//! Command Line Interface
//!
//! Thin front end over the configuration engine: every command loads the
//! settings, calls one engine operation and prints the result.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::catalog::{self, CatalogEntry};
use crate::codec;
use crate::config;
use crate::hwmon;
use crate::levels::{self, Bound};
use crate::model::{Config, ConfigFormat, Sensor};
use crate::monitor::SensorHistory;
use crate::settings::{self, Settings};

#[derive(Debug, Parser)]
#[command(name = "tfconf")]
#[command(version)]
#[command(about = "tfconf - thinkfan configuration editor")]
#[command(long_about = "tfconf - thinkfan configuration editor

Edits the sensors and speed levels of the thinkfan fan-control daemon,
installs the result with pkexec and restarts the daemon.

EXAMPLES:
    tfconf show                          Show the active configuration
    tfconf sensors                       List selectable sensors, CPU first
    tfconf add-sensor /sys/class/hwmon/hwmon4/temp1_input
    tfconf set-boundary 2 0 upper 72     Level 2, sensor 0, upper limit 72°C
    tfconf set-level 3 5 60 75           Level 3: speed 5, 60..75°C on every sensor
    tfconf export --legacy               Print the configuration in thinkfan.conf syntax
    tfconf watch --cycles 10             Poll the configured sensors ten times

ENVIRONMENT VARIABLES:
    TFCONF_LOG=debug         Log filter (tracing directive syntax)
    TFCONF_SETTINGS=<file>   Settings file to use

FILES:
    /etc/thinkfan.yaml                   Structured thinkfan configuration
    /etc/thinkfan.conf                   Legacy thinkfan configuration
    ~/.config/tfconf/settings.json       tfconf settings")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file (default: ~/.config/tfconf/settings.json)
    #[arg(long, global = true, env = "TFCONF_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log debug messages to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the active thinkfan configuration
    Show,

    /// List selectable temperature sensors, best candidates first
    Sensors,

    /// Read the current temperature of one sensor
    Read { path: PathBuf },

    /// Add a sensor; its limits start as a copy of the first sensor's
    AddSensor {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = SensorKind::Hwmon)]
        kind: SensorKind,
    },

    /// Remove a sensor and its limits
    RemoveSensor { path: PathBuf },

    /// Swap a sensor for another, keeping its limits
    ReplaceSensor {
        old: PathBuf,
        new: PathBuf,
        #[arg(long, value_enum, default_value_t = SensorKind::Hwmon)]
        kind: SensorKind,
    },

    /// Set one limit of one level; the adjacent level follows
    #[command(allow_negative_numbers = true)]
    SetBoundary {
        level: usize,
        sensor: usize,
        #[arg(value_enum)]
        bound: BoundArg,
        value: i32,
    },

    /// Set the fan speed of one level
    SetSpeed { level: usize, speed: u32 },

    /// Set a level's speed and the same limits for every sensor
    #[command(allow_negative_numbers = true)]
    SetLevel { level: usize, speed: u32, low: i32, high: i32 },

    /// Validate a configuration file and install it
    Apply {
        file: PathBuf,
        /// Install as /etc/thinkfan.conf in legacy syntax
        #[arg(long)]
        legacy: bool,
    },

    /// Print the active configuration
    Export {
        /// Use the legacy thinkfan.conf syntax
        #[arg(long)]
        legacy: bool,
    },

    /// Check a configuration file without installing it
    Check { file: PathBuf },

    /// Poll the configured sensors
    Watch {
        /// Stop after this many polls
        #[arg(long)]
        cycles: Option<u64>,
    },

    /// Show the effective settings
    Settings {
        /// Write them to the settings file
        #[arg(long)]
        write: bool,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum SensorKind {
    Hwmon,
    Tpacpi,
}

impl SensorKind {
    fn sensor(self, path: &Path) -> Sensor {
        match self {
            SensorKind::Hwmon => Sensor::hwmon(path),
            SensorKind::Tpacpi => Sensor::tpacpi(path),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum BoundArg {
    Lower,
    Upper,
}

impl From<BoundArg> for Bound {
    fn from(arg: BoundArg) -> Self {
        match arg {
            BoundArg::Lower => Bound::Lower,
            BoundArg::Upper => Bound::Upper,
        }
    }
}

pub fn run_cli(cli: &Cli) -> Result<()> {
    let settings = settings::load_settings(cli.settings.as_deref()).context("loading settings")?;
    let out = Output { json: cli.json };

    match &cli.command {
        Commands::Show => cmd_show(&settings, out),
        Commands::Sensors => cmd_sensors(&settings, out),
        Commands::Read { path } => cmd_read(path, out),
        Commands::AddSensor { path, kind } => {
            let config = settings.reconciler().add_sensor(kind.sensor(path))?;
            out.config(&config, None)
        }
        Commands::RemoveSensor { path } => {
            let config = settings.reconciler().remove_sensor(path)?;
            out.config(&config, None)
        }
        Commands::ReplaceSensor { old, new, kind } => {
            let config = settings.reconciler().replace_sensor(old, kind.sensor(new))?;
            out.config(&config, None)
        }
        Commands::SetBoundary { level, sensor, bound, value } => {
            let config = settings.reconciler().edit_boundary(*level, *sensor, (*bound).into(), *value)?;
            out.config(&config, None)
        }
        Commands::SetSpeed { level, speed } => {
            let config = settings.reconciler().edit_speed(*level, *speed)?;
            out.config(&config, None)
        }
        Commands::SetLevel { level, speed, low, high } => {
            let config = settings.reconciler().set_level(*level, *speed, *low, *high)?;
            out.config(&config, None)
        }
        Commands::Apply { file, legacy } => cmd_apply(&settings, file, *legacy, out),
        Commands::Export { legacy } => cmd_export(&settings, *legacy),
        Commands::Check { file } => cmd_check(file, out),
        Commands::Watch { cycles } => cmd_watch(&settings, *cycles, out),
        Commands::Settings { write } => cmd_settings(&settings, cli.settings.as_deref(), *write),
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn config(&self, config: &Config, entries: Option<&[CatalogEntry]>) -> Result<()> {
        let config = match entries {
            Some(entries) => catalog::name_sensors(config, entries),
            None => config.clone(),
        };
        if self.json {
            return self.print_json(&config);
        }
        print!("{}", render_config(&config));
        Ok(())
    }
}

/// Plain-text rendering of a configuration
pub fn render_config(config: &Config) -> String {
    let mut out = String::new();
    out.push_str(&format!("Format: {}\n\n", config.source_format));

    out.push_str(&format!("Sensors ({}):\n", config.sensors.len()));
    for (i, sensor) in config.sensors.iter().enumerate() {
        let name = sensor.display_name.as_deref().unwrap_or("");
        out.push_str(&format!(
            "  [{}] {} {} {}\n",
            i,
            sensor.identifier.structured_key(),
            sensor.path().display(),
            name
        ));
    }

    out.push_str(&format!("\nFans ({}):\n", config.fans.len()));
    for fan in &config.fans {
        out.push_str(&format!("  {} {}\n", fan.kind.structured_key(), fan.path.display()));
    }

    out.push_str(&format!("\nLevels ({}):\n", config.levels.len()));
    for (i, level) in config.levels.iter().enumerate() {
        let bands: Vec<String> = (0..config.sensors.len())
            .map(|c| {
                let lower = level.lower(c).map(|v| v.to_string()).unwrap_or_else(|| "-".into());
                let upper = level.upper(c).map(|v| v.to_string()).unwrap_or_else(|| "?".into());
                format!("{}..{}", lower, upper)
            })
            .collect();
        out.push_str(&format!("  [{}] speed {:<3} {}\n", i, level.speed, bands.join("  ")));
    }
    out
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_show(settings: &Settings, out: Output) -> Result<()> {
    let config = settings.reconciler().read_config()?;
    let entries = settings.catalog().discover();
    out.config(&config, Some(entries.as_slice()))
}

fn cmd_sensors(settings: &Settings, out: Output) -> Result<()> {
    let entries = settings.catalog().discover();
    if out.json {
        return out.print_json(&entries);
    }
    if entries.is_empty() {
        println!("No temperature sensors found");
        return Ok(());
    }
    println!("Temperature Sensors ({}):", entries.len());
    for entry in &entries {
        println!("  {:<36} {:>6.1}°C  {}", entry.name, entry.current, entry.path.display());
    }
    Ok(())
}

fn cmd_read(path: &Path, out: Output) -> Result<()> {
    let celsius = hwmon::read_one(path)?;
    if out.json {
        return out.print_json(&serde_json::json!({ "path": path, "temp": celsius }));
    }
    println!("{:.1}°C", celsius);
    Ok(())
}

fn cmd_apply(settings: &Settings, file: &Path, legacy: bool, out: Output) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let format = if legacy { ConfigFormat::Legacy } else { ConfigFormat::Structured };
    let config = settings.reconciler().apply_config(&text, format)?;
    out.config(&config, None)
}

fn cmd_export(settings: &Settings, legacy: bool) -> Result<()> {
    let config = settings.reconciler().read_config()?;
    let format = if legacy { ConfigFormat::Legacy } else { ConfigFormat::Structured };
    print!("{}", codec::render(&config, format)?);
    Ok(())
}

fn cmd_check(file: &Path, out: Output) -> Result<()> {
    let config = config::read_file(file)?;
    let problems = levels::diagnose(&config);

    if out.json {
        out.print_json(&serde_json::json!({ "config": config, "problems": problems }))?;
    } else {
        println!(
            "{}: {} syntax, {} sensors, {} fans, {} levels",
            file.display(),
            config.source_format,
            config.sensors.len(),
            config.fans.len(),
            config.levels.len()
        );
        for problem in &problems {
            println!("  problem: {}", problem);
        }
    }

    if !problems.is_empty() {
        bail!("{} problem(s) found in {}", problems.len(), file.display());
    }
    Ok(())
}

fn cmd_watch(settings: &Settings, cycles: Option<u64>, out: Output) -> Result<()> {
    let config = settings.reconciler().read_config()?;
    let paths: Vec<PathBuf> = config.sensors.iter().map(|s| s.path().to_path_buf()).collect();
    if paths.is_empty() {
        return Err(anyhow!("no sensors configured"));
    }

    let monitor = settings.monitor(paths);
    let mut print_error = None;
    monitor.run(cycles, |histories| {
        if let Err(e) = print_cycle(histories, out) {
            print_error = Some(e);
            monitor.stop();
        }
    });
    match print_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_cycle(histories: &[SensorHistory], out: Output) -> Result<()> {
    if out.json {
        println!("{}", serde_json::to_string(histories)?);
        return Ok(());
    }
    let line: Vec<String> = histories
        .iter()
        .map(|h| match (&h.last_error, h.latest()) {
            (Some(_), _) | (None, None) => "n/a".to_string(),
            (None, Some(celsius)) => format!("{:.1}°C", celsius),
        })
        .collect();
    println!("{}", line.join("  "));
    Ok(())
}

fn cmd_settings(settings: &Settings, explicit: Option<&Path>, write: bool) -> Result<()> {
    if write {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(settings::default_settings_path)
            .ok_or_else(|| anyhow!("could not determine the settings location"))?;
        settings::save_settings(settings, &path)?;
        eprintln!("Wrote settings to {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}
