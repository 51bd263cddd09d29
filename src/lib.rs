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

//! tfconf - configuration editor for the thinkfan fan-control daemon
//!
//! This library reads and writes thinkfan configuration files in both
//! grammars, discovers and names temperature sensors, keeps the multi-sensor
//! level table consistent, and installs edited configurations through a
//! privilege-elevation helper.

pub mod catalog;
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod hwmon;
pub mod identity;
pub mod levels;
pub mod logger;
pub mod model;
pub mod monitor;
pub mod report;
pub mod service;
pub mod settings;

pub use tf_error::{ApplyFailure, Result, TfconfError};

#[cfg(test)]
pub mod test_utils;
