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

//! Periodic temperature polling of the configured sensors.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tf_error::TfconfError;
use tracing::{debug, trace};

use crate::constants::monitor;
use crate::hwmon;

/// Recent readings of one sensor, oldest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorHistory {
    pub path: PathBuf,
    pub readings: VecDeque<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SensorHistory {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            readings: VecDeque::new(),
            last_error: None,
        }
    }

    pub fn latest(&self) -> Option<f64> {
        self.readings.back().copied()
    }
}

pub struct TemperatureMonitor {
    interval: Duration,
    history_len: usize,
    state: Mutex<Vec<SensorHistory>>,
    running: AtomicBool,
}

impl TemperatureMonitor {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self::with_timing(paths, Duration::from_millis(monitor::POLL_INTERVAL_MS), monitor::HISTORY_LEN)
    }

    pub fn with_timing(paths: Vec<PathBuf>, interval: Duration, history_len: usize) -> Self {
        Self {
            interval,
            history_len: history_len.max(1),
            state: Mutex::new(paths.into_iter().map(SensorHistory::new).collect()),
            running: AtomicBool::new(false),
        }
    }

    /// Read every sensor once, in parallel, and record the results.
    /// A failing sensor keeps its previous readings and gets `last_error` set.
    pub fn poll_once(&self) {
        let paths: Vec<PathBuf> = self.state.lock().iter().map(|h| h.path.clone()).collect();

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| scope.spawn(move || hwmon::read_one(path)))
                .collect();
            handles
                .into_iter()
                .zip(&paths)
                .map(|(handle, path)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(TfconfError::sensor_unavailable(path, "reader thread panicked")))
                })
                .collect()
        });

        let mut state = self.state.lock();
        for (history, result) in state.iter_mut().zip(results) {
            match result {
                Ok(celsius) => {
                    history.readings.push_back(celsius);
                    while history.readings.len() > self.history_len {
                        history.readings.pop_front();
                    }
                    history.last_error = None;
                }
                Err(e) => {
                    trace!(path = %history.path.display(), error = %e, "Sensor read failed");
                    history.last_error = Some(e.to_string());
                }
            }
        }
    }

    /// Poll until [`stop`](Self::stop) is called or `max_cycles` polls have
    /// run. `on_cycle` sees the histories after each poll.
    pub fn run<F>(&self, max_cycles: Option<u64>, mut on_cycle: F)
    where
        F: FnMut(&[SensorHistory]),
    {
        self.running.store(true, Ordering::SeqCst);
        let mut cycles = 0u64;
        debug!(interval = ?self.interval, "Temperature monitor started");

        while self.running.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.poll_once();
            cycles += 1;
            on_cycle(&self.snapshot());

            if max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }
            // Sleep in short slices so stop() takes effect promptly
            while self.running.load(Ordering::SeqCst) && started.elapsed() < self.interval {
                thread::sleep(Duration::from_millis(50).min(self.interval));
            }
        }

        self.running.store(false, Ordering::SeqCst);
        debug!(cycles, "Temperature monitor stopped");
    }

    /// Ask a running [`run`](Self::run) loop to end after the current cycle
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<SensorHistory> {
        self.state.lock().clone()
    }
}
