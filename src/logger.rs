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

use std::env;
use std::io;

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "TFCONF_LOG";

/// Filter directive: `TFCONF_LOG` if set, else `debug` when verbose, else `warn`
pub fn log_filter(verbose: bool) -> String {
    match env::var(LOG_ENV) {
        Ok(filter) if !filter.trim().is_empty() => filter,
        _ if verbose => "debug".to_string(),
        _ => "warn".to_string(),
    }
}

/// Install the stderr subscriber. Calling it twice is harmless.
pub fn init_logging(verbose: bool) {
    let filter = log_filter(verbose);
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter.as_str())
        .with_writer(io::stderr)
        .try_init();
}
