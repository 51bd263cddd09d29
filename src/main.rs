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

use clap::Parser;

use tfconf::cli::{self, Cli};
use tfconf::{logger, TfconfError};

fn main() {
    let cli = Cli::parse();
    logger::init_logging(cli.verbose);

    if let Err(err) = cli::run_cli(&cli) {
        eprintln!("error: {:#}", err);
        if let Some(TfconfError::Apply(failure)) = err.downcast_ref::<TfconfError>() {
            if failure.is_retryable() {
                eprintln!("hint: the authentication prompt was not completed; run the command again to retry");
            } else {
                eprintln!("hint: run `tfconf show` to see which configuration is active now");
            }
        }
        std::process::exit(1);
    }
}
