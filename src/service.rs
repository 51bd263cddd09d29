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

//! Installing a configuration file as root and restarting thinkfan.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use tf_error::{ApplyFailure, Result};
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use crate::constants::apply;

/// Replaces `target` with `scratch` and restarts the daemon.
///
/// Partial success (file installed, restart failed) is an error.
#[cfg_attr(test, mockall::automock)]
pub trait PrivilegedApplier: Send + Sync {
    fn apply(&self, scratch: &Path, target: &Path) -> Result<()>;
}

// $1 scratch file, $2 target, $3 service unit (empty: no restart).
// The copy lands next to the target so the final mv is a same-filesystem
// rename.
const APPLY_SCRIPT: &str = r#"set -u
src="$1"
dst="$2"
unit="$3"
tmp="$dst.tfconf-new"
install -m 0644 "$src" "$tmp" || exit 10
mv -f "$tmp" "$dst" || { rm -f "$tmp"; exit 10; }
if [ -n "$unit" ]; then
    systemctl restart "$unit" || exit 11
fi
"#;

/// Runs the install script through `pkexec`, or directly when already root.
#[derive(Debug, Clone)]
pub struct PkexecApplier {
    elevate: Vec<String>,
    service: String,
    timeout: Duration,
    direct: bool,
}

impl Default for PkexecApplier {
    fn default() -> Self {
        Self::new(
            vec![apply::ELEVATE_COMMAND.to_string()],
            apply::SERVICE_NAME,
            Duration::from_secs(apply::TIMEOUT_SECS),
        )
    }
}

impl PkexecApplier {
    /// `elevate` is the helper program and its leading arguments. An empty
    /// helper runs the script directly, as does running as root.
    pub fn new(elevate: Vec<String>, service: impl Into<String>, timeout: Duration) -> Self {
        let direct = elevate.is_empty() || is_root();
        Self {
            elevate,
            service: service.into(),
            timeout,
            direct,
        }
    }

    pub fn with_direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = match self.elevate.split_first() {
            Some((program, args)) if !self.direct => {
                let mut cmd = Command::new(program);
                cmd.args(args).arg("sh");
                cmd
            }
            _ => Command::new("sh"),
        };
        cmd.arg("-c").arg(APPLY_SCRIPT).arg("sh");
        cmd
    }

    fn program(&self) -> &str {
        match self.elevate.first() {
            Some(program) if !self.direct => program,
            _ => "sh",
        }
    }

    fn classify(&self, code: Option<i32>, stderr: String) -> ApplyFailure {
        match code {
            Some(apply::EXIT_DECLINED) if !self.direct => ApplyFailure::Declined,
            Some(apply::EXIT_NOT_AUTHORIZED) if !self.direct => ApplyFailure::NotAuthorized,
            Some(apply::EXIT_INSTALL_FAILED) => ApplyFailure::InstallFailed(stderr),
            Some(apply::EXIT_RESTART_FAILED) => ApplyFailure::RestartFailed(stderr),
            code => ApplyFailure::Failed { code, stderr },
        }
    }
}

impl PrivilegedApplier for PkexecApplier {
    fn apply(&self, scratch: &Path, target: &Path) -> Result<()> {
        info!(target = %target.display(), service = %self.service, direct = self.direct, "Applying configuration");

        let mut child = self
            .command()
            .arg(scratch)
            .arg(target)
            .arg(&self.service)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ApplyFailure::Spawn {
                program: self.program().to_string(),
                reason: e.to_string(),
            })?;

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                warn!(timeout = ?self.timeout, "Elevation helper did not finish, killing it");
                let _ = child.kill();
                let _ = child.wait();
                return Err(ApplyFailure::TimedOut(self.timeout).into());
            }
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
            .trim()
            .to_string();

        if status.success() {
            debug!(target = %target.display(), "Configuration installed");
            return Ok(());
        }
        let failure = self.classify(status.code(), stderr);
        warn!(error = %failure, "Apply failed");
        Err(failure.into())
    }
}

/// Check if running as root
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}
