use std::path::Path;

use crate::cmd;
use crate::error::{ReleaseError, ReleaseResult};

/// Reload nginx without dropping connections. Used during the
/// certificate bootstrap window, where a serving gap would break the
/// in-flight HTTP challenge.
pub fn reload_nginx() -> ReleaseResult<()> {
    systemctl(&["reload", "nginx"])
}

/// Full nginx restart, reserved for the post-activation pickup of the
/// new revision.
pub fn restart_nginx() -> ReleaseResult<()> {
    systemctl(&["restart", "nginx"])
}

pub fn daemon_reload() -> ReleaseResult<()> {
    systemctl(&["daemon-reload"])
}

/// Enable and (re)start the per-app unit.
pub fn start_app(name: &str) -> ReleaseResult<()> {
    let unit = unit_name(name);
    systemctl(&["enable", &unit])?;
    systemctl(&["restart", &unit])
}

/// Stop and disable the per-app unit.
pub fn stop_app(name: &str) -> ReleaseResult<()> {
    let unit = unit_name(name);
    systemctl(&["stop", &unit])?;
    systemctl(&["disable", &unit])
}

/// Instantiated unit name for an app.
#[must_use]
pub fn unit_name(name: &str) -> String {
    format!("app@{name}")
}

fn systemctl(args: &[&str]) -> ReleaseResult<()> {
    cmd::run_interactive("systemctl", args)
        .map_err(|_| ReleaseError::ServiceControlFailed(format!("systemctl {}", args.join(" "))))
}

/// Write the basic-auth credentials file into the app's data
/// directory.
pub fn write_htpasswd(data_dir: &Path, basicauth: &str) -> ReleaseResult<()> {
    let Some((user, password)) = basicauth.split_once(':') else {
        return Err(ReleaseError::ConfigInvalid(
            "basicauth must be \"user:pass\"".into(),
        ));
    };

    let file = data_dir.join(".htpasswd");
    let file = file.to_string_lossy();
    cmd::run("htpasswd", &["-b", "-c", &file, user, password])?;
    Ok(())
}
