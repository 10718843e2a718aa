//! Daily systemd user timer that re-runs this binary with `--service`.
//!
//! The scheduler is the source of truth: state is always queried live with
//! `systemctl --user is-enabled`, never cached.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::desktop::exec_path;
use crate::errors::{AppError, CommandError};
use crate::runner::{CommandRunner, CommandSpec};

pub const SERVICE_UNIT: &str = "sysdupd.service";
pub const TIMER_UNIT: &str = "sysdupd.timer";
const ENABLED: &str = "enabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Installed,
    NotInstalled,
}

impl ServiceState {
    /// Label for the control that toggles this state.
    pub fn action_label(self) -> &'static str {
        match self {
            ServiceState::Installed => "Remove",
            ServiceState::NotInstalled => "Install",
        }
    }
}

pub struct TriggerManager {
    unit_dir: PathBuf,
    executable: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl TriggerManager {
    pub fn new(
        unit_dir: impl Into<PathBuf>,
        executable: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            unit_dir: unit_dir.into(),
            executable: executable.into(),
            runner,
        }
    }

    pub fn status(&self) -> ServiceState {
        let output = self.runner.run(&systemctl(["is-enabled", TIMER_UNIT]));
        if output.stdout.trim() == ENABLED {
            ServiceState::Installed
        } else {
            ServiceState::NotInstalled
        }
    }

    /// Writes both units, reloads systemd and enables the timer right away.
    /// Safe to repeat: the files are overwritten and enabling is idempotent.
    /// A failed reload is only logged; a failed enable is returned.
    pub fn install(&self) -> Result<ServiceState, AppError> {
        fs::create_dir_all(&self.unit_dir)?;
        fs::write(self.unit_dir.join(SERVICE_UNIT), service_unit(&self.executable))?;
        fs::write(self.unit_dir.join(TIMER_UNIT), timer_unit())?;
        info!(
            "Wrote {} and {} to {}",
            SERVICE_UNIT,
            TIMER_UNIT,
            self.unit_dir.display()
        );

        if let Err(e) = self.run_systemctl(["daemon-reload"]) {
            warn!("{}", e);
        }
        self.run_systemctl(["enable", "--now", TIMER_UNIT])?;
        Ok(self.status())
    }

    /// Disables and stops the timer. Unit files stay on disk.
    pub fn remove(&self) -> ServiceState {
        if let Err(e) = self.run_systemctl(["disable", "--now", TIMER_UNIT]) {
            warn!("{}", e);
        }
        self.status()
    }

    pub fn toggle(&self) -> Result<ServiceState, AppError> {
        match self.status() {
            ServiceState::Installed => Ok(self.remove()),
            ServiceState::NotInstalled => self.install(),
        }
    }

    fn run_systemctl<const N: usize>(&self, args: [&str; N]) -> Result<String, CommandError> {
        let command = systemctl(args);
        self.runner.run(&command).into_result(&command)
    }
}

fn systemctl<const N: usize>(args: [&str; N]) -> CommandSpec {
    CommandSpec::new("systemctl").arg("--user").args(args)
}

pub fn service_unit(executable: &Path) -> String {
    format!(
        "[Unit]\nDescription=Sysdupd\n\n[Service]\nExecStart={} --service\nType=oneshot\n",
        exec_path(executable)
    )
}

pub fn timer_unit() -> String {
    "[Unit]\nDescription=Daily Sysdupd\n\n[Timer]\nOnCalendar=daily\nPersistent=true\n\n[Install]\nWantedBy=timers.target\n"
        .to_string()
}
