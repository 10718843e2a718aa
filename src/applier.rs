use tracing::{info, warn};

use crate::distro::DistroProfile;
use crate::errors::AppError;
use crate::runner::CommandRunner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    pub success: bool,
    /// Upgrade stdout on success, stderr on failure.
    pub message: String,
}

impl ApplyResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Folds a second run into this one: both must succeed.
    pub fn merge(self, other: ApplyResult) -> Self {
        let message = match (self.message.trim().is_empty(), other.message.trim().is_empty()) {
            (true, _) => other.message,
            (_, true) => self.message,
            _ => format!("{}\n{}", self.message.trim_end(), other.message),
        };
        Self {
            success: self.success && other.success,
            message,
        }
    }
}

/// Runs the profile's upgrade command to completion. There is no progress
/// reporting and no way to cancel once started.
pub fn apply(
    profile: &DistroProfile,
    runner: &dyn CommandRunner,
) -> Result<ApplyResult, AppError> {
    let upgrade = profile
        .upgrade_cmd
        .as_ref()
        .ok_or(AppError::NoUpgradeCommand)?;

    info!("Applying updates with: {}", upgrade);
    let output = runner.run(upgrade);
    if output.success {
        info!("Upgrade finished");
        Ok(ApplyResult {
            success: true,
            message: output.stdout,
        })
    } else {
        warn!("Upgrade failed");
        Ok(ApplyResult::failed(output.stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distro::ManagerDef;
    use crate::runner::CommandOutput;
    use crate::test_utils::ScriptedRunner;

    const UPGRADE: &str = "pkexec pacman -Syu --noconfirm";

    fn pacman() -> DistroProfile {
        DistroProfile::for_manager("Arch", &ManagerDef::pacman())
    }

    #[test]
    fn success_returns_stdout() {
        let runner =
            ScriptedRunner::new().respond(UPGRADE, CommandOutput::ok("upgraded 3 packages"));
        let result = apply(&pacman(), &runner).unwrap();
        assert!(result.success);
        assert_eq!(result.message, "upgraded 3 packages");
    }

    #[test]
    fn failure_returns_stderr() {
        let runner = ScriptedRunner::new().respond(
            UPGRADE,
            CommandOutput {
                stdout: "partial".into(),
                stderr: "error: failed to commit transaction".into(),
                success: false,
            },
        );
        let result = apply(&pacman(), &runner).unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "error: failed to commit transaction");
    }

    #[test]
    fn missing_upgrade_command_fails_fast() {
        let runner = ScriptedRunner::new();
        let err = apply(&DistroProfile::unsupported("Linux"), &runner).unwrap_err();
        assert!(matches!(err, AppError::NoUpgradeCommand));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn merge_requires_both_to_succeed() {
        let ok = ApplyResult {
            success: true,
            message: "system done".into(),
        };
        let merged = ok.clone().merge(ApplyResult::failed("flatpak broke"));
        assert!(!merged.success);
        assert_eq!(merged.message, "system done\nflatpak broke");

        let merged = ok.merge(ApplyResult {
            success: true,
            message: String::new(),
        });
        assert!(merged.success);
        assert_eq!(merged.message, "system done");
    }
}
