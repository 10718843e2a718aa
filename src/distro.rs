//! Works out which distribution this is and which package manager drives it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::runner::CommandSpec;

const OS_RELEASE: &str = "/etc/os-release";
const DEFAULT_DISTRO_NAME: &str = "Linux";

/// How a manager's list output marks a pending update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateFormat {
    /// A line is an update iff it contains `marker`, e.g. pacman's
    /// `linux 6.9.1-1 -> 6.9.2-1`.
    Transition { marker: String },
    /// Every non-blank line is an update, first column is the name.
    Columns,
}

impl Default for UpdateFormat {
    fn default() -> Self {
        UpdateFormat::Transition {
            marker: " -> ".to_string(),
        }
    }
}

/// One package manager the resolver knows how to drive. Built-ins are below,
/// more can be declared in `profiles.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManagerDef {
    pub name: String,
    /// Presence of this file selects the manager.
    pub binary: PathBuf,
    #[serde(default)]
    pub refresh: Option<CommandSpec>,
    pub list: CommandSpec,
    pub upgrade: CommandSpec,
    #[serde(default)]
    pub format: UpdateFormat,
}

impl ManagerDef {
    pub fn pacman() -> Self {
        Self {
            name: "pacman".to_string(),
            binary: PathBuf::from("/usr/bin/pacman"),
            refresh: Some(CommandSpec::new("pkexec").args(["pacman", "-Sy"])),
            list: CommandSpec::new("pacman").arg("-Qu"),
            upgrade: CommandSpec::new("pkexec").args(["pacman", "-Syu", "--noconfirm"]),
            format: UpdateFormat::default(),
        }
    }

    pub fn flatpak() -> Self {
        Self {
            name: "flatpak".to_string(),
            binary: PathBuf::from("/usr/bin/flatpak"),
            refresh: None,
            list: CommandSpec::new("flatpak").args([
                "remote-ls",
                "--updates",
                "--columns=application,version",
            ]),
            upgrade: CommandSpec::new("flatpak").args(["update", "-y", "--noninteractive"]),
            format: UpdateFormat::Columns,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.binary.exists()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageManager {
    Known(String),
    Unknown,
}

/// Everything the rest of the program needs to drive the host's package
/// manager. With [`PackageManager::Unknown`] all commands are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroProfile {
    pub name: String,
    pub package_manager: PackageManager,
    pub refresh_cmd: Option<CommandSpec>,
    pub list_cmd: Option<CommandSpec>,
    pub upgrade_cmd: Option<CommandSpec>,
    pub format: UpdateFormat,
}

impl DistroProfile {
    pub fn unsupported(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_manager: PackageManager::Unknown,
            refresh_cmd: None,
            list_cmd: None,
            upgrade_cmd: None,
            format: UpdateFormat::default(),
        }
    }

    pub fn for_manager(name: impl Into<String>, manager: &ManagerDef) -> Self {
        Self {
            name: name.into(),
            package_manager: PackageManager::Known(manager.name.clone()),
            refresh_cmd: manager.refresh.clone(),
            list_cmd: Some(manager.list.clone()),
            upgrade_cmd: Some(manager.upgrade.clone()),
            format: manager.format.clone(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.package_manager != PackageManager::Unknown
    }
}

#[derive(Deserialize)]
struct ManagerFile {
    #[serde(default)]
    manager: Vec<ManagerDef>,
}

/// Reads `[[manager]]` tables from a TOML file.
pub fn load_manager_file(path: &Path) -> Result<Vec<ManagerDef>, AppError> {
    let content = fs::read_to_string(path)?;
    let file: ManagerFile = toml::from_str(&content)?;
    Ok(file.manager)
}

#[derive(Debug, Clone)]
pub struct ProfileResolver {
    os_release: PathBuf,
    managers: Vec<ManagerDef>,
}

impl Default for ProfileResolver {
    fn default() -> Self {
        Self::new(vec![ManagerDef::pacman()])
    }
}

impl ProfileResolver {
    /// `managers` are probed in order; the first whose binary exists wins.
    pub fn new(managers: Vec<ManagerDef>) -> Self {
        Self {
            os_release: PathBuf::from(OS_RELEASE),
            managers,
        }
    }

    /// User-declared managers from `profiles_file` first, then the built-ins.
    /// A file that fails to parse is logged and skipped.
    pub fn with_user_profiles(profiles_file: &Path) -> Self {
        let mut managers = Vec::new();
        if profiles_file.exists() {
            match load_manager_file(profiles_file) {
                Ok(extra) => {
                    debug!(
                        "Loaded {} manager profile(s) from {}",
                        extra.len(),
                        profiles_file.display()
                    );
                    managers.extend(extra);
                }
                Err(e) => warn!(
                    "Ignoring manager profiles in {}: {}",
                    profiles_file.display(),
                    e
                ),
            }
        }
        managers.push(ManagerDef::pacman());
        Self::new(managers)
    }

    pub fn with_os_release(mut self, path: impl Into<PathBuf>) -> Self {
        self.os_release = path.into();
        self
    }

    pub fn resolve(&self) -> DistroProfile {
        let name = read_distro_name(&self.os_release);
        match self.managers.iter().find(|m| m.is_installed()) {
            Some(manager) => {
                info!("Detected {} with package manager {}", name, manager.name);
                DistroProfile::for_manager(name, manager)
            }
            None => {
                info!("Detected {} with no supported package manager", name);
                DistroProfile::unsupported(name)
            }
        }
    }
}

/// Display name from the `ID=` line of an os-release file.
pub fn read_distro_name(path: &Path) -> String {
    let Ok(content) = fs::read_to_string(path) else {
        return DEFAULT_DISTRO_NAME.to_string();
    };
    content
        .lines()
        .find_map(|line| line.strip_prefix("ID="))
        .map(|id| capitalize(id.trim().trim_matches('"')))
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_DISTRO_NAME.to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
