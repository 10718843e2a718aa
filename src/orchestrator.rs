//! Ties checking, applying, history and notifications together.
//!
//! Interactive callers use [`Orchestrator::refresh_updates`] and
//! [`Orchestrator::apply_updates`], which hand the work to a detached rayon
//! job and post the result back as a [`UiEvent`] on the caller's channel.
//! Nothing here serialises concurrent calls; the presentation layer is
//! expected to keep at most one of each in flight.

use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, error, info, warn};

use crate::applier::{self, ApplyResult};
use crate::checker::{self, UpdateRecord};
use crate::config::{AppPaths, Config, ConfigStore};
use crate::distro::{DistroProfile, ManagerDef, ProfileResolver};
use crate::history::HistoryLog;
use crate::notify::{APP_TITLE, Notifier};
use crate::runner::CommandRunner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    UpdatesReady(Vec<UpdateRecord>),
    ApplyFinished(ApplyResult),
}

/// What a `--service` run ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceOutcome {
    NoUpdates,
    /// Updates are pending and were left alone.
    Pending { count: usize, notified: bool },
    Applied(ApplyResult),
}

#[derive(Clone)]
pub struct Orchestrator {
    profile: Arc<DistroProfile>,
    flatpak: Option<Arc<DistroProfile>>,
    runner: Arc<dyn CommandRunner>,
    history: HistoryLog,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    pub fn new(
        profile: DistroProfile,
        runner: Arc<dyn CommandRunner>,
        history: HistoryLog,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let flatpak = ManagerDef::flatpak();
        let flatpak = flatpak
            .is_installed()
            .then(|| Arc::new(DistroProfile::for_manager("Flatpak", &flatpak)));
        Self {
            profile: Arc::new(profile),
            flatpak,
            runner,
            history,
            notifier,
        }
    }

    /// Overrides Flatpak detection.
    pub fn with_flatpak(mut self, flatpak: Option<DistroProfile>) -> Self {
        self.flatpak = flatpak.map(Arc::new);
        self
    }

    pub fn profile(&self) -> &DistroProfile {
        &self.profile
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// System updates followed by Flatpak updates when enabled, unfiltered.
    pub fn check(&self, include_flatpaks: bool) -> Vec<UpdateRecord> {
        let mut updates = checker::check(&self.profile, self.runner.as_ref());
        if let Some(flatpak) = self.flatpak_profile(include_flatpaks) {
            updates.extend(checker::check(flatpak, self.runner.as_ref()));
        }
        updates
    }

    /// Runs the system upgrade, then the Flatpak one when enabled. On a host
    /// without a supported package manager only Flatpak is upgraded; with
    /// neither available the result is a failure.
    pub fn apply(&self, include_flatpaks: bool) -> ApplyResult {
        let system = self
            .profile
            .is_supported()
            .then(|| self.apply_profile(&self.profile));
        let flatpak = self
            .flatpak_profile(include_flatpaks)
            .map(|flatpak| self.apply_profile(flatpak));
        match (system, flatpak) {
            (Some(system), Some(flatpak)) => system.merge(flatpak),
            (Some(result), None) | (None, Some(result)) => result,
            (None, None) => self.apply_profile(&self.profile),
        }
    }

    /// Checks in the background and sends the filtered list to `sink`.
    pub fn refresh_updates(&self, config: &Config, sink: Sender<UiEvent>) {
        let this = self.clone();
        let exclude = config.exclude.clone();
        let include_flatpaks = config.check_flatpaks;
        rayon::spawn(move || {
            let updates = this.check(include_flatpaks);
            let exclude: HashSet<&str> = exclude.iter().map(String::as_str).collect();
            let updates = filter_excluded(updates, &exclude);
            if sink.send(UiEvent::UpdatesReady(updates)).is_err() {
                debug!("Update list dropped, receiver is gone");
            }
        });
    }

    /// Applies in the background, records the outcome in the history log
    /// and sends the result to `sink`.
    pub fn apply_updates(&self, config: &Config, sink: Sender<UiEvent>) {
        let this = self.clone();
        let include_flatpaks = config.check_flatpaks;
        rayon::spawn(move || {
            let result = this.apply(include_flatpaks);
            this.record("Update run", result.success);
            if sink.send(UiEvent::ApplyFinished(result)).is_err() {
                debug!("Apply result dropped, receiver is gone");
            }
        });
    }

    /// One unattended pass: check, then either apply or tell the user.
    pub fn run_once(&self, config: &Config) -> ServiceOutcome {
        let updates = filter_excluded(self.check(config.check_flatpaks), &config.exclude_set());
        if updates.is_empty() {
            info!("System is up to date");
            return ServiceOutcome::NoUpdates;
        }

        let count = updates.len();
        if config.auto_update {
            info!("Applying {} update(s) in the background", count);
            let result = self.apply(config.check_flatpaks);
            self.record("Background update run", result.success);
            if config.notifications {
                let message = if result.success {
                    "Background updates applied!"
                } else {
                    "Background update failed!"
                };
                self.notifier.notify(APP_TITLE, message);
            }
            return ServiceOutcome::Applied(result);
        }

        info!("{} update(s) ready", count);
        if config.notifications {
            self.notifier
                .notify(APP_TITLE, &format!("{} updates ready!", count));
        }
        ServiceOutcome::Pending {
            count,
            notified: config.notifications,
        }
    }

    fn apply_profile(&self, profile: &DistroProfile) -> ApplyResult {
        applier::apply(profile, self.runner.as_ref())
            .unwrap_or_else(|e| ApplyResult::failed(e.to_string()))
    }

    fn flatpak_profile(&self, enabled: bool) -> Option<&DistroProfile> {
        self.flatpak.as_deref().filter(|_| enabled)
    }

    fn record(&self, what: &str, success: bool) {
        let message = format!("{}: {}", what, if success { "Success" } else { "Failed" });
        if let Err(e) = self.history.append(&message) {
            error!("Failed to write history: {}", e);
        }
    }
}

/// Drops records whose package name is excluded, keeping the original order.
pub fn filter_excluded(updates: Vec<UpdateRecord>, exclude: &HashSet<&str>) -> Vec<UpdateRecord> {
    updates
        .into_iter()
        .filter(|u| !exclude.contains(u.package_name.as_str()))
        .collect()
}

/// Entry point for `--service`: no display, no config writes, and a broken
/// config degrades to the defaults.
pub fn run_service(
    paths: &AppPaths,
    runner: Arc<dyn CommandRunner>,
    notifier: Arc<dyn Notifier>,
) -> ServiceOutcome {
    let config = ConfigStore::new(&paths.config_file).load_or_default();
    let profile = ProfileResolver::with_user_profiles(&paths.profiles_file).resolve();
    let orchestrator =
        Orchestrator::new(profile, runner, HistoryLog::new(&paths.history_file), notifier);
    if !orchestrator.profile().is_supported() {
        if orchestrator.flatpak_profile(config.check_flatpaks).is_some() {
            warn!("No supported package manager found, checking Flatpak only");
        } else {
            warn!("No supported package manager found, nothing to do");
        }
    }
    orchestrator.run_once(&config)
}
