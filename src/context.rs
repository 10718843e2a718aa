use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{AppPaths, Config, ConfigStore};
use crate::distro::{DistroProfile, ProfileResolver};
use crate::errors::AppError;
use crate::history::HistoryLog;
use crate::inventory::{Inventory, SystemSpecs};
use crate::notify::{DesktopNotifier, Notifier};
use crate::orchestrator::Orchestrator;
use crate::runner::CommandRunner;
use crate::service::TriggerManager;

/// Everything the interactive session needs, built once at start-up and
/// passed by reference from there on.
pub struct AppContext {
    pub paths: AppPaths,
    /// This binary, as written into the timer unit and desktop entry.
    pub executable: PathBuf,
    pub store: ConfigStore,
    pub config: Config,
    pub specs: SystemSpecs,
    pub orchestrator: Orchestrator,
    pub trigger: TriggerManager,
    pub notifier: Arc<dyn Notifier>,
}

impl AppContext {
    /// Loads the config strictly: a corrupt file is returned as an error
    /// rather than replaced with defaults.
    pub fn new(
        paths: AppPaths,
        executable: PathBuf,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, AppError> {
        let profile = ProfileResolver::with_user_profiles(&paths.profiles_file).resolve();
        let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier::new(runner.clone()));
        Self::with_profile(paths, executable, runner, notifier, profile)
    }

    pub fn with_profile(
        paths: AppPaths,
        executable: PathBuf,
        runner: Arc<dyn CommandRunner>,
        notifier: Arc<dyn Notifier>,
        profile: DistroProfile,
    ) -> Result<Self, AppError> {
        let store = ConfigStore::new(&paths.config_file);
        let config = store.load()?;
        let specs = Inventory::default().gather(runner.as_ref());
        let orchestrator = Orchestrator::new(
            profile,
            runner.clone(),
            HistoryLog::new(&paths.history_file),
            notifier.clone(),
        );
        let trigger = TriggerManager::new(&paths.unit_dir, &executable, runner);
        Ok(Self {
            paths,
            executable,
            store,
            config,
            specs,
            orchestrator,
            trigger,
            notifier,
        })
    }
}
