use std::sync::Arc;

use tracing::warn;

use crate::runner::{CommandRunner, CommandSpec};

pub const APP_TITLE: &str = "Sysdupd";

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Sends desktop notifications through `notify-send`.
pub struct DesktopNotifier {
    runner: Arc<dyn CommandRunner>,
}

impl DesktopNotifier {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) {
        let command = CommandSpec::new("notify-send").arg(title).arg(message);
        let output = self.runner.run(&command);
        if !output.success {
            warn!("Could not send notification: {}", output.stderr.trim());
        }
    }
}
