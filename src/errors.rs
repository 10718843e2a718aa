use std::path::PathBuf;

use thiserror::Error;

/// A command that ran (or failed to launch) without succeeding.
#[derive(Debug, Clone)]
pub struct CommandError {
    pub program: String,
    pub args: Vec<String>,
    pub stdout: String,
    pub stderr: String,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Command failed: {} {}", self.program, self.args.join(" "))?;
        if !self.stdout.is_empty() {
            writeln!(f, "Stdout: {}", self.stdout.trim_end())?;
        }
        if !self.stderr.is_empty() {
            writeln!(f, "Stderr: {}", self.stderr.trim_end())?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandError {}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Command Error: {0}")]
    Command(#[from] CommandError),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML Deserialization Error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("Config Error: could not read {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("No upgrade command available for this system")]
    NoUpgradeCommand,
    #[error("Could not determine the user's home or config directory")]
    NoHomeDir,
    #[error("Other Error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
