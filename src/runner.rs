//! The single place where external processes are spawned.
//!
//! Every other module describes what to run as a [`CommandSpec`] and hands it
//! to a [`CommandRunner`]. Launch failures and non-zero exits come back as
//! data in [`CommandOutput`], never as errors.

use std::fmt;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::CommandError;

/// A program plus its argument vector. No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CommandRepr")]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

/// Profiles written by hand may give a command either as a single line
/// (split on whitespace) or as an explicit array.
#[derive(Deserialize)]
#[serde(untagged)]
enum CommandRepr {
    Line(String),
    Argv(Vec<String>),
}

impl TryFrom<CommandRepr> for CommandSpec {
    type Error = String;

    fn try_from(repr: CommandRepr) -> Result<Self, Self::Error> {
        match repr {
            CommandRepr::Line(line) => {
                CommandSpec::parse(&line).ok_or_else(|| "command must not be empty".to_string())
            }
            CommandRepr::Argv(mut argv) => {
                if argv.is_empty() || argv[0].trim().is_empty() {
                    return Err("command must not be empty".to_string());
                }
                let program = argv.remove(0);
                Ok(CommandSpec::new(program).args(argv))
            }
        }
    }
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Splits a command line on whitespace. Quoting is not understood, so an
    /// argument containing spaces cannot be expressed this way; build the
    /// spec with [`CommandSpec::arg`] instead.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).args(parts))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of one command run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }

    /// Turns an unsuccessful run into a [`CommandError`] for callers that
    /// want to propagate it with `?`.
    pub fn into_result(self, spec: &CommandSpec) -> Result<String, CommandError> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(CommandError {
                program: spec.program.clone(),
                args: spec.args.clone(),
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}

pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &CommandSpec) -> CommandOutput;
}

/// Runs commands on the host with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> CommandOutput {
        debug!("Executing: {}", command);

        let output = match Command::new(&command.program).args(&command.args).output() {
            Ok(output) => output,
            Err(e) => {
                warn!("Error executing command '{}': {}", command, e);
                return CommandOutput::failed(e.to_string());
            }
        };

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        };

        if !result.success {
            warn!(
                "Command failed with exit code {:?}: {}",
                output.status.code(),
                command
            );
            if !result.stderr.is_empty() {
                debug!("Stderr:\n{}", result.stderr);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_any_whitespace() {
        let spec = CommandSpec::parse("  pkexec   pacman\t-Syu --noconfirm ").unwrap();
        assert_eq!(spec.program(), "pkexec");
        assert_eq!(spec.arguments(), ["pacman", "-Syu", "--noconfirm"]);
        assert_eq!(spec.to_string(), "pkexec pacman -Syu --noconfirm");
    }

    #[test]
    fn parse_rejects_blank_lines() {
        assert!(CommandSpec::parse("").is_none());
        assert!(CommandSpec::parse("   ").is_none());
    }

    #[test]
    fn builder_keeps_arguments_with_spaces_intact() {
        let spec = CommandSpec::new("notify-send")
            .arg("Sysdupd")
            .arg("2 updates ready!");
        assert_eq!(spec.arguments(), ["Sysdupd", "2 updates ready!"]);
    }

    #[test]
    fn missing_binary_is_reported_as_data() {
        let spec = CommandSpec::new("/nonexistent/sysdupd-test-binary").arg("--version");
        let output = SystemRunner.run(&spec);
        assert!(!output.success);
        assert!(output.stdout.is_empty());
        assert!(!output.stderr.is_empty());
    }

    #[test]
    fn successful_run_captures_stdout() {
        let output = SystemRunner.run(&CommandSpec::new("echo").arg("hello"));
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn failed_output_converts_to_command_error() {
        let spec = CommandSpec::parse("pacman -Qu").unwrap();
        let err = CommandOutput::failed("boom").into_result(&spec).unwrap_err();
        assert_eq!(err.program, "pacman");
        assert!(err.to_string().contains("Stderr: boom"));
    }

    #[test]
    fn deserializes_from_line_or_array() {
        #[derive(Deserialize)]
        struct Holder {
            a: CommandSpec,
            b: CommandSpec,
        }
        let holder: Holder =
            toml::from_str("a = \"pacman -Qu\"\nb = [\"notify-send\", \"two words\"]").unwrap();
        assert_eq!(holder.a, CommandSpec::new("pacman").arg("-Qu"));
        assert_eq!(holder.b.arguments(), ["two words"]);
    }
}
