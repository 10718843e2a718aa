//! Test doubles shared by the unit tests and `tests/integration.rs`.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::runner::{CommandOutput, CommandRunner, CommandSpec};

/// A [`CommandRunner`] that answers from a table keyed by the rendered
/// command line and records every call. Unscripted commands fail as if the
/// binary were missing.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, CommandOutput>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, command: &str, output: CommandOutput) -> Self {
        self.set(command, output);
        self
    }

    pub fn set(&self, command: &str, output: CommandOutput) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(command.to_string(), output);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, program: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split_whitespace().next() == Some(program))
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &CommandSpec) -> CommandOutput {
        let line = command.to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        self.responses
            .lock()
            .ok()
            .and_then(|r| r.get(&line).cloned())
            .unwrap_or_else(|| {
                CommandOutput::failed(format!("No such file or directory: {}", command.program()))
            })
    }
}
