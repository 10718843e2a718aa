//! Update orchestration for Linux hosts: detect the package manager, list
//! and apply updates through it, keep settings and a history log, and
//! schedule unattended runs with a systemd user timer.

pub mod applier;
pub mod checker;
pub mod cli;
pub mod config;
pub mod console;
pub mod context;
pub mod desktop;
pub mod distro;
pub mod errors;
pub mod history;
pub mod inventory;
pub mod notify;
pub mod orchestrator;
pub mod runner;
pub mod service;
pub mod test_utils;
