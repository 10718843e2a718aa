//! Host hardware summary shown on the home view. Has nothing to do with
//! updates.

use std::env;
use std::fs;
use std::path::PathBuf;

use crate::runner::{CommandRunner, CommandSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSpecs {
    pub cpu: String,
    pub gpu: String,
    pub ram: String,
    pub user: String,
}

/// Where to look. Defaults to the live `/proc` files and `/usr/bin/lspci`.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub cpuinfo: PathBuf,
    pub meminfo: PathBuf,
    pub lspci: PathBuf,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            cpuinfo: PathBuf::from("/proc/cpuinfo"),
            meminfo: PathBuf::from("/proc/meminfo"),
            lspci: PathBuf::from("/usr/bin/lspci"),
        }
    }
}

impl Inventory {
    pub fn gather(&self, runner: &dyn CommandRunner) -> SystemSpecs {
        let cpu = fs::read_to_string(&self.cpuinfo)
            .ok()
            .and_then(|c| parse_cpu(&c))
            .unwrap_or_else(|| "unknown cpu".to_string());
        let ram = fs::read_to_string(&self.meminfo)
            .ok()
            .and_then(|m| parse_ram(&m))
            .unwrap_or_else(|| "unknown ram".to_string());
        let gpu = Some(&self.lspci)
            .filter(|lspci| lspci.exists())
            .map(|lspci| runner.run(&CommandSpec::new(lspci.display().to_string())))
            .and_then(|output| parse_gpu(&output.stdout))
            .unwrap_or_else(|| "unknown gpu".to_string());

        SystemSpecs {
            cpu,
            gpu,
            ram,
            user: current_user(),
        }
    }
}

pub fn parse_cpu(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .find(|line| line.contains("model name"))
        .and_then(|line| line.split(':').nth(1))
        .map(|name| name.trim().to_string())
}

/// `MemTotal` in whole GiB, e.g. `16 GB`.
pub fn parse_ram(meminfo: &str) -> Option<String> {
    let kb: u64 = meminfo
        .lines()
        .find(|line| line.contains("MemTotal"))?
        .split(':')
        .nth(1)?
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    let gb = (kb as f64 / 1024.0 / 1024.0).round();
    Some(format!("{} GB", gb as u64))
}

/// Name of the first VGA controller in `lspci` output, without the
/// trailing `(rev xx)`.
pub fn parse_gpu(lspci: &str) -> Option<String> {
    let line = lspci.lines().find(|line| line.contains("VGA"))?;
    let name = line.splitn(3, ':').nth(2)?.trim();
    let name = name.split('(').next().unwrap_or(name).trim();
    Some(name.to_string())
}

fn current_user() -> String {
    env::var("USER")
        .or_else(|_| env::var("LOGNAME"))
        .unwrap_or_else(|_| "user".to_string())
}
