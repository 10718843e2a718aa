use clap::Parser;

/// Sysdupd: system update checker for Linux desktops
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Run one unattended check (used by the systemd timer) instead of the
    /// interactive session.
    #[arg(long, default_value = "false")]
    pub service: bool,
}
