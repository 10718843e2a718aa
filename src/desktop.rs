use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::AppError;

pub const DESKTOP_FILE: &str = "com.virex.sysdupd.desktop";

/// Renders `executable` for an `Exec=`/`ExecStart=` line, double-quoted
/// when it contains whitespace.
pub fn exec_path(executable: &Path) -> String {
    let exe = executable.display().to_string();
    if exe.contains(char::is_whitespace) {
        format!("\"{}\"", exe)
    } else {
        exe
    }
}

pub fn desktop_entry(executable: &Path) -> String {
    format!(
        "[Desktop Entry]\n\
         Name=Sysdupd\n\
         Exec={}\n\
         Icon=software-update-available-symbolic\n\
         Type=Application\n\
         Categories=System;Settings;\n",
        exec_path(executable)
    )
}

/// Writes the application-menu entry into `applications_dir` and returns
/// its path.
pub fn create_desktop_entry(
    applications_dir: &Path,
    executable: &Path,
) -> Result<PathBuf, AppError> {
    fs::create_dir_all(applications_dir)?;
    let path = applications_dir.join(DESKTOP_FILE);
    fs::write(&path, desktop_entry(executable))?;
    info!("Created desktop entry at {}", path.display());
    Ok(path)
}
