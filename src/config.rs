use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::AppError;

const APP_DIR: &str = "sysdupd";

/// Compact JSON with a space after every `,` and `:`, the layout earlier
/// releases wrote.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Per-user file locations, resolved once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub history_file: PathBuf,
    pub profiles_file: PathBuf,
    /// systemd user unit directory.
    pub unit_dir: PathBuf,
    /// Where desktop entries are picked up by application menus.
    pub applications_dir: PathBuf,
}

impl AppPaths {
    /// `config_root` is usually `~/.config`, `data_root` `~/.local/share`.
    pub fn new(config_root: &Path, data_root: &Path) -> Self {
        let config_dir = config_root.join(APP_DIR);
        Self {
            config_file: config_dir.join("config.json"),
            history_file: config_dir.join("history.log"),
            profiles_file: config_dir.join("profiles.toml"),
            config_dir,
            unit_dir: config_root.join("systemd").join("user"),
            applications_dir: data_root.join("applications"),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let config_root = dirs::config_dir().ok_or(AppError::NoHomeDir)?;
        let data_root = dirs::data_dir().ok_or(AppError::NoHomeDir)?;
        Ok(Self::new(&config_root, &data_root))
    }
}

/// User settings. Keys missing from the file take their defaults; keys this
/// version does not know are kept in `extra` and written back on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub exclude: Vec<String>,
    pub check_flatpaks: bool,
    pub notifications: bool,
    pub terminal: String,
    pub auto_update: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            check_flatpaks: true,
            notifications: true,
            terminal: "kitty".to_string(),
            auto_update: false,
            extra: Map::new(),
        }
    }
}

impl Config {
    pub fn exclude_set(&self) -> HashSet<&str> {
        self.exclude.iter().map(String::as_str).collect()
    }

    /// Replaces the exclude list from comma-separated text, dropping blanks
    /// and repeats.
    pub fn set_exclude_from_text(&mut self, text: &str) {
        let mut seen = HashSet::new();
        self.exclude = text
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty() && seen.insert(*name))
            .map(String::from)
            .collect();
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the config, writing the defaults first if no file exists yet.
    /// An unreadable or malformed file is an error.
    pub fn load(&self) -> Result<Config, AppError> {
        if !self.path.exists() {
            debug!("No config at {}, writing defaults", self.path.display());
            let config = Config::default();
            self.save(&config)?;
            return Ok(config);
        }
        self.read()
    }

    /// Service-mode loading: never writes, and falls back to the defaults
    /// (with a warning) when the file cannot be used.
    pub fn load_or_default(&self) -> Config {
        if !self.path.exists() {
            debug!("No config at {}, using defaults", self.path.display());
            return Config::default();
        }
        self.read().unwrap_or_else(|e| {
            warn!("{}; continuing with default settings", e);
            Config::default()
        })
    }

    /// Overwrites the whole file with `config` on a single line, known keys
    /// first and unknown keys in the order they were read.
    pub fn save(&self, config: &Config) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut json = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut json, SpacedFormatter);
        config.serialize(&mut serializer)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Applies `change` and saves immediately.
    pub fn update<F>(&self, config: &mut Config, change: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Config),
    {
        change(config);
        self.save(config)
    }

    fn read(&self) -> Result<Config, AppError> {
        let content = fs::read_to_string(&self.path).map_err(|e| self.corrupt(e))?;
        serde_json::from_str(&content).map_err(|e| self.corrupt(e))
    }

    fn corrupt<E>(&self, source: E) -> AppError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AppError::Config {
            path: self.path.clone(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("sysdupd").join("config.json"))
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let config = store.load().unwrap();
        assert_eq!(config, Config::default());
        assert!(store.path().exists());
        assert_eq!(store.load().unwrap(), Config::default());
    }

    #[test]
    fn persisted_values_override_defaults_and_absent_keys_default() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"auto_update": true, "exclude": ["linux"]}"#).unwrap();

        let config = store.load().unwrap();
        assert!(config.auto_update);
        assert_eq!(config.exclude, ["linux"]);
        assert!(config.notifications);
        assert_eq!(config.terminal, "kitty");
    }

    #[test]
    fn round_trip_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        let original = r#"{"exclude":["a","b"],"check_flatpaks":false,"notifications":true,"terminal":"foot","auto_update":false,"window":{"width":950},"theme":"dark"}"#;
        fs::write(store.path(), original).unwrap();

        let config = store.load().unwrap();
        store.save(&config).unwrap();

        let before: Value = serde_json::from_str(original).unwrap();
        let after: Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(before, after);

        let first_save = fs::read_to_string(store.path()).unwrap();
        store.save(&store.load().unwrap()).unwrap();
        assert_eq!(first_save, fs::read_to_string(store.path()).unwrap());
    }

    #[test]
    fn file_in_saved_layout_round_trips_byte_for_byte() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        let content = concat!(
            r#"{"exclude": ["linux", "firefox"], "check_flatpaks": true, "#,
            r#""notifications": false, "terminal": "kitty", "auto_update": false, "#,
            r#""window": {"width": 950, "height": 600}, "theme": "dark"}"#
        );
        fs::write(store.path(), content).unwrap();

        store.save(&store.load().unwrap()).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), content);
    }

    #[test]
    fn corrupt_file_is_an_error_for_interactive_load() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(AppError::Config { .. })));
    }

    #[test]
    fn service_load_falls_back_without_writing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(store.load_or_default(), Config::default());
        assert!(!store.path().exists());

        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "[1, 2").unwrap();
        assert_eq!(store.load_or_default(), Config::default());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[1, 2");
    }

    #[test]
    fn update_saves_immediately() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut config = store.load().unwrap();
        store
            .update(&mut config, |c| c.terminal = "alacritty".to_string())
            .unwrap();
        assert_eq!(store.load().unwrap().terminal, "alacritty");
    }

    #[test]
    fn exclude_text_is_split_and_trimmed() {
        let mut config = Config::default();
        config.set_exclude_from_text(" linux, ,nvidia-dkms,linux ,");
        assert_eq!(config.exclude, ["linux", "nvidia-dkms"]);
        assert!(config.exclude_set().contains("nvidia-dkms"));
    }

    #[test]
    fn paths_follow_xdg_layout() {
        let paths = AppPaths::new(Path::new("/home/u/.config"), Path::new("/home/u/.local/share"));
        assert_eq!(paths.config_file, Path::new("/home/u/.config/sysdupd/config.json"));
        assert_eq!(paths.history_file, Path::new("/home/u/.config/sysdupd/history.log"));
        assert_eq!(paths.unit_dir, Path::new("/home/u/.config/systemd/user"));
        assert_eq!(
            paths.applications_dir,
            Path::new("/home/u/.local/share/applications")
        );
    }
}
