use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use metadata::ParserSettings;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub name: String,
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub version: u32,
    pub port: u16,
    pub index_path: String,
    pub metadata_path: String,
    pub data_folder: String,
    pub libraries: Vec<LibraryConfig>,
    pub max_concurrent_tasks: usize,
    pub task_history: usize,
    pub ffmpeg_path: String,
    pub parser: ParserSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            port: 3000,
            index_path: "index.redb".to_string(),
            metadata_path: "metadata".to_string(),
            data_folder: "data".to_string(),
            libraries: Vec::new(),
            max_concurrent_tasks: 2,
            task_history: 50,
            ffmpeg_path: "ffmpeg".to_string(),
            parser: ParserSettings::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("MEDIA_INDEX_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

pub fn load_or_create_config(path: &Path) -> Result<(ServerConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: ServerConfig = serde_yaml::from_str(&contents)?;
        normalize(&mut config);
        return Ok((config, false));
    }

    let config = ServerConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

fn normalize(config: &mut ServerConfig) {
    let defaults = ServerConfig::default();
    if config.version < CONFIG_VERSION {
        config.version = CONFIG_VERSION;
    }
    if config.port == 0 {
        config.port = defaults.port;
    }
    if config.index_path.trim().is_empty() {
        config.index_path = defaults.index_path;
    }
    if config.metadata_path.trim().is_empty() {
        config.metadata_path = defaults.metadata_path;
    }
    if config.data_folder.trim().is_empty() {
        config.data_folder = defaults.data_folder;
    }
    if config.max_concurrent_tasks == 0 {
        config.max_concurrent_tasks = defaults.max_concurrent_tasks;
    }
    if config.task_history == 0 {
        config.task_history = defaults.task_history;
    }
    if config.ffmpeg_path.trim().is_empty() {
        config.ffmpeg_path = defaults.ffmpeg_path;
    }
    config
        .libraries
        .retain(|library| !library.name.trim().is_empty() && !library.path.trim().is_empty());
}

pub fn save_config(path: &Path, config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}

/// Library folders are relative to `data_folder`, which is itself relative
/// to the config file.
pub fn resolve_library_path(config_path: &Path, config: &ServerConfig, value: &str) -> PathBuf {
    let raw = PathBuf::from(value.trim());
    if raw.is_absolute() {
        return raw;
    }
    resolve_path(config_path, config.data_folder.trim()).join(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let (config, created) = load_or_create_config(&path).unwrap();
        assert!(created);
        assert!(path.exists());
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_concurrent_tasks, 2);

        let (_, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
    }

    #[test]
    fn blank_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "port: 0\nindex_path: ' '\nmax_concurrent_tasks: 0\nlibraries:\n  - name: Music\n    path: music\n  - name: ''\n    path: nowhere\nparser:\n  metadata:\n    source: path\n    order: only\n",
        )
        .unwrap();

        let (config, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
        assert_eq!(config.port, 3000);
        assert_eq!(config.index_path, "index.redb");
        assert_eq!(config.max_concurrent_tasks, 2);
        assert_eq!(config.task_history, 50);
        assert_eq!(
            config.libraries,
            vec![LibraryConfig {
                name: "Music".to_string(),
                path: "music".to_string(),
            }]
        );
        assert_eq!(
            config.parser.metadata.source,
            metadata::MetadataSource::Path
        );
    }

    #[test]
    fn library_paths_resolve_against_the_data_folder() {
        let config_path = Path::new("/srv/index/config.yaml");
        let config = ServerConfig::default();
        assert_eq!(
            resolve_library_path(config_path, &config, "music"),
            PathBuf::from("/srv/index/data/music")
        );
        assert_eq!(
            resolve_library_path(config_path, &config, "/mnt/music"),
            PathBuf::from("/mnt/music")
        );

        let absolute = ServerConfig {
            data_folder: "/data".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(
            resolve_library_path(config_path, &absolute, "music"),
            PathBuf::from("/data/music")
        );
    }
}
