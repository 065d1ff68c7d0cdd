use std::env::current_exe;
use std::path::{Path, PathBuf};
use directories_next::ProjectDirs;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use serde_json;
use fd_lock::{RwLock, RwLockWriteGuard};
use log::{info, warn};
use std::fs::OpenOptions;
use std::str;

use crate::config::types::Config;
use crate::error::ConfigError;

// creates a path to beacon-scanner.json in the same directory as the executable
// this could be useful for usb sticks
fn get_portable_config_path() -> Option<PathBuf> {
    match current_exe() {
        Ok(mut path) => {
            // F:\beacon-scanner.exe => F:\beacon-scanner.json
            if !path.set_extension("json") {
                warn!("current exe has no filename: {}", path.to_string_lossy());
                return None
            }

            Some(path)
        },
        Err(err) => {
            warn!("failed to get current exe path: {:?}", err);
            None
        },
    }
}

// creates a path to beacon-scanner.json in an os dependent standard directory, such as %AppData% on
// windows.
fn get_local_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "cmp491", "beacon-scanner").map(|dirs| {
        dirs.config_dir().join("beacon-scanner.json")
    })
}

fn get_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = get_portable_config_path() {
        match std::fs::metadata(&path) {
            Ok(attr) => {
                if attr.is_file() {
                    return Ok(path);
                }
            }
            Err(err) => {
                info!("Could not read metadata of: {}; Using local path instead. ({})", path.to_string_lossy(), err);
            },
        }
    }

    match get_local_config_path() {
        None => Err(ConfigError::NoConfigPath),
        Some(path) => Ok(path),
    }
}

pub struct ConfigIOLocker {
    rw_lock: RwLock<std::fs::File>,
}

impl ConfigIOLocker {
    /// Only one scanner may run per config file.
    pub fn lock(&mut self) -> Result<RwLockWriteGuard<std::fs::File>, ConfigError> {
        match self.rw_lock.try_write() {
            Ok(guard) => Ok(guard),
            Err(source) => Err(ConfigError::CanNotLock { source }),
        }
    }
}

pub struct ConfigIO {
    file: std::fs::File,
}

impl ConfigIO {
    pub fn new_sync() -> Result<Self, ConfigError> {
        let path = get_config_path()?;
        ConfigIO::open_sync(&path)
    }

    pub fn open_sync(path: &Path) -> Result<Self, ConfigError> {
        info!("Using config file {}", path.to_string_lossy());

        if let Some(directory) = path.parent() {
            std::fs::create_dir_all(directory)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(false)
            .append(false)
            .create(true)
            .open(path)?;

        Ok(ConfigIO { file })
    }

    pub fn locker(&self) -> Result<ConfigIOLocker, ConfigError> {
        Ok(ConfigIOLocker {
            rw_lock: RwLock::new(self.file.try_clone()?),
        })
    }

    // clones share the file offset, so every read and write starts with a rewind
    fn get_file(&self) -> Result<File, ConfigError> {
        Ok(File::from_std(self.file.try_clone()?))
    }

    /// Reads the config; an empty file yields the defaults.
    pub async fn read(&self) -> Result<Config, ConfigError> {
        let mut file = self.get_file()?;
        info!("Reading config file");

        let mut content = vec![];
        file.rewind().await?;
        file.read_to_end(&mut content).await?;

        if content.is_empty() {
            return Ok(Config::default());
        }

        let content = str::from_utf8(&content)?;
        let config: Config = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Like `read`, but writes the defaults to a new (empty) config file so they can be edited.
    pub async fn read_or_init(&self) -> Result<Config, ConfigError> {
        let mut file = self.get_file()?;
        let is_empty = file.metadata().await?.len() == 0;
        file.rewind().await?;

        if is_empty {
            info!("Config file is empty, writing defaults");
            let config = Config::default();
            self.save(&config).await?;
            return Ok(config);
        }

        self.read().await
    }

    pub async fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let mut file = self.get_file()?;
        info!("Saving config");

        let content = serde_json::to_string_pretty(config)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos();
        std::env::temp_dir()
            .join(format!("beacon-scanner-test-{}-{}-{}", process::id(), name, nanos))
            .join("beacon-scanner.json")
    }

    #[tokio::test]
    async fn empty_file_is_initialized_with_defaults() {
        let path = temp_config_path("init");
        let config_io = ConfigIO::open_sync(&path).unwrap();

        assert_eq!(config_io.read_or_init().await.unwrap(), Config::default());

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"scanPeriodSecs\": 20"));

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn save_then_read() {
        let path = temp_config_path("save");
        let config_io = ConfigIO::open_sync(&path).unwrap();
        let config = Config { scan_period_secs: 5, scan_on_launch: false };

        config_io.save(&config).await.unwrap();
        assert_eq!(config_io.read_or_init().await.unwrap(), config);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn second_instance_can_not_lock() {
        let path = temp_config_path("lock");
        let first = ConfigIO::open_sync(&path).unwrap();
        let second = ConfigIO::open_sync(&path).unwrap();

        let mut first_locker = first.locker().unwrap();
        let guard = first_locker.lock().unwrap();

        let mut second_locker = second.locker().unwrap();
        assert!(matches!(second_locker.lock(), Err(ConfigError::CanNotLock { .. })));

        drop(guard);
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn invalid_json_is_an_error() {
        let path = temp_config_path("invalid");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let config_io = ConfigIO::open_sync(&path).unwrap();
        let result = config_io.read().await;
        assert!(matches!(result, Err(ConfigError::JsonError { .. })));

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
