use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use uuid::Uuid;

const DEVICE_FILE: &str = "device_id";

/// Stable identifier of the device the survey runs on.
pub trait DeviceIdentity: Send + Sync {
    /// Returns the identifier, or an empty string when none can be kept.
    fn device_id(&self) -> String;
}

/// Keeps a random UUID in a file, creating it on first use.
#[derive(Debug, Clone)]
pub struct FileDeviceStore {
    path: Option<PathBuf>,
}

impl FileDeviceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Uses the platform data directory. Without one, every lookup yields `""`.
    pub fn in_data_dir() -> Self {
        Self {
            path: default_path(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load_or_create(path: &Path) -> io::Result<String> {
        match fs::read_to_string(path) {
            Ok(existing) if !existing.trim().is_empty() => return Ok(existing.trim().to_string()),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }

        let id = Uuid::new_v4().to_string();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &id)?;
        tracing::debug!(path = %path.display(), "created device id");
        Ok(id)
    }
}

impl DeviceIdentity for FileDeviceStore {
    fn device_id(&self) -> String {
        let Some(path) = &self.path else {
            return String::new();
        };
        Self::load_or_create(path).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "device id storage unavailable");
            String::new()
        })
    }
}

/// A fixed identifier, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDevice(pub String);

impl DeviceIdentity for StaticDevice {
    fn device_id(&self) -> String {
        self.0.clone()
    }
}

pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "wli", "fellowship-survey")
        .map(|dirs| dirs.data_dir().join(DEVICE_FILE))
}
