use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const DEFAULT_GAME: &str = "initdv3";
pub const DEFAULT_CARDS_FOLDER: &str = "./cards";
pub const DEFAULT_NVRAM_FOLDER: &str = "./data";
pub const DEFAULT_CARD_SUFFIX: &str = ".zip.card";

/// User configuration persisted as `settings.json`.
///
/// Keys the application does not know about are kept in `extra` so that a
/// rewrite never drops them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub game: String,
    pub cards_folder: String,
    pub nvram_folder: String,
    pub card_file_name_suffix: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        RawSettings::default().into()
    }
}

// Every field optional so that absent and null values both fall back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    game: Option<String>,
    cards_folder: Option<String>,
    nvram_folder: Option<String>,
    card_file_name_suffix: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        Settings {
            game: raw.game.unwrap_or_else(|| DEFAULT_GAME.to_string()),
            cards_folder: raw
                .cards_folder
                .unwrap_or_else(|| DEFAULT_CARDS_FOLDER.to_string()),
            nvram_folder: raw
                .nvram_folder
                .unwrap_or_else(|| DEFAULT_NVRAM_FOLDER.to_string()),
            card_file_name_suffix: raw
                .card_file_name_suffix
                .unwrap_or_else(|| DEFAULT_CARD_SUFFIX.to_string()),
            extra: raw.extra,
        }
    }
}

impl Settings {
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        let raw: RawSettings = serde_json::from_str(s)?;
        Ok(raw.into())
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Reads and writes [`Settings`] at a fixed location.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file yields defaults; malformed JSON is an error.
    pub fn load(&self) -> Result<Settings> {
        self.read().map(|(settings, _)| settings)
    }

    /// Like [`load`](Self::load), but writes the defaults out on first run.
    pub fn load_or_init(&self) -> Result<Settings> {
        let (settings, existed) = self.read()?;
        if !existed {
            self.save(&settings)?;
        }
        Ok(settings)
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let write_err = |source: io::Error| Error::SettingsWrite {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = settings.to_json_string().map_err(|e| write_err(e.into()))?;
        fs::write(&self.path, json).map_err(write_err)?;
        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    fn read(&self) -> Result<(Settings, bool)> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file, using defaults");
                return Ok((Settings::default(), false));
            }
            Err(e) => return Err(Error::io(&self.path, e)),
        };
        let settings = Settings::from_json_str(&text).map_err(|source| Error::SettingsParse {
            path: self.path.clone(),
            source,
        })?;
        Ok((settings, true))
    }
}
