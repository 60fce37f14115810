//! Resolution of the library, active-data and settings locations.

use std::env;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::settings::Settings;

pub const APP_NAME: &str = "initiald-card-selector";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DEV_ENV_VAR: &str = "CSEL_DEV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Relative folders are anchored at the working directory.
    Development,
    /// Relative folders are anchored next to the executable.
    Packaged,
}

impl RunMode {
    pub fn detect() -> Self {
        if cfg!(debug_assertions) || env::var_os(DEV_ENV_VAR).is_some() {
            RunMode::Development
        } else {
            RunMode::Packaged
        }
    }
}

/// Directory that relative settings paths are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDir(PathBuf);

impl BaseDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn detect(mode: RunMode) -> Self {
        let cwd = || env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let dir = match mode {
            RunMode::Development => cwd(),
            RunMode::Packaged => env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
                .unwrap_or_else(cwd),
        };
        Self(dir)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn join(&self, p: impl AsRef<Path>) -> PathBuf {
        let p = p.as_ref();
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.0.join(p)
        }
    }
}

/// Library and active-data roots derived from [`Settings`]. Rebuild whenever
/// `cards_folder` or `nvram_folder` change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub cards_root: PathBuf,
    pub nvram_root: PathBuf,
}

impl ResolvedPaths {
    pub fn resolve(base: &BaseDir, settings: &Settings) -> Self {
        Self {
            cards_root: base.join(&settings.cards_folder),
            nvram_root: base.join(&settings.nvram_folder),
        }
    }

    pub fn game_dir(&self, game: &str) -> PathBuf {
        self.cards_root.join(game)
    }

    pub fn library_card(&self, game: &str, card: &str) -> PathBuf {
        self.game_dir(game).join(card)
    }

    pub fn marker_file(&self, game: &str) -> PathBuf {
        self.nvram_root.join(format!("{game}.txt"))
    }

    pub fn active_card_file(&self, game: &str, suffix: &str) -> PathBuf {
        self.nvram_root.join(format!("{game}{suffix}"))
    }
}

pub fn default_settings_file(base: &BaseDir) -> PathBuf {
    match ProjectDirs::from("", "", APP_NAME) {
        Some(dirs) => dirs.config_dir().join(SETTINGS_FILE_NAME),
        None => base.join(SETTINGS_FILE_NAME),
    }
}
