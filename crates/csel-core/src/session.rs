use tracing::info;

use crate::error::Result;
use crate::paths::{BaseDir, ResolvedPaths};
use crate::repository::CardRepository;
use crate::settings::{Settings, SettingsStore};
use crate::transfer::TransferEngine;

/// Owns the configuration and the paths derived from it.
///
/// Every mutation goes through a method here so the settings file and
/// [`ResolvedPaths`] never lag behind the in-memory [`Settings`].
#[derive(Debug)]
pub struct Session {
    store: SettingsStore,
    base: BaseDir,
    settings: Settings,
    paths: ResolvedPaths,
}

impl Session {
    /// Loads settings (writing defaults on first run) and makes sure the
    /// selected game exists in the library.
    pub fn open(store: SettingsStore, base: BaseDir) -> Result<Self> {
        let settings = store.load_or_init()?;
        let paths = ResolvedPaths::resolve(&base, &settings);
        let mut session = Self {
            store,
            base,
            settings,
            paths,
        };
        session.refresh()?;
        Ok(session)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    pub fn base(&self) -> &BaseDir {
        &self.base
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn selected_game(&self) -> &str {
        &self.settings.game
    }

    pub fn repository(&self) -> CardRepository<'_> {
        CardRepository::new(&self.paths)
    }

    pub fn engine(&self) -> TransferEngine<'_> {
        TransferEngine::new(&self.paths, &self.settings.card_file_name_suffix)
    }

    pub fn select_game(&mut self, game: &str) -> Result<()> {
        self.settings.game = game.to_string();
        self.store.save(&self.settings)
    }

    /// Applies new folder settings and re-lists the library against them.
    pub fn update_folders(
        &mut self,
        cards_folder: &str,
        nvram_folder: &str,
        suffix: &str,
    ) -> Result<Vec<String>> {
        self.settings.cards_folder = cards_folder.to_string();
        self.settings.nvram_folder = nvram_folder.to_string();
        self.settings.card_file_name_suffix = suffix.to_string();
        self.store.save(&self.settings)?;
        self.paths = ResolvedPaths::resolve(&self.base, &self.settings);
        self.refresh()
    }

    /// Lists games and falls back to the first one when the selected game is
    /// gone. The fallback is persisted.
    pub fn refresh(&mut self) -> Result<Vec<String>> {
        let games = self.repository().list_games();
        if let Some(first) = games.first()
            && !games.contains(&self.settings.game)
        {
            info!(
                configured = %self.settings.game,
                fallback = %first,
                "selected game not found in library"
            );
            self.settings.game = first.clone();
            self.store.save(&self.settings)?;
        }
        Ok(games)
    }
}
