//! Load/save of memory cards between the library and the emulator's data
//! folder, plus the dirty check guarding unsaved progress.
//!
//! Nothing here prompts the user. A load that would discard unsaved changes
//! returns [`LoadOutcome::UnsavedChanges`] and leaves every file alone; the
//! caller decides whether to retry with [`LoadPolicy::DiscardUnsaved`].

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::paths::ResolvedPaths;
use crate::repository::{CardRepository, is_plain_file_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStatus {
    /// No marker, so nothing is tracked.
    Untracked,
    Saved,
    Dirty,
}

impl CardStatus {
    pub fn is_saved(self) -> bool {
        !matches!(self, CardStatus::Dirty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    RequireSaved,
    DiscardUnsaved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// The active card differs from its library copy; nothing was touched.
    UnsavedChanges { active_card: String },
}

#[derive(Debug, Clone, Copy)]
pub struct TransferEngine<'a> {
    paths: &'a ResolvedPaths,
    suffix: &'a str,
}

impl<'a> TransferEngine<'a> {
    pub fn new(paths: &'a ResolvedPaths, suffix: &'a str) -> Self {
        Self { paths, suffix }
    }

    pub fn repository(&self) -> CardRepository<'a> {
        CardRepository::new(self.paths)
    }

    pub fn card_status(&self, game: &str) -> CardStatus {
        let Some(card) = self.repository().active_card_name(game) else {
            return CardStatus::Untracked;
        };
        let active = read_optional(&self.paths.active_card_file(game, self.suffix));
        let saved = read_optional(&self.paths.library_card(game, &card));
        // Both sides missing compares equal: there is nothing to lose.
        if active == saved {
            CardStatus::Saved
        } else {
            CardStatus::Dirty
        }
    }

    pub fn is_active_card_saved(&self, game: &str) -> bool {
        self.card_status(game).is_saved()
    }

    pub fn load_card(&self, game: &str, card: &str, policy: LoadPolicy) -> Result<LoadOutcome> {
        if policy == LoadPolicy::RequireSaved
            && let Some(active_card) = self.dirty_card(game)
        {
            debug!(game, active_card = %active_card, "load blocked by unsaved changes");
            return Ok(LoadOutcome::UnsavedChanges { active_card });
        }

        let src = self.paths.library_card(game, card);
        if !is_plain_file_name(card) || !src.is_file() {
            return Err(Error::CardNotFound {
                game: game.to_string(),
                card: card.to_string(),
                path: src,
            });
        }
        let dest = self.paths.active_card_file(game, self.suffix);
        copy_replace(&src, &dest)?;

        // Only reached once the bytes are in place.
        let marker = self.paths.marker_file(game);
        write_replace(&marker, card.as_bytes()).map_err(|e| Error::io(&marker, e))?;
        info!(game, card, "card loaded");
        Ok(LoadOutcome::Loaded)
    }

    /// Writes the active card back under the name recorded in the marker.
    pub fn save_card(&self, game: &str) -> Result<String> {
        let src = self.paths.active_card_file(game, self.suffix);
        if !src.is_file() {
            return Err(Error::NothingToSave { path: src });
        }
        // A marker naming anything but a file inside the game folder is unusable.
        let Some(card) = self
            .repository()
            .active_card_name(game)
            .filter(|c| is_plain_file_name(c))
        else {
            return Err(Error::UnknownDestination {
                game: game.to_string(),
                marker: self.paths.marker_file(game),
            });
        };
        let dest = self.paths.library_card(game, &card);
        copy_replace(&src, &dest)?;
        info!(game, card = %card, "card saved");
        Ok(card)
    }

    fn dirty_card(&self, game: &str) -> Option<String> {
        match self.card_status(game) {
            CardStatus::Dirty => self.repository().active_card_name(game),
            _ => None,
        }
    }
}

fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                debug!(path = %path.display(), error = %e, "card read failed");
            }
            None
        }
    }
}

fn copy_replace(from: &Path, to: &Path) -> Result<()> {
    debug!(from = %from.display(), to = %to.display(), "copying card");
    let transfer_err = |source: io::Error| Error::Transfer {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    let bytes = fs::read(from).map_err(transfer_err)?;
    write_replace(to, &bytes).map_err(transfer_err)
}

// Stage into a sibling temp file and rename over the target, so a failure
// leaves the previous contents in place.
fn write_replace(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
