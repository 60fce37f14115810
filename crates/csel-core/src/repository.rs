use std::fs;
use std::io;
use std::path::{Component, Path};

use tracing::warn;
use walkdir::WalkDir;

use crate::paths::ResolvedPaths;

#[derive(Clone, Copy)]
enum EntryKind {
    Dir,
    File,
}

/// Read-only view of the card library and the active-card markers.
///
/// Every query here is fail-soft: read errors are logged and collapse to an
/// empty list or `None`.
#[derive(Debug, Clone, Copy)]
pub struct CardRepository<'a> {
    paths: &'a ResolvedPaths,
}

impl<'a> CardRepository<'a> {
    pub fn new(paths: &'a ResolvedPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &'a ResolvedPaths {
        self.paths
    }

    pub fn list_games(&self) -> Vec<String> {
        list_entries(&self.paths.cards_root, EntryKind::Dir)
    }

    pub fn list_cards(&self, game: &str) -> Vec<String> {
        list_entries(&self.paths.game_dir(game), EntryKind::File)
    }

    pub fn active_card_name(&self, game: &str) -> Option<String> {
        let marker = self.paths.marker_file(game);
        match fs::read_to_string(&marker) {
            Ok(s) => parse_marker(&s),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %marker.display(), error = %e, "cannot read active card marker");
                None
            }
        }
    }
}

/// Card name without its last extension, as shown to the user.
pub fn card_display_name(card: &str) -> &str {
    match card.rfind('.') {
        Some(0) | None => card,
        Some(i) => &card[..i],
    }
}

/// True for a single path component with no separators, `.` or `..`.
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut comps = Path::new(name).components();
    matches!(
        (comps.next(), comps.next()),
        (Some(Component::Normal(c)), None) if c.to_str() == Some(name)
    )
}

// Editors tend to append a newline to hand-written markers.
fn parse_marker(contents: &str) -> Option<String> {
    let name = contents.trim_end_matches(['\r', '\n']);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn list_entries(dir: &Path, kind: EntryKind) -> Vec<String> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "error reading directory");
                return Vec::new();
            }
        };
        let ft = entry.file_type();
        let wanted = match kind {
            EntryKind::Dir => ft.is_dir(),
            EntryKind::File => ft.is_file(),
        };
        if !wanted {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => out.push(name.to_string()),
            None => warn!(path = %entry.path().display(), "skipping non UTF-8 entry"),
        }
    }
    out
}
