use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("filesystem error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed settings file {}: {source}", path.display())]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings file {}: {source}", path.display())]
    SettingsWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("card {card} not found for {game} ({})", path.display())]
    CardNotFound {
        game: String,
        card: String,
        path: PathBuf,
    },
    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    Transfer {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no active card to save ({} does not exist)", path.display())]
    NothingToSave { path: PathBuf },
    #[error("unable to determine card name; create {}", marker.display())]
    UnknownDestination { game: String, marker: PathBuf },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
