//! csel-core: Memory card library, active-card tracking and transfers
//!
//! This crate focuses on a small, well-factored surface:
//! - Path resolution for the card library, the emulator data folder and settings
//! - Fail-soft listing of games and cards, and reading the active-card marker
//! - Load/save transfers and the dirty check that guards unsaved progress
//! - JSON settings persistence and a session that owns the configuration
//!
pub mod error;
pub mod paths;
pub mod repository;
pub mod session;
pub mod settings;
pub mod transfer;

pub use error::{Error, Result};
pub use paths::{BaseDir, ResolvedPaths, RunMode, default_settings_file};
pub use repository::{CardRepository, card_display_name};
pub use session::Session;
pub use settings::{Settings, SettingsStore};
pub use transfer::{CardStatus, LoadOutcome, LoadPolicy, TransferEngine};
