use chrono::{DateTime, Local};
use csel_core::{
    BaseDir, CardStatus, LoadOutcome, LoadPolicy, RunMode, Session, SettingsStore,
    card_display_name,
};
use eframe::{App, egui};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct State {
    games: Vec<String>,
    cards: Vec<String>,
    selected_card: Option<String>,
    card_status: Option<CardStatus>,
    status: String,
    // Settings form, committed with "Save settings"
    cards_folder: String,
    nvram_folder: String,
    card_suffix: String,
    // Confirmation flags
    confirm_load: Option<PendingLoad>,
    last_transfer_time: Option<DateTime<Local>>,
}

/// A load held back by unsaved changes, waiting for the user's answer.
#[derive(Debug, Clone, PartialEq)]
struct PendingLoad {
    active_card: String,
    target_card: String,
}

struct AppGui {
    session: Option<Session>,
    state: State,
}

impl AppGui {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let base = BaseDir::detect(RunMode::detect());
        let store = SettingsStore::new(csel_core::default_settings_file(&base));
        let mut app = Self {
            session: None,
            state: State::default(),
        };
        match Session::open(store, base) {
            Ok(session) => {
                let s = session.settings();
                app.state.cards_folder = s.cards_folder.clone();
                app.state.nvram_folder = s.nvram_folder.clone();
                app.state.card_suffix = s.card_file_name_suffix.clone();
                app.session = Some(session);
                app.refresh_games();
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot open settings");
                app.state.status = format!("Settings error: {}", e);
            }
        }
        app
    }

    fn refresh_games(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };
        match session.refresh() {
            Ok(games) => self.state.games = games,
            Err(e) => self.state.status = format!("Settings error: {}", e),
        }
        self.refresh_cards();
    }

    fn refresh_cards(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let game = session.selected_game();
        let repo = session.repository();
        self.state.cards = repo.list_cards(game);
        let keep = self
            .state
            .selected_card
            .take()
            .filter(|c| self.state.cards.contains(c));
        self.state.selected_card = keep
            .or_else(|| {
                repo.active_card_name(game)
                    .filter(|c| self.state.cards.contains(c))
            })
            .or_else(|| self.state.cards.first().cloned());
        self.state.card_status = Some(session.engine().card_status(game));
    }

    fn select_game(&mut self, game: String) {
        let Some(session) = &mut self.session else {
            return;
        };
        if let Err(e) = session.select_game(&game) {
            self.state.status = format!("Settings error: {}", e);
        }
        // Card names are per game; start from the new game's marker.
        self.state.selected_card = None;
        self.state.confirm_load = None;
        self.refresh_cards();
    }

    fn save_settings(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };
        match session.update_folders(
            &self.state.cards_folder,
            &self.state.nvram_folder,
            &self.state.card_suffix,
        ) {
            Ok(games) => {
                self.state.games = games;
                self.state.status = "Settings saved!".into();
            }
            Err(e) => self.state.status = format!("Settings error: {}", e),
        }
        self.refresh_cards();
    }

    fn load_selected(&mut self) {
        if let Some(card) = self.state.selected_card.clone() {
            self.load(card, LoadPolicy::RequireSaved);
        }
    }

    /// Continues a load the user confirmed, with the card they picked.
    fn confirm_pending_load(&mut self) {
        if let Some(pending) = self.state.confirm_load.take() {
            self.load(pending.target_card, LoadPolicy::DiscardUnsaved);
        }
    }

    fn load(&mut self, card: String, policy: LoadPolicy) {
        let Some(session) = &self.session else {
            return;
        };
        let game = session.selected_game().to_string();
        match session.engine().load_card(&game, &card, policy) {
            Ok(LoadOutcome::Loaded) => {
                self.state.status = "Card is loaded".into();
                self.state.last_transfer_time = Some(Local::now());
                self.state.confirm_load = None;
            }
            Ok(LoadOutcome::UnsavedChanges { active_card }) => {
                self.state.confirm_load = Some(PendingLoad {
                    active_card,
                    target_card: card,
                });
            }
            Err(e) => {
                self.state.status = format!("Load error: {}", e);
                self.state.confirm_load = None;
            }
        }
        self.refresh_cards();
    }

    fn save_active(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let game = session.selected_game().to_string();
        match session.engine().save_card(&game) {
            Ok(card) => {
                self.state.status = format!("Card saved. ({})", card_display_name(&card));
                self.state.last_transfer_time = Some(Local::now());
            }
            Err(e) => self.state.status = format!("Save error: {}", e),
        }
        self.refresh_cards();
    }

    fn pick_folder(target: &mut String) {
        if let Some(dir) = rfd::FileDialog::new().set_directory(".").pick_folder() {
            *target = dir.display().to_string();
        }
    }
}

impl App for AppGui {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(time) = self.state.last_transfer_time {
                    ui.label(format!("Last transfer: {}", time.format("%Y-%m-%d %H:%M:%S")));
                    ui.separator();
                }
                ui.label(&self.state.status);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Card");
            let selected_game = self
                .session
                .as_ref()
                .map(|s| s.selected_game().to_string())
                .unwrap_or_default();
            let mut picked_game: Option<String> = None;
            ui.horizontal(|ui| {
                ui.label("Game");
                egui::ComboBox::from_id_source("games")
                    .selected_text(&selected_game)
                    .show_ui(ui, |ui| {
                        for g in &self.state.games {
                            if ui.selectable_label(*g == selected_game, g).clicked() {
                                picked_game = Some(g.clone());
                            }
                        }
                    });
            });
            if let Some(g) = picked_game {
                self.state.confirm_load = None;
                self.select_game(g);
            }

            ui.horizontal(|ui| {
                ui.label("Card");
                let text = self
                    .state
                    .selected_card
                    .as_deref()
                    .map(card_display_name)
                    .unwrap_or("<none>");
                egui::ComboBox::from_id_source("cards")
                    .selected_text(text)
                    .show_ui(ui, |ui| {
                        for c in &self.state.cards {
                            ui.selectable_value(
                                &mut self.state.selected_card,
                                Some(c.clone()),
                                card_display_name(c),
                            );
                        }
                    });
                match self.state.card_status {
                    Some(CardStatus::Dirty) => ui.label("unsaved changes"),
                    Some(CardStatus::Saved) => ui.label("saved"),
                    _ => ui.label(""),
                };
            });

            ui.horizontal(|ui| {
                if ui.button("Load card").clicked() {
                    self.state.confirm_load = None;
                    self.load_selected();
                }
                if ui.button("Save card").clicked() {
                    self.save_active();
                }
            });

            if let Some(pending) = self.state.confirm_load.clone() {
                ui.horizontal(|ui| {
                    ui.label(format!(
                        "Active card {} has not been saved. Continue loading {}?",
                        card_display_name(&pending.active_card),
                        card_display_name(&pending.target_card)
                    ));
                    if ui.button("Continue").clicked() {
                        self.confirm_pending_load();
                    }
                    if ui.button("Cancel").clicked() {
                        self.state.confirm_load = None;
                    }
                });
            }

            ui.separator();
            ui.heading("Settings");
            egui::Grid::new("settings_grid").num_columns(3).show(ui, |ui| {
                ui.label("Cards folder");
                ui.text_edit_singleline(&mut self.state.cards_folder);
                if ui.button("Browse").clicked() {
                    Self::pick_folder(&mut self.state.cards_folder);
                }
                ui.end_row();
                ui.label("NVRAM folder");
                ui.text_edit_singleline(&mut self.state.nvram_folder);
                if ui.button("Browse").clicked() {
                    Self::pick_folder(&mut self.state.nvram_folder);
                }
                ui.end_row();
                ui.label("Card file suffix");
                ui.text_edit_singleline(&mut self.state.card_suffix);
                ui.end_row();
            });
            if ui.button("Save settings").clicked() {
                self.save_settings();
            }
        });
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let native_options = eframe::NativeOptions {
        viewport: egui::viewport::ViewportBuilder::default()
            .with_inner_size([520.0, 360.0])
            .with_min_inner_size([420.0, 300.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Card Selector",
        native_options,
        Box::new(|cc| Ok(Box::new(AppGui::new(cc)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    // cards/initdv3/{alice,bob}.card with bob.card loaded and modified
    fn app_with_dirty_bob(root: &Path) -> AppGui {
        let game = root.join("cards/initdv3");
        fs::create_dir_all(&game).unwrap();
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(game.join("alice.card"), b"alice-bytes").unwrap();
        fs::write(game.join("bob.card"), b"bob-bytes").unwrap();
        fs::write(root.join("data/initdv3.txt"), "bob.card").unwrap();
        fs::write(root.join("data/initdv3.zip.card"), b"unsaved progress").unwrap();

        let store = SettingsStore::new(root.join("settings.json"));
        let session = Session::open(store, BaseDir::new(root)).unwrap();
        let mut app = AppGui {
            session: Some(session),
            state: State::default(),
        };
        app.refresh_games();
        app
    }

    #[test]
    fn dirty_card_asks_before_loading_and_keeps_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_dirty_bob(dir.path());
        assert_eq!(app.state.selected_card.as_deref(), Some("bob.card"));
        assert_eq!(app.state.card_status, Some(CardStatus::Dirty));

        app.state.selected_card = Some("alice.card".into());
        app.load_selected();
        assert_eq!(
            app.state.confirm_load,
            Some(PendingLoad {
                active_card: "bob.card".into(),
                target_card: "alice.card".into(),
            })
        );
        assert_eq!(app.state.selected_card.as_deref(), Some("alice.card"));
        assert_eq!(
            fs::read(dir.path().join("data/initdv3.zip.card")).unwrap(),
            b"unsaved progress"
        );
    }

    #[test]
    fn continue_loads_the_chosen_card() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_dirty_bob(dir.path());
        app.state.selected_card = Some("alice.card".into());
        app.load_selected();
        // Selection changes between prompt and answer do not change the target.
        app.state.selected_card = Some("bob.card".into());
        app.confirm_pending_load();

        assert_eq!(app.state.confirm_load, None);
        assert_eq!(
            fs::read_to_string(dir.path().join("data/initdv3.txt")).unwrap(),
            "alice.card"
        );
        assert_eq!(
            fs::read(dir.path().join("data/initdv3.zip.card")).unwrap(),
            b"alice-bytes"
        );
        assert_eq!(
            fs::read(dir.path().join("cards/initdv3/bob.card")).unwrap(),
            b"bob-bytes"
        );
        assert_eq!(app.state.card_status, Some(CardStatus::Saved));
        assert!(app.state.last_transfer_time.is_some());
    }

    #[test]
    fn cancel_leaves_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_dirty_bob(dir.path());
        app.state.selected_card = Some("alice.card".into());
        app.load_selected();
        app.state.confirm_load = None;
        app.confirm_pending_load();
        assert_eq!(
            fs::read_to_string(dir.path().join("data/initdv3.txt")).unwrap(),
            "bob.card"
        );
        assert_eq!(
            fs::read(dir.path().join("data/initdv3.zip.card")).unwrap(),
            b"unsaved progress"
        );
    }

    #[test]
    fn saved_card_loads_without_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_dirty_bob(dir.path());
        app.save_active();
        assert_eq!(app.state.card_status, Some(CardStatus::Saved));
        app.state.selected_card = Some("alice.card".into());
        app.load_selected();
        assert_eq!(app.state.confirm_load, None);
        assert_eq!(
            fs::read_to_string(dir.path().join("data/initdv3.txt")).unwrap(),
            "alice.card"
        );
    }
}
