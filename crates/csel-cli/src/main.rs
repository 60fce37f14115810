use clap::{Args as ClapArgs, Parser, Subcommand};
use csel_core::{
    BaseDir, CardStatus, LoadOutcome, LoadPolicy, RunMode, Session, SettingsStore,
    card_display_name,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "csel",
    about = "Swap emulator memory cards between a card library and the active data folder",
    version
)]
struct Cli {
    /// Settings file to use instead of the per-user default
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List games in the card library
    Games,
    /// List cards for a game
    Cards(GameArgs),
    /// Show the active card and whether it has been saved
    Status(StatusArgs),
    /// Make a game the selected one
    Select(SelectArgs),
    /// Copy a library card into the active data folder
    Load(LoadArgs),
    /// Copy the active card back into the library
    Save(GameArgs),
    /// Show or change settings
    #[command(subcommand)]
    Config(ConfigCmd),
}

#[derive(ClapArgs, Debug)]
struct GameArgs {
    /// Game folder name (defaults to the selected game)
    #[arg(long)]
    game: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct StatusArgs {
    #[command(flatten)]
    game: GameArgs,
    /// Print status as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(ClapArgs, Debug)]
struct SelectArgs {
    game: String,
}

#[derive(ClapArgs, Debug)]
struct LoadArgs {
    /// Card file name, e.g. bob.card
    card: String,
    #[command(flatten)]
    game: GameArgs,
    /// Discard unsaved changes without asking
    #[arg(long, short = 'y', default_value_t = false)]
    yes: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigCmd {
    /// Print settings as JSON
    Show,
    /// Update folder settings; omitted values are kept
    Set(ConfigSetArgs),
}

#[derive(ClapArgs, Debug)]
struct ConfigSetArgs {
    #[arg(long)]
    cards_folder: Option<String>,
    #[arg(long)]
    nvram_folder: Option<String>,
    #[arg(long)]
    suffix: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut session = open_session(cli.settings);
    match cli.cmd.unwrap_or(Cmd::Games) {
        Cmd::Games => cmd_games(&session),
        Cmd::Cards(a) => cmd_cards(&session, a),
        Cmd::Status(a) => cmd_status(&session, a),
        Cmd::Select(a) => cmd_select(&mut session, a),
        Cmd::Load(a) => cmd_load(&session, a),
        Cmd::Save(a) => cmd_save(&session, a),
        Cmd::Config(ConfigCmd::Show) => cmd_config_show(&session),
        Cmd::Config(ConfigCmd::Set(a)) => cmd_config_set(&mut session, a),
    }
}

fn open_session(settings: Option<PathBuf>) -> Session {
    let base = BaseDir::detect(RunMode::detect());
    let path = settings.unwrap_or_else(|| csel_core::default_settings_file(&base));
    tracing::debug!(base = %base.path().display(), settings = %path.display(), "opening session");
    Session::open(SettingsStore::new(path), base).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(2);
    })
}

fn game_or_selected(session: &Session, args: GameArgs) -> String {
    args.game
        .unwrap_or_else(|| session.selected_game().to_string())
}

fn cmd_games(session: &Session) {
    let games = session.repository().list_games();
    if games.is_empty() {
        eprintln!(
            "no games found in {}",
            session.paths().cards_root.display()
        );
        return;
    }
    for g in games {
        let mark = if g == session.selected_game() { "*" } else { " " };
        println!("{} {}", mark, g);
    }
}

fn cmd_cards(session: &Session, args: GameArgs) {
    let game = game_or_selected(session, args);
    let repo = session.repository();
    let active = repo.active_card_name(&game);
    for c in repo.list_cards(&game) {
        let mark = if active.as_deref() == Some(c.as_str()) { "*" } else { " " };
        println!("{} {}\t{}", mark, card_display_name(&c), c);
    }
}

fn cmd_status(session: &Session, args: StatusArgs) {
    let game = game_or_selected(session, args.game);
    let active = session.repository().active_card_name(&game);
    let status = session.engine().card_status(&game);
    let label = match status {
        CardStatus::Untracked => "untracked",
        CardStatus::Saved => "saved",
        CardStatus::Dirty => "unsaved changes",
    };
    if args.json {
        let v = status_json(&game, active.as_deref(), status, label);
        let json = serde_json::to_string_pretty(&v).unwrap_or_else(|e| {
            eprintln!("error: {}", e);
            std::process::exit(2);
        });
        println!("{}", json);
    } else {
        println!("game:   {}", game);
        println!("card:   {}", active.as_deref().unwrap_or("<none>"));
        println!("status: {}", label);
    }
}

fn status_json(
    game: &str,
    active: Option<&str>,
    status: CardStatus,
    label: &str,
) -> serde_json::Value {
    serde_json::json!({
        "game": game,
        "activeCard": active,
        "saved": status.is_saved(),
        "status": label,
    })
}

fn cmd_select(session: &mut Session, args: SelectArgs) {
    if !session.repository().list_games().contains(&args.game) {
        eprintln!("unknown game: {}", args.game);
        std::process::exit(4);
    }
    session.select_game(&args.game).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(2);
    });
}

fn cmd_load(session: &Session, args: LoadArgs) {
    let game = game_or_selected(session, args.game);
    let policy = if args.yes {
        LoadPolicy::DiscardUnsaved
    } else {
        LoadPolicy::RequireSaved
    };
    let mut outcome = run_load(session, &game, &args.card, policy);
    if let LoadOutcome::UnsavedChanges { active_card } = &outcome {
        eprintln!("{} has changes that are not in the library.", active_card);
        if !confirm("Active card has not been saved. Continue loading card?") {
            std::process::exit(1);
        }
        outcome = run_load(session, &game, &args.card, LoadPolicy::DiscardUnsaved);
    }
    if outcome == LoadOutcome::Loaded {
        println!("Card is loaded");
    }
}

fn run_load(session: &Session, game: &str, card: &str, policy: LoadPolicy) -> LoadOutcome {
    session
        .engine()
        .load_card(game, card, policy)
        .unwrap_or_else(|e| {
            eprintln!("error: {}", e);
            std::process::exit(3);
        })
}

fn cmd_save(session: &Session, args: GameArgs) {
    let game = game_or_selected(session, args);
    match session.engine().save_card(&game) {
        Ok(card) => println!("Card saved. ({})", card),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(3);
        }
    }
}

fn cmd_config_show(session: &Session) {
    let json = session.settings().to_json_string().unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(2);
    });
    println!("{}", json);
    eprintln!("settings file: {}", session.store().path().display());
}

fn cmd_config_set(session: &mut Session, args: ConfigSetArgs) {
    let current = session.settings().clone();
    let cards = args.cards_folder.unwrap_or(current.cards_folder);
    let nvram = args.nvram_folder.unwrap_or(current.nvram_folder);
    let suffix = args.suffix.unwrap_or(current.card_file_name_suffix);
    let games = session
        .update_folders(&cards, &nvram, &suffix)
        .unwrap_or_else(|e| {
            eprintln!("error: {}", e);
            std::process::exit(2);
        });
    println!("Settings saved! {} game(s) found", games.len());
}

fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn load_args_parse_game_and_yes() {
        let cli = Cli::try_parse_from(["csel", "load", "bob.card", "--game", "initdv3", "-y"])
            .unwrap();
        match cli.cmd {
            Some(Cmd::Load(a)) => {
                assert_eq!(a.card, "bob.card");
                assert_eq!(a.game.game.as_deref(), Some("initdv3"));
                assert!(a.yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn status_json_untracked_card() {
        let v = status_json("initdv3", None, CardStatus::Untracked, "untracked");
        assert_eq!(
            v,
            serde_json::json!({
                "game": "initdv3",
                "activeCard": null,
                "saved": true,
                "status": "untracked",
            })
        );
        assert!(serde_json::to_string_pretty(&v).is_ok());
    }
}
