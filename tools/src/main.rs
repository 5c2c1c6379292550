//! save-tool: inspect and move save data held in a local save database.
//!
//! Usage:
//!   save-tool --db saves.db --user ash summary
//!   save-tool --db saves.db --user ash export system --out ./exports
//!   save-tool --db saves.db --user ash import session backup.prsv --slot 2
//!   save-tool --db saves.db --user ash decode backup.prsv
//!   save-tool --db saves.db --user ash history
//!   save-tool --db saves.db --user ash --ipc-mode

use anyhow::Result;
use gamedata_core::{
    config::{GameDataConfig, SpeciesCatalog},
    game_data::GameData,
    remote::OfflineSaveApi,
    store::SaveStore,
    types::{SaveCategory, SlotId},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Flags that take a value; everything else not starting with `--` is
/// a positional argument.
const VALUE_FLAGS: [&str; 5] = ["--db", "--user", "--data-dir", "--slot", "--out"];

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Summary,
    History,
    Export {
        category: String,
        #[serde(default)]
        slot: SlotId,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct Summary {
    username:        String,
    trainer_id:      u32,
    encoding:        &'static str,
    species_seen:    usize,
    species_caught:  usize,
    starters_owned:  usize,
    pokemon_caught:  u32,
    pokemon_hatched: u32,
    ribbons_owned:   u32,
    cached_sessions: Vec<SlotId>,
    runs_recorded:   usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db").unwrap_or("saves.db");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let slot = parse_arg(&args, "--slot", 0 as SlotId);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let positional = positional_args(&args);

    let mut config = GameDataConfig::load(data_dir)?;
    // The tool never talks to an account server.
    config.offline = true;
    if let Some(user) = flag_value(&args, "--user") {
        config.username = user.to_string();
    }
    let catalog = SpeciesCatalog::load(data_dir)?;
    let store = SaveStore::open(db)?;
    let mut game = GameData::new(config, catalog, store, Arc::new(OfflineSaveApi))?;

    if !game.load_system().await {
        anyhow::bail!("Could not load system data for {} from {db}", game.config().username);
    }
    log::info!("Loaded system data for {} from {db}", game.config().username);

    if ipc_mode {
        return run_ipc_loop(&mut game).await;
    }

    match positional.first().map(String::as_str) {
        Some("summary") | None => print_summary(&game)?,
        Some("history") => print_history(&game)?,
        Some("export") => {
            let category = parse_category(positional.get(1))?;
            let out_dir = flag_value(&args, "--out").unwrap_or(".");
            match game.export_data(category, slot).await? {
                Some(file) => {
                    let path = format!("{out_dir}/{}", file.file_name);
                    std::fs::write(&path, file.contents)
                        .map_err(|e| anyhow::anyhow!("Cannot write {path}: {e}"))?;
                    println!("Exported {category} data to {path}");
                }
                None => println!("No {category} data to export"),
            }
        }
        Some("import") => {
            let category = parse_category(positional.get(1))?;
            let path = positional
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("import needs a file path"))?;
            let contents = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
            let outcome = game.import_data(category, slot, contents.trim()).await;
            println!("{}", outcome.message());
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Some("decode") => {
            let path = positional
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("decode needs a file path"))?;
            let contents = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
            let plain = game.codec().decrypt(contents.trim())?;
            let value: serde_json::Value = serde_json::from_str(&plain)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Some(other) => anyhow::bail!("Unknown command: {other}"),
    }

    Ok(())
}

async fn run_ipc_loop(game: &mut GameData) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let cmd: IpcCommand = match serde_json::from_str(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                continue;
            }
        };
        let reply = match cmd {
            IpcCommand::Summary => serde_json::to_value(build_summary(game)?)?,
            IpcCommand::History => serde_json::to_value(game.run_history().load()?)?,
            IpcCommand::Export { category, slot } => {
                let category = parse_category(Some(&category))?;
                match game.export_data(category, slot).await? {
                    Some(file) => serde_json::json!({ "file_name": file.file_name, "contents": file.contents }),
                    None => serde_json::Value::Null,
                }
            }
            IpcCommand::Quit => break,
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn build_summary(game: &GameData) -> Result<Summary> {
    let ledger = game.ledger();
    Ok(Summary {
        username:        game.config().username.clone(),
        trainer_id:      game.trainer_id,
        encoding:        if game.codec().is_weak() { "weak" } else { "strong" },
        species_seen:    ledger.species_count(|e| e.seen_attr != 0),
        species_caught:  ledger.species_count(|e| e.is_caught()),
        starters_owned:  ledger.starter_count(|s| s.ability_attr != 0),
        pokemon_caught:  ledger.game_stats.pokemon_caught,
        pokemon_hatched: ledger.game_stats.pokemon_hatched,
        ribbons_owned:   ledger.game_stats.ribbons_owned,
        cached_sessions: game
            .store()
            .cached_session_slots(&game.config().username, game.config().session_slots)?,
        runs_recorded:   game.run_history().load()?.len(),
    })
}

fn print_summary(game: &GameData) -> Result<()> {
    let s = build_summary(game)?;
    println!("=== SAVE SUMMARY ===");
    println!("  user:            {}", s.username);
    println!("  trainer id:      {}", s.trainer_id);
    println!("  local encoding:  {}", s.encoding);
    println!("  species seen:    {}", s.species_seen);
    println!("  species caught:  {}", s.species_caught);
    println!("  starters owned:  {}", s.starters_owned);
    println!("  caught / hatched {} / {}", s.pokemon_caught, s.pokemon_hatched);
    println!("  ribbons:         {}", s.ribbons_owned);
    println!("  session slots:   {:?}", s.cached_sessions);
    println!("  runs recorded:   {}", s.runs_recorded);
    Ok(())
}

fn print_history(game: &GameData) -> Result<()> {
    let history = game.run_history().load()?;
    if history.is_empty() {
        println!("  (No runs recorded yet)");
        return Ok(());
    }
    println!("=== RUN HISTORY ===");
    for (timestamp, run) in &history {
        let result = if run.is_victory { "victory" } else { "defeat" };
        let favorite = if run.is_favorite { " *" } else { "" };
        println!(
            "  {timestamp}  wave {:>4}  {:?}  {result}{favorite}",
            run.entry.wave_index, run.entry.game_mode
        );
    }
    Ok(())
}

fn parse_category(arg: Option<&String>) -> Result<SaveCategory> {
    let name = arg.ok_or_else(|| anyhow::anyhow!("missing data category"))?;
    SaveCategory::parse(name).ok_or_else(|| anyhow::anyhow!("Unknown data category: {name}"))
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn positional_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            out.push(arg.clone());
        }
    }
    out
}
