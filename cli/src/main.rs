use std::{fs, path::PathBuf};

use anyhow::{bail, Context};
use battle_engine::api::{self, BattleConfig};
use battle_engine::content::{Format, Library};
use battle_engine::Side;
use clap::{ArgAction, Parser, Subcommand};
use encoding_rs::Encoding;

#[derive(Subcommand)]
enum Cmd {
    /// Run one scripted battle and print its log
    Simulate {
        /// Battle config file (JSON or YAML)
        #[arg(long, conflicts_with = "builtin")]
        config: Option<PathBuf>,
        /// Builtin encounter id
        #[arg(long, default_value = "forest_skirmish")]
        builtin: String,
        /// Override the config's RNG seed
        #[arg(long)]
        seed: Option<u64>,
        /// Print the full result as JSON instead of the log
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print move lists with their action command summaries
    Catalog {
        /// Only this move list
        #[arg(long)]
        list: Option<String>,
        /// Extra move list file to include
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the opening turn order of an encounter
    TurnOrder {
        /// Builtin encounter id
        #[arg(long, default_value = "forest_skirmish")]
        builtin: String,
    },
    /// Dump the hero party of an encounter as JSON snapshots
    RosterDump {
        /// Builtin encounter id
        #[arg(long, default_value = "forest_skirmish")]
        builtin: String,
        /// Pretty-print JSON
        #[arg(long, default_value_t = true)]
        pretty: bool,
    },
}

#[derive(Parser)]
#[command(name = "battle-cli")]
#[command(about = "Battle engine CLI harness")]
struct Cli {
    /// More diagnostics on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

fn read_text_auto(path: &std::path::Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn load_config(path: &std::path::Path) -> anyhow::Result<BattleConfig> {
    let text = read_text_auto(path)?;
    BattleConfig::parse(&text, Format::from_path(path))
        .with_context(|| format!("invalid battle config {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    battle_engine::logging::init(cli.verbose);

    match cli.cmd {
        Cmd::Simulate { config, builtin, seed, json } => {
            let mut cfg = match config {
                Some(path) => load_config(&path)?,
                None => BattleConfig::builtin(builtin, 0),
            };
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            let res = api::simulate_battle(cfg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&res)?);
            } else {
                for line in &res.log {
                    println!("{}", line);
                }
                println!(
                    "winner={} turns={} experience={}",
                    res.winner, res.turns, res.experience
                );
            }
        }
        Cmd::Catalog { list, file } => {
            let mut library = Library::builtin()?;
            if let Some(path) = file {
                library.load_file(&path)?;
            }
            if let Some(id) = list.as_deref() {
                if library.list(id).is_none() {
                    bail!("unknown move list '{}'", id);
                }
            }
            for (id, moves) in library.iter() {
                if list.as_deref().is_some_and(|wanted| wanted != id) {
                    continue;
                }
                println!("{} ({})", moves.name, id);
                for action in &moves.actions {
                    let cost = if action.mana_cost() > 0 {
                        format!(" {} MP", action.mana_cost())
                    } else {
                        String::new()
                    };
                    println!(
                        "  {:<22} Lv{:<2}{} -> {} [{}]",
                        action.name(),
                        action.required_level(),
                        cost,
                        action.target_label(),
                        action.command_summary()
                    );
                }
            }
        }
        Cmd::TurnOrder { builtin } => {
            let order = api::turn_order(&BattleConfig::builtin(builtin, 0))?;
            for (i, name) in order.iter().enumerate() {
                println!("{}. {}", i + 1, name);
            }
        }
        Cmd::RosterDump { builtin, pretty } => {
            let cfg = BattleConfig::builtin(builtin, 0);
            let library = api::build_library(&cfg)?;
            let heroes: Vec<_> = api::build_roster(&cfg, &library)?
                .into_iter()
                .filter(|c| c.stats.side == Side::Hero)
                .map(|c| c.stats)
                .collect();
            if pretty {
                println!("{}", serde_json::to_string_pretty(&heroes)?);
            } else {
                println!("{}", serde_json::to_string(&heroes)?);
            }
        }
    }
    Ok(())
}
