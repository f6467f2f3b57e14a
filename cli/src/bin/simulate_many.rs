use std::{fs, path::PathBuf};

use anyhow::Context;
use battle_engine::api::{simulate_battle_many, BattleConfig};
use battle_engine::content::Format;
use clap::{ArgAction, Parser};
use encoding_rs::Encoding;

#[derive(Parser)]
#[command(name = "simulate-many")]
#[command(about = "Monte Carlo sim: many scripted battles, aggregated")]
struct Args {
    /// Builtin encounter id
    #[arg(long, default_value = "forest_skirmish")]
    builtin: String,

    /// Battle config file; overrides --builtin
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of battles
    #[arg(long, default_value_t = 100)]
    samples: u32,

    /// RNG base seed (battle i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Scripted player accuracy in percent
    #[arg(long)]
    skill: Option<u32>,

    /// Print the summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
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

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    battle_engine::logging::init(args.verbose);

    let mut cfg = match &args.config {
        Some(path) => {
            let text = read_text_auto(path)?;
            BattleConfig::parse(&text, Format::from_path(path))?
        }
        None => BattleConfig::builtin(args.builtin.clone(), args.seed),
    };
    cfg.seed = args.seed;
    if let Some(skill) = args.skill {
        cfg.player_skill = skill.min(100);
    }

    let summary = simulate_battle_many(cfg, args.samples)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let pct = |n: u32| {
        if summary.samples == 0 {
            0.0
        } else {
            100.0 * n as f64 / summary.samples as f64
        }
    };
    println!("samples={}", summary.samples);
    println!(
        "heroes={} ({:.1}%) enemies={} ({:.1}%) draws={} ({:.1}%)",
        summary.hero_wins,
        pct(summary.hero_wins),
        summary.enemy_wins,
        pct(summary.enemy_wins),
        summary.draws,
        pct(summary.draws)
    );
    println!(
        "avg_turns={:.2} avg_experience={:.2}",
        summary.avg_turns, summary.avg_experience
    );
    Ok(())
}
