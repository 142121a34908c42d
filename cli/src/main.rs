use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use sr1e_engine::api::{load_encounter, resolve_roll, run_encounter, spend_karma, KarmaAction};
use sr1e_engine::{
    calculate_phases, parse_notation, roll_opposed, sanitize, validate_notation, Dice, DiceSpec,
    EngineConfig, KarmaLedger, RollResult,
};

#[derive(Subcommand)]
enum KarmaCmd {
    /// Reroll the failed dice of a test
    Reroll {
        /// Failed faces, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        failed: Vec<u32>,
        #[arg(long)]
        tn: u32,
        /// Which reroll of the same test this is (costs that much karma)
        #[arg(long, default_value_t = 1)]
        iteration: u32,
        #[arg(long)]
        exploding: bool,
    },
    /// Buy extra dice, one karma each
    BuyDice {
        #[arg(long)]
        count: u32,
        #[arg(long)]
        tn: u32,
        #[arg(long)]
        exploding: bool,
        /// Override the karma dice ceiling
        #[arg(long)]
        max: Option<u32>,
    },
    /// Buy successes outright (permanent cost)
    BuySuccesses {
        #[arg(long)]
        current: u32,
        #[arg(long)]
        buy: u32,
    },
    /// Spend a point to downgrade an all-ones roll
    AvoidDisaster {
        #[arg(long, value_delimiter = ',', required = true)]
        rolls: Vec<u32>,
    },
}

impl From<KarmaCmd> for KarmaAction {
    fn from(cmd: KarmaCmd) -> Self {
        match cmd {
            KarmaCmd::Reroll { failed, tn, iteration, exploding } => {
                KarmaAction::Reroll { failed, target_number: tn, iteration, exploding }
            }
            KarmaCmd::BuyDice { count, tn, exploding, max } => {
                KarmaAction::BuyDice { count, target_number: tn, exploding, max_allowed: max }
            }
            KarmaCmd::BuySuccesses { current, buy } => KarmaAction::BuySuccesses { current, buy },
            KarmaCmd::AvoidDisaster { rolls } => KarmaAction::AvoidDisaster { rolls },
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Roll dice notation, e.g. `roll 2d6+5 tn4`
    Roll {
        /// Notation and optional tn clause
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// RNG seed for determinism; omitted means a fresh roll
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Opposed test: attacker successes minus defender successes
    Opposed {
        attacker: String,
        defender: String,
        #[arg(long, default_value_t = 4)]
        attacker_tn: u32,
        #[arg(long, default_value_t = 4)]
        defender_tn: u32,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the canonical form of a notation
    Validate {
        #[arg(required = true, num_args = 1..)]
        notation: Vec<String>,
    },
    /// Clean chat text the way commands are cleaned before parsing
    Sanitize {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Roll initiative for an encounter file or a builtin encounter
    Init {
        /// Path to an encounter JSON, or a builtin id (street_ambush, arcology_raid)
        #[arg(long)]
        encounter: String,
        /// Override the encounter's seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List the passes a multi-pass initiative score acts in
    Phases {
        initiative: i64,
    },
    /// Spend karma from a pool
    Karma {
        /// Karma pool size
        #[arg(long)]
        pool: u32,
        #[arg(long)]
        seed: Option<u64>,
        #[command(subcommand)]
        action: KarmaCmd,
    },
}

#[derive(Parser)]
#[command(name = "sr1e-cli")]
#[command(about = "Dice, initiative and karma harness")]
struct Cli {
    /// Engine config (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn dice_for(seed: Option<u64>) -> Dice {
    seed.map_or_else(Dice::from_entropy, Dice::from_seed)
}

fn emit<T: Serialize>(json: bool, value: &T, log: &[String]) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        for line in log {
            println!("{}", line);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };

    match cli.cmd {
        Cmd::Roll { text, seed } => {
            let line = format!("roll {}", text.join(" "));
            let report = resolve_roll(&line, &config, seed)?;
            emit(cli.json, &report, &report.log)?;
        }
        Cmd::Opposed { attacker, defender, attacker_tn, defender_tn, seed } => {
            let limits = &config.limits;
            let att = parse_notation(&attacker, limits)?.with_target_number(attacker_tn, limits)?;
            let def = parse_notation(&defender, limits)?.with_target_number(defender_tn, limits)?;
            let mut dice = dice_for(seed);
            let res = roll_opposed(&att, &def, limits, &mut dice)?;
            let side = |tag: &str, spec: &DiceSpec, tn: u32, result: &RollResult| {
                format!(
                    "[{}] {} vs TN {}: {:?}, {} successes",
                    tag,
                    spec,
                    tn,
                    result.rolls,
                    result.success_count()
                )
            };
            let log = vec![
                side("ATTACKER", &att, attacker_tn, &res.attacker),
                side("DEFENDER", &def, defender_tn, &res.defender),
                format!("[NET] {:+}", res.net_successes),
            ];
            emit(cli.json, &res, &log)?;
        }
        Cmd::Validate { notation } => {
            let canonical = validate_notation(&notation.join(" "), &config.limits)?;
            emit(cli.json, &canonical, std::slice::from_ref(&canonical))?;
        }
        Cmd::Sanitize { text } => {
            let cleaned = sanitize(&text.join(" "))?;
            emit(cli.json, &cleaned, std::slice::from_ref(&cleaned))?;
        }
        Cmd::Init { encounter, seed } => {
            let mut cfg = load_encounter(&encounter)?;
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            let report = run_encounter(cfg, &config)?;
            emit(cli.json, &report, &report.log)?;
        }
        Cmd::Phases { initiative } => {
            let phases = calculate_phases(initiative);
            let line = if phases.is_empty() {
                format!("{}: single pass", initiative)
            } else {
                let parts: Vec<String> = phases.iter().map(i64::to_string).collect();
                format!("{}: {}", initiative, parts.join(", "))
            };
            emit(cli.json, &phases, &[line])?;
        }
        Cmd::Karma { pool, seed, action } => {
            let mut ledger = KarmaLedger::new(pool);
            let mut dice = dice_for(seed);
            let action = KarmaAction::from(action);
            let report = spend_karma(&mut ledger, &action, &config, &mut dice)?;
            emit(cli.json, &report, &report.log)?;
        }
    }
    Ok(())
}
