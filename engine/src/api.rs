//! Whole-operation entry points used by the CLI: one call takes raw input,
//! runs the mechanics and hands back the result with a readable log.

use std::fs;

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};

use crate::command::{parse_roll_command, RollCommand};
use crate::config::EngineConfig;
use crate::content::builtin_encounters;
use crate::dice::{roll, RollResult};
use crate::error::{Result, RuleViolation, ValidationError};
use crate::initiative::{
    track_initiative, Entrant, InitiativeFormula, InitiativeOrder, RuleSystem,
};
use crate::karma::{
    avoid_disaster, buy_karma_dice, buy_successes, reroll_cost, reroll_failures, AvoidedDisaster,
    BoughtSuccesses, KarmaCost, KarmaDice, KarmaLedger, RerollOutcome, AVOID_DISASTER_COST,
};
use crate::notation::parse_terms;
use crate::sanitize::sanitize;
use crate::source::{Dice, DiceSource};

fn dice_for(seed: Option<u64>) -> Dice {
    match seed {
        Some(seed) => Dice::from_seed(seed),
        None => Dice::from_entropy(),
    }
}

fn describe_roll(result: &RollResult) -> String {
    let mut line = format!("{:?} = {}", result.rolls, result.total);
    if let Some(successes) = result.successes {
        let plural = if successes == 1 { "" } else { "es" };
        line.push_str(&format!(", {} success{}", successes, plural));
    }
    if result.exploded_count > 0 {
        line.push_str(&format!(", {} exploded", result.exploded_count));
    }
    if result.is_disaster() {
        line.push_str(", DISASTER");
    }
    line
}

/* ---------------- roll ---------------- */

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RollReport {
    pub command: RollCommand,
    pub result: RollResult,
    pub log: Vec<String>,
}

/// Sanitize a chat line, parse it as a roll command and roll it.
pub fn resolve_roll(text: &str, config: &EngineConfig, seed: Option<u64>) -> Result<RollReport> {
    let mut dice = dice_for(seed);
    resolve_roll_with(text, config, &mut dice)
}

pub fn resolve_roll_with<S>(
    text: &str,
    config: &EngineConfig,
    source: &mut S,
) -> Result<RollReport>
where
    S: DiceSource + ?Sized,
{
    // Raw length first: sanitizing would hide padding from the bound.
    let maximum = config.limits.max_command_length;
    if text.chars().count() > maximum {
        return Err(ValidationError::InputTooLong { maximum }.into());
    }
    let mut logs = Vec::new();
    let cleaned = sanitize(text)?;
    if cleaned != text {
        logs.push(format!("[INPUT] sanitized to {:?}", cleaned));
    }
    let command = parse_roll_command(&cleaned, &config.limits)?;
    match command.spec.target_number() {
        Some(tn) => logs.push(format!("[ROLL] {} vs TN {}", command.notation, tn)),
        None => logs.push(format!("[ROLL] {}", command.notation)),
    }
    let result = roll(&command.spec, &config.limits, source)?;
    logs.push(format!("[RESULT] {}", describe_roll(&result)));
    Ok(RollReport { command, result, log: logs })
}

/* ---------------- karma ---------------- */

/// One karma spend, as a caller would request it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum KarmaAction {
    Reroll {
        failed: Vec<u32>,
        target_number: u32,
        iteration: u32,
        #[serde(default)]
        exploding: bool,
    },
    BuyDice {
        count: u32,
        target_number: u32,
        #[serde(default)]
        exploding: bool,
        #[serde(default)]
        max_allowed: Option<u32>,
    },
    BuySuccesses {
        current: u32,
        buy: u32,
    },
    AvoidDisaster {
        rolls: Vec<u32>,
    },
}

impl KarmaAction {
    /// What the action will cost, known before any die is rolled.
    pub fn quoted_cost(&self) -> u32 {
        match self {
            KarmaAction::Reroll { iteration, .. } => reroll_cost(*iteration),
            KarmaAction::BuyDice { count, .. } => *count,
            KarmaAction::BuySuccesses { buy, .. } => *buy,
            KarmaAction::AvoidDisaster { .. } => AVOID_DISASTER_COST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KarmaOutcome {
    Reroll(RerollOutcome),
    BuyDice(KarmaDice),
    BuySuccesses(BoughtSuccesses),
    AvoidDisaster(AvoidedDisaster),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct KarmaReport {
    pub outcome: KarmaOutcome,
    pub karma_cost: u32,
    pub remaining: u32,
    pub log: Vec<String>,
}

/// Check affordability, run the mechanic, then charge the ledger.
///
/// Nothing is rolled when the pool cannot cover the quoted cost, and the
/// ledger is untouched whenever the mechanic fails.
pub fn spend_karma<S>(
    ledger: &mut KarmaLedger,
    action: &KarmaAction,
    config: &EngineConfig,
    source: &mut S,
) -> Result<KarmaReport>
where
    S: DiceSource + ?Sized,
{
    let quoted = action.quoted_cost();
    if !ledger.can_afford(quoted) {
        let remaining = ledger.remaining();
        return Err(RuleViolation::NotEnoughKarma { needed: quoted, remaining }.into());
    }

    let rules = &config.karma;
    let limits = &config.limits;
    let mut logs = Vec::new();
    let outcome = match action {
        KarmaAction::Reroll { failed, target_number, iteration, exploding } => {
            let out = reroll_failures(
                failed,
                *target_number,
                *iteration,
                *exploding,
                rules,
                limits,
                source,
            )?;
            logs.push(format!(
                "[KARMA] reroll #{} of {} dice: {:?}, {} new successes",
                out.iteration,
                failed.len(),
                out.rolls,
                out.new_successes.len()
            ));
            ledger.charge(&out)?;
            KarmaOutcome::Reroll(out)
        }
        KarmaAction::BuyDice { count, target_number, exploding, max_allowed } => {
            let out = buy_karma_dice(
                *count,
                *target_number,
                *exploding,
                *max_allowed,
                rules,
                limits,
                source,
            )?;
            logs.push(format!("[KARMA] bought {} dice: {}", count, describe_roll(&out.roll)));
            ledger.charge(&out)?;
            KarmaOutcome::BuyDice(out)
        }
        KarmaAction::BuySuccesses { current, buy } => {
            let out = buy_successes(*current, *buy)?;
            logs.push(format!("[KARMA] bought {} successes, now {}", buy, out.total_successes));
            logs.push(format!("[WARN] {}", out.warning));
            ledger.charge(&out)?;
            KarmaOutcome::BuySuccesses(out)
        }
        KarmaAction::AvoidDisaster { rolls } => {
            let result = RollResult::from_rolls(rolls.clone(), 0, None);
            let out = avoid_disaster(&result)?;
            logs.push("[KARMA] disaster downgraded to a plain failure".to_string());
            ledger.charge(&out)?;
            KarmaOutcome::AvoidDisaster(out)
        }
    };

    let karma_cost = match &outcome {
        KarmaOutcome::Reroll(o) => o.karma_cost(),
        KarmaOutcome::BuyDice(o) => o.karma_cost(),
        KarmaOutcome::BuySuccesses(o) => o.karma_cost(),
        KarmaOutcome::AvoidDisaster(o) => o.karma_cost(),
    };
    logs.push(format!(
        "[POOL] spent {}, {} of {} left",
        karma_cost,
        ledger.remaining(),
        ledger.initial()
    ));
    Ok(KarmaReport { outcome, karma_cost, remaining: ledger.remaining(), log: logs })
}

/* ---------------- encounter ---------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    #[serde(alias = "id", alias = "label")]
    pub name: String,
    /// Notation such as `2d6+10`; wins over `dice`/`modifier` when present.
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub dice: u32,
    #[serde(default)]
    pub modifier: i64,
    #[serde(default)]
    pub rolls: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Join {
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub npc: Option<String>,
    pub formula: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncounterConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_system")]
    pub system: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub players: Vec<RosterEntry>,
    #[serde(default)]
    pub npcs: Vec<RosterEntry>,
    /// Combatants that show up after the first roll, in order.
    #[serde(default)]
    pub joins: Vec<Join>,
    /// NPC labels taken out after the joins.
    #[serde(default)]
    pub remove_npcs: Vec<String>,
}

fn default_system() -> String {
    RuleSystem::default().name().to_string()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterReport {
    pub name: String,
    pub order: InitiativeOrder,
    pub log: Vec<String>,
}

/// Read an encounter from a file path, or from the built-in set by name.
pub fn load_encounter(path_or_id: &str) -> anyhow::Result<EncounterConfig> {
    if let Some(text) = builtin_encounters().get(path_or_id) {
        return serde_json::from_str(text)
            .with_context(|| format!("failed to parse builtin encounter: {}", path_or_id));
    }
    let text = fs::read_to_string(path_or_id)
        .with_context(|| format!("failed to read encounter JSON: {}", path_or_id))?;
    let cfg = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse encounter JSON: {}", path_or_id))?;
    Ok(cfg)
}

pub fn builtin_encounter(name: &str) -> anyhow::Result<EncounterConfig> {
    let text = builtin_encounters()
        .get(name)
        .copied()
        .ok_or_else(|| anyhow!("unknown builtin encounter: {}", name))?;
    serde_json::from_str(text)
        .with_context(|| format!("failed to parse builtin encounter: {}", name))
}

/// Parse an initiative formula, refusing a die the rule system does not roll.
fn parse_formula(
    text: &str,
    system: RuleSystem,
    config: &EngineConfig,
) -> anyhow::Result<InitiativeFormula> {
    let terms = parse_terms(text, &config.limits, 0)?;
    if terms.die_type != system.die_type() {
        bail!("{} rolls d{} for initiative, not d{}", system, system.die_type(), terms.die_type);
    }
    Ok(InitiativeFormula::new(terms.count, terms.modifier))
}

fn formula_of(
    entry: &RosterEntry,
    system: RuleSystem,
    config: &EngineConfig,
) -> anyhow::Result<InitiativeFormula> {
    match &entry.formula {
        Some(text) => parse_formula(text, system, config)
            .with_context(|| format!("bad initiative formula for {}: {}", entry.name, text)),
        None => Ok(InitiativeFormula::new(entry.dice, entry.modifier)),
    }
}

fn log_order(order: &InitiativeOrder, logs: &mut Vec<String>) {
    for c in &order.order {
        logs.push(format!(
            "[INIT] {} {:?} {:+} = {}",
            c.key, c.rolls, c.modifier(), c.initiative
        ));
    }
    for slot in &order.phase_order {
        logs.push(format!("[PHASE] {}: {}", slot.phase, slot.actors.join(", ")));
    }
}

/// Roll initiative for a whole encounter, then apply its joins and removals.
pub fn run_encounter(
    cfg: EncounterConfig,
    config: &EngineConfig,
) -> anyhow::Result<EncounterReport> {
    let system: RuleSystem = cfg.system.parse()?;
    let mut dice = Dice::from_seed(cfg.seed);
    let mut logs = Vec::new();
    let name = cfg.name.clone().unwrap_or_else(|| "encounter".to_string());

    let mut entrants = Vec::with_capacity(cfg.players.len() + cfg.npcs.len());
    for p in &cfg.players {
        let f = formula_of(p, system, config)?;
        let mut e = Entrant::player(p.name.clone(), f.dice, f.modifier);
        e.rolls = p.rolls.clone();
        entrants.push(e);
    }
    for n in &cfg.npcs {
        let f = formula_of(n, system, config)?;
        let mut e = Entrant::npc(n.name.clone(), f.dice, f.modifier);
        e.rolls = n.rolls.clone();
        entrants.push(e);
    }

    logs.push(format!("[START] {} ({}), {} combatants", name, system, entrants.len()));
    let mut order = track_initiative(entrants, system, &config.limits, &mut dice)?;
    log_order(&order, &mut logs);

    for join in &cfg.joins {
        let formula = parse_formula(&join.formula, system, config)
            .with_context(|| format!("bad initiative formula in join: {}", join.formula))?;
        match (&join.player, &join.npc) {
            (Some(id), None) => {
                order.add_player_mid_combat(id.clone(), formula, &config.limits, &mut dice)?;
                logs.push(format!("[JOIN] {}", id));
            }
            (None, Some(label)) => {
                order.add_npc_mid_combat(label.clone(), formula, &config.limits, &mut dice)?;
                logs.push(format!("[JOIN] {}", label));
            }
            _ => bail!("a join names exactly one of player or npc"),
        }
    }
    for label in &cfg.remove_npcs {
        match order.remove_npc(label) {
            Some(_) => logs.push(format!("[LEAVE] {}", label)),
            None => logs.push(format!("[LEAVE] {} was not in the fight", label)),
        }
    }
    if !cfg.joins.is_empty() || !cfg.remove_npcs.is_empty() {
        log_order(&order, &mut logs);
    }

    let names: Vec<&str> = order.order.iter().map(|c| c.key.name()).collect();
    logs.push(format!("[ORDER] {}", names.join(" > ")));
    Ok(EncounterReport { name, order, log: logs })
}
