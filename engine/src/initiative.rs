use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Limits;
use crate::dice::draw_face;
use crate::error::{ConfigError, DiceFault, Result, ValidationError};
use crate::notation::parse_terms;
use crate::source::DiceSource;

/// Points of initiative between two passes in multi-pass systems.
pub const PASS_STEP: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSystem {
    #[default]
    Sr1e,
    Sr3e,
    Cp2020,
}

impl RuleSystem {
    pub fn die_type(self) -> u32 {
        match self {
            RuleSystem::Sr1e | RuleSystem::Sr3e => 6,
            RuleSystem::Cp2020 => 10,
        }
    }

    /// Whether combatants act again every ten points of initiative.
    pub fn multi_pass(self) -> bool {
        matches!(self, RuleSystem::Sr3e)
    }

    pub fn name(self) -> &'static str {
        match self {
            RuleSystem::Sr1e => "sr1e",
            RuleSystem::Sr3e => "sr3e",
            RuleSystem::Cp2020 => "cp2020",
        }
    }
}

impl fmt::Display for RuleSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RuleSystem {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sr1e" => Ok(RuleSystem::Sr1e),
            "sr3e" => Ok(RuleSystem::Sr3e),
            "cp2020" => Ok(RuleSystem::Cp2020),
            _ => Err(ConfigError::UnknownSystem(s.to_string())),
        }
    }
}

/// Players are keyed by id, NPCs by label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum CombatantKey {
    Player(String),
    Npc(String),
}

impl CombatantKey {
    pub fn name(&self) -> &str {
        match self {
            CombatantKey::Player(id) => id,
            CombatantKey::Npc(label) => label,
        }
    }

    pub fn is_npc(&self) -> bool {
        matches!(self, CombatantKey::Npc(_))
    }
}

impl fmt::Display for CombatantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InitiativeFormula {
    pub dice: u32,
    pub modifier: i64,
}

impl InitiativeFormula {
    pub fn new(dice: u32, modifier: i64) -> Self {
        Self { dice, modifier }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeRoll {
    /// Faces in the order they were drawn.
    pub rolls: Vec<u32>,
    pub modifier: i64,
    /// Sum plus modifier, never below 0.
    pub initiative: i64,
}

impl InitiativeRoll {
    fn from_faces(rolls: Vec<u32>, modifier: i64) -> Self {
        let sum: i64 = rolls.iter().map(|&r| i64::from(r)).sum();
        let initiative = (sum + modifier).max(0);
        Self { rolls, modifier, initiative }
    }
}

/// Parse and roll an initiative formula such as `2d6+10`.
///
/// Attribute-only formulas (`0d6+5`) are fine, and an exploding marker is
/// accepted but ignored: initiative dice never explode.
pub fn roll_initiative<S>(notation: &str, limits: &Limits, source: &mut S) -> Result<InitiativeRoll>
where
    S: DiceSource + ?Sized,
{
    let terms = parse_terms(notation, limits, 0)?;
    let formula = InitiativeFormula::new(terms.count, terms.modifier);
    roll_formula(&formula, terms.die_type, limits, source)
}

/// Roll a formula on `die_type`. The dice count is held to `limits.max_dice`
/// like any other roll.
pub fn roll_formula<S>(
    formula: &InitiativeFormula,
    die_type: u32,
    limits: &Limits,
    source: &mut S,
) -> Result<InitiativeRoll>
where
    S: DiceSource + ?Sized,
{
    if formula.dice > limits.max_dice {
        return Err(ValidationError::TooManyDice { maximum: limits.max_dice }.into());
    }
    let rolls = (0..formula.dice)
        .map(|_| draw_face(source, die_type))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(InitiativeRoll::from_faces(rolls, formula.modifier))
}

/// Someone joining the fight. `rolls` carries dice that were already rolled
/// (at the table, or restored from a saved encounter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub key: CombatantKey,
    pub formula: InitiativeFormula,
    #[serde(default)]
    pub rolls: Option<Vec<u32>>,
}

impl Entrant {
    pub fn player(id: impl Into<String>, dice: u32, modifier: i64) -> Self {
        Self {
            key: CombatantKey::Player(id.into()),
            formula: InitiativeFormula::new(dice, modifier),
            rolls: None,
        }
    }

    pub fn npc(label: impl Into<String>, dice: u32, modifier: i64) -> Self {
        Self {
            key: CombatantKey::Npc(label.into()),
            formula: InitiativeFormula::new(dice, modifier),
            rolls: None,
        }
    }

    pub fn with_rolls(mut self, rolls: Vec<u32>) -> Self {
        self.rolls = Some(rolls);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub key: CombatantKey,
    pub formula: InitiativeFormula,
    pub rolls: Vec<u32>,
    pub initiative: i64,
    /// Phases this combatant acts in; empty for single-pass systems.
    #[serde(default)]
    pub phases: Vec<i64>,
}

impl Combatant {
    pub fn modifier(&self) -> i64 {
        self.formula.modifier
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSlot {
    pub phase: i64,
    pub actors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InitiativeOrder {
    pub system: RuleSystem,
    /// Sorted by initiative, then modifier, both descending; ties keep their
    /// input order.
    pub order: Vec<Combatant>,
    /// Highest phase first. Only filled for multi-pass systems.
    #[serde(default)]
    pub phase_order: Vec<PhaseSlot>,
}

/// Extra passes for a multi-pass initiative: `[i, i-10, …]` while the value
/// stays at least 1. Below 10 there is no extra pass and the list is empty.
pub fn calculate_phases(initiative: i64) -> Vec<i64> {
    if initiative < PASS_STEP {
        return Vec::new();
    }
    std::iter::successors(Some(initiative), |p| Some(p - PASS_STEP))
        .take_while(|&p| p >= 1)
        .collect()
}

/// Every phase a combatant acts in. A single-pass combatant still acts once,
/// at its initiative.
fn action_phases(initiative: i64) -> Vec<i64> {
    let phases = calculate_phases(initiative);
    if phases.is_empty() { vec![initiative] } else { phases }
}

pub fn create_phase_order(combatants: &[Combatant]) -> Vec<PhaseSlot> {
    let mut slots: IndexMap<i64, Vec<String>> = IndexMap::new();
    for c in combatants {
        for phase in action_phases(c.initiative) {
            slots.entry(phase).or_default().push(c.key.name().to_string());
        }
    }
    slots.sort_by(|a, _, b, _| b.cmp(a));
    slots
        .into_iter()
        .map(|(phase, actors)| PhaseSlot { phase, actors })
        .collect()
}

fn sort_order(order: &mut [Combatant]) {
    order.sort_by(|a, b| {
        b.initiative
            .cmp(&a.initiative)
            .then_with(|| b.modifier().cmp(&a.modifier()))
    });
}

fn resolve<S>(
    entrant: Entrant,
    system: RuleSystem,
    limits: &Limits,
    source: &mut S,
) -> Result<Combatant>
where
    S: DiceSource + ?Sized,
{
    let die_type = system.die_type();
    let roll = match entrant.rolls {
        Some(faces) => {
            if faces.len() > limits.max_dice as usize {
                return Err(ValidationError::TooManyDice { maximum: limits.max_dice }.into());
            }
            if let Some(&bad) = faces.iter().find(|&&f| f < 1 || f > die_type) {
                return Err(DiceFault::OutOfRange { value: bad, max: die_type }.into());
            }
            InitiativeRoll::from_faces(faces, entrant.formula.modifier)
        }
        None => roll_formula(&entrant.formula, die_type, limits, source)?,
    };
    let phases = if system.multi_pass() { action_phases(roll.initiative) } else { Vec::new() };
    tracing::debug!(
        combatant = %entrant.key,
        rolls = ?roll.rolls,
        initiative = roll.initiative,
        %system,
        "initiative rolled"
    );
    Ok(Combatant {
        key: entrant.key,
        formula: entrant.formula,
        rolls: roll.rolls,
        initiative: roll.initiative,
        phases,
    })
}

/// Roll everyone and sort. An empty roster gives an empty order.
pub fn track_initiative<S>(
    entrants: impl IntoIterator<Item = Entrant>,
    system: RuleSystem,
    limits: &Limits,
    source: &mut S,
) -> Result<InitiativeOrder>
where
    S: DiceSource + ?Sized,
{
    let mut order = entrants
        .into_iter()
        .map(|e| resolve(e, system, limits, source))
        .collect::<Result<Vec<_>>>()?;
    sort_order(&mut order);
    let mut tracked = InitiativeOrder { system, order, phase_order: Vec::new() };
    tracked.rebuild_phase_order();
    Ok(tracked)
}

impl InitiativeOrder {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, key: &CombatantKey) -> Option<&Combatant> {
        self.order.iter().find(|c| &c.key == key)
    }

    /// Roll a player who joins mid-fight and re-sort. A player already in the
    /// order is replaced by the fresh roll.
    pub fn add_player_mid_combat<S>(
        &mut self,
        id: impl Into<String>,
        formula: InitiativeFormula,
        limits: &Limits,
        source: &mut S,
    ) -> Result<()>
    where
        S: DiceSource + ?Sized,
    {
        let entrant = Entrant { key: CombatantKey::Player(id.into()), formula, rolls: None };
        self.insert(entrant, limits, source)
    }

    pub fn add_npc_mid_combat<S>(
        &mut self,
        label: impl Into<String>,
        formula: InitiativeFormula,
        limits: &Limits,
        source: &mut S,
    ) -> Result<()>
    where
        S: DiceSource + ?Sized,
    {
        let entrant = Entrant { key: CombatantKey::Npc(label.into()), formula, rolls: None };
        self.insert(entrant, limits, source)
    }

    fn insert<S>(&mut self, entrant: Entrant, limits: &Limits, source: &mut S) -> Result<()>
    where
        S: DiceSource + ?Sized,
    {
        // Roll before touching the order so a faulty source leaves it intact.
        let combatant = resolve(entrant, self.system, limits, source)?;
        self.order.retain(|c| c.key != combatant.key);
        self.order.push(combatant);
        sort_order(&mut self.order);
        self.rebuild_phase_order();
        Ok(())
    }

    /// Drop an NPC by label. Nobody else is re-rolled or re-sorted.
    pub fn remove_npc(&mut self, label: &str) -> Option<Combatant> {
        self.remove(&CombatantKey::Npc(label.to_string()))
    }

    pub fn remove_player(&mut self, id: &str) -> Option<Combatant> {
        self.remove(&CombatantKey::Player(id.to_string()))
    }

    fn remove(&mut self, key: &CombatantKey) -> Option<Combatant> {
        let idx = self.order.iter().position(|c| &c.key == key)?;
        let removed = self.order.remove(idx);
        self.rebuild_phase_order();
        tracing::debug!(combatant = %removed.key, "removed from initiative");
        Some(removed)
    }

    fn rebuild_phase_order(&mut self) {
        self.phase_order = if self.system.multi_pass() {
            create_phase_order(&self.order)
        } else {
            Vec::new()
        };
    }
}
