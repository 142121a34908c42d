use serde::{Deserialize, Serialize};

use crate::config::Limits;
use crate::error::DiceFault;
use crate::notation::DiceSpec;
use crate::source::DiceSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RollResult {
    /// Every face rolled, exploded extras included, highest first.
    pub rolls: Vec<u32>,
    /// Sum of `rolls` plus the modifier.
    pub total: i64,
    /// Dice meeting the target number; only present when one was given.
    pub successes: Option<u32>,
    /// Extra dice added by explosions.
    pub exploded_count: u32,
}

impl RollResult {
    /// Assemble a result from faces that were already rolled.
    pub fn from_rolls(mut rolls: Vec<u32>, modifier: i64, target_number: Option<u32>) -> Self {
        rolls.sort_unstable_by(|a, b| b.cmp(a));
        let total = rolls.iter().map(|&r| i64::from(r)).sum::<i64>() + modifier;
        let successes = target_number.map(|tn| count_successes(&rolls, tn));
        Self { rolls, total, successes, exploded_count: 0 }
    }

    /// Every die landed on 1: the Rule of One.
    pub fn is_disaster(&self) -> bool {
        !self.rolls.is_empty() && self.rolls.iter().all(|&r| r == 1)
    }

    /// Dice that missed `target_number`, highest first.
    pub fn failures(&self, target_number: u32) -> Vec<u32> {
        self.rolls.iter().copied().filter(|&r| r < target_number).collect()
    }

    pub fn success_count(&self) -> u32 {
        self.successes.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OpposedResult {
    pub attacker: RollResult,
    pub defender: RollResult,
    /// Attacker successes minus defender successes; may be negative.
    pub net_successes: i64,
}

pub fn count_successes(rolls: &[u32], target_number: u32) -> u32 {
    rolls.iter().filter(|&&r| r >= target_number).count() as u32
}

/// Draw one face and make sure the source kept its contract.
pub(crate) fn draw_face<S>(source: &mut S, sides: u32) -> Result<u32, DiceFault>
where
    S: DiceSource + ?Sized,
{
    let value = source.draw(1, sides);
    if value < 1 || value > sides {
        tracing::error!(value, sides, "dice source out of range");
        return Err(DiceFault::OutOfRange { value, max: sides });
    }
    Ok(value)
}

/// Roll a validated spec.
///
/// With exploding set, every maximum face adds one more die, up to
/// `limits.explosion_cap` draws per original die. The cap holds even when the
/// source always answers the maximum.
pub fn roll<S>(spec: &DiceSpec, limits: &Limits, source: &mut S) -> Result<RollResult, DiceFault>
where
    S: DiceSource + ?Sized,
{
    let sides = spec.die_type();
    let cap = limits.explosion_cap.max(1);
    let mut rolls = Vec::with_capacity(spec.count() as usize);
    let mut exploded_count = 0u32;

    for _ in 0..spec.count() {
        let mut face = draw_face(source, sides)?;
        rolls.push(face);
        let mut draws = 1u32;
        while spec.exploding() && face == sides {
            if draws >= cap {
                tracing::warn!(cap, sides, "explosion cap reached; stopping this die");
                break;
            }
            face = draw_face(source, sides)?;
            rolls.push(face);
            draws += 1;
            exploded_count += 1;
        }
    }

    let mut result = RollResult::from_rolls(rolls, spec.modifier(), spec.target_number());
    result.exploded_count = exploded_count;
    tracing::debug!(
        notation = %spec,
        rolls = ?result.rolls,
        total = result.total,
        successes = ?result.successes,
        exploded = exploded_count,
        "rolled"
    );
    Ok(result)
}

/// Two independent rolls; net is attacker minus defender successes.
pub fn roll_opposed<S>(
    attacker: &DiceSpec,
    defender: &DiceSpec,
    limits: &Limits,
    source: &mut S,
) -> Result<OpposedResult, DiceFault>
where
    S: DiceSource + ?Sized,
{
    let attacker = roll(attacker, limits, source)?;
    let defender = roll(defender, limits, source)?;
    let net_successes = i64::from(attacker.success_count()) - i64::from(defender.success_count());
    Ok(OpposedResult { attacker, defender, net_successes })
}
