//! Karma Pool: a per-character budget spent to bend roll results.
//!
//! The ledger only tracks points. The mechanics below (`reroll_failures`,
//! `buy_karma_dice`, `buy_successes`, `avoid_disaster`) work on raw roll data
//! and report what they cost; a caller charges that cost with
//! [`KarmaLedger::charge`], ideally after checking [`KarmaLedger::can_afford`].

use std::slice;

use serde::{Deserialize, Serialize};

use crate::config::{KarmaRules, Limits};
use crate::dice::{roll, RollResult};
use crate::error::{Result, RuleViolation};
use crate::notation::DiceSpec;
use crate::source::DiceSource;

pub const AVOID_DISASTER_COST: u32 = 1;
pub const PERMANENT_COST_WARNING: &str =
    "Permanent karma cost: karma spent buying successes does not refresh.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KarmaSpend {
    pub amount: u32,
    pub reason: String,
    pub permanent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KarmaLedger {
    initial: u32,
    remaining: u32,
    permanent_spent: u32,
    history: Vec<KarmaSpend>,
}

impl KarmaLedger {
    pub fn new(initial: u32) -> Self {
        Self { initial, remaining: initial, permanent_spent: 0, history: Vec::new() }
    }

    pub fn initial(&self) -> u32 {
        self.initial
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn permanent_spent(&self) -> u32 {
        self.permanent_spent
    }

    pub fn can_afford(&self, amount: u32) -> bool {
        amount <= self.remaining
    }

    /// Spend points that come back on [`refresh`](Self::refresh).
    pub fn spend(
        &mut self,
        amount: u32,
        reason: impl Into<String>,
    ) -> std::result::Result<(), RuleViolation> {
        self.debit(amount, reason.into(), false)
    }

    /// Spend points that are gone for good.
    pub fn spend_permanent(
        &mut self,
        amount: u32,
        reason: impl Into<String>,
    ) -> std::result::Result<(), RuleViolation> {
        self.debit(amount, reason.into(), true)
    }

    fn debit(
        &mut self,
        amount: u32,
        reason: String,
        permanent: bool,
    ) -> std::result::Result<(), RuleViolation> {
        if amount > self.remaining {
            tracing::debug!(amount, remaining = self.remaining, %reason, "karma spend refused");
            return Err(RuleViolation::NotEnoughKarma { needed: amount, remaining: self.remaining });
        }
        self.remaining -= amount;
        if permanent {
            self.permanent_spent += amount;
        }
        tracing::debug!(amount, permanent, remaining = self.remaining, %reason, "karma spent");
        self.history.push(KarmaSpend { amount, reason, permanent });
        Ok(())
    }

    /// Charge whatever a mechanic reported it costs.
    pub fn charge(&mut self, outcome: &impl KarmaCost) -> std::result::Result<(), RuleViolation> {
        self.debit(outcome.karma_cost(), outcome.reason(), outcome.permanent())
    }

    /// Start of a new session: the pool comes back minus everything spent
    /// permanently.
    pub fn refresh(&mut self) {
        self.remaining = self.initial.saturating_sub(self.permanent_spent);
        tracing::debug!(
            remaining = self.remaining,
            permanent = self.permanent_spent,
            "karma refreshed"
        );
    }

    /// Every spend, oldest first. Clone the iterator to walk it again.
    pub fn history(&self) -> slice::Iter<'_, KarmaSpend> {
        self.history.iter()
    }
}

/// What a karma mechanic costs, and whether the cost is permanent.
pub trait KarmaCost {
    fn karma_cost(&self) -> u32;

    fn reason(&self) -> String;

    fn permanent(&self) -> bool {
        false
    }
}

/// Cost of the `iteration`-th reroll of the same test.
pub fn reroll_cost(iteration: u32) -> u32 {
    iteration
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerollOutcome {
    pub iteration: u32,
    pub karma_cost: u32,
    /// All new faces, highest first.
    pub rolls: Vec<u32>,
    pub new_successes: Vec<u32>,
    pub remaining_failures: Vec<u32>,
    pub exploded_count: u32,
}

impl KarmaCost for RerollOutcome {
    fn karma_cost(&self) -> u32 {
        self.karma_cost
    }

    fn reason(&self) -> String {
        format!("reroll #{}", self.iteration)
    }
}

/// Reroll exactly the failed dice. The n-th reroll of a test costs n.
#[allow(clippy::too_many_arguments)]
pub fn reroll_failures<S>(
    failed_dice: &[u32],
    target_number: u32,
    iteration: u32,
    exploding: bool,
    rules: &KarmaRules,
    limits: &Limits,
    source: &mut S,
) -> Result<RerollOutcome>
where
    S: DiceSource + ?Sized,
{
    if failed_dice.is_empty() {
        return Err(RuleViolation::NoFailuresToReroll.into());
    }
    if iteration < 1 {
        return Err(RuleViolation::InvalidIteration.into());
    }
    if let Some(maximum) = rules.max_reroll_iteration {
        if iteration > maximum {
            return Err(RuleViolation::RerollLimitReached { iteration, maximum }.into());
        }
    }

    let spec = DiceSpec::pool(failed_dice.len() as u32, rules.die_type, exploding, target_number);
    let rolled = roll(&spec, limits, source)?;
    let (new_successes, remaining_failures): (Vec<u32>, Vec<u32>) =
        rolled.rolls.iter().copied().partition(|&r| r >= target_number);

    Ok(RerollOutcome {
        iteration,
        karma_cost: reroll_cost(iteration),
        rolls: rolled.rolls,
        new_successes,
        remaining_failures,
        exploded_count: rolled.exploded_count,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KarmaDice {
    pub karma_cost: u32,
    pub roll: RollResult,
}

impl KarmaDice {
    pub fn rolls(&self) -> &[u32] {
        &self.roll.rolls
    }

    pub fn successes(&self) -> u32 {
        self.roll.success_count()
    }
}

impl KarmaCost for KarmaDice {
    fn karma_cost(&self) -> u32 {
        self.karma_cost
    }

    fn reason(&self) -> String {
        format!("buy {} karma dice", self.karma_cost)
    }
}

/// Buy extra dice at one point each. Without `max_allowed` the rules' ceiling
/// applies; the per-roll dice limit always does.
#[allow(clippy::too_many_arguments)]
pub fn buy_karma_dice<S>(
    count: u32,
    target_number: u32,
    exploding: bool,
    max_allowed: Option<u32>,
    rules: &KarmaRules,
    limits: &Limits,
    source: &mut S,
) -> Result<KarmaDice>
where
    S: DiceSource + ?Sized,
{
    if count == 0 {
        return Err(RuleViolation::MustBuyAtLeastOne.into());
    }
    let maximum = max_allowed.unwrap_or(rules.max_karma_dice).min(limits.max_dice);
    if count > maximum {
        return Err(RuleViolation::TooManyKarmaDice { maximum }.into());
    }
    let spec = DiceSpec::pool(count, rules.die_type, exploding, target_number);
    let rolled = roll(&spec, limits, source)?;
    Ok(KarmaDice { karma_cost: count, roll: rolled })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoughtSuccesses {
    pub karma_cost: u32,
    pub permanent: bool,
    pub total_successes: u32,
    pub warning: String,
}

impl KarmaCost for BoughtSuccesses {
    fn karma_cost(&self) -> u32 {
        self.karma_cost
    }

    fn reason(&self) -> String {
        format!("buy {} successes", self.karma_cost)
    }

    fn permanent(&self) -> bool {
        self.permanent
    }
}

/// Turn karma straight into successes. Needs at least one natural success,
/// rolls nothing, and the cost never refreshes.
pub fn buy_successes(
    current_successes: u32,
    successes_to_buy: u32,
) -> std::result::Result<BoughtSuccesses, RuleViolation> {
    if current_successes == 0 {
        return Err(RuleViolation::RequiresNaturalSuccess);
    }
    if successes_to_buy == 0 {
        return Err(RuleViolation::MustBuyAtLeastOne);
    }
    let total_successes = current_successes
        .checked_add(successes_to_buy)
        .ok_or(RuleViolation::TooManySuccesses { maximum: u32::MAX - current_successes })?;
    Ok(BoughtSuccesses {
        karma_cost: successes_to_buy,
        permanent: true,
        total_successes,
        warning: PERMANENT_COST_WARNING.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvoidedDisaster {
    pub karma_cost: u32,
    pub rolls: Vec<u32>,
    pub successes: u32,
    pub disaster: bool,
    /// Always false: an avoided disaster is final.
    pub can_reroll: bool,
    /// Always true. Nothing may reroll or buy on top of this result.
    pub final_result: bool,
}

impl KarmaCost for AvoidedDisaster {
    fn karma_cost(&self) -> u32 {
        self.karma_cost
    }

    fn reason(&self) -> String {
        "avoid disaster".to_string()
    }
}

/// Rule of One: when every die shows 1, a point of karma downgrades the
/// catastrophe to a plain failure. Nothing may be rerolled or bought after.
pub fn avoid_disaster(result: &RollResult) -> std::result::Result<AvoidedDisaster, RuleViolation> {
    if !result.is_disaster() {
        return Err(RuleViolation::NotADisaster);
    }
    Ok(AvoidedDisaster {
        karma_cost: AVOID_DISASTER_COST,
        rolls: result.rolls.clone(),
        successes: 0,
        disaster: false,
        can_reroll: false,
        final_result: true,
    })
}
