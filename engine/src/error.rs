use std::fmt;

use thiserror::Error;

/// Why a modifier clause was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierFault {
    DoubleSign,
    TrailingSign,
    NonNumeric,
    Decimal,
    MultipleClauses,
}

impl fmt::Display for ModifierFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ModifierFault::DoubleSign => "doubled sign",
            ModifierFault::TrailingSign => "sign without a value",
            ModifierFault::NonNumeric => "not a number",
            ModifierFault::Decimal => "must be a whole number",
            ModifierFault::MultipleClauses => "multiple modifiers are not allowed",
        };
        f.write_str(text)
    }
}

/// User-input faults. Always recoverable: report and stop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid dice notation: nothing to roll")]
    EmptyNotation,
    #[error("invalid dice notation: {0}")]
    InvalidNotation(&'static str),
    #[error("invalid character in dice notation: {}", describe_char(.0))]
    InvalidCharacter(char),
    #[error("must specify number of dice before 'd'")]
    MissingDiceCount,
    #[error("must specify dice to roll (at least 1)")]
    MustSpecifyDice,
    #[error("invalid dice count: must be a whole number")]
    InvalidDiceCount,
    #[error("too many dice (maximum {maximum})")]
    TooManyDice { maximum: u32 },
    #[error("invalid die type: a die needs at least 2 sides")]
    InvalidDieType,
    #[error("die type too large (maximum {maximum})")]
    DieTypeTooLarge { maximum: u32 },
    #[error("invalid modifier: {0}")]
    InvalidModifier(ModifierFault),
    #[error("modifier too large (maximum {maximum})")]
    ModifierTooLarge { maximum: i64 },
    #[error("target number must be positive (at least 1)")]
    NonPositiveTarget,
    #[error("target number must be an integer")]
    NonIntegerTarget,
    #[error("target number too high (maximum {maximum})")]
    TargetTooHigh { maximum: u32 },
    #[error("invalid target number: {0}")]
    InvalidTarget(&'static str),
    #[error("input too long (maximum {maximum} characters)")]
    InputTooLong { maximum: usize },
    #[error("invalid exploding syntax: use a single trailing '!'")]
    InvalidExplodingSyntax,
}

fn describe_char(c: &char) -> String {
    if c.is_control() {
        format!("control character U+{:04X}", *c as u32)
    } else {
        format!("'{}'", c)
    }
}

/// Valid input, but the game state does not allow the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("not enough karma: need {needed}, have {remaining}")]
    NotEnoughKarma { needed: u32, remaining: u32 },
    #[error("not a disaster: avoiding disaster needs every die to show 1")]
    NotADisaster,
    #[error("buying successes requires at least 1 natural success")]
    RequiresNaturalSuccess,
    #[error("no failures to reroll")]
    NoFailuresToReroll,
    #[error("reroll iteration must be at least 1")]
    InvalidIteration,
    #[error("reroll iteration {iteration} exceeds the limit of {maximum}")]
    RerollLimitReached { iteration: u32, maximum: u32 },
    #[error("too many karma dice (maximum {maximum})")]
    TooManyKarmaDice { maximum: u32 },
    #[error("must buy at least 1")]
    MustBuyAtLeastOne,
    #[error("too many successes to buy (maximum {maximum})")]
    TooManySuccesses { maximum: u32 },
}

/// Defects in an injected random source. Abort the single operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceFault {
    #[error("dice source returned {value}, outside 1..={max}")]
    OutOfRange { value: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown rule system '{0}' (expected sr1e, sr3e or cp2020)")]
    UnknownSystem(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Rule(#[from] RuleViolation),
    #[error(transparent)]
    Dice(#[from] DiceFault),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
