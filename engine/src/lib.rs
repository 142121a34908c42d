pub mod api;
pub mod command;
pub mod config;
pub mod content;
pub mod dice;
pub mod error;
pub mod initiative;
pub mod karma;
pub mod notation;
pub mod sanitize;
pub mod source;

pub use command::{parse_roll_command, RollCommand};
pub use config::{EngineConfig, KarmaRules, Limits};
pub use dice::{count_successes, roll, roll_opposed, OpposedResult, RollResult};
pub use error::{
    ConfigError, DiceFault, Error, ModifierFault, Result, RuleViolation, ValidationError,
};
pub use initiative::{
    calculate_phases, create_phase_order, roll_initiative, track_initiative, Combatant,
    CombatantKey, Entrant, InitiativeFormula, InitiativeOrder, PhaseSlot, RuleSystem,
};
pub use karma::{
    avoid_disaster, buy_karma_dice, buy_successes, reroll_failures, KarmaCost, KarmaLedger,
};
pub use notation::{parse_notation, parse_target_number, validate_notation, DiceSpec};
pub use sanitize::sanitize;
pub use source::{Dice, DiceSource, Scripted};
