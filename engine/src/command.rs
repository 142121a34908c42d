use serde::Serialize;

use crate::config::Limits;
use crate::error::ValidationError;
use crate::notation::{parse_notation, parse_target_text, DiceSpec};

/// A parsed `roll` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollCommand {
    /// Canonical notation, exploding marker included.
    pub notation: String,
    pub spec: DiceSpec,
}

/// Parse `[prefix]roll <notation> [tn<N>]`.
///
/// Length is checked before anything else so the validator never works on
/// oversized input.
pub fn parse_roll_command(text: &str, limits: &Limits) -> Result<RollCommand, ValidationError> {
    if text.chars().count() > limits.max_command_length {
        return Err(ValidationError::InputTooLong { maximum: limits.max_command_length });
    }

    let body = text.trim();
    let body = body.strip_prefix(limits.command_prefix.as_str()).unwrap_or(body);
    let (keyword, args) = body
        .split_once(char::is_whitespace)
        .unwrap_or((body, ""));
    if !keyword.eq_ignore_ascii_case("roll") {
        return Err(ValidationError::InvalidNotation("expected a roll command"));
    }

    let mut target: Option<&str> = None;
    let mut notation_tokens = Vec::new();
    for token in args.split_whitespace() {
        if is_target_clause(token) {
            if target.is_some() {
                return Err(ValidationError::InvalidTarget("more than one target number"));
            }
            target = Some(&token[2..]);
        } else {
            notation_tokens.push(token);
        }
    }
    if notation_tokens.is_empty() {
        return Err(ValidationError::MustSpecifyDice);
    }

    let mut spec = parse_notation(&notation_tokens.join(" "), limits)?;
    if let Some(clause) = target {
        spec = spec.with_target_number(parse_target_clause(clause, limits)?, limits)?;
    }
    tracing::trace!(notation = %spec, target = ?spec.target_number(), "roll command parsed");
    Ok(RollCommand { notation: spec.to_string(), spec })
}

fn is_target_clause(token: &str) -> bool {
    token.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("tn"))
}

/// The text after `tn`. Only bare digits are a valid clause; signs and empty
/// clauses are malformed rather than merely out of range.
fn parse_target_clause(clause: &str, limits: &Limits) -> Result<u32, ValidationError> {
    match clause.chars().next() {
        None => Err(ValidationError::InvalidTarget("'tn' needs a number")),
        Some('+' | '-') => {
            Err(ValidationError::InvalidTarget("write the target as tn followed by digits"))
        }
        Some(_) => parse_target_text(clause, limits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_clause_detection() {
        assert!(is_target_clause("tn4"));
        assert!(is_target_clause("TN"));
        assert!(!is_target_clause("t"));
        assert!(!is_target_clause("2d6"));
        assert!(!is_target_clause("ｔｎ"));
    }
}
