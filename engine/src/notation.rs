//! Dice notation: `<count>d<sides>[!][<sign><modifier>]`.
//!
//! Input is untrusted chat text. Everything is checked in a fixed order and
//! the first failure wins, so a caller always gets the most specific category
//! for what the user actually typed.

use std::fmt;

use serde::Serialize;

use crate::config::Limits;
use crate::error::{ModifierFault, ValidationError};

/// A fully validated roll. Only the parser (or [`DiceSpec::new`]) makes these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DiceSpec {
    count: u32,
    die_type: u32,
    modifier: i64,
    #[serde(skip)]
    modifier_written: bool,
    exploding: bool,
    target_number: Option<u32>,
}

impl DiceSpec {
    /// Build a spec from already-known numbers, applying the same bounds the
    /// parser does.
    pub fn new(
        count: u32,
        die_type: u32,
        modifier: i64,
        limits: &Limits,
    ) -> Result<Self, ValidationError> {
        if die_type < 2 {
            return Err(ValidationError::InvalidDieType);
        }
        if die_type > limits.max_die_type {
            return Err(ValidationError::DieTypeTooLarge { maximum: limits.max_die_type });
        }
        if count == 0 {
            return Err(ValidationError::MustSpecifyDice);
        }
        if count > limits.max_dice {
            return Err(ValidationError::TooManyDice { maximum: limits.max_dice });
        }
        if modifier.unsigned_abs() > limits.max_modifier.unsigned_abs() {
            return Err(ValidationError::ModifierTooLarge { maximum: limits.max_modifier });
        }
        Ok(Self {
            count,
            die_type,
            modifier,
            modifier_written: modifier != 0,
            exploding: false,
            target_number: None,
        })
    }

    /// Pool of plain dice, used internally for karma and reroll pools whose
    /// size was already bounded by an earlier roll or rule.
    pub(crate) fn pool(count: u32, die_type: u32, exploding: bool, target_number: u32) -> Self {
        Self {
            count: count.max(1),
            die_type: die_type.max(2),
            modifier: 0,
            modifier_written: false,
            exploding,
            target_number: Some(target_number.max(1)),
        }
    }

    pub fn with_exploding(mut self, exploding: bool) -> Self {
        self.exploding = exploding;
        self
    }

    /// Attach a target number, held to the same bounds as a typed `tnN`.
    pub fn with_target_number(
        mut self,
        target_number: u32,
        limits: &Limits,
    ) -> Result<Self, ValidationError> {
        let target_number = parse_target_number(f64::from(target_number), limits)?;
        self.target_number = Some(target_number);
        Ok(self)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn die_type(&self) -> u32 {
        self.die_type
    }

    pub fn modifier(&self) -> i64 {
        self.modifier
    }

    pub fn exploding(&self) -> bool {
        self.exploding
    }

    pub fn target_number(&self) -> Option<u32> {
        self.target_number
    }
}

/// Canonical form: no whitespace, lowercase `d`, no leading zeros, a single
/// sign on the modifier. The target number is not part of the notation.
impl fmt::Display for DiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.die_type)?;
        if self.exploding {
            f.write_str("!")?;
        }
        if self.modifier_written {
            write!(f, "{:+}", self.modifier)?;
        }
        Ok(())
    }
}

/// Parsed pieces before the dice-count floor is applied. Initiative formulas
/// accept `0d6+5`, rolls do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Terms {
    pub count: u32,
    pub die_type: u32,
    pub modifier: i64,
    pub modifier_written: bool,
    pub exploding: bool,
}

/// Validate and return the canonical notation.
pub fn validate_notation(text: &str, limits: &Limits) -> Result<String, ValidationError> {
    parse_notation(text, limits).map(|spec| spec.to_string())
}

pub fn parse_notation(text: &str, limits: &Limits) -> Result<DiceSpec, ValidationError> {
    let terms = parse_terms(text, limits, 1)?;
    Ok(DiceSpec {
        count: terms.count,
        die_type: terms.die_type,
        modifier: terms.modifier,
        modifier_written: terms.modifier_written,
        exploding: terms.exploding,
        target_number: None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Count,
    Sides,
    Modifier,
}

pub(crate) fn parse_terms(
    text: &str,
    limits: &Limits,
    min_count: u32,
) -> Result<Terms, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyNotation);
    }
    let chars: Vec<char> = trimmed.chars().collect();

    check_bang_neighbours(&chars)?;
    check_alphabet(&chars)?;
    let mut compact = compact(&chars)?;

    let d_pos = compact.iter().position(|&b| b == b'd');
    let exploding = take_bang(&mut compact, d_pos)?;
    let Some(d_pos) = d_pos else {
        return Err(ValidationError::InvalidNotation("missing die marker 'd'"));
    };

    let count_part = &compact[..d_pos];
    if count_part.is_empty() {
        return Err(ValidationError::MissingDiceCount);
    }
    if !count_part.iter().all(u8::is_ascii_digit) {
        return Err(ValidationError::InvalidDiceCount);
    }

    let rest = &compact[d_pos + 1..];
    let sides_len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if sides_len == 0 {
        return Err(ValidationError::InvalidDieType);
    }
    let (sides_part, tail) = rest.split_at(sides_len);
    let die_type = match parse_digits(sides_part) {
        Some(v) if v > u64::from(limits.max_die_type) => {
            return Err(ValidationError::DieTypeTooLarge { maximum: limits.max_die_type });
        }
        None => return Err(ValidationError::DieTypeTooLarge { maximum: limits.max_die_type }),
        Some(v) if v < 2 => return Err(ValidationError::InvalidDieType),
        Some(v) => v as u32,
    };

    let modifier = parse_modifier_clause(tail)?;

    let count = match parse_digits(count_part) {
        Some(v) if v > u64::from(limits.max_dice) => {
            return Err(ValidationError::TooManyDice { maximum: limits.max_dice });
        }
        None => return Err(ValidationError::TooManyDice { maximum: limits.max_dice }),
        Some(v) => v as u32,
    };
    if count < min_count {
        return Err(ValidationError::MustSpecifyDice);
    }

    let (modifier, modifier_written) = match modifier {
        None => (0, false),
        Some((negative, magnitude)) => {
            let bound = limits.max_modifier.unsigned_abs();
            match magnitude {
                Some(m) if m <= bound => {
                    let value = m as i64;
                    (if negative { -value } else { value }, true)
                }
                _ => return Err(ValidationError::ModifierTooLarge { maximum: limits.max_modifier }),
            }
        }
    };

    Ok(Terms { count, die_type, modifier, modifier_written, exploding })
}

fn is_notation_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, 'd' | 'D' | '+' | '-')
}

/// `!` may only be followed by notation, whitespace, or nothing.
fn check_bang_neighbours(chars: &[char]) -> Result<(), ValidationError> {
    let mut bangs = 0;
    for (idx, &c) in chars.iter().enumerate() {
        if c != '!' {
            continue;
        }
        bangs += 1;
        if let Some(&next) = chars.get(idx + 1) {
            if next != '!' && !next.is_whitespace() && !is_notation_char(next) {
                return Err(ValidationError::InvalidNotation("unexpected text after '!'"));
            }
        }
    }
    if bangs > 1 {
        return Err(ValidationError::InvalidExplodingSyntax);
    }
    Ok(())
}

fn check_alphabet(chars: &[char]) -> Result<(), ValidationError> {
    let mut section = Section::Count;
    for (idx, &c) in chars.iter().enumerate() {
        if is_notation_char(c) || c == '!' || c.is_whitespace() {
            match c {
                'd' | 'D' if section == Section::Count => section = Section::Sides,
                '+' | '-' if section == Section::Sides => section = Section::Modifier,
                _ => {}
            }
            continue;
        }
        if idx == 0 {
            return Err(ValidationError::InvalidNotation("expected something like 2d6+1"));
        }
        let err = match c {
            '.' => match section {
                Section::Count => ValidationError::InvalidDiceCount,
                Section::Sides => ValidationError::InvalidDieType,
                Section::Modifier => ValidationError::InvalidModifier(ModifierFault::Decimal),
            },
            c if c.is_alphanumeric() => match section {
                Section::Modifier => ValidationError::InvalidModifier(ModifierFault::NonNumeric),
                _ => ValidationError::InvalidNotation("expected something like 2d6+1"),
            },
            c => ValidationError::InvalidCharacter(c),
        };
        tracing::debug!(found = ?c, position = idx, "notation rejected");
        return Err(err);
    }
    Ok(())
}

/// Drop whitespace. Whitespace between two digits would silently glue two
/// numbers together, so it is refused instead.
fn compact(chars: &[char]) -> Result<Vec<u8>, ValidationError> {
    let mut out = Vec::with_capacity(chars.len());
    let mut gap = false;
    for &c in chars {
        if c.is_whitespace() {
            gap = true;
            continue;
        }
        if gap && c.is_ascii_digit() && out.last().is_some_and(u8::is_ascii_digit) {
            return Err(ValidationError::InvalidNotation("space inside a number"));
        }
        gap = false;
        out.push(c.to_ascii_lowercase() as u8);
    }
    Ok(out)
}

/// Remove the single `!` marker if it sits right after the die size or at the
/// very end.
fn take_bang(compact: &mut Vec<u8>, d_pos: Option<usize>) -> Result<bool, ValidationError> {
    let Some(bang) = compact.iter().position(|&b| b == b'!') else {
        return Ok(false);
    };
    // Only a real die size has an end; `3d!6` puts the marker before it.
    let sides_end = d_pos.and_then(|d| {
        let digits = compact[d + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        (digits > 0).then_some(d + 1 + digits)
    });
    let at_end = bang + 1 == compact.len();
    if bang == 0 || !(Some(bang) == sides_end || at_end) {
        return Err(ValidationError::InvalidExplodingSyntax);
    }
    compact.remove(bang);
    Ok(true)
}

/// `None` when the digits do not fit a `u64`.
fn parse_digits(digits: &[u8]) -> Option<u64> {
    let mut value: u64 = 0;
    for &b in digits {
        value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
    }
    Some(value)
}

type ModifierClause = Option<(bool, Option<u64>)>;

/// Returns `(negative, magnitude)` for a present clause; magnitude is `None`
/// on overflow so the range error can be reported in its proper turn.
fn parse_modifier_clause(tail: &[u8]) -> Result<ModifierClause, ValidationError> {
    if tail.is_empty() {
        return Ok(None);
    }
    if tail[0] == b'd' {
        return Err(ValidationError::InvalidNotation("only one dice term is supported"));
    }
    let signs = tail.iter().take_while(|b| matches!(b, b'+' | b'-')).count();
    let digits_len = tail[signs..].iter().take_while(|b| b.is_ascii_digit()).count();
    let digits = &tail[signs..signs + digits_len];
    let after = &tail[signs + digits_len..];

    if digits.is_empty() {
        let fault = if signs > 1 {
            ModifierFault::DoubleSign
        } else if after.is_empty() {
            ModifierFault::TrailingSign
        } else {
            ModifierFault::NonNumeric
        };
        return Err(ValidationError::InvalidModifier(fault));
    }
    if let Some(&next) = after.first() {
        let fault = match next {
            b'+' | b'-' => ModifierFault::MultipleClauses,
            _ => ModifierFault::NonNumeric,
        };
        return Err(ValidationError::InvalidModifier(fault));
    }

    let magnitude = parse_digits(digits);
    if signs > 1 {
        // `+-0` carries no sign worth arguing about.
        if signs == 2 && magnitude == Some(0) {
            return Ok(Some((false, Some(0))));
        }
        return Err(ValidationError::InvalidModifier(ModifierFault::DoubleSign));
    }
    let negative = tail[0] == b'-' && magnitude != Some(0);
    Ok(Some((negative, magnitude)))
}

/// Validate a target number given as a number.
pub fn parse_target_number(value: f64, limits: &Limits) -> Result<u32, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidTarget("not a finite number"));
    }
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveTarget);
    }
    if value.fract() != 0.0 {
        return Err(ValidationError::NonIntegerTarget);
    }
    if value > f64::from(limits.max_target_number) {
        return Err(ValidationError::TargetTooHigh { maximum: limits.max_target_number });
    }
    Ok(value as u32)
}

/// Validate a target number given as text.
pub fn parse_target_text(text: &str, limits: &Limits) -> Result<u32, ValidationError> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidTarget("not a number"))?;
    parse_target_number(value, limits)
}
