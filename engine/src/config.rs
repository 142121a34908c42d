use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_DICE: u32 = 100;
pub const DEFAULT_MAX_DIE_TYPE: u32 = 999_999;
pub const DEFAULT_EXPLOSION_CAP: u32 = 100;
pub const DEFAULT_MAX_TARGET_NUMBER: u32 = 999_999;
pub const DEFAULT_MAX_COMMAND_LENGTH: usize = 200;
pub const DEFAULT_MAX_KARMA_DICE: u32 = 20;

/// Bounds applied to untrusted input and to the work a single roll may do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Limits {
    /// Most dice a single notation may ask for.
    pub max_dice: u32,
    /// Largest die size accepted.
    pub max_die_type: u32,
    /// Total draws allowed per original die when exploding.
    pub explosion_cap: u32,
    /// Highest target number accepted (inclusive).
    pub max_target_number: u32,
    /// Longest command text, in characters, looked at by the command parser.
    pub max_command_length: usize,
    /// Largest modifier magnitude.
    pub max_modifier: i64,
    /// Prefix in front of the `roll` keyword. Empty means none.
    pub command_prefix: String,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_dice: DEFAULT_MAX_DICE,
            max_die_type: DEFAULT_MAX_DIE_TYPE,
            explosion_cap: DEFAULT_EXPLOSION_CAP,
            max_target_number: DEFAULT_MAX_TARGET_NUMBER,
            max_command_length: DEFAULT_MAX_COMMAND_LENGTH,
            max_modifier: i64::from(i32::MAX),
            command_prefix: "!".to_string(),
        }
    }
}

/// Karma pool knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct KarmaRules {
    /// Faces on karma and reroll dice.
    pub die_type: u32,
    /// Ceiling for `buy_karma_dice` when the caller gives none.
    pub max_karma_dice: u32,
    /// Highest reroll iteration allowed. `None` leaves rerolls unbounded.
    pub max_reroll_iteration: Option<u32>,
}

impl Default for KarmaRules {
    fn default() -> Self {
        Self {
            die_type: 6,
            max_karma_dice: DEFAULT_MAX_KARMA_DICE,
            max_reroll_iteration: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    pub limits: Limits,
    pub karma: KarmaRules,
}

impl EngineConfig {
    /// Read a config file; `.yaml`/`.yml` go through YAML, everything else JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        let cfg = if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
        .with_context(|| format!("failed to parse config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?cfg, "loaded engine config");
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = EngineConfig::from_yaml_str("limits:\n  max_dice: 40\n").unwrap();
        assert_eq!(cfg.limits.max_dice, 40);
        assert_eq!(cfg.limits.max_die_type, DEFAULT_MAX_DIE_TYPE);
        assert_eq!(cfg.karma, KarmaRules::default());
    }

    #[test]
    fn json_reroll_ceiling() {
        let cfg =
            EngineConfig::from_json_str(r#"{"karma": {"max_reroll_iteration": 3}}"#).unwrap();
        assert_eq!(cfg.karma.max_reroll_iteration, Some(3));
        assert_eq!(cfg.limits, Limits::default());
    }
}
