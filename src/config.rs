//! Host configuration (YAML or JSON, picked by file extension).
//!
//! Resolution: `--config PATH` > `HOLLOW_CONFIG` env > built-in defaults.
//!
//! ```yaml
//! verbose: 1
//! cooldowns:
//!   heal: { seconds: 30, max_uses: 1 }
//!   spawn: { seconds: 10, max_uses: 3 }
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::dispatch::Cooldown;
use crate::dispatch::command::names_match;

pub const CONFIG_ENV: &str = "HOLLOW_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Verbosity floor; `-v` flags can only raise it.
    pub verbose: u8,
    pub quiet: bool,
    /// Per-command cooldown overrides, keyed case-insensitively by name.
    pub cooldowns: BTreeMap<String, CooldownConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CooldownConfig {
    pub seconds: f64,
    #[serde(default = "default_max_uses")]
    pub max_uses: u32,
}

fn default_max_uses() -> u32 {
    1
}

impl CooldownConfig {
    pub const fn new(seconds: f64, max_uses: u32) -> Self {
        Self { seconds, max_uses }
    }

    pub fn to_cooldown(self) -> Result<Cooldown> {
        Cooldown::from_secs(self.seconds, self.max_uses)
    }
}

impl Config {
    /// Load from a file; `.yaml` / `.yml` parse as YAML, anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let lower = path.to_string_lossy().to_ascii_lowercase();
        if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Self::from_yaml(&raw)
        } else {
            Self::from_json(&raw)
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(raw).context("failed to parse YAML config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(raw).context("failed to parse JSON config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Every cooldown must convert to a window: finite, non-negative, in range.
    pub fn validate(&self) -> Result<()> {
        for (name, cd) in &self.cooldowns {
            if !cd.seconds.is_finite() || cd.seconds < 0.0 {
                bail!("cooldown '{name}': seconds must be a finite non-negative number");
            }
            cd.to_cooldown().with_context(|| format!("cooldown '{name}'"))?;
        }
        Ok(())
    }

    /// Explicit path first, then `HOLLOW_CONFIG`, else defaults.
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        let from_env = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty());
        match explicit.map(str::to_string).or(from_env) {
            Some(path) => Self::load(path.trim()),
            None => Ok(Self::default()),
        }
    }

    /// Cooldown for `command`, or `fallback` when not configured.
    pub fn cooldown_for(&self, command: &str, fallback: CooldownConfig) -> CooldownConfig {
        self.cooldowns
            .iter()
            .find(|(name, _)| names_match(name, command))
            .map(|(_, cd)| *cd)
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_yaml() {
        let raw = "\
verbose: 2
cooldowns:
  Heal: { seconds: 5.5, max_uses: 2 }
  spawn: { seconds: 1 }
";
        let cfg = Config::from_yaml(raw).unwrap();
        assert_eq!(cfg.verbose, 2);
        assert_eq!(
            cfg.cooldown_for("heal", CooldownConfig::new(30.0, 1)),
            CooldownConfig::new(5.5, 2)
        );
        assert_eq!(cfg.cooldowns["spawn"].max_uses, 1, "max_uses defaults to 1");
    }

    #[test]
    fn parses_json_and_falls_back() {
        let cfg = Config::from_json(r#"{ "quiet": true }"#).unwrap();
        assert!(cfg.quiet);
        let fallback = CooldownConfig::new(30.0, 1);
        assert_eq!(cfg.cooldown_for("heal", fallback), fallback);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Config::from_json(r#"{ "verbosity": 3 }"#).unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"));
    }

    #[test]
    fn load_picks_format_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "cooldowns:\n  wait: {{ seconds: 2, max_uses: 4 }}").unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.cooldowns["wait"], CooldownConfig::new(2.0, 4));

        let missing = Config::load("/definitely/not/here.json").unwrap_err();
        assert!(missing.to_string().contains("failed to read config file"));
    }

    #[test]
    fn json_file_by_default_extension() {
        let mut file = tempfile::Builder::new().suffix(".conf").tempfile().unwrap();
        write!(file, r#"{{ "cooldowns": {{ "heal": {{ "seconds": 3 }} }} }}"#).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.cooldowns["heal"], CooldownConfig::new(3.0, 1));
    }

    #[test]
    fn rejects_unusable_cooldown_windows() {
        let err = Config::from_yaml("cooldowns:\n  heal: { seconds: .inf }\n").unwrap_err();
        assert!(format!("{err:#}").contains("cooldown 'heal'"));
        assert!(Config::from_yaml("cooldowns:\n  heal: { seconds: -2 }\n").is_err());
        assert!(Config::from_yaml("cooldowns:\n  heal: { seconds: 1.0e300 }\n").is_err());
        assert!(Config::from_json(r#"{ "cooldowns": { "spawn": { "seconds": 0.5 } } }"#).is_ok());
    }
}
