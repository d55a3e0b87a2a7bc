use std::collections::HashMap;
use std::path::Path;
use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One provisioned login for the static authenticator.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenEntry {
    pub user_id: String,
    pub name: String,
}

/// Server configuration persisted as TOML.
///
/// Fields:
/// - port: listen port
/// - deal_delay_ms: pacing between dealt cards
/// - dealer_delay_ms: pacing between dealer draws
/// - starting_credits: balance granted to first-seen players
/// - tokens: bearer token table for the static authenticator
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub port: u16,
    pub deal_delay_ms: u64,
    pub dealer_delay_ms: u64,
    pub starting_credits: u32,
    #[serde(default)]
    pub tokens: HashMap<String, TokenEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            deal_delay_ms: 1000,
            dealer_delay_ms: 1000,
            starting_credits: 1000,
            tokens: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path`. If the file does not exist, create
    /// it with reasonable defaults and return the default config.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("reading config file '{}'", path.display()))?;
            let cfg: Config = toml::from_str(&s)
                .with_context(|| format!("parsing TOML config '{}'", path.display()))?;
            Ok(cfg)
        } else {
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("creating config directory '{}'", parent.display())
                    })?;
                }
            }

            let cfg = Config::default();
            let toml_text = toml::to_string_pretty(&cfg)
                .with_context(|| "serializing default config to TOML")?;
            fs::write(path, toml_text)
                .with_context(|| format!("writing default config to '{}'", path.display()))?;
            Ok(cfg)
        }
    }

    /// Save the current config state back to the provided path (overwrites).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating config directory '{}'", parent.display()))?;
            }
        }
        let toml_text =
            toml::to_string_pretty(&self).with_context(|| "serializing config to TOML")?;
        fs::write(path, toml_text)
            .with_context(|| format!("writing config to '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_table_parses() {
        let raw = r#"
port = 4000
deal_delay_ms = 500
dealer_delay_ms = 500
starting_credits = 2000

[tokens.tok-alice]
user_id = "alice"
name = "Alice"
"#;
        let cfg: Config = toml::from_str(raw).unwrap();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.starting_credits, 2000);
        assert_eq!(cfg.tokens["tok-alice"].user_id, "alice");
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.port, cfg.port);
        assert_eq!(parsed.deal_delay_ms, cfg.deal_delay_ms);
        assert!(parsed.tokens.is_empty());
    }
}
