//! Engine configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Default values in code
//! 2. `config/{environment}.toml` (optional)
//! 3. Environment variables with the `PROCURA__` prefix, e.g.
//!    `PROCURA__SIDE_EFFECTS__REPORTS_ENABLED=false`

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use procura_observability::LogConfig;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcuraConfig {
    /// Current environment (development, production)
    pub environment: String,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub side_effects: SideEffectsConfig,
}

/// Switches for the post-commit side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SideEffectsConfig {
    pub notifications_enabled: bool,
    pub reports_enabled: bool,
}

impl Default for SideEffectsConfig {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            reports_enabled: true,
        }
    }
}

impl Default for ProcuraConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log: LogConfig::default(),
            side_effects: SideEffectsConfig::default(),
        }
    }
}

impl ProcuraConfig {
    /// Load configuration from `.env`, files and environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment =
            std::env::var("PROCURA__ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Self::builder(&environment)?
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(
                Environment::with_prefix("PROCURA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Builder preloaded with the in-code defaults.
    pub fn builder(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let log = LogConfig::default();
        let side_effects = SideEffectsConfig::default();

        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("log.filter", log.filter)?
            .set_default("log.json", log.json)?
            .set_default(
                "side_effects.notifications_enabled",
                side_effects.notifications_enabled,
            )?
            .set_default("side_effects.reports_enabled", side_effects.reports_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn defaults_apply_without_sources() {
        let cfg: ProcuraConfig = ProcuraConfig::builder("test")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.environment, "test");
        assert_eq!(cfg.log, LogConfig::default());
        assert!(cfg.side_effects.notifications_enabled);
        assert!(cfg.side_effects.reports_enabled);
    }

    #[test]
    fn file_overrides_defaults() {
        let toml = r#"
            [log]
            filter = "procura_infra=debug"
            json = false

            [side_effects]
            reports_enabled = false
        "#;

        let cfg: ProcuraConfig = ProcuraConfig::builder("development")
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.log.filter, "procura_infra=debug");
        assert!(!cfg.log.json);
        assert!(cfg.side_effects.notifications_enabled);
        assert!(!cfg.side_effects.reports_enabled);
    }
}
