use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::access::matcher::RuleMatchMode;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub policy: Policy,
    pub rules: Rules,
    pub logging: Logging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Directory holding the `.kdl` policy files. Default: policies
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Rules {
    /// Whether a rule covers the subtree below its last pattern (`prefix`)
    /// or only the path it spells out (`exact`).
    #[serde(default)]
    pub match_mode: RuleMatchMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    /// `EnvFilter` directives, used when RUST_LOG is not set
    pub filter: String,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("policies"),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default(
                "policy.dir",
                Policy::default().dir.to_string_lossy().to_string(),
            )
            .into_diagnostic()?
            .set_default("rules.match_mode", "prefix")
            .into_diagnostic()?
            .set_default("logging.filter", Logging::default().filter)
            .into_diagnostic()?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: CATALOG_ACCESS__RULES__MATCH_MODE=exact, etc.
        builder =
            builder.add_source(config::Environment::with_prefix("CATALOG_ACCESS").separator("__"));

        let cfg = builder.build().into_diagnostic()?;
        let mut s: Settings = cfg.try_deserialize().into_diagnostic()?;

        // Normalize policy dir to be relative to current dir
        if s.policy.dir.is_relative() {
            s.policy.dir = std::env::current_dir()
                .into_diagnostic()?
                .join(&s.policy.dir);
        }

        Ok(s)
    }
}
