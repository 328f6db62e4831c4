//! Process settings: business profile, compliance tooling, default
//! Factur-X level and logging, loaded from TOML and overridden from the
//! environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cii::ConformanceLevel;
use crate::core::{BusinessConfiguration, FacturxError};

/// Abstracts environment variable access.
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

pub const ENV_VERAPDF_PATH: &str = "FACTURX_VERAPDF_PATH";
pub const ENV_VERAPDF_TIMEOUT: &str = "FACTURX_VERAPDF_TIMEOUT_SECS";
pub const ENV_PROFILE: &str = "FACTURX_PROFILE";
pub const ENV_LOG_LEVEL: &str = "FACTURX_LOG_LEVEL";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub business: BusinessConfiguration,
    pub compliance: ComplianceSettings,
    pub facturx: FacturxSettings,
    pub logging: LoggingSettings,
}

/// External validator discovery and invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceSettings {
    /// Use this veraPDF binary instead of probing.
    pub verapdf_path: Option<PathBuf>,
    /// Locations tried in order when no explicit path is set.
    pub verapdf_candidates: Vec<PathBuf>,
    pub validation_timeout_secs: u64,
    pub discovery_timeout_secs: u64,
    /// veraPDF `--flavour` argument.
    pub flavour: String,
}

impl Default for ComplianceSettings {
    fn default() -> Self {
        Self {
            verapdf_path: None,
            verapdf_candidates: [
                "/usr/local/bin/verapdf",
                "/opt/verapdf/verapdf",
                "verapdf",
                "/Applications/veraPDF/verapdf",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
            validation_timeout_secs: 30,
            discovery_timeout_secs: 10,
            flavour: "3b".into(),
        }
    }
}

impl ComplianceSettings {
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacturxSettings {
    /// Default conformance level for generation.
    pub profile: String,
}

impl Default for FacturxSettings {
    fn default() -> Self {
        Self {
            profile: "basic".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(s: &str) -> Result<Self, FacturxError> {
        toml::from_str(s).map_err(|e| FacturxError::Config(format!("invalid settings TOML: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, FacturxError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FacturxError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// File (or defaults), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, FacturxError> {
        Self::load_with(path, &SystemEnvProvider)
    }

    pub fn load_with(path: Option<&Path>, env: &impl EnvProvider) -> Result<Self, FacturxError> {
        let settings = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let settings = settings.apply_env_overrides(env)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_env_overrides(mut self, env: &impl EnvProvider) -> Result<Self, FacturxError> {
        if let Some(path) = env.get(ENV_VERAPDF_PATH) {
            self.compliance.verapdf_path = Some(PathBuf::from(path));
        }
        if let Some(timeout) = env.get(ENV_VERAPDF_TIMEOUT) {
            self.compliance.validation_timeout_secs = timeout.trim().parse().map_err(|_| {
                FacturxError::Config(format!("invalid {ENV_VERAPDF_TIMEOUT} value: {timeout}"))
            })?;
        }
        if let Some(profile) = env.get(ENV_PROFILE) {
            self.facturx.profile = profile;
        }
        if let Some(level) = env.get(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), FacturxError> {
        self.profile()?;
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(FacturxError::Config(format!(
                "invalid log level '{}' (expected one of {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        if self.compliance.validation_timeout_secs == 0 {
            return Err(FacturxError::Config(
                "validation timeout must be at least one second".into(),
            ));
        }
        if self.business.invoice_number_format.is_empty() {
            return Err(FacturxError::Config("invoice number format is empty".into()));
        }
        Ok(())
    }

    /// The configured default conformance level.
    pub fn profile(&self) -> Result<ConformanceLevel, FacturxError> {
        self.facturx
            .profile
            .parse()
            .map_err(|e| FacturxError::Config(format!("facturx.profile: {e}")))
    }
}
