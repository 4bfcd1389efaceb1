//! Suite settings via `axiom.toml`
//!
//! Lets a suite keep its defaults (metadata, retry policy, skip, parallel)
//! in a file next to the tests instead of in code. Absent fields stay unset,
//! so applying the settings to a runner goes through the same join rules as
//! any other fragment.

use axiom_core::{Error, Meta, Result, Retry, Skip};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Settings file name looked up in the suite directory.
pub const SETTINGS_FILE_NAME: &str = "axiom.toml";

/// `[retry]` section. Both fields are optional; an absent field never
/// overrides a value set elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<u32>,
    /// Delay between attempts in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

/// Suite settings loaded from `axiom.toml`.
///
/// # Example
///
/// ```toml
/// parallel = false
///
/// [meta]
/// epic = "checkout"
/// tags = ["smoke"]
///
/// [retry]
/// times = 3
/// delay_ms = 250
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteSettings {
    /// Let cases run in parallel with their siblings
    #[serde(default)]
    pub parallel: bool,
    /// Suite-wide metadata
    #[serde(default)]
    pub meta: Meta,
    /// Suite-wide retry policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetrySettings>,
    /// Skip the whole suite
    #[serde(default)]
    pub skip: Skip,
}

impl SuiteSettings {
    /// Retry fragment carrying only the fields present in the file
    pub fn retry(&self) -> Retry {
        let mut retry = Retry::new();
        if let Some(settings) = self.retry {
            if let Some(times) = settings.times {
                retry = retry.times(times);
            }
            if let Some(ms) = settings.delay_ms {
                retry = retry.delay(Duration::from_millis(ms));
            }
        }
        retry
    }

    /// Returns the default settings file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Axiom suite settings
#
# Allow cases to run in parallel with their siblings (default: false)
parallel = false

# Suite-wide metadata, joined into every case.
# Scalars set here are overridden by a case that sets them too;
# tags and issues are appended.
[meta]
# epic = "checkout"
# feature = "payments"
# severity = "normal"   # blocker, critical, normal, minor, trivial
# tags = ["smoke"]

# Retry policy. Unset fields never override what a case sets.
# [retry]
# times = 3        # total attempts, including the first
# delay_ms = 250   # pause between attempts

# Skip every case in the suite.
# [skip]
# enabled = true
# reason = "backend under maintenance"
"#
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSettings` if the text is not valid settings TOML.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::InvalidSettings(format!("Failed to parse settings: {}", e)))
    }

    /// Read and parse settings from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidSettings(format!(
                "Failed to read settings file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let settings: SuiteSettings = toml::from_str(&content).map_err(|e| {
            Error::InvalidSettings(format!(
                "Failed to parse settings file '{}': {}",
                path.display(),
                e
            ))
        })?;
        debug!(target: "axiom::settings", path = %path.display(), "Loaded suite settings");
        Ok(settings)
    }

    /// Write the default settings file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::InvalidSettings(format!(
                    "Failed to write default settings file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize these settings to TOML and write them to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidSettings(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::InvalidSettings(format!(
                "Failed to write settings file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
