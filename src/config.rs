//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::mail::filter::{AttachmentCriteria, DEFAULT_CONTENT_TYPES, DEFAULT_DISPOSITION_PATTERN};
use crate::pipeline::router::UnroutedPolicy;

/// Environment variable names read by [`ExtractorConfig::from_env`].
pub mod env {
    pub const TARGET_DIR: &str = "DMARC_TARGET_DIR";
    pub const CONTENT_TYPES: &str = "DMARC_CONTENT_TYPES";
    pub const DISPOSITION_PATTERN: &str = "DMARC_DISPOSITION_PATTERN";
    pub const UNROUTED_POLICY: &str = "DMARC_UNROUTED_POLICY";
}

/// Extractor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Directory that receives staged attachments and extracted reports. Must exist.
    pub target_dir: PathBuf,
    /// Accepted MIME types (lowercase `type/subtype`).
    pub content_types: Vec<String>,
    /// Regex the `Content-Disposition` value must match.
    pub disposition_pattern: String,
    /// What to do with attachments that are neither `.zip` nor `.gz`.
    pub unrouted_policy: UnroutedPolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("."),
            content_types: DEFAULT_CONTENT_TYPES.iter().map(|t| t.to_string()).collect(),
            disposition_pattern: DEFAULT_DISPOSITION_PATTERN.to_string(),
            unrouted_policy: UnroutedPolicy::default(),
        }
    }
}

impl ExtractorConfig {
    /// Defaults with the given output directory.
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            ..Default::default()
        }
    }

    /// Build config from environment variables.
    ///
    /// `DMARC_TARGET_DIR` is required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (the environment, in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let target_dir = get(env::TARGET_DIR)
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(env::TARGET_DIR.to_string()))?;

        let mut config = Self::new(target_dir);

        if let Some(types) = get(env::CONTENT_TYPES) {
            config.content_types = types
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect();

            if config.content_types.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: env::CONTENT_TYPES.to_string(),
                    message: "no content types listed".to_string(),
                });
            }
        }

        if let Some(pattern) = get(env::DISPOSITION_PATTERN) {
            config.disposition_pattern = pattern;
        }

        if let Some(policy) = get(env::UNROUTED_POLICY) {
            config.unrouted_policy = policy.parse().map_err(|_| ConfigError::InvalidValue {
                key: env::UNROUTED_POLICY.to_string(),
                message: format!("expected ignore, accept or reject, got {policy:?}"),
            })?;
        }

        // Fail here rather than at first use.
        config.criteria()?;

        Ok(config)
    }

    /// Compile the attachment acceptance rule.
    pub fn criteria(&self) -> Result<AttachmentCriteria, ConfigError> {
        Ok(AttachmentCriteria::new(
            &self.content_types,
            &self.disposition_pattern,
        )?)
    }
}
