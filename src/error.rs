//! Error types for the fake source facade.

use thiserror::Error;

/// Errors detected while preparing the source.
///
/// A validation failure names the plugin and the violated rule; the source
/// does not start.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration rule was violated.
    #[error("{plugin}, {plugin_type}, [{rule}] {message}")]
    Validation {
        plugin: &'static str,
        plugin_type: &'static str,
        rule: &'static str,
        message: String,
    },

    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The configuration file could not be read.
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Validation failure of the fake source.
    pub fn validation(rule: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            plugin: crate::source::PLUGIN_NAME,
            plugin_type: crate::source::PLUGIN_TYPE,
            rule,
            message: message.into(),
        }
    }

    /// Violated rule name, if this is a validation failure.
    pub fn rule(&self) -> Option<&'static str> {
        match self {
            Self::Validation { rule, .. } => Some(rule),
            _ => None,
        }
    }
}

impl From<fake_generator::RuleViolation> for ConfigError {
    fn from(violation: fake_generator::RuleViolation) -> Self {
        Self::validation(violation.rule, violation.message)
    }
}
