//! Stack configuration
//!
//! Controls the initial slot capacity of a [`Stack`](crate::Stack) and how deep
//! nested tables are followed when they are converted to or from host values.
//!
//! Configuration can be built in code or read from TOML:
//!
//! ```toml
//! initial_capacity = 512
//! max_table_depth = 16
//! ```
//!
//! Missing keys fall back to the defaults.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Default stack capacity (number of slots reserved up front)
pub const DEFAULT_STACK_CAPACITY: usize = 256;

/// Default limit on table nesting followed by conversions
pub const DEFAULT_MAX_TABLE_DEPTH: usize = 64;

/// Error loading a [`StackConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read stack config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse stack config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid stack config: {0}")]
    Invalid(String),
}

/// Configuration for a runtime stack
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    /// Number of slots reserved when the stack is created. The stack grows
    /// past this on demand.
    pub initial_capacity: usize,

    /// Maximum table nesting followed when materializing or pushing tables.
    /// Deeper levels degrade to nil.
    pub max_table_depth: usize,
}

impl Default for StackConfig {
    fn default() -> Self {
        StackConfig {
            initial_capacity: DEFAULT_STACK_CAPACITY,
            max_table_depth: DEFAULT_MAX_TABLE_DEPTH,
        }
    }
}

impl StackConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial slot capacity
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the table nesting limit
    pub fn with_max_table_depth(mut self, depth: usize) -> Self {
        self.max_table_depth = depth;
        self
    }

    /// Parse a config from TOML text
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: StackConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check the settings for values the stack cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_table_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_table_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
