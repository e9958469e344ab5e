//! Validation configuration
//!
//! - Strict by default: unknown input keys are rejected
//! - Permissive mode ignores unknown keys
//! - Only whole-record validation reads the config

use serde::{Deserialize, Serialize};

/// Options for whole-record validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Whether keys the record does not declare are ignored.
    pub allow_unknown_fields: bool,
}

impl ValidationConfig {
    /// Create a config that rejects unknown keys.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Create a config that ignores unknown keys.
    pub fn permissive() -> Self {
        Self {
            allow_unknown_fields: true,
        }
    }

    /// Check if unknown keys are ignored.
    pub fn allows_unknown_fields(&self) -> bool {
        self.allow_unknown_fields
    }
}
