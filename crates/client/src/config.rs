//! Encoder configuration
//!
//! Tunables for [`FlatBufferBuilder`](crate::FlatBufferBuilder), parsed from
//! TOML with defaults for every field.
//!
//! # Example
//!
//! ```toml
//! initial_capacity = 65536
//! max_buffer_size = 268435456
//! force_defaults = false
//! dedup_vtables = true
//! ```

use std::str::FromStr;

use serde::Deserialize;
use statesync_protocol::MAX_BUFFER_SIZE;

use crate::error::{BuilderError, Result};

/// Default initial buffer capacity in bytes
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Builder configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    /// Bytes allocated up front; the buffer doubles when it runs out
    /// Default: 1024
    pub initial_capacity: usize,

    /// Hard ceiling on the finished buffer size
    /// Default: 2 GiB - 1 (largest size the offsets can address)
    pub max_buffer_size: usize,

    /// Write scalar fields even when they equal their default
    /// Default: false
    pub force_defaults: bool,

    /// Reuse an identical vtable already in the buffer
    /// Default: true
    pub dedup_vtables: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_buffer_size: MAX_BUFFER_SIZE,
            force_defaults: false,
            dedup_vtables: true,
        }
    }
}

impl EncoderConfig {
    /// Validate field relationships
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::InvalidConfig`] if `max_buffer_size` is zero
    /// or beyond what offsets can address, or if `initial_capacity` exceeds
    /// `max_buffer_size`.
    pub fn validate(&self) -> Result<()> {
        if self.max_buffer_size == 0 {
            return Err(BuilderError::invalid_config("max_buffer_size must be positive"));
        }
        if self.max_buffer_size > MAX_BUFFER_SIZE {
            return Err(BuilderError::invalid_config(format!(
                "max_buffer_size {} exceeds addressable maximum {}",
                self.max_buffer_size, MAX_BUFFER_SIZE
            )));
        }
        if self.initial_capacity > self.max_buffer_size {
            return Err(BuilderError::invalid_config(format!(
                "initial_capacity {} exceeds max_buffer_size {}",
                self.initial_capacity, self.max_buffer_size
            )));
        }
        Ok(())
    }
}

impl FromStr for EncoderConfig {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self> {
        let config: EncoderConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EncoderConfig::from_str("").unwrap();
        assert_eq!(config, EncoderConfig::default());
        assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert!(config.dedup_vtables);
        assert!(!config.force_defaults);
    }

    #[test]
    fn test_partial_config() {
        let config = EncoderConfig::from_str(
            r#"
initial_capacity = 65536
force_defaults = true
"#,
        )
        .unwrap();
        assert_eq!(config.initial_capacity, 65536);
        assert!(config.force_defaults);
        assert_eq!(config.max_buffer_size, MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EncoderConfig::from_str("compression = \"zstd\"").unwrap_err();
        assert!(matches!(err, BuilderError::ConfigParse(_)));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = EncoderConfig::from_str("dedup_vtables = \"yes\"").unwrap_err();
        assert!(matches!(err, BuilderError::ConfigParse(_)));
    }

    #[test]
    fn test_zero_max_rejected() {
        let err = EncoderConfig::from_str("max_buffer_size = 0\ninitial_capacity = 0").unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_capacity_above_max_rejected() {
        let err =
            EncoderConfig::from_str("max_buffer_size = 128\ninitial_capacity = 256").unwrap_err();
        assert!(matches!(err, BuilderError::InvalidConfig(_)));
    }

    #[test]
    fn test_max_above_addressable_rejected() {
        let config = EncoderConfig {
            max_buffer_size: MAX_BUFFER_SIZE + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
