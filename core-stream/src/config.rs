//! # Stream Configuration
//!
//! Buffering knobs for [`RemoteStream`](crate::RemoteStream).

use serde::{Deserialize, Serialize};

/// Buffering configuration for one remote stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Ring buffer capacity in bytes.
    ///
    /// Default: 256 KB.
    #[serde(default = "default_buffer_bytes")]
    pub buffer_bytes: usize,

    /// Distance in bytes the writer keeps behind the reader's logical
    /// tail. Buffered bytes inside this margin survive a short backward
    /// seek without a transfer restart.
    ///
    /// Default: 2 KB.
    #[serde(default = "default_guard_bytes")]
    pub guard_bytes: usize,

    /// Ask servers for inline metadata (track titles on live streams).
    ///
    /// Default: true.
    #[serde(default = "default_inline_metadata")]
    pub inline_metadata: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_bytes: default_buffer_bytes(),
            guard_bytes: default_guard_bytes(),
            inline_metadata: default_inline_metadata(),
        }
    }
}

impl StreamConfig {
    /// Configuration for memory-constrained hosts: a 64 KB window.
    pub fn low_memory() -> Self {
        Self {
            buffer_bytes: 64 * 1024,
            ..Default::default()
        }
    }

    /// Configuration for lossy networks: a 1 MB window absorbs longer
    /// stalls and keeps more history for backward seeks.
    pub fn deep_buffer() -> Self {
        Self {
            buffer_bytes: 1024 * 1024,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_bytes == 0 {
            return Err("buffer_bytes must be > 0".to_string());
        }
        if self.guard_bytes >= self.buffer_bytes {
            return Err("guard_bytes must be smaller than buffer_bytes".to_string());
        }
        Ok(())
    }
}

fn default_buffer_bytes() -> usize {
    256 * 1024
}

fn default_guard_bytes() -> usize {
    2048
}

fn default_inline_metadata() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_bytes, 256 * 1024);
        assert_eq!(config.guard_bytes, 2048);
        assert!(config.inline_metadata);
    }

    #[test]
    fn test_presets() {
        assert!(StreamConfig::low_memory().validate().is_ok());
        assert!(StreamConfig::deep_buffer().validate().is_ok());
        assert!(StreamConfig::low_memory().buffer_bytes < StreamConfig::deep_buffer().buffer_bytes);
    }

    #[test]
    fn test_config_validation() {
        let mut config = StreamConfig::default();
        assert!(config.validate().is_ok());

        config.buffer_bytes = 0;
        assert!(config.validate().is_err());

        config.buffer_bytes = 1024;
        config.guard_bytes = 1024;
        assert!(config.validate().is_err());
    }
}
