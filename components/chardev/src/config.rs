//! Device configuration
//!
//! Configuration is plain data that can be built in code or parsed from TOML:
//!
//! ```toml
//! name = "mychardev"
//! write_policy = "append"
//! ```

use serde::{Deserialize, Serialize};

use crate::{DeviceError, Result};

/// Default device name
pub const DEFAULT_DEVICE_NAME: &str = "mychardev";

/// How a write treats the data already in the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Each write replaces the whole buffer and rewinds every reader
    #[default]
    Replace,

    /// Writes accumulate until the buffer is full; readers keep their place
    Append,
}

/// Device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Device name, as it would appear under /dev
    pub name: String,

    /// Write semantics
    pub write_policy: WritePolicy,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            write_policy: WritePolicy::default(),
        }
    }
}

impl DeviceConfig {
    /// Config with the given name and default policy
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style policy override
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns `InvalidConfig` on malformed TOML, unknown keys, or a bad name
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: DeviceConfig =
            toml::from_str(input).map_err(|e| DeviceError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the name is usable as a device node name
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DeviceError::InvalidConfig("device name is empty".into()));
        }

        if let Some(c) = self
            .name
            .chars()
            .find(|c| !c.is_ascii_graphic() || *c == '/')
        {
            return Err(DeviceError::InvalidConfig(format!(
                "device name {:?} contains invalid character {:?}",
                self.name, c
            )));
        }

        Ok(())
    }
}
