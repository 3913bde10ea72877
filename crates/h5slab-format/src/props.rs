//! Transfer properties.
//!
//! Groups the knobs of a single encode/decode call into a reusable bundle,
//! either built in code or loaded from a TOML snippet:
//!
//! ```
//! use h5slab_format::props::TransferProps;
//!
//! let props = TransferProps::from_toml_str("allow_bulk_copy = false").unwrap();
//! assert!(!props.allow_bulk_copy);
//! assert_eq!(props.max_seek_step, i32::MAX as u32);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlabError};

/// Largest relative seek a stream accepts.
pub const MAX_SEEK_STEP: u32 = i32::MAX as u32;

/// Per-transfer properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferProps {
    /// Collapse whole single-chunk selections into one step.
    pub allow_bulk_copy: bool,
    /// Largest relative seek issued while positioning a stream.
    pub max_seek_step: u32,
}

impl Default for TransferProps {
    fn default() -> Self {
        Self {
            allow_bulk_copy: true,
            max_seek_step: MAX_SEEK_STEP,
        }
    }
}

impl TransferProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the bulk copy shortcut.
    pub fn bulk_copy(mut self, allow: bool) -> Self {
        self.allow_bulk_copy = allow;
        self
    }

    /// Set the largest relative seek, clamped to `1..=MAX_SEEK_STEP`.
    pub fn seek_step(mut self, step: u32) -> Self {
        self.max_seek_step = step.clamp(1, MAX_SEEK_STEP);
        self
    }

    /// Parse properties from TOML; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let props: Self = toml::from_str(s)?;
        props.validate()
    }

    /// Reject values no stream could honour.
    pub fn validate(self) -> Result<Self> {
        if self.max_seek_step == 0 {
            return Err(SlabError::InvalidProps("max_seek_step must be positive".into()));
        }
        Ok(Self {
            max_seek_step: self.max_seek_step.min(MAX_SEEK_STEP),
            ..self
        })
    }

    /// The seek step as the signed offset streams take.
    pub(crate) fn seek_step_i32(&self) -> i32 {
        self.max_seek_step.clamp(1, MAX_SEEK_STEP) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let props = TransferProps::new();
        assert!(props.allow_bulk_copy);
        assert_eq!(props.seek_step_i32(), i32::MAX);
    }

    #[test]
    fn builder() {
        let props = TransferProps::new().bulk_copy(false).seek_step(u32::MAX);
        assert!(!props.allow_bulk_copy);
        assert_eq!(props.max_seek_step, MAX_SEEK_STEP);
    }

    #[test]
    fn builder_clamps_zero_step() {
        let props = TransferProps::new().seek_step(0);
        assert_eq!(props.max_seek_step, 1);
        assert_eq!(props.validate().unwrap(), props);
    }

    #[test]
    fn toml_roundtrip() {
        let props = TransferProps::new().bulk_copy(false).seek_step(4096);
        let text = toml::to_string(&props).unwrap();
        assert_eq!(TransferProps::from_toml_str(&text).unwrap(), props);
    }

    #[test]
    fn toml_clamps_large_step() {
        let props = TransferProps::from_toml_str("max_seek_step = 4294967295").unwrap();
        assert_eq!(props.max_seek_step, MAX_SEEK_STEP);
    }

    #[test]
    fn toml_rejects_zero_step() {
        assert!(matches!(
            TransferProps::from_toml_str("max_seek_step = 0").unwrap_err(),
            SlabError::InvalidProps(_)
        ));
    }

    #[test]
    fn toml_rejects_garbage() {
        assert!(matches!(
            TransferProps::from_toml_str("allow_bulk_copy = \"yes\"").unwrap_err(),
            SlabError::Config(_)
        ));
    }
}
