//! SDK version compatibility

use std::fmt;
use std::str::FromStr;

use crate::error::PluginHostError;

/// A numeric `major.minor.patch` version.
///
/// Missing components count as zero and any pre-release or build suffix
/// (`-beta.1`, `+sha`) is ignored, so `"1.2"`, `"1.2.0"` and `"1.2.0-rc1"`
/// all compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SdkVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SdkVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for SdkVersion {
    type Err = PluginHostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PluginHostError::InvalidVersion {
            version: s.to_string(),
        };

        let core = s.trim().split(['-', '+']).next().unwrap_or_default();
        if core.is_empty() {
            return Err(invalid());
        }

        let mut parts = [0u32; 3];
        let mut count = 0;
        for component in core.split('.') {
            if count == parts.len() {
                return Err(invalid());
            }
            parts[count] = component.parse().map_err(|_| invalid())?;
            count += 1;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for SdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Check that a plugin's minimum SDK version is satisfied by the host.
pub fn check_compatible(required: &str, current: &str) -> Result<(), PluginHostError> {
    let required_version: SdkVersion = required.parse()?;
    let current_version: SdkVersion = current.parse()?;

    if required_version > current_version {
        return Err(PluginHostError::IncompatibleVersion {
            required: required.to_string(),
            current: current.to_string(),
        });
    }
    Ok(())
}
