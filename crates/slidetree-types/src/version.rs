use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Version of the interchange document format a store reads and writes.
///
/// Producers up to and including 0.2.3 did not write the `id` type tag on
/// feature records; readers synthesize it from `properties.object_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InterchangeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl InterchangeVersion {
    /// The version written by this crate.
    pub const CURRENT: Self = Self::new(0, 4, 3);

    /// The last version that omitted type tags.
    pub const LAST_UNTAGGED: Self = Self::new(0, 2, 3);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns `true` if records of this version may lack a type tag.
    pub fn omits_type_tags(&self) -> bool {
        *self <= Self::LAST_UNTAGGED
    }
}

impl Default for InterchangeVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for InterchangeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for InterchangeVersion {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidVersion(s.to_string());
        let mut parts = s.trim().splitn(3, '.');
        let mut next = || -> Result<u32, TypeError> {
            parts
                .next()
                .ok_or_else(invalid)?
                .parse()
                .map_err(|_| invalid())
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        Ok(Self::new(major, minor, patch))
    }
}

impl TryFrom<String> for InterchangeVersion {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InterchangeVersion> for String {
    fn from(version: InterchangeVersion) -> Self {
        version.to_string()
    }
}
