use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a path object.
///
/// In interchange documents this is the `properties.classification` object,
/// with the color packed into a signed ARGB integer (`colorRGB`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathClass {
    name: String,
    #[serde(rename = "colorRGB", default, skip_serializing_if = "Option::is_none")]
    color: Option<i32>,
}

impl PathClass {
    /// Create a class without a color.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }

    /// Attach an opaque RGB color.
    pub fn with_rgb(mut self, r: u8, g: u8, b: u8) -> Self {
        let packed = 0xff00_0000_u32 | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);
        self.color = Some(packed as i32);
        self
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The color as an `(r, g, b)` triple, if set.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        self.color.map(|packed| {
            let packed = packed as u32;
            ((packed >> 16) as u8, (packed >> 8) as u8, packed as u8)
        })
    }
}

impl fmt::Display for PathClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
