use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use slidetree_hierarchy::LoadOptions;
use slidetree_types::InterchangeVersion;

/// Settings read from `--config`. Command-line flags win over these.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub load: LoadOptions,
    /// Interchange version assumed for input documents.
    pub interchange_version: Option<InterchangeVersion>,
}

impl CliConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Merge flags over the file settings.
    pub fn load_options(&self, fix_invalid: bool, raise_on_skip: bool) -> LoadOptions {
        LoadOptions {
            fix_invalid: fix_invalid || self.load.fix_invalid,
            raise_on_skip: raise_on_skip || self.load.raise_on_skip,
        }
    }

    pub fn version(&self, legacy: Option<InterchangeVersion>) -> InterchangeVersion {
        legacy.or(self.interchange_version).unwrap_or_default()
    }
}
