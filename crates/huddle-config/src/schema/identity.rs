use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the durable display identity lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Explicit store file. `None` uses `<data_dir>/huddle/identity.json`.
    pub store_path: Option<PathBuf>,
}

impl IdentityConfig {
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        self.store_path
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("huddle").join("identity.json")))
    }
}
