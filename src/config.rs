use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::error::{Error, Result};
use crate::fatal::FailurePolicy;
use crate::naming::DEFAULT_HANDLER_PREFIX;

/// Registry construction settings, loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default = "default_handler_prefix")]
    pub handler_prefix: String,
}

fn default_handler_prefix() -> String {
    DEFAULT_HANDLER_PREFIX.to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            handler_prefix: default_handler_prefix(),
        }
    }
}

impl RegistryConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| Error::config(e.to_string()))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::config(e.to_string()))
    }
}
