use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory that template and include paths are resolved against.
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Reuse compiled templates whose source has not changed.
    #[serde(default)]
    pub cache: bool,

    /// Name given to templates compiled from strings.
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_template_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_name() -> String {
    "template".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_dir: default_template_dir(),
            cache: false,
            name: default_name(),
        }
    }
}

impl Config {
    /// Parses a JSON config. Missing fields take their defaults; an empty
    /// document is the default config.
    pub fn from_json(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }
}
