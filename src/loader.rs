//! Sources for included documents.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Resolves an include path to the lines of another document.
///
/// Lines keep their terminators; rendering concatenates them unchanged.
pub trait Loader {
    fn load(&self, path: &str) -> Result<Vec<String>>;
}

/// Splits a text blob into lines that keep their `\n`.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

/// Reads includes relative to a template directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    base_dir: PathBuf,
}

impl FsLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Loader for FsLoader {
    fn load(&self, path: &str) -> Result<Vec<String>> {
        let full = self.base_dir.join(path);
        let text = fs::read_to_string(&full).map_err(|err| Error::IncludeNotFound {
            path: path.to_string(),
            reason: format!("{}: {}", full.display(), err),
        })?;
        Ok(split_lines(&text))
    }
}

/// Documents held in memory, keyed by include path.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(path.into(), text.into());
    }
}

impl Loader for MemoryLoader {
    fn load(&self, path: &str) -> Result<Vec<String>> {
        self.documents
            .get(path)
            .map(|text| split_lines(text))
            .ok_or_else(|| Error::IncludeNotFound {
                path: path.to_string(),
                reason: "no such document".to_string(),
            })
    }
}

/// Rejects every include.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIncludes;

impl Loader for NoIncludes {
    fn load(&self, path: &str) -> Result<Vec<String>> {
        Err(Error::IncludeNotFound {
            path: path.to_string(),
            reason: "includes are disabled".to_string(),
        })
    }
}
