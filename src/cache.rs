//! Persisting compiled templates.
//!
//! A compiled [`Template`] serializes to an opaque [`Compiled`] blob. Hosts
//! key blobs by template name and [`checksum`] of the source lines, so an
//! edited source never hits a stale entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::template::{Render, Template};
use crate::value::Value;

/// Hex SHA-256 of the concatenated source lines.
pub fn checksum(lines: &[String]) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Serialized form of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compiled(Vec<u8>);

impl Compiled {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl Template {
    /// Serializes the compiled structure, its warnings and the current
    /// scope.
    pub fn to_compiled(&self) -> Result<Compiled> {
        Ok(Compiled(serde_json::to_vec(self)?))
    }

    pub fn from_compiled(compiled: &Compiled) -> Result<Template> {
        Ok(serde_json::from_slice(compiled.as_bytes())?)
    }
}

/// Storage for compiled templates.
pub trait TemplateCache {
    fn get(&self, key: &str) -> Option<Compiled>;
    fn put(&mut self, key: String, compiled: Compiled);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: HashMap<String, Compiled>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TemplateCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Compiled> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: String, compiled: Compiled) {
        self.entries.insert(key, compiled);
    }
}

/// A template either compiled from source or restored from a cache.
#[derive(Debug, Clone)]
pub enum Document {
    Fresh(Template),
    Cached(Template),
}

impl Document {
    pub fn template(&self) -> &Template {
        match self {
            Document::Fresh(t) | Document::Cached(t) => t,
        }
    }

    pub fn template_mut(&mut self) -> &mut Template {
        match self {
            Document::Fresh(t) | Document::Cached(t) => t,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Document::Cached(_))
    }

    pub fn into_template(self) -> Template {
        match self {
            Document::Fresh(t) | Document::Cached(t) => t,
        }
    }
}

impl Render for Document {
    fn set(&mut self, name: &str, value: Value) {
        Render::set(self.template_mut(), name, value);
    }

    fn render(&self) -> String {
        self.template().render()
    }
}
