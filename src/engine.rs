use tracing::{debug, warn};

use crate::block::BlockParser;
use crate::cache::{checksum, Document, MemoryCache, TemplateCache};
use crate::config::Config;
use crate::error::Result;
use crate::loader::{split_lines, FsLoader, Loader};
use crate::template::Template;

/// Compiles templates from a loader, optionally reusing compiled trees.
pub struct Engine {
    config: Config,
    loader: Box<dyn Loader>,
    cache: Box<dyn TemplateCache>,
}

impl Engine {
    /// Reads templates from `config.template_dir` and caches in memory.
    pub fn new(config: Config) -> Self {
        let loader = FsLoader::new(config.template_dir.clone());
        Self {
            config,
            loader: Box::new(loader),
            cache: Box::new(MemoryCache::new()),
        }
    }

    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_cache(mut self, cache: impl TemplateCache + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads and compiles `path`. Its includes resolve through the same
    /// loader.
    pub fn compile_file(&self, path: &str) -> Result<Template> {
        BlockParser::new(self.loader.as_ref()).compile_path(path)
    }

    /// Compiles `text` under `name`, or under the configured default name
    /// when `name` is empty.
    pub fn compile_str(&self, name: &str, text: &str) -> Result<Template> {
        let name = if name.is_empty() {
            self.config.name.as_str()
        } else {
            name
        };
        BlockParser::new(self.loader.as_ref()).compile(name, split_lines(text))
    }

    /// Loads `path`, restoring the compiled tree from the cache when caching
    /// is on and the source is unchanged.
    pub fn load(&mut self, path: &str) -> Result<Document> {
        let lines = self.loader.load(path)?;
        if !self.config.cache {
            return self.compile_lines(path, lines).map(Document::Fresh);
        }

        let key = format!("{}:{}", path, checksum(&lines));
        if let Some(compiled) = self.cache.get(&key) {
            match Template::from_compiled(&compiled) {
                Ok(template) => {
                    debug!(template = path, "cache hit");
                    return Ok(Document::Cached(template));
                }
                Err(err) => warn!(template = path, "discarding cached template: {}", err),
            }
        }

        let template = self.compile_lines(path, lines)?;
        self.cache.put(key, template.to_compiled()?);
        Ok(Document::Fresh(template))
    }

    fn compile_lines(&self, path: &str, lines: Vec<String>) -> Result<Template> {
        BlockParser::new(self.loader.as_ref()).compile_document(path, lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Compiled;
    use crate::loader::MemoryLoader;
    use crate::template::Render;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn engine(cache: bool) -> Engine {
        let loader = MemoryLoader::new()
            .with("page.html", "{include head.html}\nbody {n}\n")
            .with("head.html", "<h{n}>");
        Engine::new(Config::default().with_cache(cache)).with_loader(loader)
    }

    #[test]
    fn compile_file_resolves_includes() {
        let mut tmpl = engine(false).compile_file("page.html").unwrap();
        tmpl.set("n", 1);
        assert_eq!(tmpl.name(), "page.html");
        assert_eq!(tmpl.render(), "<h1>\nbody 1\n");
    }

    #[test]
    fn compile_str_uses_configured_name() {
        let engine = engine(false);
        assert_eq!(engine.compile_str("", "x").unwrap().name(), "template");
        assert_eq!(engine.compile_str("inline", "x").unwrap().name(), "inline");
    }

    #[test]
    fn load_without_cache_is_always_fresh() {
        let mut engine = engine(false);
        assert!(!engine.load("page.html").unwrap().is_cached());
        assert!(!engine.load("page.html").unwrap().is_cached());
    }

    #[test]
    fn second_load_hits_the_cache() {
        let mut engine = engine(true);
        let first = engine.load("page.html").unwrap();
        let mut second = engine.load("page.html").unwrap();

        assert!(!first.is_cached());
        assert!(second.is_cached());
        second.set("n", Value::from(2));
        assert_eq!(second.render(), "<h2>\nbody 2\n");
    }

    #[test]
    fn undecodable_entry_is_recompiled() {
        struct Poisoned;
        impl TemplateCache for Poisoned {
            fn get(&self, _key: &str) -> Option<Compiled> {
                Some(Compiled::from_bytes(b"{".to_vec()))
            }
            fn put(&mut self, _key: String, _compiled: Compiled) {}
        }

        let mut engine = engine(true).with_cache(Poisoned);
        let doc = engine.load("page.html").unwrap();
        assert!(!doc.is_cached());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(engine(true).load("nope.html").is_err());
    }
}
