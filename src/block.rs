//! Block parser: carves conditional, repetition and comment blocks out of a
//! line sequence into child templates, then cuts what remains into
//! segments.
//!
//! Block matching works on physical lines. A block opened on line *i* closes
//! on the first later line where the open/close count of that block kind
//! returns to zero; the whole range is blanked and line *i* becomes a
//! placeholder marker.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace, warn};

use crate::ast::{Placeholder, PlaceholderKind, Segment};
use crate::error::{BlockKind, Error, Result};
use crate::loader::Loader;
use crate::parser::{expression_id, Expression};
use crate::template::Template;
use crate::value::Value;

static FOREACH_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{foreach\s([a-zA-Z0-9_]+)\}").unwrap());
static FOREACH_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{/foreach\}").unwrap());
static IF_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{if\s([a-zA-Z0-9_=><\-+()\s'!*%&|/]+)\}").unwrap());
static IF_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{/if\}").unwrap());
static COMMENT_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{\*").unwrap());
static COMMENT_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\}").unwrap());
static INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{include\s([a-zA-Z0-9_./]+)\}").unwrap());

fn markers(kind: BlockKind) -> (&'static Regex, &'static Regex) {
    match kind {
        BlockKind::If => (&IF_OPEN, &IF_CLOSE),
        BlockKind::Foreach => (&FOREACH_OPEN, &FOREACH_CLOSE),
        BlockKind::Comment => (&COMMENT_OPEN, &COMMENT_CLOSE),
    }
}

fn is_variable_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_expression_source(s: &str) -> bool {
    !s.trim().is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || c.is_whitespace() || "_=><-+()'!*%&|/".contains(c)
        })
}

fn is_include_path(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/'))
}

/// Compiles documents into template trees, loading includes on demand.
pub struct BlockParser<'a> {
    loader: &'a dyn Loader,
    /// Include paths currently being compiled, outermost first.
    include_stack: Vec<String>,
}

impl<'a> BlockParser<'a> {
    pub fn new(loader: &'a dyn Loader) -> Self {
        Self {
            loader,
            include_stack: Vec::new(),
        }
    }

    /// Loads `path` through the loader and compiles it.
    pub fn compile_path(&mut self, path: &str) -> Result<Template> {
        if self.include_stack.iter().any(|p| p == path) {
            return Err(Error::IncludeCycle {
                path: path.to_string(),
            });
        }
        let lines = self.loader.load(path)?;
        self.compile_document(path, lines)
    }

    /// Compiles lines already read from `path`. Includes that lead back to
    /// `path` are reported as cycles.
    pub fn compile_document(&mut self, path: &str, lines: Vec<String>) -> Result<Template> {
        self.include_stack.push(path.to_string());
        let compiled = self.compile(path, lines);
        self.include_stack.pop();
        compiled
    }

    pub fn compile(&mut self, name: &str, mut lines: Vec<String>) -> Result<Template> {
        debug!(template = name, lines = lines.len(), "compiling");
        let mut template = Template::empty(name);

        for i in 0..lines.len() {
            if COMMENT_OPEN.is_match(&lines[i]) {
                self.carve(&mut lines, i, BlockKind::Comment, &mut template);
                continue;
            }

            let repetition = FOREACH_OPEN
                .captures(&lines[i])
                .map(|caps| caps[1].to_string());
            if let Some(key) = repetition {
                let index = template.repetitions.get(&key).map_or(0, Vec::len);
                let body = self.carve(&mut lines, i, BlockKind::Foreach, &mut template);
                let child = self.compile(&format!("{}_for_{}_{}", name, key, index), body)?;
                template.repetitions.entry(key.clone()).or_default().push(child);
                lines[i] = Placeholder::new(PlaceholderKind::For, key, index).to_string();
            }

            let condition = IF_OPEN.captures(&lines[i]).map(|caps| caps[1].to_string());
            if let Some(source) = condition {
                let expr = Expression::compile(&source)?;
                let key = expr.id().to_string();
                let index = template.conditionals.get(&key).map_or(0, Vec::len);
                let body = self.carve(&mut lines, i, BlockKind::If, &mut template);
                let child = self.compile(&format!("{}_if_{}_{}", name, key, index), body)?;
                template.conditionals.entry(key.clone()).or_default().push(child);
                template.expressions.entry(key.clone()).or_insert(expr);
                lines[i] = Placeholder::new(PlaceholderKind::If, key, index).to_string();
            }

            let paths: Vec<String> = INCLUDE
                .captures_iter(&lines[i])
                .map(|caps| caps[1].to_string())
                .collect();
            for path in paths {
                if !template.includes.contains_key(&path) {
                    let child = self.compile_path(&path)?;
                    template.includes.insert(path, child);
                }
            }
        }

        let mut segments = Segmenter::new(&mut template);
        for (n, line) in lines.iter().enumerate() {
            segments.line(line, n + 1)?;
        }
        segments.finish();

        // Placeholder names start out bound to the empty string in this node
        // only, so an unset `{name}` compares as `''` rather than as 0.
        for name in &template.variables {
            template
                .scope
                .entry(name.clone())
                .or_insert_with(|| Value::String(String::new()));
        }

        Ok(template)
    }

    /// Cuts the block opened on line `start` out of `lines` and returns its
    /// body. Lines `start..=end` are blanked.
    fn carve(
        &self,
        lines: &mut [String],
        start: usize,
        kind: BlockKind,
        template: &mut Template,
    ) -> Vec<String> {
        let (open, close) = markers(kind);

        let mut depth = 0usize;
        let mut end = None;
        for (n, line) in lines.iter().enumerate().skip(start) {
            if open.is_match(line) {
                depth += 1;
            }
            if close.is_match(line) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    end = Some(n);
                    break;
                }
            }
        }

        let body = match end {
            // `{block}BODY{/block}` on one line
            Some(end) if end == start => {
                let line = &lines[start];
                match (line.find('}'), line.rfind('{')) {
                    (Some(open_end), Some(close_start)) if open_end < close_start => {
                        vec![line[open_end + 1..close_start].to_string()]
                    }
                    _ => Vec::new(),
                }
            }
            // `{block}` then `BODY{/block}` on the next line
            Some(end) if end == start + 1 => {
                let line = &lines[end];
                let close_start = line.rfind('{').unwrap_or(0);
                vec![line[..close_start].to_string()]
            }
            Some(end) => lines[start + 1..end].to_vec(),
            None => {
                let err = Error::UnclosedBlock {
                    kind,
                    line: start + 1,
                };
                warn!(template = %template.name, "{}", err);
                template.warnings.push(err);
                lines[start + 1..].to_vec()
            }
        };

        let end = end.unwrap_or(lines.len() - 1);
        trace!(
            template = %template.name,
            %kind,
            from = start + 1,
            to = end + 1,
            "carved block"
        );
        for line in &mut lines[start..=end] {
            line.clear();
        }

        body
    }
}

/// Cuts carved lines into segments, compiling inline expressions into the
/// template's expression table.
struct Segmenter<'t> {
    template: &'t mut Template,
    text: String,
}

impl<'t> Segmenter<'t> {
    fn new(template: &'t mut Template) -> Self {
        Self {
            template,
            text: String::new(),
        }
    }

    fn push(&mut self, segment: Segment) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.template.segments.push(Segment::Text(text));
        }
        self.template.segments.push(segment);
    }

    fn finish(mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.template.segments.push(Segment::Text(text));
        }
    }

    fn line(&mut self, line: &str, number: usize) -> Result<()> {
        let mut rest = line;

        while let Some(pos) = rest.find(['{', '\\']) {
            self.text.push_str(&rest[..pos]);
            rest = &rest[pos..];

            if let Some(after) = rest.strip_prefix("\\{") {
                self.text.push('{');
                rest = after;
                continue;
            }
            if let Some(after) = rest.strip_prefix("\\}") {
                self.text.push('}');
                rest = after;
                continue;
            }
            if let Some(after) = rest.strip_prefix('\\') {
                self.text.push('\\');
                rest = after;
                continue;
            }

            // At a `{`: the marker is whatever sits before the next brace,
            // provided that brace closes it.
            let inner = &rest[1..];
            let marker = inner
                .find(['{', '}'])
                .filter(|&end| inner[end..].starts_with('}'))
                .map(|end| &inner[..end]);

            match marker {
                Some(content) if self.marker(content, number)? => {
                    rest = &inner[content.len() + 1..];
                }
                _ => {
                    self.text.push('{');
                    rest = inner;
                }
            }
        }
        self.text.push_str(rest);
        Ok(())
    }

    /// Handles the content of one `{...}`. Returns `false` when it is plain
    /// text.
    fn marker(&mut self, content: &str, number: usize) -> Result<bool> {
        if let Ok(placeholder) = format!("{{{}}}", content).parse::<Placeholder>() {
            let table = match placeholder.kind {
                PlaceholderKind::If => &self.template.conditionals,
                PlaceholderKind::For => &self.template.repetitions,
            };
            let known = table
                .get(&placeholder.key)
                .is_some_and(|children| placeholder.index < children.len());
            if known {
                self.push(Segment::Block(placeholder));
            }
            return Ok(known);
        }

        let stray = match content {
            "/if" => Some(BlockKind::If),
            "/foreach" => Some(BlockKind::Foreach),
            _ => None,
        };
        if let Some(kind) = stray {
            let err = Error::UnmatchedClose { kind, line: number };
            warn!(template = %self.template.name, "{}", err);
            self.template.warnings.push(err);
            return Ok(true);
        }

        if let Some(path) = content.strip_prefix("include") {
            let mut chars = path.chars();
            if chars.next().is_some_and(char::is_whitespace) && is_include_path(chars.as_str()) {
                let path = chars.as_str();
                if self.template.includes.contains_key(path) {
                    self.push(Segment::Include(path.to_string()));
                    return Ok(true);
                }
            }
        }

        if is_variable_name(content) {
            self.template.variables.insert(content.to_string());
            self.push(Segment::Variable(content.to_string()));
            return Ok(true);
        }

        if is_expression_source(content) {
            let id = expression_id(content);
            if !self.template.expressions.contains_key(&id) {
                let expr = Expression::compile(content)?;
                self.template.expressions.insert(id.clone(), expr);
            }
            self.push(Segment::Expression(id));
            return Ok(true);
        }

        Ok(false)
    }
}
