use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::ast::{Placeholder, PlaceholderKind, Segment};
use crate::error::Error;
use crate::eval::Memo;
use crate::parser::Expression;
use crate::value::{Scope, Value};

/// A compiled document fragment.
///
/// Owns the child templates of its blocks and includes. Only the scope
/// changes after compilation, through [`Template::set`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub(crate) name: String,
    pub(crate) segments: Vec<Segment>,
    /// Conditions and inline expressions, deduplicated by id.
    pub(crate) expressions: IndexMap<String, Expression>,
    pub(crate) conditionals: IndexMap<String, Vec<Template>>,
    pub(crate) repetitions: IndexMap<String, Vec<Template>>,
    pub(crate) includes: IndexMap<String, Template>,
    pub(crate) variables: IndexSet<String>,
    pub(crate) scope: Scope,
    #[serde(default)]
    pub(crate) warnings: Vec<Error>,
}

impl Template {
    pub(crate) fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segments: Vec::new(),
            expressions: IndexMap::new(),
            conditionals: IndexMap::new(),
            repetitions: IndexMap::new(),
            includes: IndexMap::new(),
            variables: IndexSet::new(),
            scope: Scope::new(),
            warnings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scope.get(name)
    }

    /// Names used as `{name}` placeholders in this fragment.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(String::as_str)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn expression(&self, id: &str) -> Option<&Expression> {
        self.expressions.get(id)
    }

    pub fn conditional(&self, id: &str, index: usize) -> Option<&Template> {
        self.conditionals.get(id)?.get(index)
    }

    pub fn repetition(&self, name: &str, index: usize) -> Option<&Template> {
        self.repetitions.get(name)?.get(index)
    }

    pub fn repetition_mut(&mut self, name: &str, index: usize) -> Option<&mut Template> {
        self.repetitions.get_mut(name)?.get_mut(index)
    }

    pub fn include(&self, path: &str) -> Option<&Template> {
        self.includes.get(path)
    }

    /// Recoverable structure errors found while compiling this fragment and
    /// everything below it.
    pub fn warnings(&self) -> Vec<&Error> {
        let mut all: Vec<&Error> = self.warnings.iter().collect();
        for child in self.children() {
            all.extend(child.warnings());
        }
        all
    }

    fn children(&self) -> impl Iterator<Item = &Template> {
        self.repetitions
            .values()
            .flatten()
            .chain(self.conditionals.values().flatten())
            .chain(self.includes.values())
    }

    fn children_mut(&mut self) -> impl Iterator<Item = &mut Template> {
        self.repetitions
            .values_mut()
            .flatten()
            .chain(self.conditionals.values_mut().flatten())
            .chain(self.includes.values_mut())
    }

    /// Binds `name` here and in every nested block and include. Children
    /// receive a copy; setting a name on a child never reaches back up.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        self.assign(&name, &value);
    }

    fn assign(&mut self, name: &str, value: &Value) {
        self.scope.insert(name.to_string(), value.clone());
        for child in self.children_mut() {
            child.assign(name, value);
        }
    }

    /// Renders against the current scope. Every expression is evaluated at
    /// most once per call.
    pub fn render(&self) -> String {
        let mut memo = Memo::new();
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Include(path) => {
                    if let Some(child) = self.includes.get(path) {
                        out.push_str(&child.render());
                    }
                }
                Segment::Block(marker) => match marker.kind {
                    PlaceholderKind::If => self.render_conditional(marker, &mut memo, &mut out),
                    PlaceholderKind::For => self.render_repetition(marker, &mut out),
                },
                Segment::Variable(name) => {
                    if let Some(value) = self.scope.get(name) {
                        out.push_str(&value.to_string());
                    }
                }
                Segment::Expression(id) => {
                    if let Some(expr) = self.expressions.get(id) {
                        out.push_str(&memo.evaluate(expr, &self.scope).to_string());
                    }
                }
            }
        }

        out
    }

    fn render_conditional(&self, marker: &Placeholder, memo: &mut Memo, out: &mut String) {
        let (Some(expr), Some(child)) = (
            self.expressions.get(&marker.key),
            self.conditional(&marker.key, marker.index),
        ) else {
            return;
        };
        if memo.evaluate(expr, &self.scope).is_truthy() {
            out.push_str(&child.render());
        }
    }

    fn render_repetition(&self, marker: &Placeholder, out: &mut String) {
        let Some(Value::List(items)) = self.scope.get(&marker.key) else {
            return;
        };
        let Some(child) = self.repetition(&marker.key, marker.index) else {
            return;
        };

        // Bindings from earlier items stay visible to later ones within
        // this pass, but never leak into the stored child.
        let mut instance = child.clone();
        for item in items {
            for (name, value) in item {
                instance.assign(name, value);
            }
            out.push_str(&instance.render());
        }
    }
}

/// The set/render contract shared by fresh and cached documents.
pub trait Render {
    fn set(&mut self, name: &str, value: Value);
    fn render(&self) -> String;
}

impl Render for Template {
    fn set(&mut self, name: &str, value: Value) {
        self.assign(name, &value);
    }

    fn render(&self) -> String {
        Template::render(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_str;
    use crate::loader::NoIncludes;
    use pretty_assertions::assert_eq;

    fn compile(text: &str) -> Template {
        compile_str(text, &NoIncludes).unwrap()
    }

    #[test]
    fn set_broadcasts_to_every_child() {
        let mut tmpl = compile("{foreach items}\n{v}\n{/foreach}\n{if v}\n{v}\n{/if}\n");
        tmpl.set("v", 1);

        assert_eq!(tmpl.get("v"), Some(&Value::from(1)));
        assert_eq!(
            tmpl.repetition("items", 0).unwrap().get("v"),
            Some(&Value::from(1))
        );
        assert_eq!(
            tmpl.conditional("v", 0).unwrap().get("v"),
            Some(&Value::from(1))
        );
    }

    #[test]
    fn child_override_stays_local() {
        let mut tmpl = compile("{foreach items}\n{v}\n{/foreach}\n");
        tmpl.set("v", 1);
        tmpl.repetition_mut("items", 0).unwrap().set("v", 2);

        assert_eq!(tmpl.get("v"), Some(&Value::from(1)));
        assert_eq!(
            tmpl.repetition("items", 0).unwrap().get("v"),
            Some(&Value::from(2))
        );
    }

    #[test]
    fn repetition_does_not_mutate_stored_child() {
        let mut tmpl = compile("{foreach items}{x}{/foreach}");
        tmpl.set(
            "items",
            Value::from(serde_json::json!([{ "x": 0 }, { "x": 1 }])),
        );

        assert_eq!(tmpl.render(), "01");
        assert_eq!(
            tmpl.repetition("items", 0).unwrap().get("x"),
            Some(&Value::from(""))
        );
        assert_eq!(tmpl.render(), "01");
    }

    #[test]
    fn earlier_item_bindings_carry_forward_within_a_pass() {
        let mut tmpl = compile("{foreach items}[{x}{y}]{/foreach}");
        tmpl.set(
            "items",
            Value::from(serde_json::json!([{ "x": 1, "y": "a" }, { "x": 2 }])),
        );
        assert_eq!(tmpl.render(), "[1a][2a]");
    }

    #[test]
    fn render_trait_delegates() {
        let mut tmpl = compile("{greeting}, {who}!");
        Render::set(&mut tmpl, "greeting", Value::from("Hello"));
        Render::set(&mut tmpl, "who", Value::from("world"));
        assert_eq!(Render::render(&tmpl), "Hello, world!");
    }
}
