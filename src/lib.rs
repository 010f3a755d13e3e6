//! stencil: a line-oriented brace template language.
//!
//! A template is plain text with markers in braces:
//!
//! - `{name}` inserts a scope value.
//! - `{a + b * 2}` inserts the result of an expression.
//! - `{if cond}...{/if}` keeps its body when `cond` is truthy.
//! - `{foreach items}...{/foreach}` renders its body once per item of a
//!   list, binding the item's keys.
//! - `{include path}` inserts another compiled document.
//! - `{* ... *}` is a comment, opened at the start of a line.
//! - `\{` and `\}` are literal braces.
//!
//! Brace content made only of expression characters (letters, digits,
//! `_`, spaces, quotes and operators) is compiled as an expression and must
//! be valid: `{hello world}` or `{/ if}` fail with [`Error::Syntax`]. Other
//! brace content, such as `{a.b}` or `{}`, stays as text.
//!
//! Rendering never fails. Every `{name}` placeholder starts out bound to the
//! empty string in its own node; other unknown names evaluate to `0` in
//! expressions.
//!
//! Block markers are matched per physical line. Opening and closing a block
//! on the same line, or closing it on the next line, cuts the body out of
//! the line; otherwise the body is the lines strictly between the markers,
//! and text around the markers on those lines is dropped.
//!
//! Expressions support `+ - * / %`, the comparisons `< > <= >= = != ==`,
//! `&& || !` and parentheses. Operands are numbers, `'quoted'` words,
//! `true`, `false` and scope names.
//!
//! ```
//! use stencil::{compile_str, NoIncludes, Value};
//!
//! let mut tmpl = compile_str("{if n > 1}\n{n} items\n{/if}\n", &NoIncludes).unwrap();
//! tmpl.set("n", 3);
//! assert_eq!(tmpl.render(), "3 items\n");
//!
//! tmpl.set("n", Value::from(1));
//! assert_eq!(tmpl.render(), "");
//! ```

mod ast;
mod block;
mod cache;
mod config;
mod engine;
mod error;
mod eval;
mod lexer;
mod loader;
mod parser;
mod template;
mod value;

pub use ast::{Atom, Operator, Placeholder, PlaceholderKind, Segment};
pub use block::BlockParser;
pub use cache::{checksum, Compiled, Document, MemoryCache, TemplateCache};
pub use config::Config;
pub use engine::Engine;
pub use error::{BlockKind, Error, Result};
pub use eval::Memo;
pub use lexer::{Token, Tokenizer};
pub use loader::{split_lines, FsLoader, Loader, MemoryLoader, NoIncludes};
pub use parser::{expression_id, Expression};
pub use template::{Render, Template};
pub use value::{Scope, Value};

/// Compiles a document given as lines that keep their terminators.
pub fn compile(lines: Vec<String>, loader: &dyn Loader) -> Result<Template> {
    BlockParser::new(loader).compile("template", lines)
}

/// Compiles a document held in one string.
pub fn compile_str(text: &str, loader: &dyn Loader) -> Result<Template> {
    compile(split_lines(text), loader)
}
