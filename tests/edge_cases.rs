use pretty_assertions::assert_eq;
use serde_json::json;
use stencil::{compile_str, BlockKind, Error, Expression, NoIncludes, Scope, Template, Value};

fn compile(text: &str) -> Template {
    compile_str(text, &NoIncludes).unwrap()
}

// ── Text and variables ──

#[test]
fn empty_template_renders_empty() {
    assert_eq!(compile("").render(), "");
}

#[test]
fn plain_text_template_no_markers() {
    assert_eq!(compile("Hello, world!\n").render(), "Hello, world!\n");
}

#[test]
fn unset_variable_renders_empty() {
    assert_eq!(compile("[{missing}]").render(), "[]");
}

#[test]
fn unset_placeholder_compares_as_empty_string() {
    let tmpl = compile("{title}\n{if title = ''}\nuntitled\n{/if}\n");
    assert_eq!(tmpl.get("title"), Some(&Value::from("")));
    assert_eq!(tmpl.render(), "\nuntitled\n");

    let tmpl = compile("{n}|\n{if n = 0}\nzero\n{/if}\n");
    assert_eq!(tmpl.render(), "|\n");
}

#[test]
fn placeholder_stub_stays_in_its_own_node() {
    let mut tmpl = compile("{if show}\n[{label}]\n{/if}\n");
    assert_eq!(tmpl.get("label"), None);
    assert_eq!(
        tmpl.conditional("show", 0).unwrap().get("label"),
        Some(&Value::from(""))
    );

    tmpl.set("show", true);
    tmpl.set("label", "ok");
    assert_eq!(tmpl.render(), "[ok]\n");
}

#[test]
fn list_variable_renders_its_count() {
    let mut tmpl = compile("{items} items");
    tmpl.set("items", json!([{}, {}, {}]));
    assert_eq!(tmpl.render(), "3 items");
}

#[test]
fn inserted_text_is_not_rescanned() {
    let mut tmpl = compile("{v}");
    tmpl.set("v", "{w}");
    tmpl.set("w", "x");
    assert_eq!(tmpl.render(), "{w}");
}

#[test]
fn escaped_braces_render_literally() {
    assert_eq!(compile(r"\{literal\}").render(), "{literal}");
}

#[test]
fn unicode_content() {
    let mut tmpl = compile("こんにちは {who} 🌍");
    tmpl.set("who", "世界");
    assert_eq!(tmpl.render(), "こんにちは 世界 🌍");
}

#[test]
fn comments_are_removed() {
    let tmpl = compile("{* header\n   notes *}\nbody\n");
    assert_eq!(tmpl.render(), "body\n");
}

// ── Expressions ──

#[test]
fn inline_expressions() {
    let mut tmpl = compile("{a + b * 2}|{7 / 2}|{1 < 2}|{1 > 2}|{missing + 1}");
    tmpl.set("a", 1);
    tmpl.set("b", 3);
    assert_eq!(tmpl.render(), "7|3|1||1");
}

#[test]
fn unbalanced_group_is_a_syntax_error() {
    assert!(matches!(
        Expression::compile("(a + b"),
        Err(Error::Syntax { .. })
    ));
    assert!(matches!(
        compile_str("{(a + b}", &NoIncludes),
        Err(Error::Syntax { .. })
    ));
}

#[test]
fn expression_shaped_braces_must_compile() {
    for text in ["see {hello world} here", "{/ if}"] {
        assert!(
            matches!(compile_str(text, &NoIncludes), Err(Error::Syntax { .. })),
            "{}",
            text
        );
    }
    assert_eq!(compile("{a.b} {}").render(), "{a.b} {}");
}

#[test]
fn expression_id_ignores_whitespace() {
    let a = Expression::compile("a > b").unwrap();
    let b = Expression::compile(" a>b ").unwrap();
    assert_eq!(a.id(), b.id());
    assert_eq!(a.atoms(), b.atoms());
}

#[test]
fn string_comparison_in_expression() {
    let expr = Expression::compile("(role = 'user') || (role = 'assistant')").unwrap();
    let mut scope = Scope::new();
    for (role, expected) in [("system", false), ("user", true), ("assistant", true)] {
        scope.insert("role".into(), Value::from(role));
        assert_eq!(expr.evaluate(&scope), Value::Bool(expected), "{}", role);
    }
}

// ── Blocks ──

#[test]
fn conditional_follows_comparison() {
    let mut tmpl = compile("{if a > b}Y{/if}");
    tmpl.set("a", 2);
    tmpl.set("b", 1);
    assert_eq!(tmpl.render(), "Y");

    tmpl.set("a", 1);
    tmpl.set("b", 2);
    assert_eq!(tmpl.render(), "");
}

#[test]
fn repetition_over_items() {
    let mut tmpl = compile("{foreach items}{x}{/foreach}");
    tmpl.set("items", json!([{ "x": 0 }, { "x": 1 }, { "x": 2 }]));
    assert_eq!(tmpl.render(), "012");
}

#[test]
fn repetition_without_a_list_renders_nothing() {
    let mut tmpl = compile("[\n{foreach items}{x}{/foreach}\n]");
    assert_eq!(tmpl.render(), "[\n]");

    tmpl.set("items", "not a list");
    assert_eq!(tmpl.render(), "[\n]");
}

#[test]
fn nested_repetition() {
    let mut tmpl = compile("{foreach rows}\n{foreach cells}\n{c}\n{/foreach}\n{/foreach}\n");
    tmpl.set(
        "rows",
        json!([
            { "cells": [{ "c": "a" }, { "c": "b" }] },
            { "cells": [{ "c": "c" }] },
        ]),
    );
    assert_eq!(tmpl.render(), "a\nb\nc\n");
}

#[test]
fn conditional_inside_repetition_sees_item_keys() {
    let mut tmpl = compile(
        "{foreach users}\n{if role = 'admin'}\n*{name}\n{/if}\n{/foreach}\n",
    );
    tmpl.set(
        "users",
        json!([
            { "name": "alice", "role": "admin" },
            { "name": "bob", "role": "user" },
        ]),
    );
    assert_eq!(tmpl.render(), "*alice\n");
}

#[test]
fn unclosed_block_is_a_warning() {
    let mut tmpl = compile("{if flag}\nshown\n");
    assert_eq!(
        tmpl.warnings(),
        vec![&Error::UnclosedBlock {
            kind: BlockKind::If,
            line: 1,
        }]
    );
    tmpl.set("flag", true);
    assert_eq!(tmpl.render(), "shown\n");
}

// ── Scope ──

#[test]
fn parent_bindings_reach_nested_blocks() {
    let mut tmpl = compile("{foreach items}\n{if show}\n{x}{suffix}\n{/if}\n{/foreach}\n");
    tmpl.set("items", json!([{ "x": 1 }, { "x": 2 }]));
    tmpl.set("show", true);
    tmpl.set("suffix", "!");
    assert_eq!(tmpl.render(), "1!\n2!\n");
}

#[test]
fn render_is_idempotent() {
    let mut tmpl = compile("{foreach items}{x}{/foreach}\n{n * 2}");
    tmpl.set("items", json!([{ "x": "a" }, { "x": "b" }]));
    tmpl.set("n", 21);
    let first = tmpl.render();
    // The block line is replaced by its output, newline included
    assert_eq!(first, "ab42");
    assert_eq!(tmpl.render(), first);
}

#[test]
fn templates_can_be_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Template>();
    assert_send_sync::<Expression>();
}
