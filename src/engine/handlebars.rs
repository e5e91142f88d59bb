//! Handlebars backed renderer
//!
//! Handlebars has no notion of Mustache sections: `{{#name}}` must name a
//! helper and `{{^name}}` does not parse. Bodies are rewritten before
//! compiling so every section goes through [`SectionHelper`], which applies
//! Mustache rules to the section value.

use super::Renderer;
use crate::error::MustrError;
use anyhow::Result;
use handlebars::{
    BlockContext, Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
    Renderable, Template,
};
use serde_json::Value;
use std::collections::BTreeMap;

const SECTION_HELPER: &str = "$section";

/// Default renderer
///
/// Runs in non-strict mode, so missing keys render as empty strings the way
/// Mustache does. A fresh registry is built per render so partials never leak
/// between templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandlebarsRenderer;

impl HandlebarsRenderer {
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

impl Renderer for HandlebarsRenderer {
    fn render(
        &self,
        body: &str,
        context: &Value,
        partials: &BTreeMap<String, String>,
    ) -> Result<String> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_helper(SECTION_HELPER, Box::new(SectionHelper));

        for (name, partial) in partials {
            handlebars
                .register_partial(name, translate_sections(partial))
                .map_err(|e| MustrError::render(format!("invalid partial {name}: {e}")))?;
        }

        handlebars
            .render_template(&translate_sections(body), context)
            .map_err(|e| MustrError::render(e.to_string()).into())
    }
}

/// Mustache section semantics
///
/// Lists render once per item, objects render with their keys in scope,
/// other truthy values render the block as is and falsy values (including
/// empty lists) render the inverse.
#[derive(Clone, Copy)]
struct SectionHelper;

impl HelperDef for SectionHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = h
            .param(0)
            .map_or(Value::Null, |param| param.value().clone());

        if !is_truthy(&value) {
            return match h.inverse() {
                Some(inverse) => inverse.render(r, ctx, rc, out),
                None => Ok(()),
            };
        }
        let Some(template) = h.template() else {
            return Ok(());
        };

        let current = rc.evaluate(ctx, "this")?.as_json().clone();
        match &value {
            Value::Array(items) => {
                for item in items {
                    render_scoped(template, scope(&current, item), r, ctx, rc, out)?;
                }
                Ok(())
            }
            Value::Object(_) => render_scoped(template, scope(&current, &value), r, ctx, rc, out),
            _ => template.render(r, ctx, rc, out),
        }
    }
}

/// Mustache truthiness: empty objects still count
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Keys of `item` layered over the enclosing scope, so names the item lacks
/// still resolve
fn scope(current: &Value, item: &Value) -> Value {
    match (current, item) {
        (Value::Object(outer), Value::Object(inner)) => {
            let mut merged = outer.clone();
            merged.extend(inner.iter().map(|(key, value)| (key.clone(), value.clone())));
            Value::Object(merged)
        }
        _ => item.clone(),
    }
}

fn render_scoped<'reg: 'rc, 'rc>(
    template: &'rc Template,
    scope: Value,
    r: &'reg Handlebars<'reg>,
    ctx: &'rc Context,
    rc: &mut RenderContext<'reg, 'rc>,
    out: &mut dyn Output,
) -> HelperResult {
    let mut block = BlockContext::new();
    block.set_base_value(scope);
    rc.push_block(block);
    let rendered = template.render(r, ctx, rc, out);
    rc.pop_block();
    rendered
}

/// Whether a block tag names a Mustache section rather than a helper call
fn is_section_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '$' | ':' | '.' | '/' | '@'))
        && !name.starts_with(['.', '/', '@'])
}

/// Rewrite Mustache sections into calls to the section helper
///
/// `{{#name}}` becomes `{{#$section name}}`, `{{^name}}` becomes
/// `{{#$section name}}{{else}}` and the matching closing tags follow. Blocks
/// with parameters are Handlebars helpers and stay untouched. `{{.}}` becomes
/// `{{this}}`.
fn translate_sections(body: &str) -> String {
    let mut translated = String::with_capacity(body.len());
    // One flag per open block: whether it is a rewritten section
    let mut open: Vec<bool> = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find("{{") {
        translated.push_str(&rest[..start]);
        let tag = &rest[start..];
        let Some(end) = tag.find("}}") else {
            translated.push_str(tag);
            return translated;
        };
        let raw = &tag[..end + 2];
        rest = &tag[end + 2..];

        let inner = &tag[2..end];
        let lead = if inner.starts_with('~') { "~" } else { "" };
        let inner = &inner[lead.len()..];
        let trail = if inner.ends_with('~') { "~" } else { "" };
        let inner = inner[..inner.len() - trail.len()].trim();

        if let Some(name) = inner.strip_prefix('#').map(str::trim) {
            let section = is_section_name(name);
            open.push(section);
            if section {
                translated.push_str(&format!("{{{{{lead}#{SECTION_HELPER} {name}{trail}}}}}"));
                continue;
            }
        } else if let Some(name) = inner.strip_prefix('^').map(str::trim) {
            if is_section_name(name) {
                open.push(true);
                translated.push_str(&format!(
                    "{{{{{lead}#{SECTION_HELPER} {name}}}}}{{{{else{trail}}}}}"
                ));
                continue;
            }
        } else if inner.starts_with('/') {
            if open.pop() == Some(true) {
                translated.push_str(&format!("{{{{{lead}/{SECTION_HELPER}{trail}}}}}"));
                continue;
            }
        } else if inner == "." {
            translated.push_str(&format!("{{{{{lead}this{trail}}}}}"));
            continue;
        }

        translated.push_str(raw);
    }

    translated.push_str(rest);
    translated
}
