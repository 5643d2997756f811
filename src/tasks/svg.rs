// src/tasks/svg.rs

//! Textual SVG cleanup.
//!
//! Works on markup, not a parsed tree: removes editor noise and comments and
//! collapses whitespace between tags. `viewBox` and `id` attributes are never
//! touched. [`cleanup_for_sprite`] additionally strips titles and colouring
//! so icons inherit `fill`/`stroke` from the page.

use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::{Captures, Regex};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static svg pattern")
}

static XML_DECL: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)<\?xml.*?\?>"));
static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)<!DOCTYPE[^>\[]*(\[[^\]]*\])?\s*>"));
static COMMENT: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)<!--.*?-->"));
static METADATA: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)<metadata\b[^>]*/>|<metadata\b.*?</metadata\s*>"));
static EDITOR_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?is)<(?:sodipodi|inkscape):[\w.-]+\b[^>]*/>|<(?:sodipodi|inkscape):[\w.-]+\b.*?</(?:sodipodi|inkscape):[\w.-]+\s*>")
});
static EDITOR_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"\s+(?:xmlns:)?(?:sodipodi|inkscape)(?::[\w.-]+)?\s*=\s*(?:"[^"]*"|'[^']*')"#)
});
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)<title\b[^>]*/>|<title\b.*?</title\s*>"));
static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| re(r">\s+<"));
static START_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"<([A-Za-z][\w:.-]*)((?:\s[^<>]*?)?)(/?)>"));
static ATTR: LazyLock<Regex> =
    LazyLock::new(|| re(r#"\s+([\w:.-]+)\s*=\s*("([^"]*)"|'([^']*)')"#));
static SVG_OPEN: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<svg\b([^>]*?)(/?)>"));

/// Generic cleanup used for optimised image copies.
pub fn cleanup(svg: &str) -> Result<String> {
    ensure_svg_root(svg)?;

    let out = XML_DECL.replace_all(svg, "");
    let out = DOCTYPE.replace_all(&out, "");
    let out = COMMENT.replace_all(&out, "");
    let out = METADATA.replace_all(&out, "");
    let out = EDITOR_ELEMENT.replace_all(&out, "");
    let out = EDITOR_ATTR.replace_all(&out, "");
    let out = BETWEEN_TAGS.replace_all(&out, "><");
    Ok(out.trim().to_string())
}

/// Cleanup for sprite symbols: [`cleanup`] plus no `<title>`, no useless
/// stroke/fill attributes and no `fill`/`stroke` attributes at all.
pub fn cleanup_for_sprite(svg: &str) -> Result<String> {
    let out = cleanup(svg)?;
    let out = TITLE.replace_all(&out, "");
    let out = START_TAG.replace_all(&out, |caps: &Captures<'_>| {
        let attrs = strip_paint_attrs(&caps[2]);
        format!("<{}{}{}>", &caps[1], attrs, &caps[3])
    });
    Ok(out.into_owned())
}

/// Turn a cleaned `<svg>` document into a `<symbol>` with the given id.
pub fn to_symbol(svg: &str, id: &str) -> Result<String> {
    let Some(open) = SVG_OPEN.captures(svg) else {
        bail!("no <svg> root element");
    };
    let whole = open.get(0).map(|m| m.range()).unwrap_or_default();
    let self_closing = !open[2].is_empty();

    let view_box = ATTR
        .captures_iter(&open[1])
        .find(|c| &c[1] == "viewBox")
        .map(|c| attr_value(&c).to_string());

    let inner = if self_closing {
        ""
    } else {
        let Some(close) = svg.rfind("</svg") else {
            bail!("<svg> element is not closed");
        };
        if close < whole.end {
            bail!("<svg> element is not closed");
        }
        &svg[whole.end..close]
    };

    let mut symbol = format!("<symbol id=\"{}\"", escape_attr(id));
    if let Some(vb) = view_box {
        symbol.push_str(&format!(" viewBox=\"{}\"", escape_attr(&vb)));
    }
    symbol.push('>');
    symbol.push_str(inner);
    symbol.push_str("</symbol>");
    Ok(symbol)
}

fn ensure_svg_root(svg: &str) -> Result<()> {
    let Some(open) = SVG_OPEN.captures(svg) else {
        bail!("no <svg> root element");
    };
    if open[2].is_empty() && !svg.contains("</svg") {
        bail!("<svg> element is not closed");
    }
    Ok(())
}

fn attr_value<'a>(caps: &'a Captures<'_>) -> &'a str {
    caps.get(3)
        .or_else(|| caps.get(4))
        .map(|m| m.as_str())
        .unwrap_or("")
}

fn strip_paint_attrs(attrs: &str) -> String {
    let parsed: Vec<(String, String)> = ATTR
        .captures_iter(attrs)
        .map(|c| (c[1].to_string(), attr_value(&c).trim().to_string()))
        .collect();

    let value_of = |name: &str| {
        parsed
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    };
    let no_stroke = value_of("stroke") == Some("none")
        || value_of("stroke-width").is_some_and(|w| w.parse::<f64>().is_ok_and(|w| w == 0.0));
    let no_fill = value_of("fill") == Some("none");

    ATTR.replace_all(attrs, |c: &Captures<'_>| {
        let name = &c[1];
        let drop = name == "fill"
            || name == "stroke"
            || (no_stroke && name.starts_with("stroke-"))
            || (no_fill && name.starts_with("fill-"));
        if drop {
            String::new()
        } else {
            c[0].to_string()
        }
    })
    .into_owned()
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
