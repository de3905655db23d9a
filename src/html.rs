//! HTML description normalizer.
//!
//! Feed descriptions arrive as rich HTML. [`normalize_html`] reduces them to
//! plain text that keeps a small set of inline tags understood by the
//! delivery channel, and [`extract_image_url`] finds the lead image.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use url::Url;

use crate::Result;

/// Inline tags re-emitted as-is around their rendered children.
const INLINE_TAGS: &[&str] = &["b", "strong", "i", "em", "code", "s", "strike", "del", "u"];

/// Query parameter marking a campaign-tracking hyperlink.
const TRACKING_PARAM: &str = "utm_source";

/// A newline surrounded by blank space, including further newlines.
static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\t\n\f\r ]+\n[\t\n\f\r ]*").expect("valid blank line pattern"));

/// Convert an HTML description into normalized text.
///
/// Empty input yields empty output. The parser is lenient, so unbalanced
/// or stray markup is tolerated.
pub fn normalize_html(input: &str) -> Result<String> {
    if input.is_empty() {
        return Ok(String::new());
    }

    let fragment = Html::parse_fragment(input);
    let mut text = String::new();
    render_children(fragment.root_element(), &mut text);

    Ok(post_process(&text))
}

/// Find the `src` of the first `<img>` in document order.
pub fn extract_image_url(input: &str) -> Result<Option<String>> {
    if input.is_empty() {
        return Ok(None);
    }

    let fragment = Html::parse_fragment(input);
    Ok(find_image(fragment.root_element()))
}

fn post_process(text: &str) -> String {
    let text = text.trim_matches(|c| c == ' ' || c == '\n');
    let text = BLANK_LINES.replace_all(text, "\n");
    text.replace("  ", " ")
}

fn render_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text.trim_matches('\n')),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    render_element(child, out);
                }
            }
            _ => {}
        }
    }
}

fn render_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();

    match name {
        "br" => {
            out.push('\n');
            return;
        }
        "a" if is_tracking_link(element) => return,
        "pre" => {
            render_pre(element, out);
            return;
        }
        _ => {}
    }

    let inline = INLINE_TAGS.contains(&name);
    if inline {
        out.push('<');
        out.push_str(name);
        out.push('>');
    }
    if name == "li" {
        out.push_str("- ");
    }

    render_children(element, out);

    if inline {
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
    if name == "p" || name == "li" {
        out.push('\n');
    }
}

/// Render a `<pre>` block, preferring the text of a nested `<code>`.
///
/// The language comes from the `class` attribute of whichever element
/// supplies the text.
fn render_pre(pre: ElementRef<'_>, out: &mut String) {
    let source = pre
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "code")
        .unwrap_or(pre);

    match source.value().attr("class") {
        Some(lang) if !lang.is_empty() => {
            out.push_str("<pre language=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(lang));
            out.push_str("\">");
        }
        _ => out.push_str("<pre>"),
    }

    for child in source.children() {
        if let Node::Text(text) = child.value() {
            out.push_str(text.trim_matches('\n'));
            out.push('\n');
        }
    }

    out.push_str("</pre>\n");
}

/// Links carrying a tracking parameter are dropped with their text.
/// So are links whose `href` can't be parsed at all.
fn is_tracking_link(element: ElementRef<'_>) -> bool {
    let Some(href) = element.value().attr("href") else {
        return false;
    };

    match parse_href(href) {
        Ok(url) => url.query_pairs().any(|(key, _)| key == TRACKING_PARAM),
        Err(_) => true,
    }
}

fn parse_href(href: &str) -> std::result::Result<Url, url::ParseError> {
    match Url::parse(href) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("http://localhost/").and_then(|base| base.join(href))
        }
        other => other,
    }
}

fn find_image(element: ElementRef<'_>) -> Option<String> {
    for child in element.children().filter_map(ElementRef::wrap) {
        if child.value().name() == "img" {
            if let Some(src) = child.value().attr("src").filter(|src| !src.is_empty()) {
                return Some(src.to_string());
            }
        }
        if let Some(src) = find_image(child) {
            return Some(src);
        }
    }
    None
}
