//! Escaping and well-formedness helpers for hand-built markup.

use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use scraper::Html;

/// A character reference, minus its leading `&`.
static ENTITY_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9A-Fa-f]+);")
        .unwrap_or_else(|_| unreachable!())
});

/// Escapes text for use as element content.
#[must_use]
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escapes text for use inside a double-quoted attribute value.
#[must_use]
pub fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

/// Replaces every `&` that does not start a character reference with
/// `&amp;`, leaving `&nbsp;`, `&#39;`, `&#x27;` and friends alone.
#[must_use]
pub fn escape_bare_ampersands(markup: &str) -> String {
    let mut escaped = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(pos) = rest.find('&') {
        escaped.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        if ENTITY_TAIL.is_match(tail) {
            escaped.push('&');
        } else {
            escaped.push_str("&amp;");
        }
        rest = tail;
    }

    escaped.push_str(rest);
    escaped
}

/// Returns `true` if `markup` is balanced mixed content: every start tag
/// closed, in order.
#[must_use]
pub fn is_well_formed(markup: &str) -> bool {
    let mut reader = Reader::from_str(markup);
    let mut depth = 0_usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => {
                let Some(next) = depth.checked_sub(1) else {
                    return false;
                };
                depth = next;
            }
            Ok(Event::Eof) => return depth == 0,
            Ok(_) => {}
            Err(e) => {
                log::debug!("Markup is not well formed: {e}");
                return false;
            }
        }
    }
}

/// Re-serializes a markup fragment through the HTML parser, closing open
/// elements and escaping stray `<`.
#[must_use]
pub fn normalize_fragment(markup: &str) -> String {
    Html::parse_fragment(markup).root_element().inner_html()
}
