//! Indented serialization of the output document.
//!
//! Structural elements get one line per tag, indented by depth. Everything
//! else (headings, paragraphs, table cells and in particular `<pre>`) is
//! written on one line exactly as the parser serializes it, so whitespace
//! inside it is never disturbed. Whitespace-only text between structural
//! elements is dropped, which makes the output stable under re-parsing.
//!
//! The HTML parser drops a newline directly after `<pre>`, `<textarea>` and
//! `<listing>` start tags, so one is written back whenever the content
//! itself starts with a newline.

use scraper::{ElementRef, Html, Node};

use crate::markup::{escape_attr, escape_text};

/// Elements laid out one child per line.
const BLOCK_ELEMENTS: &[&str] = &[
    "html", "head", "body", "div", "table", "thead", "tbody", "tfoot", "tr",
];

/// Elements whose first newline the parser swallows.
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

const INDENT: &str = "  ";

/// Serializes a document with structural elements indented.
#[must_use]
pub fn pretty_print(document: &Html) -> String {
    let mut out = String::new();
    write_element(&mut out, document.root_element(), 0);
    out
}

fn write_element(out: &mut String, element: ElementRef<'_>, depth: usize) {
    let indent = INDENT.repeat(depth);
    let name = element.value().name();

    if !BLOCK_ELEMENTS.contains(&name) {
        out.push_str(&indent);
        out.push_str(&inline_html(element));
        out.push('\n');
        return;
    }

    out.push_str(&indent);
    out.push_str(&start_tag(element));
    out.push('\n');

    for child in element.children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(out, child, depth + 1);
                }
            }
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push_str(&indent);
                    out.push_str(INDENT);
                    out.push_str(&escape_text(text));
                    out.push('\n');
                }
            }
            Node::Comment(comment) => {
                out.push_str(&indent);
                out.push_str(INDENT);
                out.push_str(&format!("<!--{}-->\n", &**comment));
            }
            _ => {}
        }
    }

    out.push_str(&indent);
    out.push_str(&format!("</{name}>\n"));
}

/// Serializes an element on one line, as the parser would, except that the
/// leading newline of `<pre>`-like content survives the next parse.
fn inline_html(element: ElementRef<'_>) -> String {
    let name = element.value().name();

    if LEADING_NEWLINE_ELEMENTS.contains(&name) {
        let lead = match element.first_child().map(|child| child.value()) {
            Some(Node::Text(text)) if text.starts_with('\n') => "\n",
            _ => "",
        };
        return format!(
            "{}{lead}{}</{name}>",
            start_tag(element),
            element.inner_html()
        );
    }

    let holds_leading_newline_element = element.descendants().skip(1).any(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| LEADING_NEWLINE_ELEMENTS.contains(&el.name()))
    });
    if !holds_leading_newline_element {
        return element.html();
    }

    let mut out = start_tag(element);
    for child in element.children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    out.push_str(&inline_html(child));
                }
            }
            Node::Text(text) => {
                out.push_str(&escape_text(text).replace('\u{a0}', "&nbsp;"));
            }
            Node::Comment(comment) => out.push_str(&format!("<!--{}-->", &**comment)),
            _ => {}
        }
    }
    out.push_str(&format!("</{name}>"));
    out
}

fn start_tag(element: ElementRef<'_>) -> String {
    let attrs = element
        .value()
        .attrs()
        .map(|(name, value)| format!(" {name}=\"{}\"", escape_attr(value)))
        .collect::<String>();
    format!("<{}{attrs}>", element.value().name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_structure_and_keeps_pre_verbatim() {
        let document = Html::parse_document(
            "<html><head></head><body><div class=\"race\"><h1>Turkey Trot</h1>\
             <pre class=\"actual_results\">\n  1 Sean Spalding   16:01\n 10 Caleb Gartner  18:12\n</pre>\
             </div></body></html>",
        );
        let printed = pretty_print(&document);

        assert!(printed.starts_with("<html>\n  <head>\n  </head>\n  <body>\n"));
        assert!(printed.contains("    <div class=\"race\">\n      <h1>Turkey Trot</h1>\n"));
        assert!(printed.contains("  1 Sean Spalding   16:01\n 10 Caleb Gartner  18:12\n</pre>"));
        assert!(printed.ends_with("  </body>\n</html>\n"));
    }

    #[test]
    fn printing_is_stable_under_reparsing() {
        let document = Html::parse_document(
            "<html><body><table><tr><td>1</td><td>MIKE NORTON</td></tr></table>\
             <p>Complete results <a href=\"http://x/?a=1&amp;b=2\">here</a></p></body></html>",
        );
        let once = pretty_print(&document);
        let twice = pretty_print(&Html::parse_document(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn blank_line_at_start_of_pre_survives_reparsing() {
        let document = Html::parse_document(
            "<html><body><div><pre>\n\n   Blank-led 5K\n  1 Sean Spalding</pre>\
             <span>x&nbsp;<pre>\n\nnested</pre></span></div></body></html>",
        );
        let once = pretty_print(&document);
        assert!(once.contains("<pre>\n\n   Blank-led 5K\n"));
        assert!(once.contains("<span>x&nbsp;<pre>\n\nnested</pre></span>"));

        let twice = pretty_print(&Html::parse_document(&once));
        assert_eq!(once, twice);
    }
}
