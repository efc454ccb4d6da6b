// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Markup to plain text.
//!
//! Only the visible text matters for pattern matching, so the document is
//! flattened: script-like elements are dropped, block-level boundaries become
//! line breaks, and whitespace is normalized so patterns do not depend on
//! where the source happened to wrap.

use scraper::{Html, Node};

/// Elements whose content never contains report text.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that start a new line of text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "caption", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td",
    "tfoot", "th", "thead", "title", "tr", "ul",
];

enum Step<N> {
    Enter(N),
    Leave,
}

/// Strip tags from `markup` and return normalized text.
///
/// Plain text input (no tags) passes through with whitespace normalized.
pub fn html_to_text(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let mut out = String::with_capacity(markup.len() / 2);

    // Explicit stack instead of recursion: report pages nest tables deeply.
    let mut stack = vec![Step::Enter(*document.root_element())];
    while let Some(step) = stack.pop() {
        match step {
            Step::Leave => out.push('\n'),
            Step::Enter(node) => match node.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => {
                    let name = element.name();
                    if SKIPPED_ELEMENTS.contains(&name) {
                        continue;
                    }
                    if BLOCK_ELEMENTS.contains(&name) {
                        out.push('\n');
                        stack.push(Step::Leave);
                    }
                    for child in node.children().rev() {
                        stack.push(Step::Enter(child));
                    }
                }
                _ => {}
            },
        }
    }

    normalize_whitespace(&out)
}

/// Collapse whitespace: non-breaking spaces become spaces, runs of spaces
/// inside a line become one, lines are trimmed and blank lines dropped.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace(['\u{00a0}', '\u{202f}', '\u{2007}'], " ");
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_cells_become_lines() {
        let html = "<table><tr><td>Spieler:</td><td>Nova</td></tr>\
                    <tr><td>Tarn</td><td>80</td></tr></table>";
        assert_eq!(html_to_text(html), "Spieler:\nNova\nTarn\n80");
    }

    #[test]
    fn test_inline_elements_stay_on_one_line() {
        let html = "<p>Planet <b>TEMPEL</b> <span>(555:849:4)</span></p>";
        assert_eq!(html_to_text(html), "Planet TEMPEL (555:849:4)");
    }

    #[test]
    fn test_scripts_and_styles_dropped() {
        let html = "<html><head><style>td { color: red }</style>\
                    <script>var spieler = 'x';</script></head>\
                    <body><div>Report</div></body></html>";
        assert_eq!(html_to_text(html), "Report");
    }

    #[test]
    fn test_entities_and_nbsp_normalized() {
        let html = "<div>Spionageeinheit:&nbsp;&nbsp;120</div>";
        assert_eq!(html_to_text(html), "Spionageeinheit: 120");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let text = "Spieler:   Nova\n\n\n   TEMPEL (1:2:3)   ";
        assert_eq!(html_to_text(text), "Spieler: Nova\nTEMPEL (1:2:3)");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  a \t b\u{00a0}c \n\n d  "),
            "a b c\nd"
        );
        assert_eq!(normalize_whitespace(" \n \t "), "");
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let depth = 5_000;
        let html = format!("{}Nova{}", "<span>".repeat(depth), "</span>".repeat(depth));
        assert_eq!(html_to_text(&html), "Nova");
    }
}
