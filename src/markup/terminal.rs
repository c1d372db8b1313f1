//! Markdown → styled terminal text.
//!
//! A small walk over `pulldown-cmark` events: headings bold, emphasis
//! italic, inline code and code blocks dimmed, list items bulleted or
//! numbered, links shown as `text (url)`. Raw HTML is shown verbatim as
//! text; a terminal does not interpret it. Control characters are not:
//! everything but newline and tab is dropped before parsing, so a reply
//! cannot smuggle escape sequences to the terminal.

use colored::Colorize;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use super::markdown_options;

#[derive(Default)]
struct Style {
    strong: usize,
    emphasis: usize,
    code_block: bool,
}

/// Drop control characters other than `\n` and `\t`.
pub fn strip_controls(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect()
}

/// Format markdown for a terminal. Every line is prefixed with `indent`.
pub fn markdown_to_terminal(markdown: &str, indent: &str) -> String {
    let markdown = strip_controls(markdown);
    let mut out = String::new();
    let mut style = Style::default();
    // Ordered lists carry their next number; unordered carry None.
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut link_targets: Vec<String> = Vec::new();

    for event in Parser::new_ext(&markdown, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { .. }) => style.strong += 1,
            Event::End(TagEnd::Heading(_)) => {
                style.strong = style.strong.saturating_sub(1);
                out.push_str("\n\n");
            }
            Event::Start(Tag::Strong) => style.strong += 1,
            Event::End(TagEnd::Strong) => style.strong = style.strong.saturating_sub(1),
            Event::Start(Tag::Emphasis) => style.emphasis += 1,
            Event::End(TagEnd::Emphasis) => style.emphasis = style.emphasis.saturating_sub(1),
            Event::End(TagEnd::Paragraph) => {
                out.push_str(if lists.is_empty() { "\n\n" } else { "\n" });
            }
            Event::Start(Tag::CodeBlock(_)) => style.code_block = true,
            Event::End(TagEnd::CodeBlock) => {
                style.code_block = false;
                out.push('\n');
            }
            Event::Start(Tag::List(start)) => lists.push(start),
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                let depth = lists.len().saturating_sub(1);
                out.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::End(TagEnd::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Link { dest_url, .. }) => link_targets.push(dest_url.to_string()),
            Event::End(TagEnd::Link) => {
                if let Some(target) = link_targets.pop() {
                    out.push_str(&format!(" ({target})").dimmed().to_string());
                }
            }
            Event::Text(text) => out.push_str(&styled(&text, &style)),
            Event::Code(code) => out.push_str(&code.dimmed().to_string()),
            Event::Html(raw) | Event::InlineHtml(raw) => out.push_str(&raw),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("────────\n"),
            Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    out.trim_end()
        .lines()
        .map(|line| format!("{indent}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn styled(text: &str, style: &Style) -> String {
    if style.code_block {
        return text.dimmed().to_string();
    }
    let mut rendered = text.normal();
    if style.strong > 0 {
        rendered = rendered.bold();
    }
    if style.emphasis > 0 {
        rendered = rendered.italic();
    }
    rendered.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(markdown: &str, indent: &str) -> String {
        colored::control::set_override(false);
        markdown_to_terminal(markdown, indent)
    }

    #[test]
    fn paragraphs_and_lists() {
        let text = plain("Status:\n\n- cpu ok\n- temp high\n\n1. restart\n2. wait", "");
        assert_eq!(text, "Status:\n\n• cpu ok\n• temp high\n\n1. restart\n2. wait");
    }

    #[test]
    fn links_show_target() {
        assert_eq!(
            plain("see [xmrig](https://xmrig.com)", ""),
            "see xmrig (https://xmrig.com)"
        );
    }

    #[test]
    fn escape_sequences_are_dropped() {
        let text = plain("**hi** \x1b[2J\x1b]0;title\x07there", "");
        assert!(!text.contains('\x1b'));
        assert!(!text.contains('\x07'));
        assert!(text.starts_with("hi "));
        assert!(text.ends_with("titlethere"));
        assert_eq!(strip_controls("a\tb\nc\r\u{9b}d"), "a\tb\ncd");
    }

    #[test]
    fn indent_applies_to_every_line() {
        assert_eq!(plain("a\nb", "  "), "  a\n  b");
    }
}
