//! Turning assistant replies into display markup.
//!
//! Replies are markdown. Two layers keep them from injecting markup:
//!
//! 1. [`looks_unsafe`]: a reply containing `<script` or `javascript:` is not
//!    rendered as markdown at all; the caller shows it as plain text.
//! 2. [`markdown_to_html`]: even for replies that pass the check, raw HTML
//!    is escaped instead of passed through, and links or images with a
//!    script-capable scheme point at `#`.
//!
//! The substring check alone is not a sanitizer (`<img onerror=...>` sails
//! through it), which is why layer 2 exists.

pub mod terminal;

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use regex::Regex;

/// `<script` (allowing whitespace after `<`) or `javascript:` (allowing
/// whitespace before `:`), case-insensitive.
static UNSAFE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*script|javascript\s*:").expect("unsafe-content regex must compile")
});

/// URL schemes that can execute code when followed.
const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Whether raw reply text should be downgraded to plain text.
pub fn looks_unsafe(text: &str) -> bool {
    UNSAFE_RE.is_match(text)
}

/// Escape text for insertion into HTML.
pub fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Render markdown to an HTML fragment with raw HTML neutralized.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options()).map(neutralize);
    let mut output = String::new();
    html::push_html(&mut output, parser);
    output
}

/// Render plain text as an HTML fragment, one paragraph, line breaks kept.
pub fn plain_text_to_html(text: &str) -> String {
    let escaped = escape_text(text);
    format!("<p>{}</p>\n", escaped.replace('\n', "<br>\n"))
}

pub(crate) fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Rewrite events that could carry active content.
fn neutralize(event: Event<'_>) -> Event<'_> {
    match event {
        // Raw HTML becomes text, which `push_html` escapes.
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_destination(dest: CowStr<'_>) -> CowStr<'_> {
    if is_blocked_url(&dest) {
        CowStr::Borrowed("#")
    } else {
        dest
    }
}

/// Browsers ignore embedded whitespace and control characters in a scheme,
/// so they are stripped before comparing.
fn is_blocked_url(url: &str) -> bool {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect();
    BLOCKED_SCHEMES
        .iter()
        .any(|scheme| compact.starts_with(scheme))
}
