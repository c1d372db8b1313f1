//! The dashboard page: stat fields, the chat log and the input control.
//!
//! [`Page`] is plain state owned by the dashboard controller. Every mutation
//! returns a [`Change`] describing what moved, and a [`Renderer`] turns
//! those changes into output. Entries are never edited after they are
//! appended; a loading placeholder is removed and a new entry appended in
//! its place.

use std::collections::BTreeMap;

use crate::markup;
use crate::stats::{PLACEHOLDER, StatField, StatsGroup};

pub type EntryId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// How an entry's content is to be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Shown exactly as written, escaped when rendered as markup.
    PlainText,
    /// Rendered through the markdown renderer.
    Markdown,
    /// The transient "waiting for a reply" placeholder.
    Loading,
    /// An inline warning from the client itself (e.g. message too long).
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub content: String,
    pub sender: Sender,
    pub format: Format,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::User,
            format: Format::PlainText,
        }
    }

    pub fn assistant_markdown(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::Assistant,
            format: Format::Markdown,
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::Assistant,
            format: Format::PlainText,
        }
    }

    pub fn loading() -> Self {
        Self {
            content: "...".to_string(),
            sender: Sender::Assistant,
            format: Format::Loading,
        }
    }

    pub fn notice(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::Assistant,
            format: Format::Notice,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.format == Format::Loading
    }

    /// HTML for this entry, shaped like the backend's own chat page.
    pub fn to_html(&self) -> String {
        let body = match self.format {
            Format::Loading => "<div class=\"loading\"></div>\n".to_string(),
            Format::Markdown => markup::markdown_to_html(&self.content),
            Format::PlainText | Format::Notice => markup::plain_text_to_html(&self.content),
        };
        let notice = if self.format == Format::Notice {
            " notice"
        } else {
            ""
        };
        format!(
            "<div class=\"message {}-message{notice}\"><div class=\"message-content\">\n{body}</div></div>\n",
            self.sender.as_str()
        )
    }
}

/// What a page mutation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Some fields of one stats group got new text.
    Fields(StatsGroup, Vec<StatField>),
    EntryAdded(EntryId),
    EntryRemoved(EntryId),
    /// The input control was enabled, disabled or focused.
    Input,
    /// The page was hidden or shown.
    Visibility(bool),
}

/// Paints page changes somewhere.
pub trait Renderer {
    fn paint(&mut self, page: &Page, change: &Change);
}

/// A renderer that draws nothing.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn paint(&mut self, _page: &Page, _change: &Change) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputState {
    pub enabled: bool,
    pub focused: bool,
}

#[derive(Debug, Clone)]
pub struct Page {
    fields: BTreeMap<StatField, String>,
    entries: Vec<(EntryId, ChatEntry)>,
    next_id: EntryId,
    input: InputState,
    visible: bool,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Self {
            fields: StatField::ALL
                .iter()
                .map(|&field| (field, PLACEHOLDER.to_string()))
                .collect(),
            entries: Vec::new(),
            next_id: 1,
            input: InputState {
                enabled: true,
                focused: true,
            },
            visible: true,
        }
    }

    // -- Stat fields --

    pub fn field_text(&self, field: StatField) -> &str {
        self.fields
            .get(&field)
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER)
    }

    /// Write new text into fields of one group. Returns `None` when nothing
    /// actually changed.
    pub fn set_fields(
        &mut self,
        group: StatsGroup,
        updates: Vec<(StatField, String)>,
    ) -> Option<Change> {
        let mut changed = Vec::new();
        for (field, text) in updates {
            let slot = self.fields.entry(field).or_default();
            if *slot != text {
                *slot = text;
                changed.push(field);
            }
        }
        (!changed.is_empty()).then_some(Change::Fields(group, changed))
    }

    // -- Chat log --

    pub fn append(&mut self, entry: ChatEntry) -> (EntryId, Change) {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, entry));
        (id, Change::EntryAdded(id))
    }

    pub fn remove(&mut self, id: EntryId) -> Option<Change> {
        let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        self.entries.remove(index);
        Some(Change::EntryRemoved(id))
    }

    pub fn entry(&self, id: EntryId) -> Option<&ChatEntry> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, entry)| entry)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter().map(|(_, entry)| entry)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn loading_count(&self) -> usize {
        self.entries().filter(|entry| entry.is_loading()).count()
    }

    pub fn last_entry(&self) -> Option<&ChatEntry> {
        self.entries.last().map(|(_, entry)| entry)
    }

    // -- Input control --

    pub fn input(&self) -> InputState {
        self.input
    }

    pub fn set_input_enabled(&mut self, enabled: bool) -> Change {
        self.input.enabled = enabled;
        if !enabled {
            self.input.focused = false;
        }
        Change::Input
    }

    pub fn focus_input(&mut self) -> Change {
        self.input.focused = self.input.enabled;
        Change::Input
    }

    // -- Visibility --

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns `None` if the page was already in that state.
    pub fn set_visible(&mut self, visible: bool) -> Option<Change> {
        if self.visible == visible {
            return None;
        }
        self.visible = visible;
        Some(Change::Visibility(visible))
    }

    // -- Export --

    /// The chat log as a standalone HTML document.
    pub fn transcript_html(&self) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>minerdash chat</title></head>\n<body>\n<div id=\"chat-history\">\n",
        );
        for entry in self.entries().filter(|entry| !entry.is_loading()) {
            html.push_str(&entry.to_html());
        }
        html.push_str("</div>\n</body>\n</html>\n");
        html
    }
}
