//! Terminal front end: paints page changes to stdout and turns typed lines
//! into dashboard events.
//!
//! Stats refreshes print one dim summary line per group. Assistant entries
//! print with a coloured label; markdown replies are formatted for the
//! terminal. User entries are not echoed since the terminal already shows
//! what was typed.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use colored::Colorize;

use crate::dashboard::Event;
use crate::markup::terminal::{markdown_to_terminal, strip_controls};
use crate::page::{Change, ChatEntry, Format, Page, Renderer, Sender as Author};
use crate::stats::StatsGroup;

pub const PROMPT: &str = "› ";

pub const HELP: &str = "\
Type a message and press Enter to ask the assistant.
  /hide   pause stats refresh
  /show   resume stats refresh
  /help   show this help
  /quit   exit";

/// Writes page changes to any [`Write`]. Output errors are ignored; a
/// broken pipe must not take the dashboard down.
pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        let _ = writeln!(self.out, "{line}");
    }

    fn prompt(&mut self) {
        let _ = write!(self.out, "{PROMPT}");
        let _ = self.out.flush();
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn paint(&mut self, page: &Page, change: &Change) {
        match change {
            Change::Fields(group, _) => {
                let line = stats_line(page, *group);
                self.write_line(&line.dimmed().to_string());
            }
            Change::EntryAdded(id) => {
                if let Some(entry) = page.entry(*id)
                    && let Some(text) = format_entry(entry)
                {
                    self.write_line(&text);
                }
            }
            Change::EntryRemoved(_) => {}
            Change::Input => {
                let input = page.input();
                if input.enabled && input.focused {
                    self.prompt();
                }
            }
            Change::Visibility(visible) => {
                let note = if *visible {
                    "stats refresh resumed"
                } else {
                    "stats refresh paused"
                };
                self.write_line(&note.dimmed().to_string());
            }
        }
        let _ = self.out.flush();
    }
}

/// `[system] CPU 12.3% · Memory 40.0% · Temp -- · Uptime 3.4 hrs`
pub fn stats_line(page: &Page, group: StatsGroup) -> String {
    let fields = group
        .fields()
        .iter()
        .map(|&field| format!("{} {}", field.label(), page.field_text(field)))
        .collect::<Vec<_>>()
        .join(" · ");
    format!("[{}] {fields}", group.label())
}

/// Terminal text for one chat entry, or `None` for entries that are not
/// echoed.
pub fn format_entry(entry: &ChatEntry) -> Option<String> {
    if entry.sender == Author::User {
        return None;
    }

    let label = "assistant ›".cyan().bold();
    let text = match entry.format {
        Format::Loading => format!("{} {}", label, "...".dimmed()),
        Format::Markdown => format!("{label}\n{}", markdown_to_terminal(&entry.content, "  ")),
        Format::PlainText => format!("{label} {}", strip_controls(&entry.content)),
        Format::Notice => format!(
            "{} {}",
            "!".yellow().bold(),
            strip_controls(&entry.content).yellow()
        ),
    };
    Some(text)
}

/// Map a typed line to an event. Anything that is not a known command is a
/// chat submission, including lines that merely start with `/`.
pub fn parse_line(line: &str) -> Option<Event> {
    match line.trim() {
        "/hide" | "/pause" => Some(Event::Visibility(false)),
        "/show" | "/resume" => Some(Event::Visibility(true)),
        "/quit" | "/exit" => Some(Event::Quit),
        "/help" => None,
        _ => Some(Event::Submit(line.to_string())),
    }
}

/// Read stdin lines on a background thread and forward them as events.
///
/// EOF sends [`Event::Quit`].
pub fn spawn_input(events: Sender<Event>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_line(&line) {
                Some(event) => {
                    if events.send(event).is_err() {
                        return;
                    }
                }
                None => {
                    println!("{}", HELP.dimmed());
                    print!("{PROMPT}");
                    let _ = io::stdout().flush();
                }
            }
        }
        let _ = events.send(Event::Quit);
    })
}
