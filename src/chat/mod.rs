//! Chat client: validates a submission, tracks the one in-flight request and
//! renders its outcome.
//!
//! ```text
//! Idle ──submit──▶ Sending ──settle──▶ Idle
//!                  (input disabled,     (placeholder removed, reply or
//!                   placeholder shown)   error appended, input re-enabled)
//! ```
//!
//! The client mutates the [`Page`] and hands back the [`Change`]s for the
//! caller to paint. Sending the request is the caller's job; see
//! [`Submission::send`].

use std::time::Instant;

use thiserror::Error;

use crate::api::{ChatReply, RequestError};
use crate::config::schema::ChatConfig;
use crate::markup;
use crate::page::{Change, ChatEntry, EntryId, Page};

/// Reply shown when the backend answered with neither content nor an error.
pub const NOT_UNDERSTOOD: &str = "Sorry, I did not understand that.";

/// Longest error text shown in the chat log.
const MAX_ERROR_CHARS: usize = 300;

/// Why a submission was not sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("message is empty")]
    Empty,
    #[error("Message too long (max {max} characters)")]
    TooLong { max: usize, actual: usize },
    #[error("a message is already being sent")]
    Busy,
}

/// Trim and length-check a raw message.
///
/// Length is counted in characters, not bytes.
pub fn validate(raw: &str, max_chars: usize) -> Result<String, Rejection> {
    let message = raw.trim();
    if message.is_empty() {
        return Err(Rejection::Empty);
    }

    let actual = message.chars().count();
    if actual > max_chars {
        return Err(Rejection::TooLong {
            max: max_chars,
            actual,
        });
    }

    Ok(message.to_string())
}

/// Make an error string safe and short enough to show inline.
///
/// Control characters become spaces and whitespace runs collapse. The
/// result is shown as plain text, so markup in it is escaped on render.
pub fn sanitize_error(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > MAX_ERROR_CHARS {
        let cut: String = collapsed.chars().take(MAX_ERROR_CHARS).collect();
        format!("{cut}...")
    } else if collapsed.is_empty() {
        "unknown error".to_string()
    } else {
        collapsed
    }
}

/// The entry to show for a settled request.
pub fn reply_entry(outcome: &Result<ChatReply, RequestError>, render_markdown: bool) -> ChatEntry {
    match outcome {
        Ok(ChatReply::Content(text)) if !text.trim().is_empty() => {
            if render_markdown && !markup::looks_unsafe(text) {
                ChatEntry::assistant_markdown(text.clone())
            } else {
                ChatEntry::assistant_text(text.clone())
            }
        }
        Ok(ChatReply::Error(error)) => {
            ChatEntry::assistant_text(format!("Error: {}", sanitize_error(error)))
        }
        Ok(_) => ChatEntry::assistant_text(NOT_UNDERSTOOD),
        Err(RequestError::Status { code, message }) => ChatEntry::assistant_text(format!(
            "Error: {} (HTTP {code})",
            sanitize_error(message)
        )),
        Err(error) => {
            ChatEntry::assistant_text(format!("Error: {}", sanitize_error(&error.to_string())))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    Sending {
        placeholder: EntryId,
        started: Instant,
    },
}

/// Result of [`ChatClient::submit`].
#[derive(Debug, Default)]
pub struct Submission {
    pub changes: Vec<Change>,
    /// The trimmed message to POST, if the submission was accepted.
    pub send: Option<String>,
    pub rejection: Option<Rejection>,
}

/// Result of [`ChatClient::settle`].
#[derive(Debug, Default)]
pub struct Settlement {
    pub changes: Vec<Change>,
    /// Time since the request was sent, in milliseconds.
    pub latency_ms: Option<u64>,
}

#[derive(Debug)]
pub struct ChatClient {
    state: ChatState,
    max_message_chars: usize,
    render_markdown: bool,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            state: ChatState::Idle,
            max_message_chars: config.max_message_chars,
            render_markdown: config.render_markdown,
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn is_sending(&self) -> bool {
        matches!(self.state, ChatState::Sending { .. })
    }

    /// Handle a form submission.
    ///
    /// - Ignored while a request is in flight (the control is disabled).
    /// - Empty input: nothing happens.
    /// - Too long: a notice is appended, nothing is sent.
    /// - Otherwise: the user entry and a loading placeholder are appended,
    ///   the input is disabled and `send` carries the message.
    pub fn submit(&mut self, page: &mut Page, raw: &str) -> Submission {
        if self.is_sending() {
            return Submission {
                rejection: Some(Rejection::Busy),
                ..Submission::default()
            };
        }

        let message = match validate(raw, self.max_message_chars) {
            Ok(message) => message,
            Err(Rejection::Empty) => {
                return Submission {
                    rejection: Some(Rejection::Empty),
                    ..Submission::default()
                };
            }
            Err(rejection) => {
                let (_, added) = page.append(ChatEntry::notice(rejection.to_string()));
                return Submission {
                    changes: vec![added],
                    send: None,
                    rejection: Some(rejection),
                };
            }
        };

        let mut changes = Vec::with_capacity(3);
        let (_, added) = page.append(ChatEntry::user(message.clone()));
        changes.push(added);
        changes.push(page.set_input_enabled(false));
        let (placeholder, added) = page.append(ChatEntry::loading());
        changes.push(added);

        self.state = ChatState::Sending {
            placeholder,
            started: Instant::now(),
        };

        Submission {
            changes,
            send: Some(message),
            rejection: None,
        }
    }

    /// Apply the outcome of the in-flight request.
    ///
    /// The placeholder is removed before the outcome is appended, and the
    /// input is re-enabled and focused whatever the outcome. A settlement
    /// with no request in flight is dropped.
    pub fn settle(
        &mut self,
        page: &mut Page,
        outcome: &Result<ChatReply, RequestError>,
    ) -> Settlement {
        let ChatState::Sending {
            placeholder,
            started,
        } = self.state
        else {
            return Settlement::default();
        };
        self.state = ChatState::Idle;

        let mut changes = Vec::with_capacity(4);
        if let Some(removed) = page.remove(placeholder) {
            changes.push(removed);
        }
        let (_, added) = page.append(reply_entry(outcome, self.render_markdown));
        changes.push(added);
        changes.push(page.set_input_enabled(true));
        changes.push(page.focus_input());

        Settlement {
            changes,
            latency_ms: Some(started.elapsed().as_millis() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Format;

    fn client() -> ChatClient {
        ChatClient::new(&ChatConfig::default())
    }

    #[test]
    fn validate_trims_and_counts_chars() {
        assert_eq!(validate("  hi  ", 10), Ok("hi".to_string()));
        assert_eq!(validate(" \n\t ", 10), Err(Rejection::Empty));
        // Multi-byte characters count once.
        assert_eq!(validate(&"é".repeat(10), 10), Ok("é".repeat(10)));
        assert_eq!(
            validate(&"é".repeat(11), 10),
            Err(Rejection::TooLong { max: 10, actual: 11 })
        );
    }

    #[test]
    fn too_long_notice_text() {
        let rejection = Rejection::TooLong {
            max: 2000,
            actual: 2001,
        };
        assert_eq!(rejection.to_string(), "Message too long (max 2000 characters)");
    }

    #[test]
    fn empty_submission_appends_nothing() {
        let mut page = Page::new();
        let submission = client().submit(&mut page, "   ");
        assert_eq!(submission.rejection, Some(Rejection::Empty));
        assert!(submission.send.is_none());
        assert_eq!(page.entry_count(), 0);
    }

    #[test]
    fn accepted_submission_disables_input_and_shows_placeholder() {
        let mut page = Page::new();
        let mut chat = client();
        let submission = chat.submit(&mut page, " what is my hashrate? ");
        assert_eq!(submission.send.as_deref(), Some("what is my hashrate?"));
        assert!(!page.input().enabled);
        assert_eq!(page.loading_count(), 1);
        assert!(chat.is_sending());
    }

    #[test]
    fn busy_client_ignores_second_submission() {
        let mut page = Page::new();
        let mut chat = client();
        chat.submit(&mut page, "first");
        let second = chat.submit(&mut page, "second");
        assert_eq!(second.rejection, Some(Rejection::Busy));
        assert_eq!(page.entry_count(), 2);
        assert_eq!(page.loading_count(), 1);
    }

    #[test]
    fn settle_replaces_placeholder_and_reenables_input() {
        let mut page = Page::new();
        let mut chat = client();
        chat.submit(&mut page, "hello");
        let settlement = chat.settle(
            &mut page,
            &Ok(ChatReply::Content("Hi **there**".to_string())),
        );
        assert!(settlement.latency_ms.is_some());
        assert_eq!(page.loading_count(), 0);
        assert!(page.input().enabled);
        assert!(page.input().focused);
        assert_eq!(page.last_entry().unwrap().format, Format::Markdown);
        assert_eq!(chat.state(), ChatState::Idle);
    }

    #[test]
    fn settle_without_request_is_ignored() {
        let mut page = Page::new();
        let settlement = client().settle(&mut page, &Ok(ChatReply::Unrecognized));
        assert!(settlement.changes.is_empty());
        assert_eq!(page.entry_count(), 0);
    }

    #[test]
    fn unsafe_reply_falls_back_to_plain_text() {
        let entry = reply_entry(
            &Ok(ChatReply::Content("<script>alert(1)</script>".to_string())),
            true,
        );
        assert_eq!(entry.format, Format::PlainText);
        assert!(entry.to_html().contains("&lt;script&gt;"));
    }

    #[test]
    fn markdown_disabled_renders_plain_text() {
        let entry = reply_entry(&Ok(ChatReply::Content("**x**".to_string())), false);
        assert_eq!(entry.format, Format::PlainText);
    }

    #[test]
    fn blank_content_is_not_a_reply() {
        let entry = reply_entry(&Ok(ChatReply::Content("  ".to_string())), true);
        assert_eq!(entry.content, NOT_UNDERSTOOD);
    }

    #[test]
    fn error_replies_are_sanitized() {
        let entry = reply_entry(&Ok(ChatReply::Error("bad\u{0}\nthing".to_string())), true);
        assert_eq!(entry.content, "Error: bad thing");
        assert_eq!(entry.format, Format::PlainText);

        let status = reply_entry(
            &Err(RequestError::Status {
                code: 500,
                message: "Failed to process chat request".to_string(),
            }),
            true,
        );
        assert_eq!(
            status.content,
            "Error: Failed to process chat request (HTTP 500)"
        );

        let transport = reply_entry(
            &Err(RequestError::Transport("connection refused".to_string())),
            true,
        );
        assert_eq!(transport.content, "Error: network error: connection refused");
    }

    #[test]
    fn sanitize_error_truncates() {
        let long = "x".repeat(400);
        let cleaned = sanitize_error(&long);
        assert_eq!(cleaned.chars().count(), MAX_ERROR_CHARS + 3);
        assert!(cleaned.ends_with("..."));
        assert_eq!(sanitize_error(" \n "), "unknown error");
    }
}
