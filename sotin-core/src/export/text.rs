//! Markdown transcript.
//!
//! Layout, one block per turn:
//!
//! ```text
//! User:
//! > What is the capital of France?
//!
//! Assistant:
//! > Paris
//!
//! Sources:
//!   1. [Wiki](https://en.wikipedia.org/wiki/Paris)
//! ```
//!
//! Content lines are always quoted, so a header line (`User:`/`Assistant:`)
//! or a numbered source line can never come from message text. [`outline`]
//! relies on that to recover roles and citation counts.

use std::fmt::Write;

use chrono::SecondsFormat;

use crate::models::{Citation, Role, Turn};
use crate::session::SessionSnapshot;

const NO_ANSWER: &str = "_(no answer)_";
const NO_DETAILS: &str = "(no details)";
const SOURCES: &str = "Sources:";

pub fn render(snapshot: &SessionSnapshot, title: &str) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    // Header values are flattened so none of them can read back as a turn.
    let _ = writeln!(out, "# {}", flatten(title));
    let _ = writeln!(out);
    let _ = writeln!(out, "Session: {}", flatten(&snapshot.session_id));
    let _ = writeln!(out, "User ID: {}", flatten(&snapshot.user_id));
    let _ = writeln!(
        out,
        "Started: {}",
        snapshot.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    for turn in snapshot.turns.iter() {
        let _ = writeln!(out);
        render_turn(&mut out, turn);
    }

    out
}

fn render_turn(out: &mut String, turn: &Turn) {
    let _ = writeln!(out, "{}:", turn.role.label());

    if turn.content.is_empty() {
        let _ = writeln!(out, "{}", NO_ANSWER);
    } else {
        for line in turn.content.split('\n') {
            if line.is_empty() {
                out.push_str(">\n");
            } else {
                let _ = writeln!(out, "> {}", line);
            }
        }
    }

    if turn.role == Role::Assistant && !turn.citations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", SOURCES);
        for (i, citation) in turn.citations.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, citation_line(citation));
        }
    }
}

/// Collapse runs of whitespace (including newlines) to single spaces.
fn flatten(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Only present fields are printed; a citation with none still gets a line.
pub fn citation_line(citation: &Citation) -> String {
    let title = citation.title.as_deref().map(flatten);
    let url = citation.url.as_deref().map(flatten);

    let mut parts = Vec::new();
    match (title, url) {
        (Some(title), Some(url)) => parts.push(format!("[{}]({})", title, url)),
        (Some(title), None) => parts.push(title),
        (None, Some(url)) => parts.push(format!("<{}>", url)),
        (None, None) => {}
    }
    if let Some(snippet) = citation.snippet.as_deref() {
        parts.push(format!("_{}_", flatten(snippet)));
    }

    if parts.is_empty() {
        NO_DETAILS.to_string()
    } else {
        parts.join(" - ")
    }
}

/// Role and citation count of one rendered turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnOutline {
    pub role: Role,
    pub citations: usize,
}

fn is_numbered_line(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("  ") else {
        return false;
    };
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && rest[digits..].starts_with(". ")
}

/// Re-parse a rendered transcript into its turn structure.
pub fn outline(markdown: &str) -> Vec<TurnOutline> {
    let mut turns: Vec<TurnOutline> = Vec::new();
    let mut in_sources = false;

    for line in markdown.lines() {
        let role = match line {
            "User:" => Some(Role::User),
            "Assistant:" => Some(Role::Assistant),
            _ => None,
        };
        if let Some(role) = role {
            turns.push(TurnOutline { role, citations: 0 });
            in_sources = false;
            continue;
        }

        if line == SOURCES {
            in_sources = true;
        } else if in_sources && is_numbered_line(line) {
            if let Some(last) = turns.last_mut() {
                last.citations += 1;
            }
        }
    }

    turns
}
