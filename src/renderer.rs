// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Markdown rendering for parsed Trello boards.
//!
//! A board becomes one document for the Obsidian Kanban plugin plus one note
//! per open card. Notes carry YAML front matter and, when the card has
//! checklists, Dataview snippets that show task progress.
//!
//! # Output Format
//!
//! The board document includes:
//! - A `kanban-plugin: board` front matter block
//! - One `## <list>` lane per open list with `- [ ] [[card]]` entries
//! - A `%% kanban:settings` footer with one collapse flag per lane
//!
//! Each card note includes:
//! - Front matter with the last activity date, tags, link and optional due date
//! - A `# <card>` heading
//! - A progress bar when the card has checklists
//! - Attachment embeds, the description, comments and checklists
//!
//! # Example
//!
//! ```
//! use trello2md::parser::parse_board;
//! use trello2md::renderer::render_board;
//!
//! let board = parse_board(r#"{
//!     "name": "Roadmap",
//!     "lists": [{ "id": "l1", "name": "To Do", "closed": false }],
//!     "cards": [{
//!         "id": "c1", "name": "Task A", "idList": "l1", "closed": false,
//!         "dateLastActivity": "2024-03-01T12:30:00.000Z"
//!     }],
//!     "checklists": [],
//!     "actions": []
//! }"#).unwrap();
//!
//! let doc = render_board(&board);
//! assert_eq!(doc.name, "Roadmap");
//! assert!(doc.content.contains("## To Do\n\n- [ ] [[Task A]]\n"));
//! ```

use crate::parser::{Action, ActionKind, Board, Card, CheckState, Checklist};
use crate::sanitize::sanitize_name;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;
use std::fmt::Write;

/// Prefix put in front of every rendered comment.
pub const COMMENT_PREFIX: &str = "💬 ";

/// A rendered Markdown document waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Unsanitized title; the file name is derived from it when writing.
    pub name: String,

    /// Markdown content.
    pub content: String,
}

/// Configuration options for card note rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Vault folder the progress bar query reads tasks from.
    pub progress_source: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            progress_source: "trello2obsidian".into(),
        }
    }
}

/// A downloadable attachment and the file name it is saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    /// Id of the card carrying the attachment.
    pub card_id: String,

    /// Download URL.
    pub url: String,

    /// Name as exported by Trello.
    pub name: String,

    /// Output file name, unique across the board.
    pub file_name: String,
}

/// Assigns a file name to every downloadable attachment of the open cards.
///
/// Names are kept as exported unless an earlier attachment already uses
/// them, in which case a counter is added before the extension
/// (`image.png`, `image (2).png`, ...). The result only depends on the
/// export, so notes and downloads agree on the names.
#[must_use]
pub fn attachment_files(board: &Board) -> Vec<AttachmentFile> {
    let mut used = HashSet::new();
    let mut files = Vec::new();

    for card in board.open_cards() {
        for attachment in card.downloadable_attachments() {
            let file_name = (1..)
                .map(|n| numbered_file_name(&attachment.name, n))
                .find(|candidate| !used.contains(candidate))
                .unwrap_or_default();
            used.insert(file_name.clone());
            files.push(AttachmentFile {
                card_id: card.id.clone(),
                url: attachment.download_url().unwrap_or_default().to_owned(),
                name: attachment.name.clone(),
                file_name,
            });
        }
    }

    files
}

/// Returns `name` for `n == 1`, otherwise `name` with ` (n)` before its extension.
fn numbered_file_name(name: &str, n: usize) -> String {
    if n == 1 {
        return name.to_owned();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{name} ({n})"),
    }
}

/// Escapes `s` for use inside a double-quoted JavaScript string.
fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Formats a timestamp the way Trello exports it (`2024-03-01T12:30:00.000Z`).
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Collects the comments posted on `card`, in activity log order.
///
/// Each comment is prefixed with [`COMMENT_PREFIX`].
#[must_use]
pub fn card_comments(actions: &[Action], card: &Card) -> Vec<String> {
    actions
        .iter()
        .filter(|action| action.kind == ActionKind::CommentCard)
        .filter(|action| action.data.card.as_ref().is_some_and(|c| c.id == card.id))
        .map(|action| {
            format!(
                "{COMMENT_PREFIX}{}",
                action.data.text.as_deref().unwrap_or_default()
            )
        })
        .collect()
}

/// Renders a checklist as a `##` section of Markdown tasks.
#[must_use]
pub fn render_checklist(checklist: &Checklist) -> String {
    let mut out = String::new();
    writeln!(out, "## {}", checklist.name).unwrap();
    for item in &checklist.check_items {
        let mark = match item.state {
            CheckState::Complete => 'x',
            CheckState::Incomplete => ' ',
        };
        writeln!(out, "- [{mark}] {}", item.name).unwrap();
    }
    out
}

fn render_frontmatter(out: &mut String, card: &Card, title: &str, has_checklist: bool) {
    out.push_str("---\n");
    writeln!(out, "date: {}", format_timestamp(&card.date_last_activity)).unwrap();
    out.push_str("tags:\n- card\n");
    for label in card.labels.iter().filter(|label| !label.name.is_empty()) {
        writeln!(out, "- {}", label.name).unwrap();
    }
    writeln!(out, "link: {}", card.url).unwrap();
    if let Some(due) = &card.due {
        writeln!(out, "due: {}", format_timestamp(due)).unwrap();
    }
    if has_checklist {
        writeln!(
            out,
            r#"progress: '`$= const tasks = dv.page("{}").file.tasks; dv.span(tasks.filter(t => t.completed).length + "/" + tasks.length);`'"#,
            escape_js_string(title)
        )
        .unwrap();
    }
    out.push_str("---\n");
}

fn render_progress_bar(out: &mut String, opts: &RenderOptions) {
    const RATIO: &str = "(length(filter(this.file.tasks.completed, (t) => t = true)) / length(this.file.tasks)) * 100";

    out.push_str("```dataview\nLIST without ID\n");
    writeln!(
        out,
        r#"	"<progress value='" + {RATIO} + "' max='100'></progress>" + "<br>" + round({RATIO}) + "% completed""#
    )
    .unwrap();
    writeln!(out, "FROM \"{}\"", opts.progress_source).unwrap();
    out.push_str("LIMIT 1\n```\n");
}

/// Renders the note for one card.
///
/// `comments` come from [`card_comments`], `attachments` are the file names
/// from [`attachment_files`] and `checklists` are the card's checklists in
/// board order.
#[must_use]
pub fn render_card(
    card: &Card,
    comments: &[String],
    attachments: &[&str],
    checklists: &[&Checklist],
    opts: &RenderOptions,
) -> Document {
    let title = sanitize_name(&card.name);
    let has_checklist = !checklists.is_empty();
    let mut out = String::new();

    render_frontmatter(&mut out, card, &title, has_checklist);
    writeln!(out, "# {title}").unwrap();
    if has_checklist {
        render_progress_bar(&mut out, opts);
    }
    for file_name in attachments {
        writeln!(out, "![[{file_name}]]").unwrap();
    }
    if !card.desc.is_empty() {
        writeln!(out, "{}", card.desc).unwrap();
    }
    for comment in comments {
        writeln!(out, "{comment}").unwrap();
    }
    for checklist in checklists {
        out.push_str(&render_checklist(checklist));
    }

    Document {
        name: card.name.clone(),
        content: out,
    }
}

/// Renders a note for every open card on the board, in export order.
///
/// Checklists whose card is archived or missing are not rendered.
#[must_use]
pub fn render_notes(board: &Board, opts: &RenderOptions) -> Vec<Document> {
    let files = attachment_files(board);
    let mut attached = 0;
    let notes: Vec<Document> = board
        .open_cards()
        .map(|card| {
            let comments = card_comments(&board.actions, card);
            let attachments: Vec<&str> = files
                .iter()
                .filter(|file| file.card_id == card.id)
                .map(|file| file.file_name.as_str())
                .collect();
            let checklists: Vec<&Checklist> = board.checklists_for(card).collect();
            attached += checklists.len();
            render_card(card, &comments, &attachments, &checklists, opts)
        })
        .collect();

    let orphaned = board.checklists.len().saturating_sub(attached);
    if orphaned > 0 {
        log::debug!("dropped {orphaned} checklist(s) without an open card");
    }
    notes
}

/// Renders the Kanban board document.
///
/// Archived lists and cards are left out. Cards whose list is missing get no
/// lane entry.
#[must_use]
pub fn render_board(board: &Board) -> Document {
    let lanes: Vec<String> = board
        .open_lists()
        .map(|list| {
            let mut lane = String::new();
            writeln!(lane, "## {}\n", list.name).unwrap();
            for card in board.open_cards_in(list) {
                writeln!(lane, "- [ ] [[{}]]", sanitize_name(&card.name)).unwrap();
            }
            lane
        })
        .collect();

    let collapse = vec!["false"; lanes.len()].join(",");

    let mut out = String::from("---\n\nkanban-plugin: board\n\n---\n\n");
    out.push_str(&lanes.join("\n"));
    out.push_str("\n\n%% kanban:settings\n```\n");
    writeln!(
        out,
        r#"{{"kanban-plugin":"board","list-collapse":[{collapse}]}}"#
    )
    .unwrap();
    out.push_str("```\n%%\n");

    Document {
        name: board.name.clone(),
        content: out,
    }
}
