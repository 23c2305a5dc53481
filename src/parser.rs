// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for Trello board exports.
//!
//! Trello's "Export as JSON" produces one document per board. Only the parts
//! needed to rebuild the board as notes are deserialized; every other field is
//! ignored.
//!
//! # Format Overview
//!
//! A board export contains:
//! - The board name
//! - Lists (columns) and cards, linked by `idList`
//! - Checklists, linked to cards by `idCard`
//! - Actions, an activity log in which comments appear as `commentCard`
//!
//! All sequences keep the order in which they appear in the export.
//!
//! # Example
//!
//! ```
//! use trello2md::parser::parse_board;
//!
//! let json = r#"{
//!     "name": "Roadmap",
//!     "lists": [{ "id": "l1", "name": "To Do", "closed": false }],
//!     "cards": [],
//!     "checklists": [],
//!     "actions": []
//! }"#;
//!
//! let board = parse_board(json).unwrap();
//! assert_eq!(board.name, "Roadmap");
//! assert_eq!(board.lists.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use snafu::prelude::*;
use std::path::{Path, PathBuf};

/// Error type for JSON parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// Error type for loading an export from disk.
#[derive(Debug, Snafu)]
pub enum LoadError {
    /// The export file does not exist.
    #[snafu(display("{} does not exist", path.display()))]
    NotFound {
        /// The path that was requested.
        path: PathBuf,
    },

    /// The export file exists but could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    Read {
        /// The path that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The export file is not a valid board export.
    #[snafu(display("failed to parse {}: {source}", path.display()))]
    Parse {
        /// The path that was requested.
        path: PathBuf,
        /// The underlying parse error.
        source: ParseError,
    },
}

/// The root structure of a Trello board export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Board {
    /// The board's title.
    pub name: String,

    /// Columns of the board, in board order.
    pub lists: Vec<List>,

    /// Every card on the board, archived ones included.
    pub cards: Vec<Card>,

    /// Every checklist on the board.
    pub checklists: Vec<Checklist>,

    /// Activity log entries.
    pub actions: Vec<Action>,
}

/// A column of cards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct List {
    /// Trello object id.
    pub id: String,

    /// Column title.
    pub name: String,

    /// Whether the list is archived.
    #[serde(default)]
    pub closed: bool,
}

/// A single card.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Trello object id.
    pub id: String,

    /// Card title as typed by the user (not sanitized).
    pub name: String,

    /// Id of the [`List`] the card sits in.
    pub id_list: String,

    /// Whether the card is archived.
    #[serde(default)]
    pub closed: bool,

    /// Due date, if one was set.
    #[serde(default)]
    pub due: Option<DateTime<Utc>>,

    /// Last time anything happened on the card.
    pub date_last_activity: DateTime<Utc>,

    /// Labels applied to the card.
    #[serde(default)]
    pub labels: Vec<Label>,

    /// Link to the card on trello.com.
    #[serde(default)]
    pub url: String,

    /// Markdown description.
    #[serde(default)]
    pub desc: String,

    /// Files and links attached to the card.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A card label. Only the name is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Label {
    /// Label text; empty for colour-only labels.
    #[serde(default)]
    pub name: String,
}

/// An attachment on a card.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    /// Where the attachment can be downloaded from.
    #[serde(default)]
    pub url: Option<String>,

    /// File name of the attachment.
    pub name: String,
}

impl Attachment {
    /// Returns the download URL when there is a non-empty one.
    #[must_use]
    pub fn download_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// A named group of check items attached to a card.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    /// Id of the [`Card`] this checklist belongs to.
    pub id_card: String,

    /// Checklist title.
    pub name: String,

    /// Items in display order.
    #[serde(default)]
    pub check_items: Vec<CheckItem>,
}

/// One entry of a checklist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckItem {
    /// Item text.
    pub name: String,

    /// Completion state.
    #[serde(default)]
    pub state: CheckState,
}

/// Completion state of a [`CheckItem`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    /// The item is ticked.
    Complete,

    /// Any other state Trello reports.
    #[default]
    #[serde(other)]
    Incomplete,
}

/// An entry from the board's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Action {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: ActionKind,

    /// Payload; which fields are present depends on `kind`.
    #[serde(default)]
    pub data: ActionData,
}

/// The kinds of actions this crate distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    /// A comment was posted on a card.
    CommentCard,

    /// Any other activity (card moves, renames, ...).
    #[serde(other)]
    Other,
}

/// Payload of an [`Action`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionData {
    /// The card the action refers to, if any.
    #[serde(default)]
    pub card: Option<CardRef>,

    /// Comment text for `commentCard` actions.
    #[serde(default)]
    pub text: Option<String>,
}

/// A reference to a card by id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CardRef {
    /// Trello object id of the card.
    pub id: String,
}

impl Board {
    /// Lists that are not archived, in board order.
    pub fn open_lists(&self) -> impl Iterator<Item = &List> {
        self.lists.iter().filter(|list| !list.closed)
    }

    /// Cards that are not archived, in export order.
    pub fn open_cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(|card| !card.closed)
    }

    /// Open cards that sit in the given list.
    pub fn open_cards_in<'a>(&'a self, list: &'a List) -> impl Iterator<Item = &'a Card> {
        self.open_cards().filter(move |card| card.id_list == list.id)
    }

    /// Checklists attached to the given card, in export order.
    pub fn checklists_for<'a>(&'a self, card: &'a Card) -> impl Iterator<Item = &'a Checklist> {
        self.checklists
            .iter()
            .filter(move |checklist| checklist.id_card == card.id)
    }
}

impl Card {
    /// Attachments that can be downloaded.
    pub fn downloadable_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments
            .iter()
            .filter(|attachment| attachment.download_url().is_some())
    }
}

/// Parses a JSON string into a [`Board`].
///
/// # Errors
///
/// Returns an error if the JSON is malformed or lacks one of the top-level
/// `name`, `lists`, `cards`, `checklists` or `actions` fields.
///
/// Card timestamps (`dateLastActivity`, and `due` when not `null`) must be
/// RFC 3339, which is what Trello writes (`2024-03-01T12:30:00.000Z`). Any
/// other format rejects the whole export rather than producing notes with
/// dates Obsidian cannot read.
pub fn parse_board(json_str: &str) -> Result<Board, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

/// Reads and parses a board export from disk.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] when the file does not exist,
/// [`LoadError::Read`] for other I/O failures, and [`LoadError::Parse`] when
/// the content is not a board export.
pub fn load_board(path: &Path) -> Result<Board, LoadError> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return NotFoundSnafu { path }.fail();
        }
        Err(e) => return Err(e).context(ReadSnafu { path }),
    };
    parse_board(&json).context(ParseSnafu { path })
}
