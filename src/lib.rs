// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert Trello board exports to Obsidian Markdown.
//!
//! This crate turns the JSON document produced by Trello's "Export as JSON"
//! into a Kanban board note plus one note per card, ready to drop into an
//! Obsidian vault.
//!
//! # Overview
//!
//! 1. Parse the export into typed Rust representations
//! 2. Render the board and every open card as Markdown
//! 3. Write all documents, and optionally the card attachments, concurrently
//!
//! # Example
//!
//! ```no_run
//! use trello2md::{parser, renderer};
//!
//! let board = parser::load_board(std::path::Path::new("board.json")).unwrap();
//! let opts = renderer::RenderOptions::default();
//!
//! let kanban = renderer::render_board(&board);
//! let notes = renderer::render_notes(&board, &opts);
//! println!("{} and {} card notes", kanban.name, notes.len());
//! ```
//!
//! # Modules
//!
//! - [`parser`]: JSON parsing and type definitions for Trello exports
//! - [`renderer`]: board, card note, checklist and comment rendering
//! - [`sanitize`]: file-name-safe titles shared by files and links
//! - [`config`]: run configuration read from the environment
//! - [`attachments`]: authenticated attachment downloads
//! - [`writer`]: concurrent file output with an aggregated result

#![deny(missing_docs)]

pub mod attachments;
pub mod config;
pub mod parser;
pub mod renderer;
pub mod sanitize;
pub mod writer;
