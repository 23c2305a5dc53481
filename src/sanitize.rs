// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! File-name-safe titles.
//!
//! Obsidian resolves `[[links]]` by file name, so the same transformation
//! is applied to every title used as a file name and to every link target.

/// Replaces characters that cannot appear in a note's file name.
///
/// - `/` becomes ` or `
/// - `'` is removed
/// - `": "` becomes `" - "`
///
/// Every other character is left untouched.
///
/// # Example
///
/// ```
/// use trello2md::sanitize::sanitize_name;
///
/// assert_eq!(sanitize_name("Read/Write"), "Read or Write");
/// assert_eq!(sanitize_name("Done: now"), "Done - now");
/// assert_eq!(sanitize_name("Bob's task"), "Bobs task");
/// ```
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.replace('/', " or ")
        .replace('\'', "")
        .replace(": ", " - ")
}
