// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Concurrent output of rendered notes and downloaded attachments.
//!
//! Every write runs as its own task. Nothing is awaited until
//! [`Writer::finish`], which joins all of them and reports how many files
//! were written and which ones failed. A failure never cancels the other
//! writes.
//!
//! File names are claimed when a write is queued: the first document to
//! claim a name wins and later claims are reported as
//! [`WriteError::DuplicateName`].

use crate::attachments::{AttachmentFetcher, FetchError};
use crate::renderer::{AttachmentFile, Document};
use crate::sanitize::sanitize_name;
use snafu::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Error type for a single failed output file.
#[derive(Debug, Snafu)]
pub enum WriteError {
    /// Another document already claimed the file name in this run.
    #[snafu(display("{} is already written by another document in this run", path.display()))]
    DuplicateName {
        /// The contested output path.
        path: PathBuf,
    },

    /// The attachment name would place the file outside the output directory.
    #[snafu(display("attachment name {name:?} is not a plain file name"))]
    UnsafeName {
        /// The attachment's name as exported.
        name: String,
    },

    /// Writing the file failed.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    Io {
        /// The output path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Downloading the attachment failed.
    #[snafu(display("failed to fetch attachment {name}: {source}"))]
    Download {
        /// The attachment's name.
        name: String,
        /// The underlying download error.
        source: FetchError,
    },

    /// The write task panicked or was aborted.
    #[snafu(display("write task did not complete: {source}"))]
    Task {
        /// The underlying join error.
        source: tokio::task::JoinError,
    },
}

/// Outcome of a batch of writes.
#[derive(Debug, Default)]
pub struct WriteSummary {
    /// Number of files written successfully.
    pub written: usize,

    /// Every write that failed, in completion order.
    pub failures: Vec<WriteError>,
}

impl WriteSummary {
    /// Returns `true` when no write failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Queues writes into an output directory.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug)]
pub struct Writer {
    out_dir: PathBuf,
    claimed: HashSet<PathBuf>,
    pending: JoinSet<Result<(), WriteError>>,
    rejected: Vec<WriteError>,
}

impl Writer {
    /// Creates a writer that places files in `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            claimed: HashSet::new(),
            pending: JoinSet::new(),
            rejected: Vec::new(),
        }
    }

    /// Returns the path a document is written to.
    #[must_use]
    pub fn document_path(&self, doc: &Document) -> PathBuf {
        self.out_dir.join(format!("{}.md", sanitize_name(&doc.name)))
    }

    /// Queues `doc` to be written as `<sanitized name>.md`.
    pub fn write_document(&mut self, doc: Document) {
        let path = self.document_path(&doc);
        if !self.claim(&path) {
            return;
        }

        self.pending.spawn(async move {
            tokio::fs::write(&path, doc.content)
                .await
                .context(IoSnafu { path: &path })?;
            println!("[{}] written successfully!", doc.name);
            Ok(())
        });
    }

    /// Queues `attachment` to be downloaded and saved as its planned file name.
    pub fn write_attachment(&mut self, fetcher: Arc<AttachmentFetcher>, attachment: &AttachmentFile) {
        let name = attachment.file_name.clone();
        if !is_plain_file_name(&name) {
            log::warn!("refusing to write attachment {name:?}");
            self.rejected.push(WriteError::UnsafeName { name });
            return;
        }

        let path = self.out_dir.join(&name);
        if !self.claim(&path) {
            return;
        }

        let url = attachment.url.clone();
        self.pending.spawn(async move {
            let body = fetcher
                .fetch(&url)
                .await
                .context(DownloadSnafu { name: &name })?;
            tokio::fs::write(&path, body)
                .await
                .context(IoSnafu { path: &path })?;
            println!("[{name}] written successfully!");
            Ok(())
        });
    }

    /// Waits for every queued write and summarises the results.
    pub async fn finish(mut self) -> WriteSummary {
        let mut summary = WriteSummary {
            written: 0,
            failures: std::mem::take(&mut self.rejected),
        };

        while let Some(joined) = self.pending.join_next().await {
            match joined.context(TaskSnafu).and_then(|result| result) {
                Ok(()) => summary.written += 1,
                Err(e) => {
                    log::warn!("{e}");
                    summary.failures.push(e);
                }
            }
        }

        summary
    }

    /// Records `path` as taken. Returns `false` if it already was.
    fn claim(&mut self, path: &Path) -> bool {
        if self.claimed.insert(path.to_path_buf()) {
            return true;
        }
        log::warn!("{} claimed twice, keeping the first", path.display());
        self.rejected.push(WriteError::DuplicateName {
            path: path.to_path_buf(),
        });
        false
    }
}

/// Returns `true` if `name` is a single, normal path component.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::parser::parse_board;
    use crate::renderer::attachment_files;
    use std::fs;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn doc(name: &str, content: &str) -> Document {
        Document {
            name: name.into(),
            content: content.into(),
        }
    }

    fn fetcher() -> Arc<AttachmentFetcher> {
        let creds = Credentials {
            api_key: Some("key".into()),
            token: Some("tok".into()),
        };
        Arc::new(AttachmentFetcher::from_credentials(&creds).unwrap().unwrap())
    }

    fn attachment(url: String, file_name: &str) -> AttachmentFile {
        AttachmentFile {
            card_id: "c1".into(),
            url,
            name: file_name.into(),
            file_name: file_name.into(),
        }
    }

    #[test]
    fn recognises_plain_file_names() {
        assert!(is_plain_file_name("photo.png"));
        assert!(is_plain_file_name("my file (1).pdf"));
        assert!(!is_plain_file_name("../escape.png"));
        assert!(!is_plain_file_name("dir/file.png"));
        assert!(!is_plain_file_name("dir\\file.png"));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("."));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("/etc/passwd"));
    }

    #[tokio::test]
    async fn writes_documents_with_sanitized_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = Writer::new(dir.path());

        writer.write_document(doc("Plan: Q1/Q2", "# plan\n"));
        writer.write_document(doc("Other", "# other\n"));
        let summary = writer.finish().await;

        assert!(summary.is_success());
        assert_eq!(summary.written, 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("Plan - Q1 or Q2.md")).unwrap(),
            "# plan\n"
        );
        assert!(dir.path().join("Other.md").exists());
    }

    #[tokio::test]
    async fn first_document_wins_name_collision() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = Writer::new(dir.path());

        writer.write_document(doc("Bob's card", "first"));
        writer.write_document(doc("Bobs card", "second"));
        let summary = writer.finish().await;

        assert_eq!(summary.written, 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(matches!(
            summary.failures[0],
            WriteError::DuplicateName { .. }
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join("Bobs card.md")).unwrap(),
            "first"
        );
    }

    #[tokio::test]
    async fn failed_write_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = Writer::new(dir.path());

        writer.write_document(doc("nul\0byte", "x"));
        writer.write_document(doc("Kept", "x"));
        let summary = writer.finish().await;

        assert_eq!(summary.written, 1);
        assert!(matches!(summary.failures[..], [WriteError::Io { .. }]));
        assert!(dir.path().join("Kept.md").exists());
    }

    #[tokio::test]
    async fn downloads_attachment_next_to_notes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/photo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut writer = Writer::new(dir.path());
        let url = format!("{}/download/photo.png", server.uri());

        writer.write_attachment(fetcher(), &attachment(url, "photo.png"));
        let summary = writer.finish().await;

        assert!(summary.is_success());
        assert_eq!(summary.written, 1);
        assert_eq!(fs::read(dir.path().join("photo.png")).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn same_named_attachments_on_different_cards_are_both_kept() {
        let server = MockServer::start().await;
        for (route, body) in [("/a/image.png", "A"), ("/b/image.png", "B")] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .expect(1)
                .mount(&server)
                .await;
        }

        let card = |id: &str, route: &str| {
            format!(
                r#"{{ "id": "{id}", "name": "Card {id}", "idList": "l1",
                     "dateLastActivity": "2024-01-01T00:00:00.000Z",
                     "attachments": [{{ "name": "image.png", "url": "{}{route}" }}] }}"#,
                server.uri()
            )
        };
        let json = format!(
            r#"{{ "name": "B", "lists": [], "checklists": [], "actions": [],
                 "cards": [{}, {}] }}"#,
            card("c1", "/a/image.png"),
            card("c2", "/b/image.png")
        );
        let board = parse_board(&json).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut writer = Writer::new(dir.path());
        for file in attachment_files(&board) {
            writer.write_attachment(fetcher(), &file);
        }
        let summary = writer.finish().await;

        assert!(summary.is_success(), "{:?}", summary.failures);
        assert_eq!(summary.written, 2);
        assert_eq!(fs::read(dir.path().join("image.png")).unwrap(), b"A");
        assert_eq!(fs::read(dir.path().join("image (2).png")).unwrap(), b"B");
    }

    #[tokio::test]
    async fn records_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut writer = Writer::new(dir.path());
        let url = format!("{}/download/gone.png", server.uri());

        writer.write_attachment(fetcher(), &attachment(url, "gone.png"));
        writer.write_document(doc("Note", "still written"));
        let summary = writer.finish().await;

        assert_eq!(summary.written, 1);
        assert!(matches!(
            summary.failures[..],
            [WriteError::Download { .. }]
        ));
        assert!(!dir.path().join("gone.png").exists());
        assert!(dir.path().join("Note.md").exists());
    }

    #[tokio::test]
    async fn rejects_attachment_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = Writer::new(dir.path());

        writer.write_attachment(
            fetcher(),
            &attachment("http://127.0.0.1:9/x".into(), "../x.png"),
        );
        let summary = writer.finish().await;

        assert_eq!(summary.written, 0);
        assert!(matches!(
            summary.failures[..],
            [WriteError::UnsafeName { .. }]
        ));
    }
}
