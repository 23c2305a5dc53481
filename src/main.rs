// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for trello2md.
//!
//! This binary provides the `trello2md` command, which converts a Trello
//! board export into Obsidian notes in the current directory.

use lexopt::prelude::*;
use snafu::{ensure, prelude::*};
use std::path::PathBuf;
use std::sync::Arc;
use trello2md::attachments::{AttachmentFetcher, FetchError};
use trello2md::config::Config;
use trello2md::parser::{self, LoadError};
use trello2md::renderer;
use trello2md::writer::Writer;

struct Cli {
    input: PathBuf,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("{source}"))]
    LoadBoard { source: LoadError },

    #[snafu(display("attachment downloads unavailable: {source}"))]
    Fetcher { source: FetchError },

    #[snafu(display("{failed} file(s) could not be written"))]
    WritesFailed { failed: usize },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert a Trello board export to Obsidian Markdown

Usage: {name} <EXPORT>

Arguments:
  <EXPORT>  Trello board export (JSON)

Files are written to the current directory. Set TRELLO_API_KEY and
TRELLO_TOKEN to also download card attachments.

Options:
  -h, --help     Print help
  -V, --version  Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input: Option<PathBuf> = None;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if input.is_none() => input = Some(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input: input.ok_or("missing required argument: <EXPORT>")?,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = parse_args().context(ParseArgsSnafu)?;
    let config = Config::from_env();

    let board = parser::load_board(&cli.input).context(LoadBoardSnafu)?;
    let fetcher = AttachmentFetcher::from_credentials(&config.credentials)
        .context(FetcherSnafu)?
        .map(Arc::new);
    let opts = renderer::RenderOptions::default();

    let mut writer = Writer::new(".");
    writer.write_document(renderer::render_board(&board));
    for note in renderer::render_notes(&board, &opts) {
        writer.write_document(note);
    }

    if let Some(fetcher) = &fetcher {
        for attachment in renderer::attachment_files(&board) {
            writer.write_attachment(Arc::clone(fetcher), &attachment);
        }
    } else {
        log::debug!("attachment downloads disabled: credentials not set");
    }

    let summary = writer.finish().await;
    for failure in &summary.failures {
        eprintln!("error: {failure}");
    }
    ensure!(
        summary.is_success(),
        WritesFailedSnafu {
            failed: summary.failures.len()
        }
    );

    Ok(())
}
