// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Authenticated download of card attachments.
//!
//! Files uploaded to Trello are only served to authenticated requests, so the
//! fetcher sends the API key and token as an OAuth `Authorization` header. It
//! only exists when both credentials are configured.

use crate::config::Credentials;
use reqwest::header::{AUTHORIZATION, HeaderValue, InvalidHeaderValue};
use snafu::prelude::*;

/// Error type for attachment downloads.
#[derive(Debug, Snafu)]
pub enum FetchError {
    /// The credentials contain characters not allowed in an HTTP header.
    #[snafu(display("credentials cannot be sent as a header: {source}"))]
    InvalidCredentials {
        /// The underlying header error.
        source: InvalidHeaderValue,
    },

    /// The HTTP client could not be created.
    #[snafu(display("failed to create HTTP client: {source}"))]
    Client {
        /// The underlying client error.
        source: reqwest::Error,
    },

    /// The request failed or its body could not be read.
    #[snafu(display("failed to download {url}: {source}"))]
    Request {
        /// The attachment URL.
        url: String,
        /// The underlying request error.
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[snafu(display("failed to download {url}: server returned {status}"))]
    Status {
        /// The attachment URL.
        url: String,
        /// The HTTP status received.
        status: reqwest::StatusCode,
    },
}

/// Downloads attachments with Trello credentials.
#[derive(Debug, Clone)]
pub struct AttachmentFetcher {
    client: reqwest::Client,
    authorization: HeaderValue,
}

impl AttachmentFetcher {
    /// Creates a fetcher, or `None` when either credential is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be encoded as a header or
    /// the HTTP client cannot be initialised.
    pub fn from_credentials(credentials: &Credentials) -> Result<Option<Self>, FetchError> {
        let Some((key, token)) = credentials.pair() else {
            return Ok(None);
        };

        let mut authorization = HeaderValue::from_str(&authorization_header(key, token))
            .context(InvalidCredentialsSnafu)?;
        authorization.set_sensitive(true);

        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(ClientSnafu)?;

        Ok(Some(Self {
            client,
            authorization,
        }))
    }

    /// Downloads `url` and returns the raw body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not a
    /// success status.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        log::debug!("downloading {url}");

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .send()
            .await
            .context(RequestSnafu { url })?;

        let status = response.status();
        ensure!(status.is_success(), StatusSnafu { url, status });

        let body = response.bytes().await.context(RequestSnafu { url })?;
        Ok(body.to_vec())
    }
}

/// Formats the OAuth header Trello accepts for API key/token pairs.
fn authorization_header(key: &str, token: &str) -> String {
    format!(r#"OAuth oauth_consumer_key="{key}", oauth_token="{token}""#)
}
