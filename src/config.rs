// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Run configuration taken from the environment.
//!
//! The environment is read once, in the binary, and the resulting [`Config`]
//! is handed to the components that need it.

/// Environment variable holding the Trello API key.
pub const API_KEY_VAR: &str = "TRELLO_API_KEY";

/// Environment variable holding the Trello API token.
pub const TOKEN_VAR: &str = "TRELLO_TOKEN";

/// Settings for one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Credentials used to download attachments.
    pub credentials: Credentials,
}

impl Config {
    /// Builds the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            credentials: Credentials::from_lookup(|var| std::env::var(var).ok()),
        }
    }
}

/// Trello API credentials. Attachment downloads need both.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// API key (`oauth_consumer_key`).
    pub api_key: Option<String>,

    /// API token (`oauth_token`).
    pub token: Option<String>,
}

impl Credentials {
    /// Reads credentials through `lookup`, treating empty values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |var: &str| lookup(var).filter(|value| !value.is_empty());
        Self {
            api_key: get(API_KEY_VAR),
            token: get(TOKEN_VAR),
        }
    }

    /// Returns the key and token when both are set.
    #[must_use]
    pub fn pair(&self) -> Option<(&str, &str)> {
        Some((self.api_key.as_deref()?, self.token.as_deref()?))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("token", &redact(&self.token))
            .finish()
    }
}
