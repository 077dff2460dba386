//! Connection configuration for the remote search index.
//!
//! The configuration is a JSON object with the keys `url`, `port`, `user`,
//! `pwd` and `index`.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use url::Url;

use crate::errors::SearchIndexError;

/// Where and how to reach the search index.
#[derive(Clone, Deserialize)]
pub struct IndexConnection {
    /// Host or base URL of the search engine.
    pub url: String,
    /// Port, given either as a number or a numeric string.
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    pub user: String,
    pub pwd: String,
    /// Target index name.
    pub index: String,
}

impl fmt::Debug for IndexConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexConnection")
            .field("url", &self.url)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pwd", &"<redacted>")
            .field("index", &self.index)
            .finish()
    }
}

impl IndexConnection {
    /// Load the connection configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SearchIndexError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SearchIndexError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Parse the connection configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SearchIndexError> {
        let connection: Self =
            serde_json::from_str(text).map_err(|e| SearchIndexError::config(e.to_string()))?;

        if connection.index.trim().is_empty() {
            return Err(SearchIndexError::config("index name must not be empty"));
        }
        if connection.url.trim().is_empty() {
            return Err(SearchIndexError::config("url must not be empty"));
        }

        Ok(connection)
    }

    /// Full endpoint URL, with `https` assumed when no scheme is given.
    pub fn endpoint(&self) -> Result<Url, SearchIndexError> {
        let raw = self.url.trim().trim_end_matches('/');
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };

        let mut url = Url::parse(&with_scheme)
            .map_err(|e| SearchIndexError::config(format!("invalid url '{}': {}", self.url, e)))?;
        url.set_port(Some(self.port))
            .map_err(|_| SearchIndexError::config(format!("url '{}' cannot carry a port", self.url)))?;

        Ok(url)
    }
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|e| serde::de::Error::custom(format!("invalid port '{}': {}", text, e))),
    }
}
