//! Static agent directory and external feed.
//!
//! Both files are decorative, read-only data owned by someone else; any
//! failure to read or parse them degrades to an empty listing instead of
//! an error.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;

/// Registered external agent, sourced from the static directory file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryAgent {
    pub id: String,
    pub name: String,
    #[serde(alias = "type")]
    pub role: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl DirectoryAgent {
    /// Substring match over name, role and capabilities, the same
    /// filtering the directory page applies.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();

        self.name.to_lowercase().contains(&query)
            || self.role.to_lowercase().contains(&query)
            || self
                .capabilities
                .iter()
                .any(|capability| capability.to_lowercase().contains(&query))
    }
}

/// One item of the static external feed. Only `text` is required.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalFeedItem {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Agent record created through the public registration endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegisteredAgent {
    pub id: String,
    pub name: String,
    pub capability: String,
    pub created_at: DateTime<Utc>,
}

impl RegisteredAgent {
    pub fn new(name: impl Into<String>, capability: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            capability: capability.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AgentsFile {
    agents: Vec<DirectoryAgent>,
}

#[derive(Debug, Deserialize)]
struct ExternalFeedFile {
    items: Vec<ExternalFeedItem>,
}

/// Loader for the two static files.
#[derive(Clone)]
pub struct DirectoryLoader {
    agents_path: PathBuf,
    external_feed_path: PathBuf,
}

impl DirectoryLoader {
    pub fn new(config: &config::Directory) -> Self {
        Self {
            agents_path: config.agents_path.clone(),
            external_feed_path: config.external_feed_path.clone(),
        }
    }

    /// Load the registered agents listing, empty on any failure.
    pub async fn load_agents(&self) -> Vec<DirectoryAgent> {
        match self.read::<AgentsFile>(&self.agents_path).await {
            Some(file) => file.agents,
            None => Vec::new(),
        }
    }

    /// Load the external feed items, empty on any failure.
    pub async fn load_external_feed(&self) -> Vec<ExternalFeedItem> {
        match self.read::<ExternalFeedFile>(&self.external_feed_path).await {
            Some(file) => file.items,
            None => Vec::new(),
        }
    }

    async fn read<T: serde::de::DeserializeOwned>(&self, path: &PathBuf) -> Option<T> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "directory file unreadable");
                return None;
            },
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "directory file malformed");
                None
            },
        }
    }
}
