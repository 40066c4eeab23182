//! Server records stored in the vault blob.
//!
//! On disk a record is the flat JSON object older versions wrote
//! (`name`, `host`, `port`, `username`, `password`, `keyFile`,
//! `keyPassphrase`, `description`). In memory the authentication fields are
//! folded into [`AuthMethod`] so password and key auth cannot be confused.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// How a server authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Nothing stored; ssh prompts interactively.
    #[default]
    None,
    /// Password authentication.
    Password(String),
    /// Private key authentication.
    Key {
        /// Key file, either centralized or external.
        path: PathBuf,
        /// Passphrase protecting the key.
        passphrase: Option<String>,
        /// Password tried when the key is rejected.
        fallback_password: Option<String>,
    },
}

impl AuthMethod {
    /// Creates key authentication without passphrase or fallback.
    #[must_use]
    pub fn key(path: impl Into<PathBuf>) -> Self {
        Self::Key {
            path: path.into(),
            passphrase: None,
            fallback_password: None,
        }
    }

    /// Returns the key file path for key authentication.
    ///
    /// An empty path counts as no key file.
    #[must_use]
    pub fn key_path(&self) -> Option<&Path> {
        match self {
            Self::Key { path, .. } if !path.as_os_str().is_empty() => Some(path),
            _ => None,
        }
    }

    /// Returns the password usable for this method, if any.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        match self {
            Self::Password(password) => Some(password),
            Self::Key {
                fallback_password, ..
            } => fallback_password.as_deref(),
            Self::None => None,
        }
    }

    /// Returns a short label for listings.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Password(_) => "password",
            Self::Key { .. } => "key",
        }
    }
}

/// A saved SSH server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireServerRecord", into = "WireServerRecord")]
pub struct ServerRecord {
    /// Unique (case-insensitive) name used to connect.
    pub name: String,
    /// Hostname or IP address.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Authentication material.
    pub auth: AuthMethod,
    /// Free-form note.
    pub description: Option<String>,
}

impl ServerRecord {
    /// Creates a record on the default port without authentication.
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            auth: AuthMethod::None,
            description: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns true if `name` matches this record, ignoring case.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Returns `host` or `host:port` when the port is not 22.
    #[must_use]
    pub fn address(&self) -> String {
        if self.port == DEFAULT_PORT {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// On-disk shape of a [`ServerRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireServerRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(rename = "keyFile", default)]
    key_file: Option<String>,
    #[serde(rename = "keyPassphrase", default)]
    key_passphrase: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl From<WireServerRecord> for ServerRecord {
    fn from(wire: WireServerRecord) -> Self {
        // A present `keyFile`, even an empty one, keeps key auth so the
        // passphrase survives a save/load cycle.
        let auth = match wire.key_file {
            Some(path) => AuthMethod::Key {
                path: PathBuf::from(path),
                passphrase: wire.key_passphrase,
                fallback_password: wire.password,
            },
            None => match wire.password {
                Some(password) => AuthMethod::Password(password),
                None => AuthMethod::None,
            },
        };

        Self {
            name: wire.name,
            host: wire.host,
            port: wire.port,
            username: wire.username,
            auth,
            description: wire.description,
        }
    }
}

impl From<ServerRecord> for WireServerRecord {
    fn from(record: ServerRecord) -> Self {
        let (password, key_file, key_passphrase) = match record.auth {
            AuthMethod::None => (None, None, None),
            AuthMethod::Password(password) => (Some(password), None, None),
            AuthMethod::Key {
                path,
                passphrase,
                fallback_password,
            } => (
                fallback_password,
                Some(path.to_string_lossy().into_owned()),
                passphrase,
            ),
        };

        Self {
            name: record.name,
            host: record.host,
            port: record.port,
            username: record.username,
            password,
            key_file,
            key_passphrase,
            description: record.description,
        }
    }
}

/// The full set of servers held in one vault.
///
/// Name uniqueness is the caller's job; lookups here are case-insensitive
/// and return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialCollection {
    #[serde(default)]
    servers: Vec<ServerRecord>,
}

impl CredentialCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of servers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Returns true if there are no servers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Returns an iterator over all servers.
    pub fn servers(&self) -> impl Iterator<Item = &ServerRecord> {
        self.servers.iter()
    }

    /// Finds a server by name, ignoring case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ServerRecord> {
        self.servers.iter().find(|s| s.matches(name))
    }

    /// Finds a server by name for modification, ignoring case.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut ServerRecord> {
        self.servers.iter_mut().find(|s| s.matches(name))
    }

    /// Returns true if a server with this name exists, ignoring case.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Appends a server without any uniqueness check.
    pub fn push(&mut self, record: ServerRecord) {
        self.servers.push(record);
    }

    /// Removes the first server matching `name`, ignoring case.
    pub fn remove(&mut self, name: &str) -> Option<ServerRecord> {
        let index = self.servers.iter().position(|s| s.matches(name))?;
        Some(self.servers.remove(index))
    }

    /// Returns true if any server references `path` as its key file.
    #[must_use]
    pub fn references_key(&self, path: &Path) -> bool {
        self.servers
            .iter()
            .any(|s| s.auth.key_path() == Some(path))
    }

    /// Returns servers sorted by name for display.
    #[must_use]
    pub fn sorted_by_name(&self) -> Vec<&ServerRecord> {
        let mut sorted: Vec<&ServerRecord> = self.servers.iter().collect();
        sorted.sort_by_key(|s| s.name.to_lowercase());
        sorted
    }
}

impl FromIterator<ServerRecord> for CredentialCollection {
    fn from_iter<I: IntoIterator<Item = ServerRecord>>(iter: I) -> Self {
        Self {
            servers: iter.into_iter().collect(),
        }
    }
}
