//! Launching the system `ssh` client.
//!
//! Inline private keys are written to a [`TempKeyFile`] for the lifetime of
//! the ssh process. The guard wipes and deletes the file when dropped, which
//! covers normal exit, errors, Ctrl+C and panics.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::connection::{ConnectionAuth, ConnectionRecord};
use super::server::{DEFAULT_PORT, ServerRecord};

/// Name of the ssh binary looked up in `PATH`.
pub const SSH_BINARY: &str = "ssh";

/// Errors launching ssh.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The temporary key file could not be written.
    #[error("Failed to write temporary key file: {0}")]
    TempKey(#[source] io::Error),

    /// ssh could not be started.
    #[error("Failed to start {SSH_BINARY}: {0}")]
    Spawn(#[source] io::Error),

    /// The user interrupted the session.
    #[error("Interrupted")]
    Interrupted,
}

/// Private key material written to disk for one ssh run.
#[derive(Debug)]
pub struct TempKeyFile {
    path: PathBuf,
    len: usize,
}

impl TempKeyFile {
    /// Writes `contents` to a new owner-only file in the system temp dir.
    pub fn create(contents: &str) -> Result<Self, LaunchError> {
        Self::create_in(&std::env::temp_dir(), contents)
    }

    /// Writes `contents` to a new owner-only file in `dir`.
    ///
    /// A trailing newline is added when missing; OpenSSH rejects keys
    /// without one.
    pub fn create_in(dir: &Path, contents: &str) -> Result<Self, LaunchError> {
        let path = dir.join(format!("fast-ssh-{}.key", uuid::Uuid::new_v4().simple()));

        let mut data = contents.as_bytes().to_vec();
        if !data.ends_with(b"\n") {
            data.push(b'\n');
        }

        // The guard exists before the first write so a failed write is
        // still cleaned up.
        let guard = Self {
            path,
            len: data.len(),
        };

        let mut file = create_private(&guard.path).map_err(LaunchError::TempKey)?;
        file.write_all(&data).map_err(LaunchError::TempKey)?;
        file.sync_all().map_err(LaunchError::TempKey)?;
        data.fill(0);

        debug!("Wrote temporary key {}", guard.path.display());
        Ok(guard)
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the file with zeros, then deletes it.
    fn wipe(&self) -> io::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        {
            let mut file = OpenOptions::new().write(true).open(&self.path)?;
            file.write_all(&vec![0u8; self.len])?;
            file.sync_all()?;
        }
        fs::remove_file(&self.path)
    }
}

impl Drop for TempKeyFile {
    fn drop(&mut self) {
        match self.wipe() {
            Ok(()) => debug!("Wiped temporary key {}", self.path.display()),
            Err(e) => warn!(
                "Could not securely delete temporary key {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Identity file handed to ssh with `-i`.
#[derive(Debug)]
pub enum Identity {
    /// A key file that outlives the session.
    File(PathBuf),
    /// A key written only for this session.
    Temporary(TempKeyFile),
}

impl Identity {
    /// Returns the path passed to ssh.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) => path,
            Self::Temporary(temp) => temp.path(),
        }
    }
}

/// Everything needed to run ssh against one server.
#[derive(Debug)]
pub struct SshInvocation {
    /// Hostname or IP address.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Key for `-i`, if any.
    pub identity: Option<Identity>,
    /// Whether a password is stored (ssh will ask for it).
    pub has_password: bool,
}

impl SshInvocation {
    /// Builds an invocation for a vault server.
    #[must_use]
    pub fn for_server(server: &ServerRecord) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            username: server.username.clone(),
            identity: server
                .auth
                .key_path()
                .map(|path| Identity::File(path.to_path_buf())),
            has_password: server.auth.password().is_some(),
        }
    }

    /// Builds an invocation for a per-entry connection.
    ///
    /// An inline key is written to a temporary file that lives as long
    /// as the returned value.
    pub fn for_connection(connection: &ConnectionRecord) -> Result<Self, LaunchError> {
        let (identity, has_password) = match &connection.auth {
            ConnectionAuth::None => (None, false),
            ConnectionAuth::Password(_) => (None, true),
            ConnectionAuth::PrivateKey { key, password, .. } => (
                Some(Identity::Temporary(TempKeyFile::create(key)?)),
                password.is_some(),
            ),
        };

        Ok(Self {
            host: connection.host.clone(),
            port: connection.port,
            username: connection.username.clone(),
            identity,
            has_password,
        })
    }

    /// Returns the ssh command-line arguments.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(5);

        if self.port != DEFAULT_PORT {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        if let Some(ref identity) = self.identity {
            args.push("-i".to_string());
            args.push(identity.path().to_string_lossy().into_owned());
        }

        if self.username.is_empty() {
            args.push(self.host.clone());
        } else {
            args.push(format!("{}@{}", self.username, self.host));
        }

        args
    }

    /// Runs ssh interactively and returns its exit code.
    ///
    /// Ctrl+C in the parent kills the child and yields
    /// [`LaunchError::Interrupted`]. Any temporary key is wiped when this
    /// returns.
    pub async fn run(self) -> Result<i32, LaunchError> {
        let args = self.args();
        info!("Connecting to {}:{} via {}", self.host, self.port, SSH_BINARY);

        let mut child = Command::new(SSH_BINARY)
            .args(&args)
            .kill_on_drop(true)
            .spawn()
            .map_err(LaunchError::Spawn)?;

        let result = tokio::select! {
            status = child.wait() => {
                let status = status.map_err(LaunchError::Spawn)?;
                Ok(status.code().unwrap_or(1))
            }
            _ = tokio::signal::ctrl_c() => {
                if let Err(e) = child.kill().await {
                    warn!("Could not stop {}: {}", SSH_BINARY, e);
                }
                Err(LaunchError::Interrupted)
            }
        };

        debug!("{} finished: {:?}", SSH_BINARY, result);
        result
    }
}
