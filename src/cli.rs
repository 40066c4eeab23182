//! Command-line front end.
//!
//! Usage: fast-ssh <COMMAND | SERVER>
//!
//! Commands:
//!   <server>                 Connect to a saved server
//!   add                      Add a server interactively
//!   list                     List saved servers
//!   remove <name>            Remove a server
//!   set-key <name> <path|->  Replace a server's key (`-` for password auth)
//!   config                   Show settings and paths
//!   change-password          Re-encrypt everything with a new master password
//!   change-storage           Choose where connections are kept
//!   help, --help, -h         Show this help
//!   --version, -v            Show version

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::{ConfigError, UserConfig};
use crate::ssh::{
    AuthMethod, ConnectionRecord, DEFAULT_PORT, LaunchError, ServerRecord, SshInvocation,
};
use crate::storage::StorageError;
use crate::sync::StorageMode;
use crate::vault::{Vault, VaultError};
use crate::VERSION;

/// Exit status reported when the session was interrupted with Ctrl+C.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Usage text printed by `help`.
pub const USAGE: &str = "\
Usage: fast-ssh <COMMAND | SERVER>

Commands:
  <server>                 Connect to a saved server
  add                      Add a server interactively
  list                     List saved servers
  remove <name>            Remove a server
  set-key <name> <path|->  Replace a server's key (- switches to password)
  config                   Show settings and paths
  change-password          Re-encrypt everything with a new master password
  change-storage           Choose where connections are kept
  help, --help, -h         Show this help
  --version, -v            Show version";

/// Errors reported by the front end.
#[derive(Debug, Error)]
pub enum CliError {
    /// Wrong or missing arguments.
    #[error("{0}")]
    Usage(String),

    /// The two new-password entries differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// A new master password was empty.
    #[error("Master password must not be empty")]
    EmptyPassword,

    /// No server or connection has this name.
    #[error("Server '{0}' not found")]
    NotFound(String),

    /// Vault operation failed.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Store operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Config file could not be read or written.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// ssh could not be run.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// Terminal I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect to the named server.
    Connect(String),
    /// Add a server interactively.
    Add,
    /// List servers.
    List,
    /// Remove the named server.
    Remove(String),
    /// Replace a server's key; `None` switches to password auth.
    SetKey {
        /// Server name.
        name: String,
        /// New key file.
        key: Option<PathBuf>,
    },
    /// Show settings.
    Config,
    /// Rotate the master password.
    ChangePassword,
    /// Choose the storage mode.
    ChangeStorage,
    /// Print usage.
    Help,
    /// Print version.
    Version,
}

impl Command {
    /// Parses arguments, excluding the program name.
    ///
    /// Anything that is not a known command is taken as a server name.
    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let Some(first) = args.first() else {
            return Ok(Self::Help);
        };

        let command = match first.to_lowercase().as_str() {
            "add" => Self::Add,
            "list" | "ls" => Self::List,
            "remove" | "rm" => Self::Remove(required(args, 1, "remove <name>")?),
            "set-key" => {
                let name = required(args, 1, "set-key <name> <path|->")?;
                let key = required(args, 2, "set-key <name> <path|->")?;
                Self::SetKey {
                    name,
                    key: (key != "-").then(|| PathBuf::from(key)),
                }
            }
            "config" => Self::Config,
            "change-password" => Self::ChangePassword,
            "change-storage" => Self::ChangeStorage,
            "help" | "--help" | "-h" => Self::Help,
            "--version" | "-v" => Self::Version,
            _ if first.starts_with('-') => {
                return Err(CliError::Usage(format!("Unknown option '{}'", first)));
            }
            _ => Self::Connect(first.clone()),
        };

        Ok(command)
    }
}

/// Returns the non-empty argument at `index` or a usage error.
fn required(args: &[String], index: usize, usage: &str) -> Result<String, CliError> {
    match args.get(index).map(|a| a.trim()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(CliError::Usage(format!("Usage: fast-ssh {}", usage))),
    }
}

/// Runs commands against the stores in one config directory.
pub struct Cli {
    config_dir: PathBuf,
    config: UserConfig,
    vault: Vault,
}

impl Cli {
    /// Creates a front end for `config_dir`.
    #[must_use]
    pub fn new(config_dir: PathBuf, config: UserConfig) -> Self {
        let vault = Vault::open(&config_dir, config.sync_target());
        Self {
            config_dir,
            config,
            vault,
        }
    }

    /// Runs `command` and returns the process exit status.
    pub async fn run(&mut self, command: Command) -> Result<i32, CliError> {
        debug!("Running {:?}", command);

        match command {
            Command::Connect(name) => self.connect(&name).await,
            Command::Add => self.add().map(|()| 0),
            Command::List => self.list().map(|()| 0),
            Command::Remove(name) => self.remove(&name).map(|()| 0),
            Command::SetKey { name, key } => self.set_key(&name, key).map(|()| 0),
            Command::Config => {
                self.show_config();
                Ok(0)
            }
            Command::ChangePassword => self.change_password().map(|()| 0),
            Command::ChangeStorage => self.change_storage().map(|()| 0),
            Command::Help => {
                println!("{}", USAGE);
                Ok(0)
            }
            Command::Version => {
                println!("fast-ssh v{}", VERSION);
                Ok(0)
            }
        }
    }

    async fn connect(&self, name: &str) -> Result<i32, CliError> {
        let password = self.master_password()?;
        let servers = self.vault.load(&password)?;

        let invocation = match servers.find(name) {
            Some(server) => SshInvocation::for_server(server),
            None => {
                let connections = self.vault.load_connections(&password)?;
                let connection = connections
                    .iter()
                    .find(|c| c.matches(name))
                    .ok_or_else(|| CliError::NotFound(name.to_string()))?;
                SshInvocation::for_connection(connection)?
            }
        };
        drop(password);

        if invocation.has_password {
            println!("A password is stored for this server; ssh will ask for it.");
        }

        match invocation.run().await {
            Ok(code) => Ok(code),
            Err(LaunchError::Interrupted) => {
                eprintln!("Interrupted");
                Ok(EXIT_INTERRUPTED)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn add(&self) -> Result<(), CliError> {
        let password = if self.vault.is_initialized() {
            self.master_password()?
        } else {
            println!("No vault yet, choose a master password.");
            new_password("Master password: ", "Repeat master password: ")?
        };
        let mut servers = self.vault.load(&password)?;

        let name = prompt_line("Server name: ")?;
        let host = prompt_line("Host (IP or domain): ")?;
        let port = parse_port(&prompt_line(&format!("Port (default {}): ", DEFAULT_PORT))?)
            .ok_or_else(|| CliError::Usage("Port must be a number between 1 and 65535".to_string()))?;
        let username = prompt_line("Username: ")?;
        let key_path = prompt_line("Private key path (empty for password auth): ")?;

        let (auth, centralize) = if key_path.is_empty() {
            let server_password = prompt_secret("Server password (empty to let ssh ask): ")?;
            (non_empty(server_password.as_str()).map_or(AuthMethod::None, AuthMethod::Password), false)
        } else {
            let passphrase = prompt_secret("Key passphrase (empty if none): ")?;
            let fallback = prompt_secret("Server password (empty if none): ")?;
            let centralize = prompt_yes_no(
                &format!("Copy the key into {}?", self.vault.keys().keys_dir().display()),
                true,
            )?;
            let auth = AuthMethod::Key {
                path: PathBuf::from(&key_path),
                passphrase: non_empty(passphrase.as_str()),
                fallback_password: non_empty(fallback.as_str()),
            };
            (auth, centralize)
        };

        let mut record = ServerRecord::new(name, host, username)
            .with_port(port)
            .with_auth(auth);
        if let Some(description) = non_empty(&prompt_line("Description (optional): ")?) {
            record = record.with_description(description);
        }

        if let Some(path) = record.auth.key_path() {
            if !centralize && !path.is_file() {
                eprintln!("Warning: key file {} does not exist", path.display());
            }
        }

        let name = record.name.clone();
        self.vault.add_server(&mut servers, record, centralize, &password)?;
        println!("Server '{}' added.", name);
        Ok(())
    }

    fn list(&self) -> Result<(), CliError> {
        let password = self.master_password()?;
        let servers = self.vault.load(&password)?;
        let connections = self.vault.load_connections(&password)?;

        let legacy: Vec<&ConnectionRecord> = connections
            .iter()
            .filter(|c| !servers.contains(&c.name))
            .collect();

        if servers.is_empty() && legacy.is_empty() {
            println!("No servers saved. Add one with 'fast-ssh add'.");
            return Ok(());
        }

        for server in servers.sorted_by_name() {
            println!("{}", format_server(server));
        }
        for connection in legacy {
            println!("{}", format_connection(connection));
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), CliError> {
        let password = self.master_password()?;
        let mut servers = self.vault.load(&password)?;

        if servers.contains(name) {
            let removed = self.vault.remove_server(&mut servers, name, &password)?;
            println!("Server '{}' removed.", removed.name);
            return Ok(());
        }

        let mut connections = self.vault.load_connections(&password)?;
        let index = connections
            .iter()
            .position(|c| c.matches(name))
            .ok_or_else(|| CliError::NotFound(name.to_string()))?;
        let removed = connections.remove(index);
        self.vault.connections().save_all(&connections, &password)?;
        println!("Connection '{}' removed.", removed.name);
        Ok(())
    }

    fn set_key(&self, name: &str, key: Option<PathBuf>) -> Result<(), CliError> {
        let password = self.master_password()?;
        let mut servers = self.vault.load(&password)?;
        let current = servers
            .find(name)
            .map(|s| s.auth.clone())
            .ok_or_else(|| CliError::NotFound(name.to_string()))?;

        let auth = match key {
            Some(path) => {
                let passphrase = prompt_secret("Key passphrase (empty if none): ")?;
                AuthMethod::Key {
                    path,
                    passphrase: non_empty(passphrase.as_str()),
                    fallback_password: current.password().map(str::to_string),
                }
            }
            None => {
                let server_password = prompt_secret("Server password (empty to let ssh ask): ")?;
                non_empty(server_password.as_str()).map_or(AuthMethod::None, AuthMethod::Password)
            }
        };

        self.vault.replace_auth(&mut servers, name, auth, true, &password)?;
        println!("Authentication for '{}' updated.", name);
        Ok(())
    }

    fn show_config(&self) {
        println!("Current settings:");
        println!("  Config directory:   {}", self.config_dir.display());
        println!("  Vault file:         {}", self.vault.credentials().path().display());
        println!("  Keys directory:     {}", self.vault.keys().keys_dir().display());
        println!("  Connections:        {}", self.vault.connections().dir().display());
        println!(
            "  Storage mode:       {} ({})",
            self.config.connections_storage_mode.as_str(),
            self.config.connections_storage_mode.description()
        );
        if self.config.connections_storage_mode == StorageMode::SelfHosted {
            println!("  Self-hosted URL:    {}", self.config.self_hosted_url);
        }
        println!("  Log level:          {}", self.config.log_level);
        println!("  Log retention:      {}h", self.config.log_retention_hours);
    }

    fn change_password(&self) -> Result<(), CliError> {
        let old = prompt_secret("Current master password: ")?;
        let new = new_password("New master password: ", "Repeat new master password: ")?;

        let summary = self.vault.rotate_password(&old, &new)?;
        println!("Master password changed.");
        println!(
            "Re-encrypted {} server(s) and {} connection(s).",
            summary.servers, summary.connections
        );
        Ok(())
    }

    fn change_storage(&mut self) -> Result<(), CliError> {
        println!("Where should connections be kept?");
        for (index, mode) in STORAGE_CHOICES.iter().enumerate() {
            println!("  {}. {} ({})", index + 1, mode.description(), mode.as_str());
        }

        let choice = prompt_line("Choose 1-3: ")?;
        let mode = parse_storage_choice(&choice)
            .ok_or_else(|| CliError::Usage(format!("Invalid choice '{}', storage mode unchanged", choice)))?;

        self.config.connections_storage_mode = mode;
        if mode == StorageMode::SelfHosted {
            self.config.self_hosted_url = prompt_line("Self-hosted server URL: ")?;
        }
        self.config.save(&self.config_dir)?;
        info!("Storage mode set to {}", mode.as_str());
        println!("Storage mode changed to {}.", mode.as_str());

        let sync = self.config.sync_target();
        sync.sync_connections(self.vault.connections().dir());
        self.vault = Vault::open(&self.config_dir, sync);
        Ok(())
    }

    /// Prompts once for the master password.
    fn master_password(&self) -> Result<Zeroizing<String>, CliError> {
        Ok(prompt_secret("Master password: ")?)
    }
}

/// Storage modes in menu order.
const STORAGE_CHOICES: [StorageMode; 3] =
    [StorageMode::Local, StorageMode::SshHub, StorageMode::SelfHosted];

/// Maps a menu answer to a storage mode.
fn parse_storage_choice(choice: &str) -> Option<StorageMode> {
    let index: usize = choice.trim().parse().ok()?;
    STORAGE_CHOICES.get(index.checked_sub(1)?).copied()
}

/// Parses a port answer; empty means the default port.
fn parse_port(input: &str) -> Option<u16> {
    let input = input.trim();
    if input.is_empty() {
        return Some(DEFAULT_PORT);
    }
    input.parse().ok().filter(|&port| port != 0)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn format_server(server: &ServerRecord) -> String {
    let target = if server.username.is_empty() {
        server.address()
    } else {
        format!("{}@{}", server.username, server.address())
    };
    let mut line = format!("  {:<20} {:<32} [{}]", server.name, target, server.auth.as_str());
    if let Some(ref description) = server.description {
        line.push_str("  ");
        line.push_str(description);
    }
    line
}

fn format_connection(connection: &ConnectionRecord) -> String {
    let address = if connection.port == DEFAULT_PORT {
        connection.host.clone()
    } else {
        format!("{}:{}", connection.host, connection.port)
    };
    format!(
        "  {:<20} {:<32} [per-entry]",
        connection.name,
        format!("{}@{}", connection.username, address)
    )
}

/// Reads one trimmed line from stdin after printing `label`.
fn prompt_line(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Reads a secret without echo.
fn prompt_secret(label: &str) -> io::Result<Zeroizing<String>> {
    rpassword::prompt_password(label).map(Zeroizing::new)
}

fn prompt_yes_no(question: &str, default: bool) -> io::Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let answer = prompt_line(&format!("{} {} ", question, hint))?;
    Ok(parse_yes_no(&answer).unwrap_or(default))
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Asks for a new password twice.
fn new_password(label: &str, repeat_label: &str) -> Result<Zeroizing<String>, CliError> {
    let first = prompt_secret(label)?;
    let second = prompt_secret(repeat_label)?;
    confirm_password(first, &second)
}

fn confirm_password(first: Zeroizing<String>, second: &str) -> Result<Zeroizing<String>, CliError> {
    if first.is_empty() {
        return Err(CliError::EmptyPassword);
    }
    if first.as_str() != second {
        return Err(CliError::PasswordMismatch);
    }
    Ok(first)
}
