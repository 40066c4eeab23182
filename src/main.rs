//! FastSSH - Main entry point.
//!
//! Encrypted SSH credential vault and connection launcher.
//!
//! Usage: fast-ssh <COMMAND | SERVER>
//!
//! Run `fast-ssh help` for the command list.

use std::env;

use fast_ssh::cli::{Cli, Command};
use fast_ssh::config::{self, UserConfig};
use fast_ssh::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Run 'fast-ssh help' for usage.");
            std::process::exit(1);
        }
    };

    let config_dir = config::config_dir();
    let user_config = match UserConfig::load(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}, using default settings", e);
            UserConfig::default()
        }
    };

    // Initialize logging; the tool still works without it
    if let Err(e) = logging::init(&user_config.log_config(&config_dir)) {
        eprintln!("Warning: file logging disabled: {}", e);
    }

    let mut cli = Cli::new(config_dir, user_config);
    match cli.run(command).await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::info!("Command failed: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
