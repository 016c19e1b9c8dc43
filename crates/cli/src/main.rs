//! editbridge CLI - hand git's commit message editing to a running host

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::{cmd_config_init, cmd_config_show, cmd_edit, cmd_env, cmd_host, cmd_script, cmd_status, script_entry};
use logging::{init_cli_logging, init_host_logging};

#[derive(Parser)]
#[command(name = "editbridge")]
#[command(about = "Route git's commit message editor through a long-running host")]
#[command(after_help = "\
QUICK START:
  editbridge host                   # Start the host (keep it running)
  eval \"$(editbridge env)\"          # Point git at the host in this shell
  git commit                        # Message opens in the configured editor

OTHER:
  editbridge env --disabled         # Let git commit without opening an editor
  editbridge status                 # Show commands and open views")]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

/// Subcommands for `editbridge config`
#[derive(Subcommand)]
pub enum ConfigCommand {
  /// Show current effective configuration
  #[command(long_about = "Show the current effective configuration.\n\n\
    Displays which config file is being used and its contents as TOML.")]
  Show,

  /// Write the default user config file
  Init {
    /// Overwrite an existing config file
    #[arg(long)]
    force: bool,
  },
}

#[derive(Subcommand)]
enum Commands {
  /// Run the host until ctrl-c
  Host {
    /// Log to a rolling file in the data directory instead of stderr
    #[arg(long)]
    log_file: bool,
  },
  /// Print the environment that makes git use the host as its editor
  #[command(after_help = "\
EXAMPLES:
  eval \"$(editbridge env)\"
  eval \"$(editbridge env --disabled)\"")]
  Env {
    /// Use a no-op editor so commits keep the message as prepared
    #[arg(long)]
    disabled: bool,
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
  /// Ask the host to edit a file and wait until its view closes
  Edit {
    /// File to edit (omit to send an empty request)
    path: Option<String>,
  },
  /// Show host status
  Status {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
  /// Manage configuration
  #[command(after_help = "\
CONFIG LOCATION:
  ~/.config/editbridge/config.toml")]
  Config {
    #[command(subcommand)]
    command: ConfigCommand,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  // Invoked by the editor shim rather than by a user
  if let Some((entry, args)) = script_entry() {
    init_cli_logging();
    let code = cmd_script(entry, args).await;
    std::process::exit(code);
  }

  let cli = Cli::parse();

  // File logging only for the host, console-only for other commands
  let _guard = match &cli.command {
    Commands::Host { log_file } => init_host_logging(*log_file),
    _ => {
      init_cli_logging();
      None
    }
  };

  match cli.command {
    Commands::Host { .. } => cmd_host().await,
    Commands::Env { disabled, json } => cmd_env(disabled, json).await,
    Commands::Edit { path } => cmd_edit(path).await,
    Commands::Status { json } => cmd_status(json).await,
    Commands::Config { command } => match command {
      ConfigCommand::Show => cmd_config_show().await,
      ConfigCommand::Init { force } => cmd_config_init(force).await,
    },
  }
}
