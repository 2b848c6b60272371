//! `relay` command-line front end: `relay connect ...` dials out through a
//! running relay server, `relay server ...` loads one or more config files
//! and starts their listeners.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use relay_core::{connect, ConnectOptions};

#[derive(Parser)]
#[command(name = "relay", about = "A protocol-agnostic TCP relay")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Dial a relay server, announcing the protocol/host/port this
  /// connection wants, then pipe stdin/stdout through it.
  Connect {
    protocol: String,
    host: String,
    port: u16,

    /// Local port to bind before connecting; out of 0-65535, the OS picks.
    #[arg(long, default_value_t = -1)]
    local_port: i32,

    /// Write the bound local port (4 bytes, big-endian) to stdout before
    /// any relay traffic. Not part of the wire protocol - a debug channel
    /// for callers that spawn `relay connect` and need to know which
    /// ephemeral port was used.
    #[arg(long)]
    output_port: bool,

    /// Increase log verbosity; repeat for more (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
  },

  /// Load one or more config files and start every server they describe.
  Server {
    #[arg(required = true)]
    config_files: Vec<PathBuf>,

    /// Increase log verbosity; repeat for more (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
  },
}

fn init_tracing(verbose: u8) {
  let default_directive = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
  tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();

  let result = match cli.command {
    Command::Connect {
      protocol,
      host,
      port,
      local_port,
      output_port,
      verbose,
    } => {
      init_tracing(verbose);
      run_connect(protocol, host, port, local_port, output_port).await
    }
    Command::Server { config_files, verbose } => {
      init_tracing(verbose);
      run_server(config_files).await
    }
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!("{e:#}");
      ExitCode::FAILURE
    }
  }
}

async fn run_connect(protocol: String, host: String, port: u16, local_port: i32, output_port: bool) -> Result<()> {
  connect(ConnectOptions {
    protocol,
    host,
    port,
    local_port,
    output_port,
  })
  .await
  .context("connect failed")
}

async fn run_server(config_files: Vec<PathBuf>) -> Result<()> {
  let mut configs = Vec::new();
  for path in &config_files {
    let file = File::open(path).with_context(|| format!("failed to open config file {}", path.display()))?;
    let parsed = relay_core::parse(file).with_context(|| format!("failed to parse config file {}", path.display()))?;
    configs.extend(parsed);
  }

  relay_core::run_servers(configs).await;

  tracing::info!("all servers up and running");
  std::future::pending::<()>().await;
  Ok(())
}
