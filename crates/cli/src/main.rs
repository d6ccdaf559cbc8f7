use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// ninlua - generate ninja build files from Lua configuration
#[derive(Parser)]
#[command(name = "ninlua")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Evaluate a configuration and write the build file
  Gen {
    /// Path to the configuration file
    #[arg(default_value = "configure.lua")]
    config: String,

    /// Path of the build file to write
    #[arg(short, long, default_value = "build.ninja")]
    out: String,

    /// KEY=VALUE definition exposed to the script as nin.args (repeatable)
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE")]
    define: Vec<String>,
  },

  /// Evaluate and serialize a configuration without writing anything
  Check {
    /// Path to the configuration file
    #[arg(default_value = "configure.lua")]
    config: String,

    /// KEY=VALUE definition exposed to the script as nin.args (repeatable)
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE")]
    define: Vec<String>,
  },

  /// Print the evaluated build graph as JSON
  Dump {
    /// Path to the configuration file
    #[arg(default_value = "configure.lua")]
    config: String,

    /// KEY=VALUE definition exposed to the script as nin.args (repeatable)
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE")]
    define: Vec<String>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();
  match cli.command {
    Commands::Gen { config, out, define } => cmd::cmd_gen(&config, &out, &define),
    Commands::Check { config, define } => cmd::cmd_check(&config, &define),
    Commands::Dump { config, define } => cmd::cmd_dump(&config, &define),
  }
}
