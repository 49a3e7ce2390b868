mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::store_path::StorePathSource;
use crate::cmd::{cmd_processes, cmd_store_path};
use crate::output::print_error;

/// storeprobe - inspect a content-addressed build store
#[derive(Parser)]
#[command(name = "storeprobe")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Store to inspect: "auto", "local", a store root directory, or a store URI
  #[arg(long, global = true, env = "STOREPROBE_STORE", default_value = "auto")]
  store: String,

  /// Give up on a single fuser lookup after this long (e.g. "5s"); waits indefinitely when unset
  #[arg(long, global = true, env = "STOREPROBE_FUSER_TIMEOUT", value_parser = humantime::parse_duration)]
  fuser_timeout: Option<Duration>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show which processes are currently holding build slots
  Processes,

  /// Print the store path of described or local content
  StorePath(StorePathArgs),
}

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true).args(["descriptor", "path"])))]
struct StorePathArgs {
  /// JSON content descriptor with narHash, contentHash and ingestionMethod
  #[arg(long)]
  descriptor: Option<PathBuf>,

  /// Local file or directory to hash
  #[arg(long)]
  path: Option<PathBuf>,

  /// Hash --path as a single flat file instead of a tree
  #[arg(long, requires = "path")]
  flat: bool,
}

impl StorePathArgs {
  fn into_source(self) -> StorePathSource {
    match (self.descriptor, self.path) {
      (Some(descriptor), _) => StorePathSource::Descriptor(descriptor),
      (None, Some(path)) => StorePathSource::Content { path, flat: self.flat },
      (None, None) => unreachable!("clap requires one of --descriptor or --path"),
    }
  }
}

fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Processes => cmd_processes(&cli.store, cli.fuser_timeout),
    Commands::StorePath(args) => cmd_store_path(&cli.store, args.into_source()),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
