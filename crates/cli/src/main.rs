mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cairn_lib::emit::SpecFormat;

use crate::cmd::EvalOptions;
use crate::output::OutputFormat;

/// cairn - evaluate content-addressed unit definitions into specifications
#[derive(Parser)]
#[command(name = "cairn")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Evaluate an exported unit and emit its specifications
  Eval {
    /// Path to the definition file
    file: PathBuf,

    /// Export name of the unit to evaluate
    unit: String,

    /// Compute identifiers without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Print the root specification
    #[arg(long)]
    print: bool,

    /// Write the dependency graph in Graphviz format to PATH
    #[arg(long, value_name = "PATH")]
    dot: Option<PathBuf>,

    /// Store root rendered into store paths (default: $CAIRN_STORE)
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Directory specifications are written to (default: $CAIRN_EVAL)
    #[arg(long, value_name = "PATH")]
    eval_dir: Option<PathBuf>,

    /// Specification file format
    #[arg(long, default_value_t = SpecFormat::Toml)]
    format: SpecFormat,

    /// Maximum number of specifications written concurrently
    #[arg(short, long)]
    jobs: Option<usize>,
  },

  /// List the units a definition file exports
  List {
    /// Path to the definition file
    file: PathBuf,

    /// Store root rendered into store paths (default: $CAIRN_STORE)
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,
  },

  /// Print a previously emitted specification
  Show {
    /// Unit identifier
    id: String,

    /// Directory specifications were written to (default: $CAIRN_EVAL)
    #[arg(long, value_name = "PATH")]
    eval_dir: Option<PathBuf>,

    /// Specification file format
    #[arg(long, default_value_t = SpecFormat::Toml)]
    format: SpecFormat,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .without_time()
    .with_writer(std::io::stderr)
    .init();

  match cli.command {
    Commands::Eval {
      file,
      unit,
      dry_run,
      print,
      dot,
      store,
      eval_dir,
      format,
      jobs,
    } => {
      let options = EvalOptions {
        unit,
        dry_run,
        print,
        dot,
        store,
        eval_dir,
        format,
        jobs,
      };
      cmd::cmd_eval(&file, &options, cli.output)
    }
    Commands::List { file, store } => cmd::cmd_list(&file, store.as_deref(), cli.output),
    Commands::Show { id, eval_dir, format } => cmd::cmd_show(&id, eval_dir.as_deref(), format, cli.output),
  }
}
