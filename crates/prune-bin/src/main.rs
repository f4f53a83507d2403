use clap::Parser;
use prune_core::{PruneOptions, prune};
use std::path::PathBuf;

mod logging;

use logging::{LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "yarn-prune", version)]
#[command(about = "Prune a yarn monorepo down to one workspace and its dependencies")]
struct Args {
  /// Workspace to prune down to
  #[arg(long, env = "PRUNE_SCOPE", value_name = "NAME")]
  scope: String,

  /// Split the output into `full/` and `json/` for docker builds
  #[arg(long)]
  docker: bool,

  /// Output directory, relative to the repository root
  #[arg(long, env = "PRUNE_OUT_DIR", default_value = "out", value_name = "DIR")]
  out_dir: PathBuf,

  /// Repository root (defaults to the current directory)
  #[arg(long, value_name = "DIR")]
  cwd: Option<PathBuf>,

  #[arg(long, value_enum, default_value_t)]
  log_level: LogLevel,

  #[arg(long, value_enum, default_value_t)]
  log_format: LogFormat,
}

fn main() {
  let args = match Args::try_parse() {
    Ok(args) => args,
    // --help and --version
    Err(e) if !e.use_stderr() => e.exit(),
    Err(e) => {
      eprint!("{e}");
      std::process::exit(1);
    }
  };

  if args.scope.trim().is_empty() {
    eprintln!("error: at least one target must be specified");
    std::process::exit(1);
  }

  if let Err(e) = logging::init(args.log_level, args.log_format) {
    eprintln!("{e:?}");
    std::process::exit(1);
  }

  let root = match args.cwd.clone().map_or_else(std::env::current_dir, Ok) {
    Ok(root) => root,
    Err(e) => {
      eprintln!("failed to read the current directory: {e}");
      std::process::exit(1);
    }
  };

  let options = PruneOptions::new(args.scope)
    .with_docker(args.docker)
    .with_out_dir(args.out_dir);

  println!(
    "Generating pruned monorepo for {} in {}",
    options.scope,
    root.join(&options.out_dir).display()
  );
  match prune(&root, &options) {
    Ok(summary) => {
      for name in &summary.targets {
        println!(" - Added {name}");
      }
    }
    Err(err) => {
      tracing::error!(error = %err, "prune failed");
      eprintln!("{:?}", miette::Report::new(err));
      std::process::exit(1);
    }
  }
}
