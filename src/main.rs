use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ishpipe::{Config, LaunchOrder, Orchestrator};

#[derive(Parser, Debug)]
#[command(name = "ishpipe", version)]
#[command(about = "Run a pipeline of external commands", long_about = None)]
struct Cli {
	/// Token separating pipeline stages
	#[arg(short, long)]
	delimiter: Option<String>,

	/// Spawn stages first-to-last instead of last-to-first
	#[arg(long)]
	forward: bool,

	/// More logging on stderr (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbose: u8,

	/// Commands and delimiters, e.g. -- ls -l '|' wc -l
	#[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
	tokens: Vec<String>,
}

fn init_logging(verbose: u8) {
	let default = match verbose {
		0 => "warn",
		1 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	let mut config = Config::from_env();
	if let Some(d) = cli.delimiter {
		config.delimiter = d;
	}
	if cli.forward {
		config.launch_order = LaunchOrder::Forward;
	}

	let report = Orchestrator::new(config).run(&cli.tokens);
	if let Some(ref e) = report.error {
		eprintln!("ishpipe: {}", e);
	}
	for (stage, status) in report.stages.iter().enumerate() {
		if !status.is_success() {
			tracing::info!(stage = stage, status = %status, "stage failed");
		}
	}
	if report.result().success {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	}
}
