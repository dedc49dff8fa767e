//! Integration with `clap`

use std::path::PathBuf;

use clap::Parser;
use figment::providers::Serialized;
use waveroom_core::{Result, config::Figment, err, toml, utils::available_parallelism};

/// Commandline arguments
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
	#[arg(short, long)]
	/// Path to the config TOML file (and optionally more than one)
	pub config: Option<Vec<PathBuf>>,

	/// Override an individual configuration variable, TOML syntax
	/// e.g. `-O log="debug"`
	#[arg(short('O'), long)]
	pub option: Vec<String>,

	/// Size of the tokio worker pool; 0 sizes from the machine
	#[arg(long, default_value_t = 0)]
	pub worker_threads: usize,
}

/// Parse commandline arguments into structured data
#[must_use]
pub fn parse() -> Args { Args::parse() }

impl Args {
	/// Arguments for the test harness: no config file, quiet logs.
	#[must_use]
	pub fn default_test() -> Self {
		Self {
			config: None,
			option: vec!["log=\"error\"".to_owned()],
			worker_threads: 2,
		}
	}

	#[must_use]
	pub(crate) fn effective_workers(&self) -> usize {
		if self.worker_threads == 0 {
			available_parallelism()
		} else {
			self.worker_threads
		}
	}
}

/// Synthesize any command line options with configuration file options;
/// the command line takes precedence.
pub(crate) fn update(mut config: Figment, args: &Args) -> Result<Figment> {
	for option in &args.option {
		let (key, val) = option
			.split_once('=')
			.ok_or_else(|| err!("Missing '=' in -O/--option: {option:?}"))?;

		if key.is_empty() || val.is_empty() {
			return Err(err!("Malformed -O/--option: {option:?}"));
		}

		// bare words are forgiven the missing quotes
		let table: toml::Table = toml::from_str(&format!("{key} = {val}"))
			.or_else(|_| toml::from_str(&format!("{key} = {val:?}")))
			.map_err(|e| err!("Invalid option value in {option:?}: {e}"))?;

		for (key, value) in table {
			config = config.merge(Serialized::default(&key, value));
		}
	}

	Ok(config)
}
