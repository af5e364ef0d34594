use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "docsession")]
#[command(about = "Inspect session tokens and replay exchanges through the session index")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Parse a bare, range-scoped or global session token
	Parse { token: String },

	/// Merge two tokens of the same range
	Merge { left: String, right: String },

	/// Report which of two tokens is at least as advanced as the other
	#[command(alias = "cmp")]
	Compare { left: String, right: String },

	/// Drive a recorded script of exchanges and lookups through one adapter
	Replay {
		/// Script file (JSON)
		script: PathBuf,
		/// Session configuration file (JSON)
		#[arg(short, long, value_name = "FILE")]
		config: Option<PathBuf>,
		/// Disable session capture regardless of configuration
		#[arg(long)]
		no_capture: bool,
	},
}
