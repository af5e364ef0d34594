mod replay;
mod token;

use anyhow::Result;
use serde::Serialize;

use crate::cli::Commands;

pub async fn dispatch(command: Commands) -> Result<()> {
	match command {
		Commands::Parse { token } => print_json(&token::parse(&token)?),
		Commands::Merge { left, right } => print_json(&token::merge(&left, &right)?),
		Commands::Compare { left, right } => print_json(&token::compare(&left, &right)?),
		Commands::Replay { script, config, no_capture } => {
			let report = replay::execute(&script, config.as_deref(), no_capture).await?;
			print_json(&report)
		}
	}
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}
