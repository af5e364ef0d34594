//! Replays recorded request/response exchanges through one adapter.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use docsession::{CaptureOutcome, CollectionHandle, RequestDescriptor, ResponseHeaders, SessionAdapter, SessionConfig, SessionIndex};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
	#[serde(default)]
	pub exchanges: Vec<Exchange>,
	#[serde(default)]
	pub lookups: Vec<Lookup>,
}

#[derive(Debug, Deserialize)]
pub struct Exchange {
	pub request: RequestDescriptor,
	#[serde(default = "default_status")]
	pub status: u16,
	#[serde(default)]
	pub headers: ResponseHeaders,
}

#[derive(Debug, Deserialize)]
pub struct Lookup {
	pub request: RequestDescriptor,
}

fn default_status() -> u16 {
	200
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
	pub capture_enabled: bool,
	pub exchanges: Vec<ExchangeReport>,
	pub lookups: Vec<LookupReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeReport {
	pub address: String,
	pub outcome: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub collection_id: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub range_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl ExchangeReport {
	fn new(address: &str, outcome: &CaptureOutcome) -> Self {
		let (collection_id, range_id) = match outcome {
			CaptureOutcome::Stored { collection_id, range_id } | CaptureOutcome::Unchanged { collection_id, range_id } => {
				(Some(*collection_id), Some(range_id.clone()))
			}
			_ => (None, None),
		};
		let error = match outcome {
			CaptureOutcome::Rejected(err) => Some(err.to_string()),
			_ => None,
		};
		Self {
			address: address.to_string(),
			outcome: outcome.label(),
			collection_id,
			range_id,
			error,
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupReport {
	pub address: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub collection: Option<CollectionHandle>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub global_token: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub partition_token: Option<String>,
}

pub async fn execute(script_path: &Path, config_path: Option<&Path>, no_capture: bool) -> Result<ReplayReport> {
	let mut config = match config_path {
		Some(path) => SessionConfig::load(path)?,
		None => SessionConfig::default(),
	}
	.with_env_overrides();
	if no_capture {
		config.capture_enabled = false;
	}

	let content = tokio::fs::read_to_string(script_path)
		.await
		.with_context(|| format!("failed to read {}", script_path.display()))?;
	let script: ReplayScript = serde_json::from_str(&content).with_context(|| format!("invalid replay script {}", script_path.display()))?;

	info!(
		target = "docsession.cli",
		exchanges = script.exchanges.len(),
		lookups = script.lookups.len(),
		capture = config.capture_enabled,
		"replaying"
	);
	run(&script, &config)
}

/// Drives `script` through a fresh index.
pub fn run(script: &ReplayScript, config: &SessionConfig) -> Result<ReplayReport> {
	let adapter = SessionAdapter::new(Arc::new(SessionIndex::new(config)), config);

	let exchanges = script
		.exchanges
		.iter()
		.map(|exchange| {
			let outcome = adapter.capture(&exchange.request, exchange.status, &exchange.headers);
			ExchangeReport::new(&exchange.request.resource_address, &outcome)
		})
		.collect();

	let mut lookups = Vec::with_capacity(script.lookups.len());
	for lookup in &script.lookups {
		let request = &lookup.request;
		lookups.push(LookupReport {
			address: request.resource_address.clone(),
			collection: adapter.index().collection_for(request),
			global_token: adapter.global_token_for(request),
			partition_token: adapter
				.partition_token_for(request)
				.with_context(|| format!("lookup for {}", request.resource_address))?,
		});
	}

	Ok(ReplayReport {
		capture_enabled: config.capture_enabled,
		exchanges,
		lookups,
	})
}
