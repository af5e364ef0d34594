use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use docsession::protocol::{RANGE_SEPARATOR, RangeSessionToken, SessionToken, parse_global};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub range_id: Option<String>,
	pub token: String,
	pub version: i64,
	pub lsn: i64,
	pub regions: BTreeMap<u32, i64>,
}

impl TokenView {
	fn new(range_id: Option<String>, token: &SessionToken) -> Self {
		Self {
			range_id,
			token: token.to_string(),
			version: token.version(),
			lsn: token.lsn(),
			regions: token.regions().clone(),
		}
	}
}

#[derive(Debug, Serialize)]
pub struct ParseReport {
	pub tokens: Vec<TokenView>,
}

#[derive(Debug, Serialize)]
pub struct MergeReport {
	pub merged: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareReport {
	pub left_covers_right: bool,
	pub right_covers_left: bool,
	pub equal: bool,
}

pub fn parse(input: &str) -> Result<ParseReport> {
	if !input.contains(RANGE_SEPARATOR) {
		let token = SessionToken::parse(input).with_context(|| format!("invalid token `{input}`"))?;
		return Ok(ParseReport {
			tokens: vec![TokenView::new(None, &token)],
		});
	}

	let by_range = parse_global(input).with_context(|| format!("invalid token `{input}`"))?;
	let tokens = by_range
		.iter()
		.map(|(range_id, token)| TokenView::new(Some(range_id.clone()), token))
		.collect();
	Ok(ParseReport { tokens })
}

pub fn merge(left: &str, right: &str) -> Result<MergeReport> {
	let (left_range, left) = scoped_or_bare(left)?;
	let (right_range, right) = scoped_or_bare(right)?;
	let merged = left.merge(&right);

	let merged = match (left_range, right_range) {
		(Some(a), Some(b)) if a != b => bail!("cannot merge tokens of different ranges `{a}` and `{b}`"),
		(Some(range), _) | (None, Some(range)) => RangeSessionToken::new(range, merged).to_string(),
		(None, None) => merged.to_string(),
	};
	Ok(MergeReport { merged })
}

pub fn compare(left: &str, right: &str) -> Result<CompareReport> {
	let (_, left) = scoped_or_bare(left)?;
	let (_, right) = scoped_or_bare(right)?;
	Ok(CompareReport {
		left_covers_right: left.is_at_least_as_advanced_as(&right),
		right_covers_left: right.is_at_least_as_advanced_as(&left),
		equal: left == right,
	})
}

fn scoped_or_bare(input: &str) -> Result<(Option<String>, SessionToken)> {
	if input.contains(RANGE_SEPARATOR) {
		let RangeSessionToken { range_id, token } = RangeSessionToken::parse(input).with_context(|| format!("invalid token `{input}`"))?;
		return Ok((Some(range_id), token));
	}
	let token = SessionToken::parse(input).with_context(|| format!("invalid token `{input}`"))?;
	Ok((None, token))
}
