//! Session token value type and its wire form.
//!
//! A token records how far one partition key range has progressed, as last
//! observed by this client:
//!
//! ```text
//! <version>#<globalLsn>#<regionId>=<regionLsn>#<regionId>=<regionLsn>...
//! ```
//!
//! On the wire a token is scoped to its range as `<rangeId>:<token>`, and an
//! outgoing request may carry several range-scoped tokens joined by commas
//! (the "global" form).

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const SEGMENT_SEPARATOR: char = '#';
const REGION_SEPARATOR: char = '=';

/// Separates a partition key range id from its token.
pub const RANGE_SEPARATOR: char = ':';

/// Separates range-scoped tokens in the global form.
pub const GLOBAL_SEPARATOR: char = ',';

/// Errors produced while parsing a session token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenParseError {
	#[error("session token is empty")]
	Empty,
	#[error("session token `{0}` has no global LSN")]
	MissingGlobalLsn(String),
	#[error("invalid number `{segment}` in session token")]
	InvalidNumber { segment: String },
	#[error("invalid region entry `{segment}` in session token")]
	InvalidRegion { segment: String },
	#[error("region {0} appears more than once in session token")]
	DuplicateRegion(u32),
	#[error("session token `{0}` is not scoped to a partition key range")]
	MissingRange(String),
}

/// Progress of a single partition key range.
///
/// Immutable once built; [`merge`](Self::merge) returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken {
	version: i64,
	global_lsn: i64,
	regions: BTreeMap<u32, i64>,
}

impl SessionToken {
	/// Builds a token. Repeated region ids keep their highest progress.
	pub fn new(version: i64, global_lsn: i64, regions: impl IntoIterator<Item = (u32, i64)>) -> Self {
		let mut by_region = BTreeMap::new();
		for (region, progress) in regions {
			by_region
				.entry(region)
				.and_modify(|current: &mut i64| *current = (*current).max(progress))
				.or_insert(progress);
		}
		Self {
			version,
			global_lsn,
			regions: by_region,
		}
	}

	/// Parses the bare wire form (no range prefix).
	///
	/// Fails without producing a partial token when any segment is malformed.
	pub fn parse(input: &str) -> Result<Self, TokenParseError> {
		if input.is_empty() {
			return Err(TokenParseError::Empty);
		}

		let mut segments = input.split(SEGMENT_SEPARATOR);
		let version = parse_number(segments.next().unwrap_or_default())?;
		let Some(global_lsn) = segments.next() else {
			return Err(TokenParseError::MissingGlobalLsn(input.to_string()));
		};
		let global_lsn = parse_number(global_lsn)?;

		let mut regions = BTreeMap::new();
		for segment in segments {
			let invalid = || TokenParseError::InvalidRegion {
				segment: segment.to_string(),
			};
			let (region, progress) = segment.split_once(REGION_SEPARATOR).ok_or_else(invalid)?;
			let region = region.parse::<u32>().map_err(|_| invalid())?;
			let progress = parse_number(progress)?;
			match regions.entry(region) {
				Entry::Vacant(slot) => {
					slot.insert(progress);
				}
				Entry::Occupied(_) => return Err(TokenParseError::DuplicateRegion(region)),
			}
		}

		Ok(Self {
			version,
			global_lsn,
			regions,
		})
	}

	/// Token version; advances when the partition topology changes.
	pub fn version(&self) -> i64 {
		self.version
	}

	/// Global logical sequence number of the range.
	pub fn lsn(&self) -> i64 {
		self.global_lsn
	}

	/// Per-region progress, ordered by region id.
	pub fn regions(&self) -> &BTreeMap<u32, i64> {
		&self.regions
	}

	pub fn region_lsn(&self, region: u32) -> Option<i64> {
		self.regions.get(&region).copied()
	}

	/// Combines two observations of the same range.
	///
	/// Version and LSN take the maximum; regions take the per-region maximum
	/// over the union of both region sets.
	pub fn merge(&self, other: &SessionToken) -> SessionToken {
		let mut regions = self.regions.clone();
		for (&region, &progress) in &other.regions {
			regions
				.entry(region)
				.and_modify(|current| *current = (*current).max(progress))
				.or_insert(progress);
		}
		SessionToken {
			version: self.version.max(other.version),
			global_lsn: self.global_lsn.max(other.global_lsn),
			regions,
		}
	}

	/// Merges two optional tokens; a single present operand is returned as is.
	pub fn merge_optional(left: Option<&SessionToken>, right: Option<&SessionToken>) -> Option<SessionToken> {
		match (left, right) {
			(Some(left), Some(right)) => Some(left.merge(right)),
			(Some(token), None) | (None, Some(token)) => Some(token.clone()),
			(None, None) => None,
		}
	}

	/// Returns `true` when `self` has seen everything `other` has.
	///
	/// Every region present in `other` must be present in `self` with at least
	/// the same progress; regions only `self` knows about do not matter.
	pub fn is_at_least_as_advanced_as(&self, other: &SessionToken) -> bool {
		self.version >= other.version
			&& self.global_lsn >= other.global_lsn
			&& other
				.regions
				.iter()
				.all(|(region, progress)| self.regions.get(region).is_some_and(|own| own >= progress))
	}
}

impl fmt::Display for SessionToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{SEGMENT_SEPARATOR}{}", self.version, self.global_lsn)?;
		for (region, progress) in &self.regions {
			write!(f, "{SEGMENT_SEPARATOR}{region}{REGION_SEPARATOR}{progress}")?;
		}
		Ok(())
	}
}

impl FromStr for SessionToken {
	type Err = TokenParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl Serialize for SessionToken {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for SessionToken {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Self::parse(&raw).map_err(serde::de::Error::custom)
	}
}

/// A token scoped to its partition key range: `<rangeId>:<token>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSessionToken {
	pub range_id: String,
	pub token: SessionToken,
}

impl RangeSessionToken {
	pub fn new(range_id: impl Into<String>, token: SessionToken) -> Self {
		Self {
			range_id: range_id.into(),
			token,
		}
	}

	/// Parses `<rangeId>:<token>`, splitting on the first colon.
	pub fn parse(input: &str) -> Result<Self, TokenParseError> {
		let Some((range_id, token)) = input.split_once(RANGE_SEPARATOR) else {
			return Err(TokenParseError::MissingRange(input.to_string()));
		};
		if range_id.is_empty() {
			return Err(TokenParseError::MissingRange(input.to_string()));
		}
		Ok(Self {
			range_id: range_id.to_string(),
			token: SessionToken::parse(token)?,
		})
	}
}

impl fmt::Display for RangeSessionToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{RANGE_SEPARATOR}{}", self.range_id, self.token)
	}
}

/// Parses the comma-joined global form into a per-range map.
///
/// An empty string is an empty map. Repeated range ids are merged.
pub fn parse_global(input: &str) -> Result<BTreeMap<String, SessionToken>, TokenParseError> {
	let mut by_range: BTreeMap<String, SessionToken> = BTreeMap::new();
	if input.is_empty() {
		return Ok(by_range);
	}

	for part in input.split(GLOBAL_SEPARATOR) {
		let RangeSessionToken { range_id, token } = RangeSessionToken::parse(part)?;
		match by_range.entry(range_id) {
			Entry::Vacant(slot) => {
				slot.insert(token);
			}
			Entry::Occupied(mut slot) => {
				let merged = slot.get().merge(&token);
				slot.insert(merged);
			}
		}
	}
	Ok(by_range)
}

/// Formats range-scoped tokens in the global form.
pub fn format_global<'a>(tokens: impl IntoIterator<Item = (&'a str, &'a SessionToken)>) -> String {
	let mut joined = String::new();
	for (range_id, token) in tokens {
		if !joined.is_empty() {
			joined.push(GLOBAL_SEPARATOR);
		}
		joined.push_str(range_id);
		joined.push(RANGE_SEPARATOR);
		joined.push_str(&token.to_string());
	}
	joined
}

fn parse_number(segment: &str) -> Result<i64, TokenParseError> {
	segment.parse::<i64>().map_err(|_| TokenParseError::InvalidNumber {
		segment: segment.to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_version_lsn_and_regions() {
		let token = SessionToken::parse("1#100#1=20#2=5#3=30").unwrap();
		assert_eq!(token.version(), 1);
		assert_eq!(token.lsn(), 100);
		assert_eq!(token.region_lsn(1), Some(20));
		assert_eq!(token.region_lsn(2), Some(5));
		assert_eq!(token.region_lsn(3), Some(30));
		assert_eq!(token.region_lsn(4), None);
	}

	#[test]
	fn parses_token_without_regions() {
		let token = SessionToken::parse("2#7").unwrap();
		assert_eq!(token.lsn(), 7);
		assert!(token.regions().is_empty());
		assert_eq!(token.to_string(), "2#7");
	}

	#[test]
	fn formats_canonical_form() {
		let raw = "1#100#4=90#5=1";
		assert_eq!(SessionToken::parse(raw).unwrap().to_string(), raw);
	}

	#[test]
	fn rejects_malformed_input() {
		assert_eq!(SessionToken::parse(""), Err(TokenParseError::Empty));
		assert_eq!(SessionToken::parse("1"), Err(TokenParseError::MissingGlobalLsn("1".into())));
		assert!(matches!(SessionToken::parse("x#100"), Err(TokenParseError::InvalidNumber { .. })));
		assert!(matches!(SessionToken::parse("1#"), Err(TokenParseError::InvalidNumber { .. })));
		assert!(matches!(SessionToken::parse("1#100#1:20"), Err(TokenParseError::InvalidRegion { .. })));
		assert!(matches!(SessionToken::parse("1#100#a=20"), Err(TokenParseError::InvalidRegion { .. })));
		assert!(matches!(SessionToken::parse("1#100#1=zz"), Err(TokenParseError::InvalidNumber { .. })));
		assert!(matches!(SessionToken::parse("1#100##1=2"), Err(TokenParseError::InvalidRegion { .. })));
		assert_eq!(SessionToken::parse("1#100#1=2#1=3"), Err(TokenParseError::DuplicateRegion(1)));
	}

	#[test]
	fn merge_takes_per_region_maximum() {
		let stored = SessionToken::parse("1#100#1=20#2=5#3=30").unwrap();
		let incoming = SessionToken::parse("1#100#1=31#2=5#3=21").unwrap();
		assert_eq!(stored.merge(&incoming).to_string(), "1#100#1=31#2=5#3=30");
	}

	#[test]
	fn merge_unions_region_sets() {
		let left = SessionToken::parse("1#10#1=5").unwrap();
		let right = SessionToken::parse("2#8#2=7").unwrap();
		let merged = left.merge(&right);
		assert_eq!(merged.to_string(), "2#10#1=5#2=7");
		assert_eq!(merged, right.merge(&left));
	}

	#[test]
	fn merge_optional_returns_present_operand() {
		let token = SessionToken::parse("1#10#1=5").unwrap();
		assert_eq!(SessionToken::merge_optional(Some(&token), None), Some(token.clone()));
		assert_eq!(SessionToken::merge_optional(None, Some(&token)), Some(token.clone()));
		assert_eq!(SessionToken::merge_optional(None, None), None);
	}

	#[test]
	fn advancement_requires_every_region_of_other() {
		let newer = SessionToken::parse("1#105#4=90#5=1").unwrap();
		let older = SessionToken::parse("1#100#4=90#5=1").unwrap();
		assert!(newer.is_at_least_as_advanced_as(&older));
		assert!(!older.is_at_least_as_advanced_as(&newer));

		let extra_region = SessionToken::parse("1#100#4=90#5=1#6=3").unwrap();
		assert!(extra_region.is_at_least_as_advanced_as(&older));
		assert!(!older.is_at_least_as_advanced_as(&extra_region));

		let crossed = SessionToken::parse("1#100#4=95#5=0").unwrap();
		assert!(!crossed.is_at_least_as_advanced_as(&older));
		assert!(!older.is_at_least_as_advanced_as(&crossed));
	}

	#[test]
	fn range_token_splits_on_first_colon() {
		let scoped = RangeSessionToken::parse("range_0:1#100#4=90").unwrap();
		assert_eq!(scoped.range_id, "range_0");
		assert_eq!(scoped.token.lsn(), 100);
		assert_eq!(scoped.to_string(), "range_0:1#100#4=90");

		assert!(matches!(RangeSessionToken::parse("1#100"), Err(TokenParseError::MissingRange(_))));
		assert!(matches!(RangeSessionToken::parse(":1#100"), Err(TokenParseError::MissingRange(_))));
		assert!(matches!(RangeSessionToken::parse("range_0:1#100:2"), Err(TokenParseError::InvalidNumber { .. })));
	}

	#[test]
	fn global_form_merges_repeated_ranges() {
		let parsed = parse_global("range_0:1#100#1=2,range_1:1#50,range_0:1#90#1=9").unwrap();
		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed["range_0"].to_string(), "1#100#1=9");
		assert_eq!(parsed["range_1"].lsn(), 50);
		assert!(parse_global("").unwrap().is_empty());
		assert!(parse_global("range_0:1#100,").is_err());
	}

	#[test]
	fn global_form_formats_in_given_order() {
		let first = SessionToken::parse("1#100").unwrap();
		let second = SessionToken::parse("1#101#2=3").unwrap();
		let formatted = format_global([("range_0", &first), ("range_1", &second)]);
		assert_eq!(formatted, "range_0:1#100,range_1:1#101#2=3");
		assert_eq!(format_global(std::iter::empty::<(&str, &SessionToken)>()), "");
	}

	#[test]
	fn serializes_as_wire_string() {
		let token = SessionToken::parse("3#42#1=7").unwrap();
		let json = serde_json::to_string(&token).unwrap();
		assert_eq!(json, "\"3#42#1=7\"");
		let back: SessionToken = serde_json::from_str(&json).unwrap();
		assert_eq!(back, token);
		assert!(serde_json::from_str::<SessionToken>("\"bogus\"").is_err());
	}
}
