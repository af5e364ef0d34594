//! The session index: (collection, partition key range) → most advanced token seen.
//!
//! Two lock levels keep lookups off a single global lock. The outer map goes
//! from collection key to that collection's range table, each table sits behind
//! its own lock, and every slot update is one read-merge-write critical section
//! under the table's write lock. Lock order is aliases → tables → table.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use docsession_protocol::{OperationCategory, RangeSessionToken, RequestDescriptor, ResponseHeaders, SessionToken, collection_path, format_global};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::identity::{CollectionAliases, CollectionHandle, collection_key, resolve_write_target};

type RangeTable = Arc<RwLock<BTreeMap<String, SessionToken>>>;

/// Why a response left the index untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	CaptureDisabled,
	NoSessionToken,
	MasterOperation,
	UnknownCollection,
}

/// Result of offering a response to the index.
#[derive(Debug)]
pub enum CaptureOutcome {
	/// The slot now holds a more advanced token.
	Stored { collection_id: u64, range_id: String },
	/// The slot already held a token at least as advanced.
	Unchanged { collection_id: u64, range_id: String },
	/// The collection's tokens were evicted.
	Evicted { cleared: bool },
	Skipped(SkipReason),
	Rejected(SessionError),
}

impl CaptureOutcome {
	pub fn is_stored(&self) -> bool {
		matches!(self, Self::Stored { .. })
	}

	/// Short label used in logs and CLI output.
	pub fn label(&self) -> &'static str {
		match self {
			Self::Stored { .. } => "stored",
			Self::Unchanged { .. } => "unchanged",
			Self::Evicted { .. } => "evicted",
			Self::Skipped(SkipReason::CaptureDisabled) => "skipped:capture-disabled",
			Self::Skipped(SkipReason::NoSessionToken) => "skipped:no-session-token",
			Self::Skipped(SkipReason::MasterOperation) => "skipped:master-operation",
			Self::Skipped(SkipReason::UnknownCollection) => "skipped:unknown-collection",
			Self::Rejected(_) => "rejected",
		}
	}
}

/// Concurrent store of the most advanced session token per collection and range.
///
/// Shared by every request of a client, typically behind an [`Arc`]. With
/// capture disabled every write is skipped and every lookup misses.
#[derive(Debug)]
pub struct SessionIndex {
	capture_enabled: bool,
	host_name: Option<String>,
	aliases: RwLock<CollectionAliases>,
	tables: RwLock<HashMap<u64, RangeTable>>,
}

impl Default for SessionIndex {
	fn default() -> Self {
		Self::new(&SessionConfig::default())
	}
}

impl SessionIndex {
	pub fn new(config: &SessionConfig) -> Self {
		Self {
			capture_enabled: config.capture_enabled,
			host_name: config.host_name.clone(),
			aliases: RwLock::new(CollectionAliases::default()),
			tables: RwLock::new(HashMap::new()),
		}
	}

	pub fn is_capture_enabled(&self) -> bool {
		self.capture_enabled
	}

	pub fn host_name(&self) -> Option<&str> {
		self.host_name.as_deref()
	}

	/// Records the session token of a response to `request`.
	///
	/// The collection is resolved with [`resolve_write_target`]; when the
	/// response names no id, a previously learned name association is used.
	pub fn set_session_token(&self, request: &RequestDescriptor, headers: &ResponseHeaders) -> CaptureOutcome {
		if !self.capture_enabled {
			return CaptureOutcome::Skipped(SkipReason::CaptureDisabled);
		}
		let Some(raw) = headers.session_token() else {
			return CaptureOutcome::Skipped(SkipReason::NoSessionToken);
		};
		if request.category() != OperationCategory::Data {
			return CaptureOutcome::Skipped(SkipReason::MasterOperation);
		}

		let scoped = match RangeSessionToken::parse(raw) {
			Ok(scoped) => scoped,
			Err(err) => return self.reject(err.into(), raw),
		};
		let target = match resolve_write_target(request, headers) {
			Ok(target) => target,
			Err(err) => return self.reject(err, raw),
		};

		let collection_id = match target.collection_id {
			Some(id) => id,
			None => {
				let learned = target.full_name.as_deref().and_then(|name| self.aliases.read().id_for(name));
				let Some(id) = learned else {
					debug!(target = "docsession.index", address = %request.resource_address, "no collection identity for response");
					return CaptureOutcome::Skipped(SkipReason::UnknownCollection);
				};
				id
			}
		};
		self.store(collection_id, target.full_name.as_deref(), scoped)
	}

	/// Records a session token for an explicitly identified collection.
	pub fn set_session_token_for_collection(&self, collection_rid: &str, collection_full_name: &str, headers: &ResponseHeaders) -> CaptureOutcome {
		if !self.capture_enabled {
			return CaptureOutcome::Skipped(SkipReason::CaptureDisabled);
		}
		let Some(raw) = headers.session_token() else {
			return CaptureOutcome::Skipped(SkipReason::NoSessionToken);
		};

		let scoped = match RangeSessionToken::parse(raw) {
			Ok(scoped) => scoped,
			Err(err) => return self.reject(err.into(), raw),
		};
		let collection_id = match collection_key(collection_rid) {
			Ok(Some(id)) => id,
			Ok(None) => return CaptureOutcome::Skipped(SkipReason::UnknownCollection),
			Err(err) => return self.reject(err.into(), raw),
		};
		self.store(collection_id, collection_path(collection_full_name), scoped)
	}

	/// Token for `range_id`, falling back to the request's resolved range ancestors, nearest first.
	pub fn resolve_partition_local_session_token(&self, request: &RequestDescriptor, range_id: &str) -> Option<SessionToken> {
		let table = self.table_for_request(request)?;
		let table = table.read();
		if let Some(token) = table.get(range_id) {
			return Some(token.clone());
		}
		request
			.resolved_range
			.as_ref()?
			.ancestors_nearest_first()
			.find_map(|parent| table.get(parent))
			.cloned()
	}

	/// Every token of the request's collection in global form; empty on a miss.
	pub fn resolve_global_session_token(&self, request: &RequestDescriptor) -> String {
		let Some(table) = self.table_for_request(request) else {
			return String::new();
		};
		let table = table.read();
		format_global(table.iter().map(|(range_id, token)| (range_id.as_str(), token)))
	}

	/// Snapshot of a collection's range table.
	pub fn tokens_for(&self, collection_id: u64) -> Option<BTreeMap<String, SessionToken>> {
		if !self.capture_enabled {
			return None;
		}
		let table = self.tables.read().get(&collection_id).cloned()?;
		let snapshot = table.read().clone();
		Some(snapshot)
	}

	/// Identity the index would read under for `request`.
	pub fn collection_for(&self, request: &RequestDescriptor) -> Option<CollectionHandle> {
		if !self.capture_enabled {
			return None;
		}
		let aliases = self.aliases.read();
		let resource_id = aliases.read_key(request)?;
		Some(CollectionHandle {
			resource_id,
			full_name: aliases.name_for(resource_id).map(str::to_string),
		})
	}

	/// Evicts every token of the collection currently known by `full_name`.
	pub fn clear_token_by_collection_full_name(&self, full_name: &str) -> bool {
		let Some(full_name) = collection_path(full_name) else {
			return false;
		};
		let mut aliases = self.aliases.write();
		let Some(collection_id) = aliases.remove_name(full_name) else {
			return false;
		};
		self.tables.write().remove(&collection_id);
		debug!(target = "docsession.index", collection_id, %full_name, "cleared collection by name");
		true
	}

	/// Evicts every token of the collection with resource id `resource_id`.
	pub fn clear_token_by_resource_id(&self, resource_id: &str) -> bool {
		let collection_id = match collection_key(resource_id) {
			Ok(Some(id)) => id,
			Ok(None) => return false,
			Err(err) => {
				warn!(target = "docsession.index", error = %err, "ignoring eviction for malformed resource id");
				return false;
			}
		};
		let mut aliases = self.aliases.write();
		let had_name = aliases.remove_id(collection_id).is_some();
		let had_table = self.tables.write().remove(&collection_id).is_some();
		if !(had_name || had_table) {
			return false;
		}
		debug!(target = "docsession.index", collection_id, "cleared collection by resource id");
		true
	}

	/// Number of collections with a token table.
	pub fn collection_count(&self) -> usize {
		self.tables.read().len()
	}

	fn reject(&self, err: SessionError, raw: &str) -> CaptureOutcome {
		warn!(target = "docsession.index", error = %err, token = %raw, host = ?self.host_name, "discarding malformed session token");
		CaptureOutcome::Rejected(err)
	}

	fn store(&self, collection_id: u64, full_name: Option<&str>, scoped: RangeSessionToken) -> CaptureOutcome {
		// The aliases guard is held across the merge so an eviction never
		// interleaves between association and insert.
		if let Some(name) = full_name {
			let aliases = self.aliases.read();
			if aliases.is_associated(name, collection_id) {
				return self.merge_into(collection_id, scoped);
			}
			drop(aliases);

			let mut aliases = self.aliases.write();
			aliases.associate(name, collection_id);
			debug!(target = "docsession.index", collection_id, full_name = %name, "learned collection name");
			return self.merge_into(collection_id, scoped);
		}

		let _aliases = self.aliases.read();
		self.merge_into(collection_id, scoped)
	}

	fn merge_into(&self, collection_id: u64, scoped: RangeSessionToken) -> CaptureOutcome {
		let RangeSessionToken { range_id, token } = scoped;
		let table = self.table_or_insert(collection_id);
		let mut table = table.write();
		match table.entry(range_id) {
			Entry::Vacant(slot) => {
				let range_id = slot.key().clone();
				debug!(target = "docsession.index", collection_id, %range_id, lsn = token.lsn(), "stored session token");
				slot.insert(token);
				CaptureOutcome::Stored { collection_id, range_id }
			}
			Entry::Occupied(mut slot) => {
				let range_id = slot.key().clone();
				if slot.get().is_at_least_as_advanced_as(&token) {
					return CaptureOutcome::Unchanged { collection_id, range_id };
				}
				let merged = slot.get().merge(&token);
				debug!(target = "docsession.index", collection_id, %range_id, lsn = merged.lsn(), "merged session token");
				slot.insert(merged);
				CaptureOutcome::Stored { collection_id, range_id }
			}
		}
	}

	fn table_or_insert(&self, collection_id: u64) -> RangeTable {
		if let Some(table) = self.tables.read().get(&collection_id) {
			return Arc::clone(table);
		}
		Arc::clone(self.tables.write().entry(collection_id).or_default())
	}

	fn table_for_request(&self, request: &RequestDescriptor) -> Option<RangeTable> {
		if !self.capture_enabled {
			return None;
		}
		let collection_id = self.aliases.read().read_key(request)?;
		self.tables.read().get(&collection_id).cloned()
	}
}
