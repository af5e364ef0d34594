//! Glue between a request pipeline and the [`SessionIndex`].
//!
//! Before dispatch the adapter picks the session token to attach; after a
//! response it decides whether the index learns a token, evicts a collection,
//! or ignores the response.

use std::sync::Arc;

use docsession_protocol::{
	OperationCategory, RangeSessionToken, RequestDescriptor, ResponseHeaders, SUB_STATUS_OWNER_RESOURCE_NOT_FOUND, SessionToken,
	collection_path, parse_global,
};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::index::{CaptureOutcome, SessionIndex};

const STATUS_NOT_FOUND: u16 = 404;

#[derive(Debug, Clone)]
pub struct SessionAdapter {
	index: Arc<SessionIndex>,
	attach_to_writes: bool,
}

impl SessionAdapter {
	pub fn new(index: Arc<SessionIndex>, config: &SessionConfig) -> Self {
		Self {
			index,
			attach_to_writes: config.attach_to_writes,
		}
	}

	pub fn index(&self) -> &Arc<SessionIndex> {
		&self.index
	}

	/// Global-form token to attach to `request`, if any.
	pub fn global_token_for(&self, request: &RequestDescriptor) -> Option<String> {
		if request.category() == OperationCategory::Master {
			return None;
		}
		if let Some(explicit) = request.explicit_session_token() {
			return Some(explicit.to_string());
		}
		if !self.attaches_to(request) {
			return None;
		}
		let global = self.index.resolve_global_session_token(request);
		(!global.is_empty()).then_some(global)
	}

	/// Range-scoped token for the range `request` was routed to.
	///
	/// A caller-supplied global token is narrowed to that range (or its nearest
	/// known ancestor); otherwise the index is consulted. Fails only when the
	/// caller-supplied token is malformed.
	pub fn partition_token_for(&self, request: &RequestDescriptor) -> Result<Option<String>> {
		let Some(range) = request.resolved_range.as_ref() else {
			return Ok(None);
		};
		if request.category() == OperationCategory::Master {
			return Ok(None);
		}

		let token = match request.explicit_session_token() {
			Some(explicit) => narrow(explicit, &range.id, range.ancestors_nearest_first())?,
			None if self.attaches_to(request) => self.index.resolve_partition_local_session_token(request, &range.id),
			None => None,
		};
		Ok(token.map(|token| RangeSessionToken::new(range.id.clone(), token).to_string()))
	}

	/// Feeds a response back into the index.
	pub fn capture(&self, request: &RequestDescriptor, status: u16, headers: &ResponseHeaders) -> CaptureOutcome {
		if request.category() == OperationCategory::CollectionDelete && is_success(status) {
			let cleared = self.evict_deleted(request, headers);
			info!(target = "docsession.adapter", address = %request.resource_address, cleared, "collection deleted");
			return CaptureOutcome::Evicted { cleared };
		}
		if status == STATUS_NOT_FOUND && headers.sub_status() == Some(SUB_STATUS_OWNER_RESOURCE_NOT_FOUND) {
			let cleared = self.on_collection_gone(request);
			info!(target = "docsession.adapter", address = %request.resource_address, cleared, "owner collection gone");
			return CaptureOutcome::Evicted { cleared };
		}

		let outcome = self.index.set_session_token(request, headers);
		debug!(target = "docsession.adapter", status, outcome = outcome.label(), "captured response");
		outcome
	}

	/// Evicts the collection `request` addresses, by name or by resource id.
	pub fn on_collection_gone(&self, request: &RequestDescriptor) -> bool {
		if request.is_name_based() {
			return collection_path(&request.resource_address).is_some_and(|name| self.index.clear_token_by_collection_full_name(name));
		}
		request.effective_resource_id().is_some_and(|id| self.index.clear_token_by_resource_id(id))
	}

	fn evict_deleted(&self, request: &RequestDescriptor, headers: &ResponseHeaders) -> bool {
		let resource_id = if request.is_name_based() {
			headers.owner_id().or_else(|| request.effective_resource_id())
		} else {
			request.effective_resource_id()
		};
		let by_id = resource_id.is_some_and(|id| self.index.clear_token_by_resource_id(id));
		let by_name = collection_path(&request.resource_address).is_some_and(|name| self.index.clear_token_by_collection_full_name(name));
		by_id || by_name
	}

	fn attaches_to(&self, request: &RequestDescriptor) -> bool {
		request.operation.is_read_only() || self.attach_to_writes
	}
}

fn is_success(status: u16) -> bool {
	(200..300).contains(&status)
}

/// Picks the token for `range_id` out of a global-form token.
fn narrow<'a>(global: &str, range_id: &str, mut ancestors: impl Iterator<Item = &'a str>) -> Result<Option<SessionToken>> {
	let mut by_range = parse_global(global)?;
	if let Some(token) = by_range.remove(range_id) {
		return Ok(Some(token));
	}
	Ok(ancestors.find_map(|parent| by_range.remove(parent)))
}
