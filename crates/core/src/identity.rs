//! Collection identity: which collection a request or response belongs to.
//!
//! A collection is addressed either by its full name (`dbs/<db>/colls/<coll>`)
//! or by its resource id. The index keys token tables by the numeric form of
//! the resource id and keeps a name ↔ id bijection learned from responses.

use std::collections::HashMap;

use docsession_protocol::{OWNER_FULL_NAME, RequestDescriptor, ResourceId, ResourceIdError, ResponseHeaders, collection_path};
use serde::Serialize;

use crate::error::{Result, SessionError};

/// Canonical identity of a tracked collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionHandle {
	pub resource_id: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub full_name: Option<String>,
}

/// Parses a resource id into the numeric key of its owning collection.
///
/// Ids that do not name a collection (database or user ids) yield `None`.
pub fn collection_key(resource_id: &str) -> std::result::Result<Option<u64>, ResourceIdError> {
	Ok(ResourceId::parse(resource_id)?.unique_collection_id())
}

/// Identity a response should be recorded under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteTarget {
	pub collection_id: Option<u64>,
	pub full_name: Option<String>,
}

/// Resolves where a response's session token belongs.
///
/// The owner full name on the response is preferred over the request address.
/// The owner id is only consulted for name-based requests; a request addressed
/// by resource id keeps its own id.
pub fn resolve_write_target(request: &RequestDescriptor, headers: &ResponseHeaders) -> Result<WriteTarget> {
	let full_name = match headers.owner_full_name() {
		Some(owner) => Some(collection_path(owner).ok_or_else(|| SessionError::MalformedHeader {
			header: OWNER_FULL_NAME,
			value: owner.to_string(),
		})?),
		None => collection_path(&request.resource_address),
	}
	.map(str::to_string);

	let resource_id = if request.is_name_based() {
		headers.owner_id().or_else(|| request.effective_resource_id())
	} else {
		request.effective_resource_id()
	};
	let collection_id = match resource_id {
		Some(id) => collection_key(id)?,
		None => None,
	};

	Ok(WriteTarget { collection_id, full_name })
}

/// Bidirectional name ↔ id association.
#[derive(Debug, Default)]
pub struct CollectionAliases {
	ids_by_name: HashMap<String, u64>,
	names_by_id: HashMap<u64, String>,
}

impl CollectionAliases {
	pub fn id_for(&self, full_name: &str) -> Option<u64> {
		self.ids_by_name.get(full_name).copied()
	}

	pub fn name_for(&self, collection_id: u64) -> Option<&str> {
		self.names_by_id.get(&collection_id).map(String::as_str)
	}

	pub fn is_associated(&self, full_name: &str, collection_id: u64) -> bool {
		self.id_for(full_name) == Some(collection_id)
	}

	/// Links `full_name` and `collection_id`, dropping any stale link either side had.
	pub fn associate(&mut self, full_name: &str, collection_id: u64) {
		match self.ids_by_name.insert(full_name.to_string(), collection_id) {
			Some(previous_id) if previous_id != collection_id => {
				self.names_by_id.remove(&previous_id);
			}
			_ => {}
		}
		match self.names_by_id.insert(collection_id, full_name.to_string()) {
			Some(previous_name) if previous_name != full_name => {
				self.ids_by_name.remove(&previous_name);
			}
			_ => {}
		}
	}

	/// Forgets a name, returning the id it pointed at.
	pub fn remove_name(&mut self, full_name: &str) -> Option<u64> {
		let collection_id = self.ids_by_name.remove(full_name)?;
		if self.name_for(collection_id) == Some(full_name) {
			self.names_by_id.remove(&collection_id);
		}
		Some(collection_id)
	}

	/// Forgets an id together with the name still pointing at it.
	pub fn remove_id(&mut self, collection_id: u64) -> Option<String> {
		let full_name = self.names_by_id.remove(&collection_id)?;
		if self.id_for(&full_name) == Some(collection_id) {
			self.ids_by_name.remove(&full_name);
		}
		Some(full_name)
	}

	pub fn len(&self) -> usize {
		self.ids_by_name.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids_by_name.is_empty()
	}

	/// Key for reading on behalf of `request`.
	///
	/// Requests by resource id use their own id; name-based requests need a
	/// learned association for their collection path.
	pub fn read_key(&self, request: &RequestDescriptor) -> Option<u64> {
		if request.is_name_based() {
			collection_path(&request.resource_address).and_then(|name| self.id_for(name))
		} else {
			request.effective_resource_id().and_then(|id| collection_key(id).ok().flatten())
		}
	}
}
