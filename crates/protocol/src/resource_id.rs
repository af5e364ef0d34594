//! Stable resource ids assigned by the service.
//!
//! Ids are base64 strings in which `/` is replaced by `-`, for example
//! `uf4PAK6T-Cw=`. The first eight decoded bytes name the owning database and
//! collection; longer ids (documents, attachments) extend that prefix.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

const MAX_ID_BYTES: usize = 20;
const COLLECTION_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
	#[error("resource id is empty")]
	Empty,
	#[error("resource id `{0}` is not valid base64")]
	Encoding(String),
	#[error("resource id `{id}` decodes to {len} bytes")]
	Length { id: String, len: usize },
}

/// Database and collection parts of a resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResourceId {
	database: u32,
	collection: u32,
}

impl ResourceId {
	/// Builds the id of a collection inside a database.
	pub fn for_collection(database: u32, collection: u32) -> Self {
		Self {
			database,
			collection: collection | COLLECTION_FLAG,
		}
	}

	pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
		if id.is_empty() {
			return Err(ResourceIdError::Empty);
		}

		let bytes = STANDARD
			.decode(id.replace('-', "/"))
			.map_err(|_| ResourceIdError::Encoding(id.to_string()))?;
		if bytes.len() < 4 || bytes.len() > MAX_ID_BYTES {
			return Err(ResourceIdError::Length {
				id: id.to_string(),
				len: bytes.len(),
			});
		}

		let database = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
		let collection = match bytes.get(4..8) {
			Some(&[a, b, c, d]) => u32::from_be_bytes([a, b, c, d]),
			_ => 0,
		};
		// The slot after the database holds a user id when the flag is clear.
		let collection = if collection & COLLECTION_FLAG != 0 { collection } else { 0 };

		Ok(Self { database, collection })
	}

	pub fn database(&self) -> u32 {
		self.database
	}

	/// Raw collection part, or `0` when the id does not name a collection.
	pub fn collection(&self) -> u32 {
		self.collection
	}

	/// Numeric handle of the owning collection, unique across databases.
	pub fn unique_collection_id(&self) -> Option<u64> {
		(self.collection != 0).then(|| (u64::from(self.database) << 32) | u64::from(self.collection))
	}

	/// The collection-level id, dropping any document part.
	pub fn collection_id(&self) -> Option<ResourceId> {
		(self.collection != 0).then_some(*self)
	}
}

impl fmt::Display for ResourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut bytes = Vec::with_capacity(8);
		bytes.extend_from_slice(&self.database.to_be_bytes());
		if self.collection != 0 {
			bytes.extend_from_slice(&self.collection.to_be_bytes());
		}
		f.write_str(&STANDARD.encode(bytes).replace('/', "-"))
	}
}
