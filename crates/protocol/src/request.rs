//! Outgoing request descriptor and operation taxonomy.

use serde::{Deserialize, Serialize};

/// Operation performed by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
	Create,
	Read,
	ReadFeed,
	Query,
	SqlQuery,
	QueryPlan,
	Replace,
	Upsert,
	Patch,
	Delete,
	ExecuteJavaScript,
	Batch,
	Head,
	HeadFeed,
}

impl OperationType {
	/// Operations that never modify state on the service.
	pub fn is_read_only(self) -> bool {
		matches!(
			self,
			Self::Read | Self::ReadFeed | Self::Query | Self::SqlQuery | Self::QueryPlan | Self::Head | Self::HeadFeed
		)
	}
}

/// Kind of resource a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
	Database,
	DocumentCollection,
	Document,
	Attachment,
	Conflict,
	StoredProcedure,
	Trigger,
	UserDefinedFunction,
	User,
	Permission,
	Offer,
	PartitionKeyRange,
	DatabaseAccount,
	Topology,
	ClientEncryptionKey,
	UserDefinedType,
}

/// How a request's response may interact with session tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationCategory {
	/// Served by a partition; its session token is captured.
	Data,
	/// Served by the metadata (master) partition; never captured.
	Master,
	/// Removes a collection; its tokens are evicted.
	CollectionDelete,
}

impl OperationCategory {
	pub fn classify(resource_type: ResourceType, operation: OperationType) -> Self {
		use OperationType as Op;
		use ResourceType as Res;

		match (resource_type, operation) {
			(Res::DocumentCollection, Op::Delete) => Self::CollectionDelete,
			(Res::DocumentCollection, Op::ReadFeed | Op::Query | Op::SqlQuery) => Self::Master,
			(
				Res::Database
				| Res::User
				| Res::Permission
				| Res::Offer
				| Res::PartitionKeyRange
				| Res::DatabaseAccount
				| Res::Topology
				| Res::ClientEncryptionKey
				| Res::UserDefinedType,
				_,
			) => Self::Master,
			_ => Self::Data,
		}
	}
}

/// Whether the request addresses its resource by name or by resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Addressing {
	#[default]
	Name,
	ResourceId,
}

/// Partition key range a request was routed to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKeyRange {
	pub id: String,
	/// Ranges this one was split from, oldest first.
	#[serde(default)]
	pub parents: Vec<String>,
}

impl PartitionKeyRange {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			parents: Vec::new(),
		}
	}

	pub fn with_parents<I, S>(mut self, parents: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.parents = parents.into_iter().map(Into::into).collect();
		self
	}

	/// Ancestors from the nearest (most recent split) to the furthest.
	pub fn ancestors_nearest_first(&self) -> impl Iterator<Item = &str> {
		self.parents.iter().rev().map(String::as_str)
	}
}

/// What the session layer needs to know about an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
	pub operation: OperationType,
	pub resource_type: ResourceType,
	/// Path (`dbs/db1/colls/c1/docs/d1`) or resource id the request addresses.
	pub resource_address: String,
	#[serde(default)]
	pub addressing: Addressing,
	/// Resource id resolved for the request, if known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resource_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resolved_range: Option<PartitionKeyRange>,
	/// Session token supplied by the caller, in global form.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_token: Option<String>,
}

impl RequestDescriptor {
	pub fn new(operation: OperationType, resource_type: ResourceType, resource_address: impl Into<String>, addressing: Addressing) -> Self {
		Self {
			operation,
			resource_type,
			resource_address: resource_address.into(),
			addressing,
			resource_id: None,
			resolved_range: None,
			session_token: None,
		}
	}

	/// A request addressed by path.
	pub fn by_name(operation: OperationType, resource_type: ResourceType, path: impl Into<String>) -> Self {
		Self::new(operation, resource_type, path, Addressing::Name)
	}

	/// A request addressed by resource id.
	pub fn by_id(operation: OperationType, resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
		let resource_id = resource_id.into();
		let mut request = Self::new(operation, resource_type, resource_id.clone(), Addressing::ResourceId);
		request.resource_id = Some(resource_id);
		request
	}

	pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
		self.resource_id = Some(resource_id.into());
		self
	}

	pub fn with_resolved_range(mut self, range: PartitionKeyRange) -> Self {
		self.resolved_range = Some(range);
		self
	}

	pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
		self.session_token = Some(token.into());
		self
	}

	pub fn is_name_based(&self) -> bool {
		self.addressing == Addressing::Name
	}

	pub fn category(&self) -> OperationCategory {
		OperationCategory::classify(self.resource_type, self.operation)
	}

	/// Resource id, ignoring empty strings.
	pub fn resource_id(&self) -> Option<&str> {
		self.resource_id.as_deref().filter(|id| !id.is_empty())
	}

	/// Resource id the request is keyed by.
	///
	/// Requests addressed by resource id fall back to their address when no
	/// separate id was resolved.
	pub fn effective_resource_id(&self) -> Option<&str> {
		self.resource_id().or_else(|| {
			(!self.is_name_based() && !self.resource_address.is_empty()).then_some(self.resource_address.as_str())
		})
	}

	/// Caller-supplied session token, ignoring empty strings.
	pub fn explicit_session_token(&self) -> Option<&str> {
		self.session_token.as_deref().filter(|token| !token.is_empty())
	}
}
