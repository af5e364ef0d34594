//! Client-side session token tracking for partitioned document stores.
//!
//! Session consistency promises a client that it observes its own writes
//! without asking the service on every read. The client achieves this by
//! remembering, per collection and partition key range, the most advanced
//! session token any response has shown it, and by sending those tokens back
//! on later requests.
//!
//! # Components
//!
//! * [`SessionIndex`]: the concurrent store (collection, range) → token
//! * [`identity`]: maps request addressing (name or resource id) to the
//!   canonical collection handle used as the index key
//! * [`SessionAdapter`]: decides per request which token to attach and per
//!   response whether and how to update the index
//! * [`SessionConfig`]: construction-time configuration, including the
//!   capture toggle
//!
//! Wire-level types live in `docsession-protocol` and are re-exported here.

pub mod adapter;
pub mod config;
pub mod error;
pub mod identity;
pub mod index;

pub use adapter::SessionAdapter;
pub use config::SessionConfig;
pub use docsession_protocol as protocol;
pub use docsession_protocol::{
	Addressing, OperationCategory, OperationType, PartitionKeyRange, RangeSessionToken, RequestDescriptor, ResourceId, ResourceType,
	ResponseHeaders, SessionToken,
};
pub use error::{Result, SessionError};
pub use identity::CollectionHandle;
pub use index::{CaptureOutcome, SessionIndex, SkipReason};
