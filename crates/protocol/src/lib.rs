//! Wire types for partition session tokens.
//!
//! This crate contains the values exchanged with a partitioned document
//! store that matter for session consistency: the session token carried in
//! `x-ms-session-token`, collection resource ids, collection paths, the
//! response header bag, and the descriptor of an outgoing request.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: parsing, formatting and value-level algebra only
//! * Stateless: no caches, no locks, no shared state
//! * Stable: changes only when the wire format changes
//!
//! The concurrent token index and the request/response adapter are built on
//! top of these types in `docsession`.

pub mod headers;
pub mod path;
pub mod request;
pub mod resource_id;
pub mod token;

pub use headers::*;
pub use path::collection_path;
pub use request::*;
pub use resource_id::{ResourceId, ResourceIdError};
pub use token::*;
