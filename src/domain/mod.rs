//! Domain model for the conversion pipeline
//!
//! Plain serde types, independent of the database entities that persist them.

pub mod digest;
pub mod item;
pub mod rights;
pub mod unit;

pub use digest::{digest_of, Digests};
pub use item::{AuthorRecord, IssueRef, ItemRecord, ItemStatus, SuppFile};
pub use rights::normalize_rights;
pub use unit::{UnitKind, UnitNode};
