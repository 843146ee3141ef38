//! Voxlink-Common: Shared types and errors.
//!
//! This crate provides the vocabulary used across voxlink:
//!
//! - **Typed IDs**: [`EntryId`] for catalog entries, [`SessionId`] for browsing sessions
//! - **Core Types**: the canonical [`CatalogEntry`] and the [`LinkVariant`] tag
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use voxlink_common::{CatalogEntry, EntryId, Error, Result};
//!
//! let entry = CatalogEntry::new(EntryId::from("42"), "sample", "https://provider/x?a=1");
//! assert_eq!(entry.player_link, "https://provider/x?a=1");
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("entry 99"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
