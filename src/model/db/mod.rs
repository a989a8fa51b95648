//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//!
//! Each entity comes as a `*Core` (its fields), a `New*` alias for inserting,
//! and a full type carrying the database ID.

pub mod candidate;
pub mod election;
pub mod party;
pub mod user;
pub mod vote;
pub mod voter;
