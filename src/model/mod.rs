//! Data types, split by where they live.
//!
//! - [`db`] types are stored as-is in the database.
//! - [`api`] types are what clients send and receive.
//! - [`mongodb`] holds the glue between the two and MongoDB.

pub mod api;
pub mod db;
pub mod mongodb;
