//! nestx Core Types
//!
//! This crate provides the foundational types shared by the nestx crates:
//! - Identity types (ObjectId, TxnId, SessionId)
//! - Object handles (ObjectRef) used to reference domain objects weakly
//! - Value types (the Value enum and Attributes snapshots)
//! - Common error types

mod error;
mod id;
mod value;

pub use error::*;
pub use id::*;
pub use value::*;
