//! Import module containing the idempotent batch-import protocol

pub mod canonical;
pub mod protocol;

pub use canonical::*;
pub use protocol::*;
