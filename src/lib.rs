//! # Reconcile Core
//!
//! A multi-tenant invoice reconciliation library matching bank transactions
//! against open invoices, with exactly-once batch imports under
//! client-supplied idempotency keys.
//!
//! ## Features
//!
//! - **Idempotent imports**: transaction batches apply at most once per
//!   `(idempotency key, tenant)`; retries replay the stored result verbatim
//! - **Match scoring**: weighted amount, date-proximity, and
//!   description-similarity signals produce ranked match candidates
//! - **Match confirmation**: one-way confirmation flow that retires the
//!   matched invoice from future runs
//! - **Explanations**: best-effort natural-language explanations with a
//!   deterministic heuristic fallback
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage; every entity is tenant-scoped
//!
//! ## Quick Start
//!
//! ```rust
//! use reconcile_core::{MemoryStorage, Reconciler};
//!
//! // The in-memory backend is for tests and development; production
//! // deployments implement ReconciliationStorage over a real database.
//! // let mut reconciler = Reconciler::new(MemoryStorage::new());
//! ```

pub mod explain;
pub mod import;
pub mod matching;
pub mod reconciler;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use reconciler::*;
pub use explain::*;
pub use import::*;
pub use matching::*;
pub use traits::*;
pub use types::*;
pub use utils::memory_storage::MemoryStorage;
