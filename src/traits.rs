//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::types::*;

/// Storage gateway for the reconciliation system
///
/// This trait allows the core to work with any transactional backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these
/// methods. The backend must provide atomic multi-row commit for the
/// methods documented as atomic, enforce a uniqueness constraint on
/// `(idempotency key, tenant_id)`, and cascade candidate deletion when an
/// invoice or transaction is deleted. The storage is the sole mutator of
/// persisted state; the engines hold no independent cache.
#[async_trait]
pub trait ReconciliationStorage: Send + Sync {
    /// Save a tenant
    async fn save_tenant(&mut self, tenant: &Tenant) -> ReconcileResult<()>;

    /// Get a tenant by ID
    async fn get_tenant(&self, tenant_id: &str) -> ReconcileResult<Option<Tenant>>;

    /// List all tenants
    async fn list_tenants(&self) -> ReconcileResult<Vec<Tenant>>;

    /// Save a vendor
    async fn save_vendor(&mut self, vendor: &Vendor) -> ReconcileResult<()>;

    /// Get a vendor by ID
    async fn get_vendor(&self, vendor_id: &str) -> ReconcileResult<Option<Vendor>>;

    /// List vendors belonging to a tenant
    async fn list_vendors(&self, tenant_id: &str) -> ReconcileResult<Vec<Vendor>>;

    /// Save an invoice
    async fn save_invoice(&mut self, invoice: &Invoice) -> ReconcileResult<()>;

    /// Get an invoice by ID, regardless of tenant
    ///
    /// Tenant ownership checks are the caller's responsibility; this is what
    /// lets the engines distinguish "not found" from "wrong tenant".
    async fn get_invoice(&self, invoice_id: &str) -> ReconcileResult<Option<Invoice>>;

    /// List a tenant's invoices matching the filter, in insertion order
    async fn list_invoices(
        &self,
        tenant_id: &str,
        filter: &InvoiceFilter,
    ) -> ReconcileResult<Vec<Invoice>>;

    /// Update an existing invoice
    async fn update_invoice(&mut self, invoice: &Invoice) -> ReconcileResult<()>;

    /// Delete an invoice and cascade deletion of its match candidates
    async fn delete_invoice(&mut self, invoice_id: &str) -> ReconcileResult<()>;

    /// Persist a batch of bank transactions atomically (all or nothing)
    async fn save_transactions(
        &mut self,
        transactions: &[BankTransaction],
    ) -> ReconcileResult<()>;

    /// Get a bank transaction by ID, regardless of tenant
    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconcileResult<Option<BankTransaction>>;

    /// List a tenant's bank transactions, in insertion order
    async fn list_transactions(&self, tenant_id: &str) -> ReconcileResult<Vec<BankTransaction>>;

    /// Persist a batch of match candidates atomically (all or nothing)
    async fn save_candidates(&mut self, candidates: &[MatchCandidate]) -> ReconcileResult<()>;

    /// Get a match candidate by ID, regardless of tenant
    async fn get_candidate(&self, candidate_id: &str) -> ReconcileResult<Option<MatchCandidate>>;

    /// List a tenant's match candidates, in insertion order
    async fn list_candidates(&self, tenant_id: &str) -> ReconcileResult<Vec<MatchCandidate>>;

    /// Update an existing match candidate
    async fn update_candidate(&mut self, candidate: &MatchCandidate) -> ReconcileResult<()>;

    /// Get the idempotency record for `(key, tenant)`
    async fn get_idempotency_record(
        &self,
        tenant_id: &str,
        key: &str,
    ) -> ReconcileResult<Option<IdempotencyRecord>>;

    /// Insert an idempotency record, exclusively on `(key, tenant)`
    ///
    /// Returns `Ok(false)` without writing when a record for the pair
    /// already exists — the losing side of a concurrent first attempt.
    /// The insertion commits as its own atomic step.
    async fn try_insert_idempotency_record(
        &mut self,
        record: &IdempotencyRecord,
    ) -> ReconcileResult<bool>;

    /// Update an existing idempotency record (stores the response payload)
    async fn update_idempotency_record(
        &mut self,
        record: &IdempotencyRecord,
    ) -> ReconcileResult<()>;

    /// Delete the idempotency record for `(key, tenant)` if present
    ///
    /// Used as the compensating step when batch creation fails after the
    /// record was inserted, so a retry with the same key starts fresh.
    async fn delete_idempotency_record(&mut self, tenant_id: &str, key: &str)
        -> ReconcileResult<()>;
}

/// Best-effort natural-language explanation of a proposed match
///
/// Implementations never fail: any collaborator problem degrades to a
/// deterministic heuristic string. The call runs outside any storage
/// transaction and is not retried.
#[async_trait]
pub trait MatchExplainer: Send + Sync {
    /// Explain why `transaction` plausibly settles `invoice`
    async fn explain(&self, invoice: &Invoice, transaction: &BankTransaction) -> String;
}
