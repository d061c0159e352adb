//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
///
/// Tables are plain vectors so every list operation returns rows in
/// insertion order, which keeps reconciliation tie-breaks reproducible.
/// Uniqueness of `(idempotency key, tenant)` and the invoice-to-candidate
/// delete cascade are enforced here the way a relational backend would.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tenants: Arc<RwLock<Vec<Tenant>>>,
    vendors: Arc<RwLock<Vec<Vendor>>>,
    invoices: Arc<RwLock<Vec<Invoice>>>,
    transactions: Arc<RwLock<Vec<BankTransaction>>>,
    candidates: Arc<RwLock<Vec<MatchCandidate>>>,
    idempotency_records: Arc<RwLock<Vec<IdempotencyRecord>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.tenants.write().unwrap().clear();
        self.vendors.write().unwrap().clear();
        self.invoices.write().unwrap().clear();
        self.transactions.write().unwrap().clear();
        self.candidates.write().unwrap().clear();
        self.idempotency_records.write().unwrap().clear();
    }
}

#[async_trait]
impl ReconciliationStorage for MemoryStorage {
    async fn save_tenant(&mut self, tenant: &Tenant) -> ReconcileResult<()> {
        self.tenants.write().unwrap().push(tenant.clone());
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: &str) -> ReconcileResult<Option<Tenant>> {
        Ok(self
            .tenants
            .read()
            .unwrap()
            .iter()
            .find(|t| t.id == tenant_id)
            .cloned())
    }

    async fn list_tenants(&self) -> ReconcileResult<Vec<Tenant>> {
        Ok(self.tenants.read().unwrap().clone())
    }

    async fn save_vendor(&mut self, vendor: &Vendor) -> ReconcileResult<()> {
        self.vendors.write().unwrap().push(vendor.clone());
        Ok(())
    }

    async fn get_vendor(&self, vendor_id: &str) -> ReconcileResult<Option<Vendor>> {
        Ok(self
            .vendors
            .read()
            .unwrap()
            .iter()
            .find(|v| v.id == vendor_id)
            .cloned())
    }

    async fn list_vendors(&self, tenant_id: &str) -> ReconcileResult<Vec<Vendor>> {
        Ok(self
            .vendors
            .read()
            .unwrap()
            .iter()
            .filter(|v| v.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn save_invoice(&mut self, invoice: &Invoice) -> ReconcileResult<()> {
        self.invoices.write().unwrap().push(invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, invoice_id: &str) -> ReconcileResult<Option<Invoice>> {
        Ok(self
            .invoices
            .read()
            .unwrap()
            .iter()
            .find(|i| i.id == invoice_id)
            .cloned())
    }

    async fn list_invoices(
        &self,
        tenant_id: &str,
        filter: &InvoiceFilter,
    ) -> ReconcileResult<Vec<Invoice>> {
        Ok(self
            .invoices
            .read()
            .unwrap()
            .iter()
            .filter(|i| i.tenant_id == tenant_id && filter.matches(i))
            .cloned()
            .collect())
    }

    async fn update_invoice(&mut self, invoice: &Invoice) -> ReconcileResult<()> {
        let mut invoices = self.invoices.write().unwrap();
        match invoices.iter_mut().find(|i| i.id == invoice.id) {
            Some(existing) => {
                *existing = invoice.clone();
                Ok(())
            }
            None => Err(ReconcileError::InvoiceNotFound(invoice.id.clone())),
        }
    }

    async fn delete_invoice(&mut self, invoice_id: &str) -> ReconcileResult<()> {
        let mut invoices = self.invoices.write().unwrap();
        let before = invoices.len();
        invoices.retain(|i| i.id != invoice_id);
        if invoices.len() == before {
            return Err(ReconcileError::InvoiceNotFound(invoice_id.to_string()));
        }
        // Referential integrity: candidates die with their invoice
        self.candidates
            .write()
            .unwrap()
            .retain(|c| c.invoice_id != invoice_id);
        Ok(())
    }

    async fn save_transactions(
        &mut self,
        transactions: &[BankTransaction],
    ) -> ReconcileResult<()> {
        self.transactions
            .write()
            .unwrap()
            .extend_from_slice(transactions);
        Ok(())
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconcileResult<Option<BankTransaction>> {
        Ok(self
            .transactions
            .read()
            .unwrap()
            .iter()
            .find(|t| t.id == transaction_id)
            .cloned())
    }

    async fn list_transactions(&self, tenant_id: &str) -> ReconcileResult<Vec<BankTransaction>> {
        Ok(self
            .transactions
            .read()
            .unwrap()
            .iter()
            .filter(|t| t.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn save_candidates(&mut self, candidates: &[MatchCandidate]) -> ReconcileResult<()> {
        self.candidates
            .write()
            .unwrap()
            .extend_from_slice(candidates);
        Ok(())
    }

    async fn get_candidate(&self, candidate_id: &str) -> ReconcileResult<Option<MatchCandidate>> {
        Ok(self
            .candidates
            .read()
            .unwrap()
            .iter()
            .find(|c| c.id == candidate_id)
            .cloned())
    }

    async fn list_candidates(&self, tenant_id: &str) -> ReconcileResult<Vec<MatchCandidate>> {
        Ok(self
            .candidates
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn update_candidate(&mut self, candidate: &MatchCandidate) -> ReconcileResult<()> {
        let mut candidates = self.candidates.write().unwrap();
        match candidates.iter_mut().find(|c| c.id == candidate.id) {
            Some(existing) => {
                *existing = candidate.clone();
                Ok(())
            }
            None => Err(ReconcileError::MatchNotFound(candidate.id.clone())),
        }
    }

    async fn get_idempotency_record(
        &self,
        tenant_id: &str,
        key: &str,
    ) -> ReconcileResult<Option<IdempotencyRecord>> {
        Ok(self
            .idempotency_records
            .read()
            .unwrap()
            .iter()
            .find(|r| r.tenant_id == tenant_id && r.key == key)
            .cloned())
    }

    async fn try_insert_idempotency_record(
        &mut self,
        record: &IdempotencyRecord,
    ) -> ReconcileResult<bool> {
        let mut records = self.idempotency_records.write().unwrap();
        if records
            .iter()
            .any(|r| r.tenant_id == record.tenant_id && r.key == record.key)
        {
            return Ok(false);
        }
        records.push(record.clone());
        Ok(true)
    }

    async fn update_idempotency_record(
        &mut self,
        record: &IdempotencyRecord,
    ) -> ReconcileResult<()> {
        let mut records = self.idempotency_records.write().unwrap();
        match records
            .iter_mut()
            .find(|r| r.tenant_id == record.tenant_id && r.key == record.key)
        {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(ReconcileError::Storage(format!(
                "idempotency record missing for key '{}'",
                record.key
            ))),
        }
    }

    async fn delete_idempotency_record(
        &mut self,
        tenant_id: &str,
        key: &str,
    ) -> ReconcileResult<()> {
        self.idempotency_records
            .write()
            .unwrap()
            .retain(|r| !(r.tenant_id == tenant_id && r.key == key));
        Ok(())
    }
}
