//! Main reconciler that coordinates imports, matching, and explanations

use crate::explain::HttpExplainer;
use crate::import::ImportEngine;
use crate::matching::ReconciliationEngine;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_amount, validate_currency_code, validate_name};

/// Main reconciliation system that orchestrates all operations for the
/// presentation layer
///
/// Holds an explicitly constructed storage handle and exposes plain data
/// results; protocol adapters (REST, GraphQL, ...) wrap this API and never
/// leak their types into the core.
pub struct Reconciler<S: ReconciliationStorage> {
    storage: S,
    import_engine: ImportEngine<S>,
    matching_engine: ReconciliationEngine<S>,
    explainer: Box<dyn MatchExplainer>,
}

impl<S: ReconciliationStorage + Clone> Reconciler<S> {
    /// Create a reconciler with the given storage backend
    ///
    /// Explanations go to the HTTP collaborator configured via `AI_API_URL`
    /// (falling back to its built-in default endpoint).
    pub fn new(storage: S) -> Self {
        Self::with_explainer(storage, Box::new(HttpExplainer::from_env()))
    }

    /// Create a reconciler with a custom explanation collaborator
    pub fn with_explainer(storage: S, explainer: Box<dyn MatchExplainer>) -> Self {
        Self {
            import_engine: ImportEngine::new(storage.clone()),
            matching_engine: ReconciliationEngine::new(storage.clone()),
            storage,
            explainer,
        }
    }

    // Tenant operations
    /// Create a new tenant
    pub async fn create_tenant(&mut self, name: String) -> ReconcileResult<Tenant> {
        validate_name(&name)?;
        let tenant = Tenant::new(name);
        self.storage.save_tenant(&tenant).await?;
        Ok(tenant)
    }

    /// Get a tenant by ID
    pub async fn get_tenant(&self, tenant_id: &str) -> ReconcileResult<Option<Tenant>> {
        self.storage.get_tenant(tenant_id).await
    }

    /// List all tenants
    pub async fn list_tenants(&self) -> ReconcileResult<Vec<Tenant>> {
        self.storage.list_tenants().await
    }

    // Vendor operations
    /// Create a new vendor under a tenant
    pub async fn create_vendor(
        &mut self,
        tenant_id: &str,
        name: String,
    ) -> ReconcileResult<Vendor> {
        validate_name(&name)?;
        self.require_tenant(tenant_id).await?;
        let vendor = Vendor::new(tenant_id.to_string(), name);
        self.storage.save_vendor(&vendor).await?;
        Ok(vendor)
    }

    /// List a tenant's vendors
    pub async fn list_vendors(&self, tenant_id: &str) -> ReconcileResult<Vec<Vendor>> {
        self.storage.list_vendors(tenant_id).await
    }

    // Invoice operations
    /// Create a new invoice under a tenant
    pub async fn create_invoice(
        &mut self,
        tenant_id: &str,
        mut fields: NewInvoice,
    ) -> ReconcileResult<Invoice> {
        self.require_tenant(tenant_id).await?;
        validate_amount(&fields.amount)?;
        if !fields.currency.is_empty() {
            validate_currency_code(&fields.currency)?;
            fields.currency = fields.currency.to_uppercase();
        }
        if let Some(ref vendor_id) = fields.vendor_id {
            match self.storage.get_vendor(vendor_id).await? {
                Some(vendor) if vendor.tenant_id == tenant_id => {}
                Some(_) => return Err(ReconcileError::TenantMismatch(vendor_id.clone())),
                None => {
                    return Err(ReconcileError::InvalidRequest(format!(
                        "Unknown vendor: {vendor_id}"
                    )))
                }
            }
        }

        let invoice = Invoice::new(tenant_id.to_string(), fields);
        self.storage.save_invoice(&invoice).await?;
        Ok(invoice)
    }

    /// Get a tenant's invoice by ID
    pub async fn get_invoice(
        &self,
        tenant_id: &str,
        invoice_id: &str,
    ) -> ReconcileResult<Invoice> {
        match self.storage.get_invoice(invoice_id).await? {
            Some(invoice) if invoice.tenant_id == tenant_id => Ok(invoice),
            _ => Err(ReconcileError::InvoiceNotFound(invoice_id.to_string())),
        }
    }

    /// List a tenant's invoices matching the filter
    pub async fn list_invoices(
        &self,
        tenant_id: &str,
        filter: &InvoiceFilter,
    ) -> ReconcileResult<Vec<Invoice>> {
        self.storage.list_invoices(tenant_id, filter).await
    }

    /// Delete a tenant's invoice; its match candidates go with it
    pub async fn delete_invoice(
        &mut self,
        tenant_id: &str,
        invoice_id: &str,
    ) -> ReconcileResult<()> {
        // Ownership check first so another tenant's invoice reads as missing
        self.get_invoice(tenant_id, invoice_id).await?;
        self.storage.delete_invoice(invoice_id).await
    }

    // Import operations
    /// Import a batch of bank transactions under an idempotency key
    pub async fn import_transactions(
        &mut self,
        tenant_id: &str,
        batch: &[TransactionRecord],
        idempotency_key: &str,
    ) -> ReconcileResult<ImportResult> {
        self.import_engine
            .import(tenant_id, batch, idempotency_key)
            .await
    }

    /// List a tenant's bank transactions
    pub async fn list_transactions(
        &self,
        tenant_id: &str,
    ) -> ReconcileResult<Vec<BankTransaction>> {
        self.storage.list_transactions(tenant_id).await
    }

    // Matching operations
    /// Run reconciliation for a tenant, returning new candidates ranked by
    /// score descending
    pub async fn reconcile(&mut self, tenant_id: &str) -> ReconcileResult<Vec<MatchCandidate>> {
        self.matching_engine.reconcile(tenant_id).await
    }

    /// Confirm a proposed match candidate
    pub async fn confirm_match(
        &mut self,
        tenant_id: &str,
        match_id: &str,
    ) -> ReconcileResult<MatchCandidate> {
        self.matching_engine.confirm(tenant_id, match_id).await
    }

    /// List a tenant's match candidates
    pub async fn list_matches(&self, tenant_id: &str) -> ReconcileResult<Vec<MatchCandidate>> {
        self.storage.list_candidates(tenant_id).await
    }

    // Explanation
    /// Produce a human-readable explanation for an (invoice, transaction)
    /// pair
    ///
    /// Fails with a not-found error when either resource is missing and
    /// with [`ReconcileError::TenantMismatch`] when either belongs to a
    /// different tenant; the collaborator itself never fails the call.
    pub async fn explain_match(
        &self,
        tenant_id: &str,
        invoice_id: &str,
        transaction_id: &str,
    ) -> ReconcileResult<String> {
        let invoice = self
            .storage
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| ReconcileError::InvoiceNotFound(invoice_id.to_string()))?;
        let transaction = self
            .storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| ReconcileError::TransactionNotFound(transaction_id.to_string()))?;

        if invoice.tenant_id != tenant_id {
            return Err(ReconcileError::TenantMismatch(invoice_id.to_string()));
        }
        if transaction.tenant_id != tenant_id {
            return Err(ReconcileError::TenantMismatch(transaction_id.to_string()));
        }

        Ok(self.explainer.explain(&invoice, &transaction).await)
    }

    async fn require_tenant(&self, tenant_id: &str) -> ReconcileResult<()> {
        if self.storage.get_tenant(tenant_id).await?.is_none() {
            return Err(ReconcileError::TenantNotFound(tenant_id.to_string()));
        }
        Ok(())
    }
}
