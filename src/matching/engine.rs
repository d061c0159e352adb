//! Reconciliation runs and match confirmation

use std::cmp::Ordering;

use crate::matching::score::{score_pair, SCORE_THRESHOLD};
use crate::traits::ReconciliationStorage;
use crate::types::*;

/// Engine scoring open invoices against bank transactions
pub struct ReconciliationEngine<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> ReconciliationEngine<S> {
    /// Create a new reconciliation engine
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Score the full cross product of a tenant's open invoices and all of
    /// its bank transactions, persisting candidates above the threshold
    ///
    /// Returns the new candidates sorted by score descending. The sort is
    /// stable, so equal scores keep cross-product order (invoices in
    /// insertion order, transactions in insertion order within each
    /// invoice). Every run appends fresh candidates; earlier runs' rows for
    /// the same pair are left untouched.
    pub async fn reconcile(&mut self, tenant_id: &str) -> ReconcileResult<Vec<MatchCandidate>> {
        if self.storage.get_tenant(tenant_id).await?.is_none() {
            return Err(ReconcileError::TenantNotFound(tenant_id.to_string()));
        }

        let open_only = InvoiceFilter {
            status: Some(InvoiceStatus::Open),
            ..Default::default()
        };
        let invoices = self.storage.list_invoices(tenant_id, &open_only).await?;
        // Transactions are reusable targets: no status filter
        let transactions = self.storage.list_transactions(tenant_id).await?;

        let mut candidates = Vec::new();
        for invoice in &invoices {
            for transaction in &transactions {
                let score = score_pair(invoice, transaction);
                if score > SCORE_THRESHOLD {
                    candidates.push(MatchCandidate::proposed(
                        tenant_id.to_string(),
                        invoice.id.clone(),
                        transaction.id.clone(),
                        score,
                    ));
                }
            }
        }

        self.storage.save_candidates(&candidates).await?;

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        tracing::debug!(
            invoices = invoices.len(),
            transactions = transactions.len(),
            candidates = candidates.len(),
            "reconciliation run complete"
        );
        Ok(candidates)
    }

    /// Confirm a proposed match candidate
    ///
    /// The transition is one-way: once confirmed, a candidate stays
    /// confirmed. Confirming also moves the candidate's invoice out of the
    /// open pool, so later reconciliation runs stop re-scoring it; other
    /// already-proposed candidates against the invoice remain confirmable.
    pub async fn confirm(
        &mut self,
        tenant_id: &str,
        match_id: &str,
    ) -> ReconcileResult<MatchCandidate> {
        let mut candidate = match self.storage.get_candidate(match_id).await? {
            // A candidate owned by another tenant is reported as missing
            Some(candidate) if candidate.tenant_id == tenant_id => candidate,
            _ => return Err(ReconcileError::MatchNotFound(match_id.to_string())),
        };

        candidate.status = MatchStatus::Confirmed;
        self.storage.update_candidate(&candidate).await?;

        if let Some(mut invoice) = self.storage.get_invoice(&candidate.invoice_id).await? {
            if invoice.status != InvoiceStatus::Matched {
                invoice.status = InvoiceStatus::Matched;
                self.storage.update_invoice(&invoice).await?;
            }
        }

        Ok(candidate)
    }
}
