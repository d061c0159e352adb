//! Core types and data structures for the reconciliation system
//!
//! Every entity is scoped to exactly one tenant; no cross-tenant references
//! are permitted anywhere in the model.

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle of an invoice with respect to reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Eligible for matching
    Open,
    /// A match candidate against this invoice has been confirmed
    Matched,
}

/// Lifecycle of a match candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Created by the reconciliation engine, awaiting review
    Proposed,
    /// Accepted by the caller; terminal
    Confirmed,
    /// Reserved for an explicit rejection flow
    Rejected,
}

/// Isolation boundary owning all other entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl Tenant {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Counterparty an invoice may optionally reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl Vendor {
    pub fn new(tenant_id: String, name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            name,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// An amount owed, awaiting a matching bank transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub tenant_id: String,
    /// Optional counterparty reference
    pub vendor_id: Option<String>,
    pub invoice_number: Option<String>,
    pub amount: BigDecimal,
    /// 3-letter currency code, uppercase
    pub currency: String,
    pub invoice_date: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub status: InvoiceStatus,
    pub created_at: NaiveDateTime,
}

/// Fields supplied when creating an invoice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInvoice {
    pub amount: BigDecimal,
    /// Defaults to "USD" when empty
    pub currency: String,
    pub invoice_date: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub invoice_number: Option<String>,
    pub vendor_id: Option<String>,
}

impl Invoice {
    pub fn new(tenant_id: String, fields: NewInvoice) -> Self {
        let currency = if fields.currency.is_empty() {
            "USD".to_string()
        } else {
            fields.currency
        };
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            vendor_id: fields.vendor_id,
            invoice_number: fields.invoice_number,
            amount: fields.amount,
            currency,
            invoice_date: fields.invoice_date,
            description: fields.description,
            status: InvoiceStatus::Open,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// A posted bank movement, created only via the import engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: String,
    pub tenant_id: String,
    /// Supplier-supplied dedup hint; not enforced unique
    pub external_id: Option<String>,
    pub posted_at: NaiveDateTime,
    pub amount: BigDecimal,
    pub currency: String,
    pub description: String,
    pub created_at: NaiveDateTime,
}

/// One row of an import batch as supplied by the caller
///
/// `posted_at` stays a string here; the import engine parses it and rejects
/// the whole batch on the first unparsable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub amount: BigDecimal,
    pub currency: String,
    /// ISO-8601 timestamp or date
    pub posted_at: String,
    pub description: String,
    pub external_id: Option<String>,
}

/// Outcome of a successful (or replayed) batch import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub message: String,
    pub count: usize,
    pub transaction_ids: Vec<String>,
}

/// A scored pairing of one invoice and one bank transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: String,
    pub tenant_id: String,
    pub invoice_id: String,
    pub transaction_id: String,
    /// Confidence in [0, 1], rounded to 3 decimal places
    pub score: f64,
    pub status: MatchStatus,
    pub created_at: NaiveDateTime,
}

impl MatchCandidate {
    /// Create a freshly proposed candidate
    pub fn proposed(
        tenant_id: String,
        invoice_id: String,
        transaction_id: String,
        score: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            invoice_id,
            transaction_id,
            score,
            status: MatchStatus::Proposed,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Bookkeeping row guaranteeing at-most-once application of an import batch
///
/// At most one record exists per `(key, tenant_id)`. A record whose
/// `response_payload` is `None` marks an attempt that is in flight or failed
/// without recording a result; retries against it must be refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub tenant_id: String,
    /// SHA-256 hex digest of the canonicalized batch payload
    pub params_hash: String,
    pub response_payload: Option<Value>,
    pub locked_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl IdempotencyRecord {
    /// Create a record marking an attempt as in flight
    pub fn in_flight(key: String, tenant_id: String, params_hash: String) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            key,
            tenant_id,
            params_hash,
            response_payload: None,
            locked_at: now,
            created_at: now,
        }
    }
}

/// Criteria for listing invoices
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub vendor_id: Option<String>,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
    pub amount_min: Option<BigDecimal>,
    pub amount_max: Option<BigDecimal>,
}

impl InvoiceFilter {
    /// Check an invoice against every populated criterion
    pub fn matches(&self, invoice: &Invoice) -> bool {
        if let Some(status) = self.status {
            if invoice.status != status {
                return false;
            }
        }
        if let Some(ref vendor_id) = self.vendor_id {
            if invoice.vendor_id.as_deref() != Some(vendor_id.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            match invoice.invoice_date {
                Some(date) if date >= from => {}
                _ => return false,
            }
        }
        if let Some(to) = self.date_to {
            match invoice.invoice_date {
                Some(date) if date <= to => {}
                _ => return false,
            }
        }
        if let Some(ref min) = self.amount_min {
            if invoice.amount < *min {
                return false;
            }
        }
        if let Some(ref max) = self.amount_max {
            if invoice.amount > *max {
                return false;
            }
        }
        true
    }
}

/// Errors that can occur in the reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Match not found: {0}")]
    MatchNotFound(String),
    #[error("Resource belongs to another tenant: {0}")]
    TenantMismatch(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),
    #[error("Idempotency key reused with different payload: {0}")]
    IdempotencyConflict(String),
    #[error("Request currently in progress or failed previously: {0}")]
    RequestInProgress(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_defaults_currency_to_usd() {
        let invoice = Invoice::new(
            "t1".to_string(),
            NewInvoice {
                amount: BigDecimal::from(100),
                ..Default::default()
            },
        );
        assert_eq!(invoice.currency, "USD");
        assert_eq!(invoice.status, InvoiceStatus::Open);
    }

    #[test]
    fn filter_checks_all_populated_criteria() {
        let invoice = Invoice::new(
            "t1".to_string(),
            NewInvoice {
                amount: BigDecimal::from(250),
                currency: "EUR".to_string(),
                vendor_id: Some("v1".to_string()),
                ..Default::default()
            },
        );

        let filter = InvoiceFilter {
            status: Some(InvoiceStatus::Open),
            vendor_id: Some("v1".to_string()),
            amount_min: Some(BigDecimal::from(100)),
            amount_max: Some(BigDecimal::from(300)),
            ..Default::default()
        };
        assert!(filter.matches(&invoice));

        let wrong_vendor = InvoiceFilter {
            vendor_id: Some("v2".to_string()),
            ..Default::default()
        };
        assert!(!wrong_vendor.matches(&invoice));

        // Date criteria require the invoice to carry a date at all
        let dated = InvoiceFilter {
            date_from: Some(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };
        assert!(!dated.matches(&invoice));
    }
}
