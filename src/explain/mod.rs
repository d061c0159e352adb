//! Explanation collaborator: prompt composition and deterministic fallback

pub mod client;

pub use client::*;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::traits::MatchExplainer;
use crate::types::{BankTransaction, Invoice};

/// Compose the fixed prompt sent to the text-generation collaborator
///
/// Deterministic: the same (invoice, transaction) pair always yields the
/// same prompt.
pub fn compose_prompt(invoice: &Invoice, transaction: &BankTransaction) -> String {
    format!(
        "Explain why this bank transaction matches this invoice concisely. \
         Invoice: {} {}, Date: {}, Desc: {}. \
         Transaction: {} {}, Date: {}, Desc: {}.",
        invoice.amount,
        invoice.currency,
        format_date(invoice.invoice_date),
        invoice.description.as_deref().unwrap_or("none"),
        transaction.amount,
        transaction.currency,
        format_date(Some(transaction.posted_at)),
        transaction.description,
    )
}

/// The templated heuristic string used whenever the collaborator fails
pub fn heuristic_explanation(invoice: &Invoice, transaction: &BankTransaction) -> String {
    format!(
        "Heuristic match based on amount similarity ({} == {})",
        invoice.amount, transaction.amount
    )
}

fn format_date(date: Option<NaiveDateTime>) -> String {
    match date {
        Some(date) => date.to_string(),
        None => "none".to_string(),
    }
}

/// Explainer that always answers with the heuristic template
///
/// Useful offline and in tests; also the behavior every other explainer
/// degrades to.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExplainer;

#[async_trait]
impl MatchExplainer for HeuristicExplainer {
    async fn explain(&self, invoice: &Invoice, transaction: &BankTransaction) -> String {
        heuristic_explanation(invoice, transaction)
    }
}
