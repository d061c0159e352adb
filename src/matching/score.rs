//! Pairwise match scoring
//!
//! A score combines three independent weighted signals — amount/currency
//! equality, date proximity, and description similarity — summed, rounded to
//! 3 decimal places, and clamped to at most 1.0.

use bigdecimal::BigDecimal;

use crate::types::{BankTransaction, Invoice};

/// Weight of an exact amount-and-currency match
pub const AMOUNT_WEIGHT: f64 = 0.6;
/// Weight of a posting date within 3 days of the invoice date
pub const DATE_CLOSE_WEIGHT: f64 = 0.2;
/// Weight of a posting date within 7 days of the invoice date
pub const DATE_NEAR_WEIGHT: f64 = 0.1;
/// Maximum contribution of description similarity
pub const DESCRIPTION_WEIGHT: f64 = 0.2;
/// A candidate is persisted only when its score strictly exceeds this
pub const SCORE_THRESHOLD: f64 = 0.3;

/// Amounts closer than this are considered equal
fn amount_tolerance() -> BigDecimal {
    // 0.01 in the amount's own decimal arithmetic, not a float
    BigDecimal::new(1.into(), 2)
}

/// Compute the match score for one (invoice, transaction) pair
///
/// The date signal only applies when the invoice carries a date; the
/// description signal only applies when both descriptions are non-empty.
pub fn score_pair(invoice: &Invoice, transaction: &BankTransaction) -> f64 {
    let mut score = 0.0;

    let amount_delta = (&invoice.amount - &transaction.amount).abs();
    if amount_delta < amount_tolerance() && invoice.currency == transaction.currency {
        score += AMOUNT_WEIGHT;
    }

    if let Some(invoice_date) = invoice.invoice_date {
        let day_diff = (invoice_date - transaction.posted_at).num_days().abs();
        if day_diff <= 3 {
            score += DATE_CLOSE_WEIGHT;
        } else if day_diff <= 7 {
            score += DATE_NEAR_WEIGHT;
        }
    }

    if let Some(description) = invoice.description.as_deref() {
        if !description.is_empty() && !transaction.description.is_empty() {
            let similarity = similarity_ratio(
                &description.to_lowercase(),
                &transaction.description.to_lowercase(),
            );
            score += similarity * DESCRIPTION_WEIGHT;
        }
    }

    round_score(score).min(1.0)
}

/// Normalized sequence similarity in [0, 1]
///
/// Longest-common-subsequence ratio over characters:
/// `2 * lcs(a, b) / (len(a) + len(b))`. Identical strings score 1.0,
/// strings sharing no characters score 0.0.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Two-row LCS table
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    2.0 * prev[b.len()] as f64 / (a.len() + b.len()) as f64
}

fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}
