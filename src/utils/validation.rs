//! Validation utilities

use bigdecimal::BigDecimal;

use crate::types::*;

/// Validate that a tenant or vendor name is usable
pub fn validate_name(name: &str) -> ReconcileResult<()> {
    if name.trim().is_empty() {
        return Err(ReconcileError::InvalidRequest(
            "Name cannot be empty".to_string(),
        ));
    }

    if name.len() > 200 {
        return Err(ReconcileError::InvalidRequest(
            "Name cannot exceed 200 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a 3-letter alphabetic currency code
pub fn validate_currency_code(currency: &str) -> ReconcileResult<()> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ReconcileError::InvalidRequest(format!(
            "Currency must be a 3-letter code, got '{}'",
            currency
        )));
    }

    Ok(())
}

/// Validate that an invoice amount is not negative
pub fn validate_amount(amount: &BigDecimal) -> ReconcileResult<()> {
    if *amount < BigDecimal::from(0) {
        return Err(ReconcileError::InvalidRequest(
            "Amount cannot be negative".to_string(),
        ));
    }

    Ok(())
}
