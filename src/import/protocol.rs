//! Idempotent batch import of bank transactions
//!
//! The import protocol guarantees at-most-one successful application of a
//! given idempotency key's batch per tenant, and deterministic replay of the
//! original result on retry. Correctness under concurrent first attempts
//! rests on the storage gateway's exclusive insert for `(key, tenant)`:
//! exactly one inserter wins, the loser observes the winner's record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::import::canonical::params_hash;
use crate::traits::ReconciliationStorage;
use crate::types::*;

/// Engine applying transaction batches under client-supplied idempotency keys
pub struct ImportEngine<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> ImportEngine<S> {
    /// Create a new import engine
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Import a batch of transaction records for a tenant
    ///
    /// Returns the stored result verbatim when the same key and payload are
    /// replayed; fails with [`ReconcileError::IdempotencyConflict`] when the
    /// key is reused with a different payload, and with
    /// [`ReconcileError::RequestInProgress`] when a prior attempt has not
    /// recorded a result.
    pub async fn import(
        &mut self,
        tenant_id: &str,
        batch: &[TransactionRecord],
        idempotency_key: &str,
    ) -> ReconcileResult<ImportResult> {
        if idempotency_key.is_empty() {
            return Err(ReconcileError::InvalidRequest(
                "Idempotency key is required".to_string(),
            ));
        }

        if self.storage.get_tenant(tenant_id).await?.is_none() {
            return Err(ReconcileError::TenantNotFound(tenant_id.to_string()));
        }

        let current_hash = params_hash(&batch)?;

        if let Some(existing) = self
            .storage
            .get_idempotency_record(tenant_id, idempotency_key)
            .await?
        {
            return self.resolve_existing(&existing, &current_hash, idempotency_key);
        }

        let record = IdempotencyRecord::in_flight(
            idempotency_key.to_string(),
            tenant_id.to_string(),
            current_hash.clone(),
        );
        if !self.storage.try_insert_idempotency_record(&record).await? {
            // Lost the race: the winner's record decides what the caller sees.
            tracing::debug!(key = %idempotency_key, "concurrent import attempt lost exclusive insert");
            return match self
                .storage
                .get_idempotency_record(tenant_id, idempotency_key)
                .await?
            {
                Some(existing) => self.resolve_existing(&existing, &current_hash, idempotency_key),
                None => Err(ReconcileError::RequestInProgress(
                    idempotency_key.to_string(),
                )),
            };
        }

        let result = match self.apply_batch(tenant_id, batch).await {
            Ok(result) => result,
            Err(e) => {
                // Compensate so a retry with the same key starts fresh.
                self.release_record(tenant_id, idempotency_key).await;
                return Err(e);
            }
        };

        let payload = match serde_json::to_value(&result) {
            Ok(payload) => payload,
            Err(e) => {
                self.release_record(tenant_id, idempotency_key).await;
                return Err(ReconcileError::Storage(format!(
                    "failed to encode import result: {e}"
                )));
            }
        };
        let completed = IdempotencyRecord {
            response_payload: Some(payload),
            ..record
        };
        if let Err(e) = self.storage.update_idempotency_record(&completed).await {
            self.release_record(tenant_id, idempotency_key).await;
            return Err(e);
        }

        tracing::debug!(
            key = %idempotency_key,
            count = result.count,
            "import applied"
        );
        Ok(result)
    }

    /// Decide the outcome when a record already exists for `(key, tenant)`
    fn resolve_existing(
        &self,
        existing: &IdempotencyRecord,
        current_hash: &str,
        idempotency_key: &str,
    ) -> ReconcileResult<ImportResult> {
        if existing.params_hash != current_hash {
            return Err(ReconcileError::IdempotencyConflict(
                idempotency_key.to_string(),
            ));
        }

        match &existing.response_payload {
            Some(payload) => {
                tracing::debug!(key = %idempotency_key, "replaying stored import result");
                serde_json::from_value(payload.clone()).map_err(|e| {
                    ReconcileError::Storage(format!("stored import result is unreadable: {e}"))
                })
            }
            None => Err(ReconcileError::RequestInProgress(
                idempotency_key.to_string(),
            )),
        }
    }

    /// Parse and persist the batch; all rows commit atomically
    async fn apply_batch(
        &mut self,
        tenant_id: &str,
        batch: &[TransactionRecord],
    ) -> ReconcileResult<ImportResult> {
        let mut transactions = Vec::with_capacity(batch.len());
        for record in batch {
            let posted_at = parse_posted_at(&record.posted_at)?;
            transactions.push(BankTransaction {
                id: uuid::Uuid::new_v4().to_string(),
                tenant_id: tenant_id.to_string(),
                external_id: record.external_id.clone(),
                posted_at,
                amount: record.amount.clone(),
                currency: record.currency.clone(),
                description: record.description.clone(),
                created_at: chrono::Utc::now().naive_utc(),
            });
        }

        self.storage.save_transactions(&transactions).await?;

        Ok(ImportResult {
            message: "Import successful".to_string(),
            count: transactions.len(),
            transaction_ids: transactions.into_iter().map(|t| t.id).collect(),
        })
    }

    /// Best-effort compensating deletion of a half-created record
    async fn release_record(&mut self, tenant_id: &str, idempotency_key: &str) {
        if let Err(e) = self
            .storage
            .delete_idempotency_record(tenant_id, idempotency_key)
            .await
        {
            tracing::warn!(
                key = %idempotency_key,
                error = %e,
                "failed to release idempotency record after import failure"
            );
        }
    }
}

/// Parse an ISO-8601 timestamp string into a naive UTC timestamp
///
/// Accepts RFC 3339 with offset, a bare datetime, or a bare date (taken at
/// midnight).
pub fn parse_posted_at(value: &str) -> ReconcileResult<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(ReconcileError::MalformedTimestamp(value.to_string()))
}
