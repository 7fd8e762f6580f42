use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use souq_core::{AggregateId, Money, UserId};
use souq_coupons::{CouponEvent, CouponId};
use souq_events::EventEnvelope;

use super::ProjectionError;
use crate::read_model::KeyValueStore;

/// Code-keyed coupon lookup backing checkout's coupon validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponReadModel {
    pub coupon_id: CouponId,
    pub owner: UserId,
    pub code: String,
    pub value: Money,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

/// Coupon directory projection.
///
/// Shoppers present codes, not ids, so the directory is keyed by code.
/// `CouponConsumed` carries the code for exactly this reason. Idempotent
/// under at-least-once delivery via per-stream cursors.
#[derive(Debug)]
pub struct CouponDirectoryProjection<S>
where
    S: KeyValueStore<String, CouponReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> CouponDirectoryProjection<S>
where
    S: KeyValueStore<String, CouponReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, code: &str) -> Option<CouponReadModel> {
        self.store.get(&code.to_string())
    }

    pub fn list_for(&self, owner: UserId) -> Vec<CouponReadModel> {
        self.store
            .list()
            .into_iter()
            .filter(|rm| rm.owner == owner)
            .collect()
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let Ok(mut cursors) = self.cursors.write() {
            let last = *cursors.get(&aggregate_id).unwrap_or(&0);

            if seq == 0 {
                return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
            }
            if seq <= last {
                // Duplicate or replay; safe to ignore.
                return Ok(());
            }
            if seq != last + 1 && last != 0 {
                return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
            }

            let event: CouponEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

            let coupon_id = match &event {
                CouponEvent::CouponIssued(e) => e.coupon_id,
                CouponEvent::CouponConsumed(e) => e.coupon_id,
            };
            if coupon_id.0 != aggregate_id {
                return Err(ProjectionError::AggregateMismatch(
                    "event coupon_id does not match envelope aggregate_id".to_string(),
                ));
            }

            match event {
                CouponEvent::CouponIssued(e) => {
                    self.store.upsert(
                        e.code.clone(),
                        CouponReadModel {
                            coupon_id: e.coupon_id,
                            owner: e.owner,
                            code: e.code,
                            value: e.value,
                            is_used: false,
                            used_at: None,
                        },
                    );
                }
                CouponEvent::CouponConsumed(e) => {
                    if let Some(mut rm) = self.store.get(&e.code) {
                        rm.is_used = true;
                        rm.used_at = Some(e.occurred_at);
                        self.store.upsert(e.code, rm);
                    }
                }
            }

            // Advance cursor after successful apply.
            cursors.insert(aggregate_id, seq);
        }

        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }
        self.store.clear();

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
