use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use souq_core::{AggregateId, Money, UserId};
use souq_events::EventEnvelope;
use souq_orders::{OrderEvent, OrderId, OrderLine, OrderStatus, ShippingInfo};

use super::ProjectionError;
use crate::read_model::KeyValueStore;

/// Queryable order read model for listings and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReadModel {
    pub order_id: OrderId,
    pub owner: UserId,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingInfo,
    pub cart_total: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub coupon_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Orders projection.
///
/// Consumes published envelopes (JSON payloads) and maintains a disposable,
/// rebuildable read model. Idempotent under at-least-once delivery: replays
/// at or below the per-stream cursor are ignored.
#[derive(Debug)]
pub struct OrdersProjection<S>
where
    S: KeyValueStore<OrderId, OrderReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> OrdersProjection<S>
where
    S: KeyValueStore<OrderId, OrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, order_id: &OrderId) -> Option<OrderReadModel> {
        self.store.get(order_id)
    }

    pub fn list(&self) -> Vec<OrderReadModel> {
        self.store.list()
    }

    pub fn list_for(&self, owner: UserId) -> Vec<OrderReadModel> {
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

            let event: OrderEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

            let order_id = match &event {
                OrderEvent::OrderCreated(e) => e.order_id,
                OrderEvent::StatusChanged(e) => e.order_id,
                OrderEvent::ItemsReplaced(e) => e.order_id,
            };
            if order_id.0 != aggregate_id {
                return Err(ProjectionError::AggregateMismatch(
                    "event order_id does not match envelope aggregate_id".to_string(),
                ));
            }

            match event {
                OrderEvent::OrderCreated(e) => {
                    self.store.upsert(
                        e.order_id,
                        OrderReadModel {
                            order_id: e.order_id,
                            owner: e.owner,
                            status: OrderStatus::Pending,
                            lines: e.lines,
                            shipping: e.shipping,
                            cart_total: e.cart_total,
                            delivery_fee: e.delivery_fee,
                            total: e.total,
                            coupon_code: e.coupon_code,
                            created_at: e.occurred_at,
                            updated_at: e.occurred_at,
                        },
                    );
                }
                OrderEvent::StatusChanged(e) => {
                    if let Some(mut rm) = self.store.get(&e.order_id) {
                        rm.status = e.to;
                        rm.updated_at = e.occurred_at;
                        self.store.upsert(e.order_id, rm);
                    }
                }
                OrderEvent::ItemsReplaced(e) => {
                    if let Some(mut rm) = self.store.get(&e.order_id) {
                        rm.lines = e.lines;
                        rm.cart_total = e.cart_total;
                        rm.total = e.total;
                        rm.updated_at = e.occurred_at;
                        self.store.upsert(e.order_id, rm);
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

        // Deterministic replay order: aggregate, then sequence.
        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
