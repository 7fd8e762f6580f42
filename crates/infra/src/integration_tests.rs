//! Integration tests for the full event-sourced pipeline.
//!
//! Tests: Command → EventStore → EventBus → Projection → ReadModel
//!
//! Verifies:
//! - Commands produce events that update read models correctly
//! - Optimistic concurrency conflicts are detected and the bounded retry
//!   resolves them
//! - Projections stay correct under replayed (at-least-once) delivery

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use std::sync::Arc;

    use souq_core::{AggregateId, ExpectedVersion, Money, UserId};
    use souq_coupons::{Coupon, CouponCommand, CouponId, IssueCoupon};
    use souq_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use souq_inventory::{ReceiveStock, Reserve, StockCommand, VariantStock};
    use souq_orders::{CreateOrder, Order, OrderCommand, OrderId, OrderLine, ShippingInfo};

    use souq_catalog::VariantId;

    use crate::command_dispatcher::{CommandDispatcher, DispatchError};
    use crate::event_store::{EventStore, InMemoryEventStore, UncommittedEvent};
    use crate::projections::{CouponDirectoryProjection, OrdersProjection};
    use crate::read_model::InMemoryKeyValueStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>;
    type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Bus>;

    fn setup() -> (
        Dispatcher,
        Arc<OrdersProjection<InMemoryKeyValueStore<OrderId, crate::projections::OrderReadModel>>>,
        Arc<
            CouponDirectoryProjection<
                InMemoryKeyValueStore<String, crate::projections::CouponReadModel>,
            >,
        >,
    ) {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let dispatcher = CommandDispatcher::new(store, bus.clone());
        let orders = Arc::new(OrdersProjection::new(InMemoryKeyValueStore::new()));
        let coupons = Arc::new(CouponDirectoryProjection::new(InMemoryKeyValueStore::new()));

        // Subscribe to the bus BEFORE any events are published.
        let orders_clone = orders.clone();
        let coupons_clone = coupons.clone();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        std::thread::spawn(move || {
            let sub = bus.subscribe();
            let _ = ready_tx.send(());
            while let Ok(env) = sub.recv() {
                let result = match env.aggregate_type() {
                    "orders.order" => orders_clone.apply_envelope(&env),
                    "coupons.coupon" => coupons_clone.apply_envelope(&env),
                    _ => Ok(()),
                };
                if let Err(e) = result {
                    eprintln!("Failed to apply envelope: {e:?}");
                }
            }
        });
        // Ensure subscriber is ready before returning (prevents missing early events).
        let _ = ready_rx.recv_timeout(std::time::Duration::from_secs(1));

        (dispatcher, orders, coupons)
    }

    /// The subscriber thread processes events asynchronously.
    fn wait_for_processing() {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    fn test_line(quantity: u32) -> OrderLine {
        OrderLine {
            variant_id: VariantId::new(AggregateId::new()),
            product_name: "Shirt".to_string(),
            color: "Red".to_string(),
            size: "M".to_string(),
            quantity,
            sale_price: Money::from_minor(100),
            purchase_price: Money::from_minor(60),
        }
    }

    fn create_order_cmd(order_id: OrderId, owner: UserId) -> CreateOrder {
        CreateOrder {
            order_id,
            owner,
            lines: vec![test_line(2)],
            shipping: ShippingInfo {
                full_name: "Mona Adel".to_string(),
                address: "12 Tahrir St".to_string(),
                phone: "01000000000".to_string(),
                governorate: "Cairo".to_string(),
            },
            cart_total: Money::from_minor(200),
            delivery_fee: Money::from_minor(40),
            total: Money::from_minor(240),
            coupon_code: None,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn create_order_updates_read_model() {
        let (dispatcher, orders, _) = setup();
        let order_id = OrderId::new(AggregateId::new());
        let owner = UserId::new();

        let committed = dispatcher
            .dispatch(
                order_id.0,
                "orders.order",
                OrderCommand::CreateOrder(create_order_cmd(order_id, owner)),
                |id| Order::empty(OrderId::new(id)),
            )
            .unwrap();
        assert_eq!(committed.len(), 1);

        wait_for_processing();

        let rm = orders.get(&order_id).unwrap();
        assert_eq!(rm.owner, owner);
        assert_eq!(rm.total, Money::from_minor(240));
        assert_eq!(orders.list_for(owner).len(), 1);
    }

    #[test]
    fn coupon_lifecycle_flows_into_directory() {
        let (dispatcher, _, coupons) = setup();
        let coupon_id = CouponId::new(AggregateId::new());
        let owner = UserId::new();

        dispatcher
            .dispatch(
                coupon_id.0,
                "coupons.coupon",
                CouponCommand::IssueCoupon(IssueCoupon {
                    coupon_id,
                    owner,
                    code: "SQ-DEADBEEF".to_string(),
                    value: Money::from_minor(500),
                    occurred_at: Utc::now(),
                }),
                |id| Coupon::empty(CouponId::new(id)),
            )
            .unwrap();

        wait_for_processing();

        let rm = coupons.get("SQ-DEADBEEF").unwrap();
        assert_eq!(rm.owner, owner);
        assert!(!rm.is_used);

        dispatcher
            .dispatch(
                coupon_id.0,
                "coupons.coupon",
                CouponCommand::ConsumeCoupon(souq_coupons::ConsumeCoupon {
                    coupon_id,
                    occurred_at: Utc::now(),
                }),
                |id| Coupon::empty(CouponId::new(id)),
            )
            .unwrap();

        wait_for_processing();

        let rm = coupons.get("SQ-DEADBEEF").unwrap();
        assert!(rm.is_used);
        assert!(rm.used_at.is_some());
    }

    #[test]
    fn stale_append_is_a_concurrency_conflict() {
        let (dispatcher, _, _) = setup();
        let variant_id = VariantId::new(AggregateId::new());

        dispatcher
            .dispatch(
                variant_id.0,
                "inventory.stock",
                StockCommand::ReceiveStock(ReceiveStock {
                    variant_id,
                    quantity: 5,
                    occurred_at: Utc::now(),
                }),
                |id| VariantStock::empty(VariantId::new(id)),
            )
            .unwrap();

        // Simulate a writer that loaded before the receive committed.
        let store = dispatcher.store();
        let stale = UncommittedEvent::from_typed(
            variant_id.0,
            "inventory.stock",
            uuid::Uuid::now_v7(),
            &souq_inventory::StockEvent::StockReserved(souq_inventory::StockReserved {
                variant_id,
                quantity: 1,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let err = store
            .append(vec![stale], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::event_store::EventStoreError::Concurrency(_)
        ));
    }

    #[test]
    fn retry_resolves_write_contention() {
        let (dispatcher, _, _) = setup();
        let dispatcher = Arc::new(dispatcher);
        let variant_id = VariantId::new(AggregateId::new());

        dispatcher
            .dispatch(
                variant_id.0,
                "inventory.stock",
                StockCommand::ReceiveStock(ReceiveStock {
                    variant_id,
                    quantity: 64,
                    occurred_at: Utc::now(),
                }),
                |id| VariantStock::empty(VariantId::new(id)),
            )
            .unwrap();

        // Hammer the same stream from several threads; with retry every
        // reservation should land.
        let mut handles = Vec::new();
        for _ in 0..8 {
            let dispatcher = dispatcher.clone();
            handles.push(std::thread::spawn(move || {
                dispatcher.dispatch_with_retry(
                    variant_id.0,
                    "inventory.stock",
                    StockCommand::Reserve(Reserve {
                        variant_id,
                        quantity: 8,
                        occurred_at: Utc::now(),
                    }),
                    |id| VariantStock::empty(VariantId::new(id)),
                    16,
                )
            }));
        }

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let history = dispatcher.store().load_stream(variant_id.0).unwrap();
        // 1 receive + 8 reserves.
        assert_eq!(history.len(), 9);
    }

    #[test]
    fn domain_failures_are_not_retried() {
        let (dispatcher, _, _) = setup();
        let variant_id = VariantId::new(AggregateId::new());

        let err = dispatcher
            .dispatch_with_retry(
                variant_id.0,
                "inventory.stock",
                StockCommand::Reserve(Reserve {
                    variant_id,
                    quantity: 1,
                    occurred_at: Utc::now(),
                }),
                |id| VariantStock::empty(VariantId::new(id)),
                16,
            )
            .unwrap_err();

        match err {
            DispatchError::OutOfStock { available } => assert_eq!(available, 0),
            other => panic!("Expected OutOfStock, got {other:?}"),
        }
    }

    #[test]
    fn projection_ignores_replayed_envelopes() {
        let (dispatcher, orders, _) = setup();
        let order_id = OrderId::new(AggregateId::new());
        let owner = UserId::new();

        let committed = dispatcher
            .dispatch(
                order_id.0,
                "orders.order",
                OrderCommand::CreateOrder(create_order_cmd(order_id, owner)),
                |id| Order::empty(OrderId::new(id)),
            )
            .unwrap();

        wait_for_processing();

        // Re-deliver the committed envelope; the cursor swallows it.
        for stored in &committed {
            orders.apply_envelope(&stored.to_envelope()).unwrap();
        }

        assert_eq!(orders.list().len(), 1);
    }

    #[test]
    fn projection_rebuilds_from_the_store() {
        let (dispatcher, orders, _) = setup();
        let order_id = OrderId::new(AggregateId::new());
        let owner = UserId::new();

        dispatcher
            .dispatch(
                order_id.0,
                "orders.order",
                OrderCommand::CreateOrder(create_order_cmd(order_id, owner)),
                |id| Order::empty(OrderId::new(id)),
            )
            .unwrap();

        wait_for_processing();

        let history = dispatcher.store().load_stream(order_id.0).unwrap();
        orders
            .rebuild_from_scratch(history.iter().map(|s| s.to_envelope()))
            .unwrap();

        let rm = orders.get(&order_id).unwrap();
        assert_eq!(rm.owner, owner);
    }
}
