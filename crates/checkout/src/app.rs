use std::sync::Arc;

use serde_json::Value as JsonValue;

use souq_auth::{Principal, require_owner_or_staff, require_staff};
use souq_catalog::{Catalog, VariantId};
use souq_core::{Money, UserId};
use souq_events::{EventEnvelope, InMemoryEventBus};
use souq_infra::{
    CommandDispatcher, CouponDirectoryProjection, CouponReadModel, EventStore, InMemoryEventStore,
    InMemoryKeyValueStore, OrderReadModel, OrdersProjection, StoredEvent, rehydrate,
};
use souq_loyalty::{AdjustPoints, LoyaltyAccount, LoyaltyCommand};
use souq_orders::{Order, OrderId};

use crate::error::CheckoutError;
use crate::ledgers::{CouponLedger, InventoryLedger};

/// Aggregate type identifiers, shared by dispatch and projection routing.
pub(crate) const STOCK_AGGREGATE: &str = "inventory.stock";
pub(crate) const COUPON_AGGREGATE: &str = "coupons.coupon";
pub(crate) const ORDER_AGGREGATE: &str = "orders.order";
pub(crate) const LOYALTY_AGGREGATE: &str = "loyalty.account";

/// Bound on transparent retries for contended writes. Every failed attempt
/// means another writer committed, so the loop cannot spin without progress
/// somewhere in the system.
pub(crate) const MAX_ATTEMPTS: u32 = 8;

pub type AppBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
pub type AppDispatcher = CommandDispatcher<Arc<InMemoryEventStore>, AppBus>;
pub type AppOrdersProjection = OrdersProjection<InMemoryKeyValueStore<OrderId, OrderReadModel>>;
pub type AppCouponDirectory =
    CouponDirectoryProjection<InMemoryKeyValueStore<String, CouponReadModel>>;

/// The wired-up application: dispatcher, ledgers, projections, catalog.
///
/// Projections are fed synchronously from each dispatch's committed events,
/// giving service methods read-your-writes; their cursors make a concurrent
/// bus subscriber harmless.
pub struct CheckoutApp {
    dispatcher: Arc<AppDispatcher>,
    bus: AppBus,
    catalog: Arc<dyn Catalog>,
    orders: Arc<AppOrdersProjection>,
    coupon_directory: Arc<AppCouponDirectory>,
    inventory: InventoryLedger,
    coupons: CouponLedger,
}

impl CheckoutApp {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: AppBus = Arc::new(InMemoryEventBus::new());
        let dispatcher = Arc::new(CommandDispatcher::new(store, bus.clone()));
        let orders = Arc::new(OrdersProjection::new(InMemoryKeyValueStore::new()));
        let coupon_directory =
            Arc::new(CouponDirectoryProjection::new(InMemoryKeyValueStore::new()));

        Self {
            inventory: InventoryLedger::new(dispatcher.clone()),
            coupons: CouponLedger::new(dispatcher.clone(), coupon_directory.clone()),
            dispatcher,
            bus,
            catalog,
            orders,
            coupon_directory,
        }
    }

    pub(crate) fn dispatcher(&self) -> &Arc<AppDispatcher> {
        &self.dispatcher
    }

    pub(crate) fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub(crate) fn inventory(&self) -> &InventoryLedger {
        &self.inventory
    }

    pub(crate) fn coupons(&self) -> &CouponLedger {
        &self.coupons
    }

    /// The bus carrying every committed envelope, for external subscribers.
    pub fn event_bus(&self) -> &AppBus {
        &self.bus
    }

    /// Feed committed events into the read models.
    ///
    /// Read models are disposable; a failed apply is logged and skipped, and
    /// a rebuild from the store repairs it.
    pub(crate) fn project(&self, committed: &[StoredEvent]) {
        for stored in committed {
            let result = match stored.aggregate_type.as_str() {
                ORDER_AGGREGATE => self.orders.apply_envelope(&stored.to_envelope()),
                COUPON_AGGREGATE => self.coupon_directory.apply_envelope(&stored.to_envelope()),
                _ => Ok(()),
            };
            if let Err(error) = result {
                tracing::warn!(
                    aggregate_type = %stored.aggregate_type,
                    sequence_number = stored.sequence_number,
                    %error,
                    "projection apply failed; read model may lag until rebuilt"
                );
            }
        }
    }

    // ---- queries ----

    pub fn order(&self, order_id: &OrderId) -> Option<OrderReadModel> {
        self.orders.get(order_id)
    }

    pub fn orders_for(&self, principal: &Principal, owner: UserId) -> Result<Vec<OrderReadModel>, CheckoutError> {
        require_owner_or_staff(principal, owner)?;
        Ok(self.orders.list_for(owner))
    }

    pub fn coupons_for(&self, principal: &Principal, owner: UserId) -> Result<Vec<CouponReadModel>, CheckoutError> {
        require_owner_or_staff(principal, owner)?;
        Ok(self.coupon_directory.list_for(owner))
    }

    pub fn on_hand(&self, variant_id: VariantId) -> Result<i64, CheckoutError> {
        self.inventory.on_hand(variant_id)
    }

    pub fn points(&self, principal: &Principal, user_id: UserId) -> Result<i64, CheckoutError> {
        require_owner_or_staff(principal, user_id)?;
        Ok(self.load_points(user_id)?.points())
    }

    // ---- back-office operations ----

    /// Stock intake: seed or replenish a variant's on-hand quantity.
    pub fn receive_stock(
        &self,
        principal: &Principal,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CheckoutError> {
        require_staff(principal)?;
        let committed = self.inventory.receive(variant_id, quantity)?;
        self.project(&committed);
        tracing::info!(%variant_id, quantity, "stock received");
        Ok(())
    }

    /// Grant a coupon to a user directly (outside the loyalty flow).
    pub fn grant_coupon(
        &self,
        principal: &Principal,
        owner: UserId,
        value: Money,
    ) -> Result<CouponReadModel, CheckoutError> {
        require_staff(principal)?;
        let code = souq_coupons::generate_code();
        let committed = self.coupons.issue(owner, code.clone(), value)?;
        self.project(&committed);
        tracing::info!(%owner, code, %value, "coupon granted");

        self.coupon_directory
            .get(&code)
            .ok_or(CheckoutError::NotFound)
    }

    /// Override a user's loyalty balance.
    pub fn adjust_points(
        &self,
        principal: &Principal,
        user_id: UserId,
        points: i64,
    ) -> Result<(), CheckoutError> {
        require_staff(principal)?;
        let committed = self.dispatcher.dispatch_with_retry(
            LoyaltyAccount::stream_id(user_id),
            LOYALTY_AGGREGATE,
            LoyaltyCommand::AdjustPoints(AdjustPoints {
                user_id,
                points,
                occurred_at: chrono::Utc::now(),
            }),
            |_| LoyaltyAccount::empty(user_id),
            MAX_ATTEMPTS,
        )?;
        self.project(&committed);
        tracing::info!(%user_id, points, "points adjusted");
        Ok(())
    }

    // ---- rehydration helpers ----

    pub(crate) fn load_order(&self, order_id: OrderId) -> Result<Order, CheckoutError> {
        let history = self.dispatcher.store().load_stream(order_id.0)?;
        let mut order = Order::empty(order_id);
        rehydrate(&mut order, &history)?;
        if !order.exists() {
            return Err(CheckoutError::NotFound);
        }
        Ok(order)
    }

    pub(crate) fn load_points(&self, user_id: UserId) -> Result<LoyaltyAccount, CheckoutError> {
        let history = self
            .dispatcher
            .store()
            .load_stream(LoyaltyAccount::stream_id(user_id))?;
        let mut account = LoyaltyAccount::empty(user_id);
        rehydrate(&mut account, &history)?;
        Ok(account)
    }
}
