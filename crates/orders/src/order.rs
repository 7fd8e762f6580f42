use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souq_catalog::VariantId;
use souq_core::{Aggregate, AggregateRoot, AggregateId, DomainError, Money, UserId};
use souq_events::Event;

use crate::shipping::{ShippingInfo, delivery_fee_for};

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Order status. Every transition between these is permitted; side effects of
/// a transition (points, stock) are the checkout service's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Delivered,
    Cancelled,
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Order line: a priced snapshot of a resolved variant at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub variant_id: VariantId,
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub quantity: u32,
    /// Price in smallest currency unit at resolution time.
    pub sale_price: Money,
    pub purchase_price: Money,
}

impl OrderLine {
    pub fn extended_price(&self) -> Money {
        self.sale_price.times(self.quantity)
    }
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    owner: UserId,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    shipping: Option<ShippingInfo>,
    cart_total: Money,
    delivery_fee: Money,
    total: Money,
    coupon_code: Option<String>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            owner: UserId::default(),
            status: OrderStatus::Pending,
            lines: Vec::new(),
            shipping: None,
            cart_total: Money::ZERO,
            delivery_fee: Money::ZERO,
            total: Money::ZERO,
            coupon_code: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn shipping(&self) -> Option<&ShippingInfo> {
        self.shipping.as_ref()
    }

    pub fn cart_total(&self) -> Money {
        self.cart_total
    }

    pub fn delivery_fee(&self) -> Money {
        self.delivery_fee
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    pub fn has_coupon(&self) -> bool {
        self.coupon_code.is_some()
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrder. Lines, totals, and the coupon code arrive already
/// resolved and validated against external state by the checkout service;
/// the aggregate re-checks everything it can verify alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub order_id: OrderId,
    pub owner: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingInfo,
    pub cart_total: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub coupon_code: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReplaceItems. The new set replaces the old wholesale; partial
/// line edits are expressed by sending the full target set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceItems {
    pub order_id: OrderId,
    pub lines: Vec<OrderLine>,
    pub cart_total: Money,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    CreateOrder(CreateOrder),
    ChangeStatus(ChangeStatus),
    ReplaceItems(ReplaceItems),
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub owner: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingInfo,
    pub cart_total: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub coupon_code: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemsReplaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsReplaced {
    pub order_id: OrderId,
    pub lines: Vec<OrderLine>,
    pub cart_total: Money,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderCreated(OrderCreated),
    StatusChanged(StatusChanged),
    ItemsReplaced(ItemsReplaced),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "orders.order.created",
            OrderEvent::StatusChanged(_) => "orders.order.status_changed",
            OrderEvent::ItemsReplaced(_) => "orders.order.items_replaced",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCreated(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
            OrderEvent::ItemsReplaced(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.owner = e.owner;
                self.status = OrderStatus::Pending;
                self.lines = e.lines.clone();
                self.shipping = Some(e.shipping.clone());
                self.cart_total = e.cart_total;
                self.delivery_fee = e.delivery_fee;
                self.total = e.total;
                self.coupon_code = e.coupon_code.clone();
                self.created = true;
            }
            OrderEvent::StatusChanged(e) => {
                self.status = e.to;
            }
            OrderEvent::ItemsReplaced(e) => {
                self.lines = e.lines.clone();
                self.cart_total = e.cart_total;
                self.total = e.total;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::CreateOrder(cmd) => self.handle_create(cmd),
            OrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            OrderCommand::ReplaceItems(cmd) => self.handle_replace_items(cmd),
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_lines(lines: &[OrderLine]) -> Result<(), DomainError> {
        if lines.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        if lines.iter().any(|line| line.quantity == 0) {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        Self::ensure_lines(&cmd.lines)?;
        cmd.shipping.validate()?;

        if cmd.delivery_fee != delivery_fee_for(&cmd.shipping.governorate) {
            return Err(DomainError::validation(format!(
                "delivery fee for '{}' must be {}",
                cmd.shipping.governorate,
                delivery_fee_for(&cmd.shipping.governorate)
            )));
        }

        // Totals invariant. cart_total already reflects any coupon discount.
        if cmd.total != cmd.cart_total + cmd.delivery_fee {
            return Err(DomainError::validation(format!(
                "total mismatch: expected {}, got {}",
                cmd.cart_total + cmd.delivery_fee,
                cmd.total
            )));
        }

        Ok(vec![OrderEvent::OrderCreated(OrderCreated {
            order_id: cmd.order_id,
            owner: cmd.owner,
            lines: cmd.lines.clone(),
            shipping: cmd.shipping.clone(),
            cart_total: cmd.cart_total,
            delivery_fee: cmd.delivery_fee,
            total: cmd.total,
            coupon_code: cmd.coupon_code.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<OrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_order_id(cmd.order_id)?;

        // Setting the current status again is a no-op, not an error.
        if cmd.status == self.status {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::StatusChanged(StatusChanged {
            order_id: cmd.order_id,
            from: self.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_replace_items(&self, cmd: &ReplaceItems) -> Result<Vec<OrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_order_id(cmd.order_id)?;
        Self::ensure_lines(&cmd.lines)?;

        if cmd.total != cmd.cart_total + self.delivery_fee {
            return Err(DomainError::validation(format!(
                "total mismatch: expected {}, got {}",
                cmd.cart_total + self.delivery_fee,
                cmd.total
            )));
        }

        Ok(vec![OrderEvent::ItemsReplaced(ItemsReplaced {
            order_id: cmd.order_id,
            lines: cmd.lines.clone(),
            cart_total: cmd.cart_total,
            total: cmd.total,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_order_id() -> OrderId {
        OrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_shipping() -> ShippingInfo {
        ShippingInfo {
            full_name: "Mona Adel".to_string(),
            address: "12 Tahrir St".to_string(),
            phone: "01000000000".to_string(),
            governorate: "Cairo".to_string(),
        }
    }

    fn test_line(quantity: u32, sale_price: i64) -> OrderLine {
        OrderLine {
            variant_id: VariantId::new(AggregateId::new()),
            product_name: "Shirt".to_string(),
            color: "Red".to_string(),
            size: "M".to_string(),
            quantity,
            sale_price: Money::from_minor(sale_price),
            purchase_price: Money::from_minor(sale_price / 2),
        }
    }

    fn create_cmd(order_id: OrderId) -> CreateOrder {
        // 2 x 100 + Cairo fee 40 = 240.
        CreateOrder {
            order_id,
            owner: UserId::new(),
            lines: vec![test_line(2, 100)],
            shipping: test_shipping(),
            cart_total: Money::from_minor(200),
            delivery_fee: Money::from_minor(40),
            total: Money::from_minor(240),
            coupon_code: None,
            occurred_at: test_time(),
        }
    }

    fn created_order() -> Order {
        let id = test_order_id();
        let mut order = Order::empty(id);
        let events = order
            .handle(&OrderCommand::CreateOrder(create_cmd(id)))
            .unwrap();
        order.apply(&events[0]);
        order
    }

    #[test]
    fn create_order_emits_order_created_with_totals() {
        let id = test_order_id();
        let order = Order::empty(id);
        let cmd = create_cmd(id);

        let events = order.handle(&OrderCommand::CreateOrder(cmd)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            OrderEvent::OrderCreated(e) => {
                assert_eq!(e.cart_total, Money::from_minor(200));
                assert_eq!(e.delivery_fee, Money::from_minor(40));
                assert_eq!(e.total, Money::from_minor(240));
            }
            _ => panic!("Expected OrderCreated event"),
        }
    }

    #[test]
    fn total_mismatch_is_rejected() {
        let id = test_order_id();
        let order = Order::empty(id);
        let mut cmd = create_cmd(id);
        cmd.total = Money::from_minor(239);

        let err = order.handle(&OrderCommand::CreateOrder(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn wrong_delivery_fee_for_governorate_is_rejected() {
        let id = test_order_id();
        let order = Order::empty(id);
        let mut cmd = create_cmd(id);
        cmd.delivery_fee = Money::from_minor(70);
        cmd.total = Money::from_minor(270);

        let err = order.handle(&OrderCommand::CreateOrder(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn empty_item_set_is_rejected() {
        let id = test_order_id();
        let order = Order::empty(id);
        let mut cmd = create_cmd(id);
        cmd.lines.clear();
        cmd.cart_total = Money::ZERO;
        cmd.total = Money::from_minor(40);

        let err = order.handle(&OrderCommand::CreateOrder(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn incomplete_shipping_is_rejected() {
        let id = test_order_id();
        let order = Order::empty(id);
        let mut cmd = create_cmd(id);
        cmd.shipping.address = String::new();

        let err = order.handle(&OrderCommand::CreateOrder(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn every_status_transition_is_permitted() {
        for (from, to) in [
            (OrderStatus::Pending, OrderStatus::Delivered),
            (OrderStatus::Pending, OrderStatus::Cancelled),
            (OrderStatus::Delivered, OrderStatus::Pending),
            (OrderStatus::Delivered, OrderStatus::Cancelled),
            (OrderStatus::Cancelled, OrderStatus::Pending),
            (OrderStatus::Cancelled, OrderStatus::Delivered),
        ] {
            let mut order = created_order();
            if from != OrderStatus::Pending {
                let events = order
                    .handle(&OrderCommand::ChangeStatus(ChangeStatus {
                        order_id: order.id_typed(),
                        status: from,
                        occurred_at: test_time(),
                    }))
                    .unwrap();
                order.apply(&events[0]);
            }

            let events = order
                .handle(&OrderCommand::ChangeStatus(ChangeStatus {
                    order_id: order.id_typed(),
                    status: to,
                    occurred_at: test_time(),
                }))
                .unwrap();
            assert_eq!(events.len(), 1);
            match &events[0] {
                OrderEvent::StatusChanged(e) => {
                    assert_eq!(e.from, from);
                    assert_eq!(e.to, to);
                }
                _ => panic!("Expected StatusChanged event"),
            }
            order.apply(&events[0]);
            assert_eq!(order.status(), to);
        }
    }

    #[test]
    fn setting_current_status_emits_nothing() {
        let order = created_order();
        let events = order
            .handle(&OrderCommand::ChangeStatus(ChangeStatus {
                order_id: order.id_typed(),
                status: OrderStatus::Pending,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn replace_items_swaps_the_whole_set() {
        let mut order = created_order();
        let new_lines = vec![test_line(1, 300)];
        let events = order
            .handle(&OrderCommand::ReplaceItems(ReplaceItems {
                order_id: order.id_typed(),
                lines: new_lines.clone(),
                cart_total: Money::from_minor(300),
                total: Money::from_minor(340),
                occurred_at: test_time(),
            }))
            .unwrap();
        order.apply(&events[0]);

        assert_eq!(order.lines(), new_lines.as_slice());
        assert_eq!(order.cart_total(), Money::from_minor(300));
        assert_eq!(order.total(), Money::from_minor(340));
        // Delivery fee is untouched by item edits.
        assert_eq!(order.delivery_fee(), Money::from_minor(40));
    }

    #[test]
    fn replace_items_rechecks_the_totals_invariant() {
        let order = created_order();
        let err = order
            .handle(&OrderCommand::ReplaceItems(ReplaceItems {
                order_id: order.id_typed(),
                lines: vec![test_line(1, 300)],
                cart_total: Money::from_minor(300),
                total: Money::from_minor(300),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let order = created_order();
        let before = order.clone();

        let _ = order.handle(&OrderCommand::ChangeStatus(ChangeStatus {
            order_id: order.id_typed(),
            status: OrderStatus::Delivered,
            occurred_at: test_time(),
        }));

        assert_eq!(order, before);
    }
}
