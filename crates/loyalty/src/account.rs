use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souq_core::{Aggregate, AggregateRoot, AggregateId, DomainError, Money, UserId};
use souq_coupons::{CouponId, generate_code};
use souq_events::Event;
use souq_orders::OrderStatus;

use crate::accrual::accrual;

/// Aggregate root: a user's loyalty point balance.
///
/// The stream is keyed by the owning user: `AggregateId::from_uuid(user
/// uuid)`. An account with no events has a zero balance; there is no explicit
/// open step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoyaltyAccount {
    id: AggregateId,
    user_id: UserId,
    points: i64,
    version: u64,
}

impl LoyaltyAccount {
    /// Stream id for a user's account.
    pub fn stream_id(user_id: UserId) -> AggregateId {
        AggregateId::from_uuid(*user_id.as_uuid())
    }

    /// Create an empty aggregate instance for rehydration.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            id: Self::stream_id(user_id),
            user_id,
            points: 0,
            version: 0,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn points(&self) -> i64 {
        self.points
    }
}

impl AggregateRoot for LoyaltyAccount {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordTransition. An order owned by this user changed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTransition {
    pub user_id: UserId,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub has_coupon: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustPoints. Admin override of the balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustPoints {
    pub user_id: UserId,
    pub points: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoyaltyCommand {
    RecordTransition(RecordTransition),
    AdjustPoints(AdjustPoints),
}

/// Event: PointsCredited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsCredited {
    pub user_id: UserId,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PointsDebited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsDebited {
    pub user_id: UserId,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CouponEarned. The balance crossed the reward threshold.
///
/// Applying this event resets the balance to zero, so the credit, the reward,
/// and the reset commit (or fail) as one append. Downstream, the checkout
/// service materializes the coupon aggregate from this event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponEarned {
    pub user_id: UserId,
    pub coupon_id: CouponId,
    pub code: String,
    pub value: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PointsSet (admin override).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsSet {
    pub user_id: UserId,
    pub points: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoyaltyEvent {
    PointsCredited(PointsCredited),
    PointsDebited(PointsDebited),
    CouponEarned(CouponEarned),
    PointsSet(PointsSet),
}

impl Event for LoyaltyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LoyaltyEvent::PointsCredited(_) => "loyalty.account.points_credited",
            LoyaltyEvent::PointsDebited(_) => "loyalty.account.points_debited",
            LoyaltyEvent::CouponEarned(_) => "loyalty.account.coupon_earned",
            LoyaltyEvent::PointsSet(_) => "loyalty.account.points_set",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LoyaltyEvent::PointsCredited(e) => e.occurred_at,
            LoyaltyEvent::PointsDebited(e) => e.occurred_at,
            LoyaltyEvent::CouponEarned(e) => e.occurred_at,
            LoyaltyEvent::PointsSet(e) => e.occurred_at,
        }
    }
}

impl Aggregate for LoyaltyAccount {
    type Command = LoyaltyCommand;
    type Event = LoyaltyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LoyaltyEvent::PointsCredited(e) => {
                self.points += e.amount;
            }
            LoyaltyEvent::PointsDebited(e) => {
                self.points = (self.points - e.amount).max(0);
            }
            LoyaltyEvent::CouponEarned(_) => {
                self.points = 0;
            }
            LoyaltyEvent::PointsSet(e) => {
                self.points = e.points;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LoyaltyCommand::RecordTransition(cmd) => self.handle_transition(cmd),
            LoyaltyCommand::AdjustPoints(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl LoyaltyAccount {
    fn ensure_user(&self, user_id: UserId) -> Result<(), DomainError> {
        if self.user_id != user_id {
            return Err(DomainError::invariant("user_id mismatch"));
        }
        Ok(())
    }

    fn handle_transition(&self, cmd: &RecordTransition) -> Result<Vec<LoyaltyEvent>, DomainError> {
        self.ensure_user(cmd.user_id)?;

        let decision = accrual(cmd.old_status, cmd.new_status, cmd.has_coupon, self.points);

        let mut events = Vec::new();
        if decision.point_delta > 0 {
            events.push(LoyaltyEvent::PointsCredited(PointsCredited {
                user_id: cmd.user_id,
                amount: decision.point_delta,
                occurred_at: cmd.occurred_at,
            }));
        } else if decision.point_delta < 0 {
            events.push(LoyaltyEvent::PointsDebited(PointsDebited {
                user_id: cmd.user_id,
                amount: -decision.point_delta,
                occurred_at: cmd.occurred_at,
            }));
        }

        if let Some(value) = decision.coupon_value {
            // Credit, reward, and reset land in one batch; one append makes
            // the threshold crossing atomic.
            events.push(LoyaltyEvent::CouponEarned(CouponEarned {
                user_id: cmd.user_id,
                coupon_id: CouponId::new(AggregateId::new()),
                code: generate_code(),
                value,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_adjust(&self, cmd: &AdjustPoints) -> Result<Vec<LoyaltyEvent>, DomainError> {
        self.ensure_user(cmd.user_id)?;

        if cmd.points < 0 {
            return Err(DomainError::validation("points cannot be negative"));
        }

        Ok(vec![LoyaltyEvent::PointsSet(PointsSet {
            user_id: cmd.user_id,
            points: cmd.points,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn account_with(points: i64) -> LoyaltyAccount {
        let mut account = LoyaltyAccount::empty(UserId::new());
        if points > 0 {
            let cmd = AdjustPoints {
                user_id: account.user_id(),
                points,
                occurred_at: test_time(),
            };
            let events = account.handle(&LoyaltyCommand::AdjustPoints(cmd)).unwrap();
            account.apply(&events[0]);
        }
        account
    }

    fn transition(
        account: &LoyaltyAccount,
        old: OrderStatus,
        new: OrderStatus,
        has_coupon: bool,
    ) -> Vec<LoyaltyEvent> {
        account
            .handle(&LoyaltyCommand::RecordTransition(RecordTransition {
                user_id: account.user_id(),
                old_status: old,
                new_status: new,
                has_coupon,
                occurred_at: test_time(),
            }))
            .unwrap()
    }

    #[test]
    fn delivery_credits_seventy_points() {
        let mut account = account_with(0);
        let events = transition(
            &account,
            OrderStatus::Pending,
            OrderStatus::Delivered,
            false,
        );
        assert_eq!(events.len(), 1);
        for event in &events {
            account.apply(event);
        }
        assert_eq!(account.points(), 70);
    }

    #[test]
    fn coupon_order_delivery_credits_nothing() {
        let account = account_with(430);
        let events = transition(&account, OrderStatus::Pending, OrderStatus::Delivered, true);
        assert!(events.is_empty());
    }

    #[test]
    fn threshold_crossing_credits_rewards_and_resets_in_one_batch() {
        let mut account = account_with(430);
        let events = transition(
            &account,
            OrderStatus::Pending,
            OrderStatus::Delivered,
            false,
        );
        assert_eq!(events.len(), 2);

        match (&events[0], &events[1]) {
            (LoyaltyEvent::PointsCredited(credit), LoyaltyEvent::CouponEarned(earned)) => {
                assert_eq!(credit.amount, 70);
                assert_eq!(earned.value, Money::from_minor(500));
                assert!(earned.code.starts_with("SQ-"));
            }
            _ => panic!("Expected PointsCredited then CouponEarned"),
        }

        for event in &events {
            account.apply(event);
        }
        assert_eq!(account.points(), 0);
    }

    #[test]
    fn undelivering_takes_the_credit_back() {
        let mut account = account_with(0);
        for event in &transition(
            &account,
            OrderStatus::Pending,
            OrderStatus::Delivered,
            false,
        ) {
            account.apply(event);
        }
        assert_eq!(account.points(), 70);

        let events = transition(
            &account,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            false,
        );
        for event in &events {
            account.apply(event);
        }
        assert_eq!(account.points(), 0);
    }

    #[test]
    fn debit_never_drives_balance_negative() {
        let mut account = account_with(30);
        let events = transition(
            &account,
            OrderStatus::Delivered,
            OrderStatus::Pending,
            false,
        );
        for event in &events {
            account.apply(event);
        }
        assert_eq!(account.points(), 0);
    }

    #[test]
    fn admin_adjustment_sets_the_balance() {
        let mut account = account_with(0);
        let cmd = AdjustPoints {
            user_id: account.user_id(),
            points: 250,
            occurred_at: test_time(),
        };
        let events = account.handle(&LoyaltyCommand::AdjustPoints(cmd)).unwrap();
        account.apply(&events[0]);
        assert_eq!(account.points(), 250);

        let cmd = AdjustPoints {
            user_id: account.user_id(),
            points: -1,
            occurred_at: test_time(),
        };
        let err = account
            .handle(&LoyaltyCommand::AdjustPoints(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        /// Any accepted sequence of transitions and adjustments keeps the
        /// balance non-negative.
        #[test]
        fn balance_never_negative(ops in proptest::collection::vec((0u8..4, 0i64..600), 0..40)) {
            let mut account = LoyaltyAccount::empty(UserId::new());
            let statuses = [OrderStatus::Pending, OrderStatus::Delivered, OrderStatus::Cancelled];

            for (kind, n) in ops {
                let cmd = match kind {
                    0..=2 => LoyaltyCommand::RecordTransition(RecordTransition {
                        user_id: account.user_id(),
                        old_status: statuses[kind as usize],
                        new_status: statuses[(n % 3) as usize],
                        has_coupon: n % 2 == 0,
                        occurred_at: test_time(),
                    }),
                    _ => LoyaltyCommand::AdjustPoints(AdjustPoints {
                        user_id: account.user_id(),
                        points: n,
                        occurred_at: test_time(),
                    }),
                };

                if let Ok(events) = account.handle(&cmd) {
                    for event in &events {
                        account.apply(event);
                    }
                }
                prop_assert!(account.points() >= 0);
            }
        }
    }
}
