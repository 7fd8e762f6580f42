use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souq_core::{Aggregate, AggregateRoot, AggregateId, DomainError, Money, UserId};
use souq_events::Event;

/// Coupon identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponId(pub AggregateId);

impl CouponId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CouponId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupon {
    id: CouponId,
    owner: UserId,
    code: String,
    value: Money,
    is_used: bool,
    used_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Coupon {
    /// Create an empty, not-yet-issued aggregate instance for rehydration.
    pub fn empty(id: CouponId) -> Self {
        Self {
            id,
            owner: UserId::default(),
            code: String::new(),
            value: Money::ZERO,
            is_used: false,
            used_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> CouponId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn value(&self) -> Money {
        self.value
    }

    pub fn is_used(&self) -> bool {
        self.is_used
    }

    pub fn used_at(&self) -> Option<DateTime<Utc>> {
        self.used_at
    }
}

impl AggregateRoot for Coupon {
    type Id = CouponId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: IssueCoupon (loyalty reward or admin grant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCoupon {
    pub coupon_id: CouponId,
    pub owner: UserId,
    pub code: String,
    pub value: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConsumeCoupon (after the order using it committed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeCoupon {
    pub coupon_id: CouponId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponCommand {
    IssueCoupon(IssueCoupon),
    ConsumeCoupon(ConsumeCoupon),
}

/// Event: CouponIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponIssued {
    pub coupon_id: CouponId,
    pub owner: UserId,
    pub code: String,
    pub value: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CouponConsumed. Carries the code so code-keyed read models can
/// update without an id lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponConsumed {
    pub coupon_id: CouponId,
    pub code: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponEvent {
    CouponIssued(CouponIssued),
    CouponConsumed(CouponConsumed),
}

impl Event for CouponEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CouponEvent::CouponIssued(_) => "coupons.coupon.issued",
            CouponEvent::CouponConsumed(_) => "coupons.coupon.consumed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CouponEvent::CouponIssued(e) => e.occurred_at,
            CouponEvent::CouponConsumed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Coupon {
    type Command = CouponCommand;
    type Event = CouponEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CouponEvent::CouponIssued(e) => {
                self.id = e.coupon_id;
                self.owner = e.owner;
                self.code = e.code.clone();
                self.value = e.value;
                self.is_used = false;
                self.used_at = None;
                self.created = true;
            }
            CouponEvent::CouponConsumed(e) => {
                self.is_used = true;
                self.used_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CouponCommand::IssueCoupon(cmd) => self.handle_issue(cmd),
            CouponCommand::ConsumeCoupon(cmd) => self.handle_consume(cmd),
        }
    }
}

impl Coupon {
    fn ensure_coupon_id(&self, coupon_id: CouponId) -> Result<(), DomainError> {
        if self.id != coupon_id {
            return Err(DomainError::invariant("coupon_id mismatch"));
        }
        Ok(())
    }

    fn handle_issue(&self, cmd: &IssueCoupon) -> Result<Vec<CouponEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("coupon already issued"));
        }
        if cmd.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }
        if cmd.value.is_zero() {
            return Err(DomainError::validation("value must be positive"));
        }

        Ok(vec![CouponEvent::CouponIssued(CouponIssued {
            coupon_id: cmd.coupon_id,
            owner: cmd.owner,
            code: cmd.code.clone(),
            value: cmd.value,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_consume(&self, cmd: &ConsumeCoupon) -> Result<Vec<CouponEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_coupon_id(cmd.coupon_id)?;

        // At-most-once: a used coupon can never be consumed again.
        if self.is_used {
            return Err(DomainError::conflict("coupon already used"));
        }

        Ok(vec![CouponEvent::CouponConsumed(CouponConsumed {
            coupon_id: cmd.coupon_id,
            code: self.code.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::generate_code;

    fn test_coupon_id() -> CouponId {
        CouponId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn issued_coupon() -> Coupon {
        let mut coupon = Coupon::empty(test_coupon_id());
        let cmd = IssueCoupon {
            coupon_id: coupon.id_typed(),
            owner: UserId::new(),
            code: generate_code(),
            value: Money::from_minor(500),
            occurred_at: test_time(),
        };
        let events = coupon.handle(&CouponCommand::IssueCoupon(cmd)).unwrap();
        coupon.apply(&events[0]);
        coupon
    }

    #[test]
    fn issue_emits_coupon_issued_event() {
        let coupon = Coupon::empty(test_coupon_id());
        let owner = UserId::new();
        let cmd = IssueCoupon {
            coupon_id: coupon.id_typed(),
            owner,
            code: "SQ-ABCD1234".to_string(),
            value: Money::from_minor(500),
            occurred_at: test_time(),
        };

        let events = coupon.handle(&CouponCommand::IssueCoupon(cmd)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            CouponEvent::CouponIssued(e) => {
                assert_eq!(e.owner, owner);
                assert_eq!(e.code, "SQ-ABCD1234");
                assert_eq!(e.value, Money::from_minor(500));
            }
            _ => panic!("Expected CouponIssued event"),
        }
    }

    #[test]
    fn cannot_issue_twice() {
        let coupon = issued_coupon();
        let cmd = IssueCoupon {
            coupon_id: coupon.id_typed(),
            owner: UserId::new(),
            code: generate_code(),
            value: Money::from_minor(100),
            occurred_at: test_time(),
        };

        let err = coupon.handle(&CouponCommand::IssueCoupon(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn consume_marks_used_with_timestamp() {
        let mut coupon = issued_coupon();
        let at = test_time();
        let cmd = ConsumeCoupon {
            coupon_id: coupon.id_typed(),
            occurred_at: at,
        };

        let events = coupon.handle(&CouponCommand::ConsumeCoupon(cmd)).unwrap();
        match &events[0] {
            CouponEvent::CouponConsumed(e) => assert_eq!(e.code, coupon.code()),
            _ => panic!("Expected CouponConsumed event"),
        }
        coupon.apply(&events[0]);

        assert!(coupon.is_used());
        assert_eq!(coupon.used_at(), Some(at));
    }

    #[test]
    fn consume_is_at_most_once() {
        let mut coupon = issued_coupon();
        let cmd = ConsumeCoupon {
            coupon_id: coupon.id_typed(),
            occurred_at: test_time(),
        };
        let events = coupon
            .handle(&CouponCommand::ConsumeCoupon(cmd.clone()))
            .unwrap();
        coupon.apply(&events[0]);

        let err = coupon.handle(&CouponCommand::ConsumeCoupon(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn consume_unissued_coupon_is_not_found() {
        let coupon = Coupon::empty(test_coupon_id());
        let cmd = ConsumeCoupon {
            coupon_id: coupon.id_typed(),
            occurred_at: test_time(),
        };

        let err = coupon.handle(&CouponCommand::ConsumeCoupon(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }
}
