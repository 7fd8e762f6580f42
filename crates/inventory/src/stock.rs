use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souq_catalog::VariantId;
use souq_core::{Aggregate, AggregateRoot, DomainError};
use souq_events::Event;

/// Aggregate root: on-hand stock for one product variant.
///
/// The stream starts at zero; there is no explicit "create" step. A variant
/// with no events simply has nothing on hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStock {
    id: VariantId,
    on_hand: i64,
    version: u64,
}

impl VariantStock {
    /// Create an empty aggregate instance for rehydration.
    pub fn empty(id: VariantId) -> Self {
        Self {
            id,
            on_hand: 0,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> VariantId {
        self.id
    }

    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }
}

impl AggregateRoot for VariantStock {
    type Id = VariantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ReceiveStock (intake / restock, staff-only at the service layer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Reserve stock for an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Release previously reserved stock back to the shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    ReceiveStock(ReceiveStock),
    Reserve(Reserve),
    Release(Release),
}

/// Event: StockReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReserved {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReleased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReleased {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    StockReceived(StockReceived),
    StockReserved(StockReserved),
    StockReleased(StockReleased),
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::StockReceived(_) => "inventory.stock.received",
            StockEvent::StockReserved(_) => "inventory.stock.reserved",
            StockEvent::StockReleased(_) => "inventory.stock.released",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::StockReceived(e) => e.occurred_at,
            StockEvent::StockReserved(e) => e.occurred_at,
            StockEvent::StockReleased(e) => e.occurred_at,
        }
    }
}

impl Aggregate for VariantStock {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::StockReceived(e) => {
                self.on_hand += i64::from(e.quantity);
            }
            StockEvent::StockReserved(e) => {
                self.on_hand -= i64::from(e.quantity);
            }
            StockEvent::StockReleased(e) => {
                self.on_hand += i64::from(e.quantity);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::ReceiveStock(cmd) => self.handle_receive(cmd),
            StockCommand::Reserve(cmd) => self.handle_reserve(cmd),
            StockCommand::Release(cmd) => self.handle_release(cmd),
        }
    }
}

impl VariantStock {
    fn ensure_variant_id(&self, variant_id: VariantId) -> Result<(), DomainError> {
        if self.id != variant_id {
            return Err(DomainError::invariant("variant_id mismatch"));
        }
        Ok(())
    }

    fn ensure_positive(quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }

    fn handle_receive(&self, cmd: &ReceiveStock) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_variant_id(cmd.variant_id)?;
        Self::ensure_positive(cmd.quantity)?;

        Ok(vec![StockEvent::StockReceived(StockReceived {
            variant_id: cmd.variant_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reserve(&self, cmd: &Reserve) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_variant_id(cmd.variant_id)?;
        Self::ensure_positive(cmd.quantity)?;

        // The invariant: on-hand can never go below zero. A failed reserve
        // emits nothing.
        if i64::from(cmd.quantity) > self.on_hand {
            return Err(DomainError::out_of_stock(self.on_hand));
        }

        Ok(vec![StockEvent::StockReserved(StockReserved {
            variant_id: cmd.variant_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &Release) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_variant_id(cmd.variant_id)?;
        Self::ensure_positive(cmd.quantity)?;

        Ok(vec![StockEvent::StockReleased(StockReleased {
            variant_id: cmd.variant_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }
}
