use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateRoot, DomainError, UserId};
use procura_events::Event;
use procura_parties::VendorId;
use procura_purchasing::OrderId;

procura_core::typed_aggregate_id!(
    /// Receipt identifier.
    ReceiptId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceivedCondition {
    Good,
    Damaged,
    Defective,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDetails {
    pub receipt_number: String,
    pub received_quantity: u32,
    pub condition: Option<ReceivedCondition>,
    pub inspection_notes: Option<String>,
}

/// Aggregate root: Receipt (goods received against a delivered order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    id: ReceiptId,
    order_id: Option<OrderId>,
    buyer_id: Option<UserId>,
    vendor_id: Option<VendorId>,
    receipt_date: Option<NaiveDate>,
    details: Option<ReceiptDetails>,
    version: u64,
    created: bool,
}

impl Receipt {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ReceiptId) -> Self {
        Self {
            id,
            order_id: None,
            buyer_id: None,
            vendor_id: None,
            receipt_date: None,
            details: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ReceiptId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn buyer_id(&self) -> Option<UserId> {
        self.buyer_id
    }

    pub fn vendor_id(&self) -> Option<VendorId> {
        self.vendor_id
    }

    pub fn receipt_date(&self) -> Option<NaiveDate> {
        self.receipt_date
    }

    pub fn details(&self) -> Option<&ReceiptDetails> {
        self.details.as_ref()
    }
}

impl AggregateRoot for Receipt {
    type Id = ReceiptId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: FileReceipt.
///
/// The order's delivery and one-receipt rule are enforced on the order stream
/// in the same commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReceipt {
    pub receipt_id: ReceiptId,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub vendor_id: VendorId,
    pub details: ReceiptDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AmendReceipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendReceipt {
    pub receipt_id: ReceiptId,
    pub details: ReceiptDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptCommand {
    FileReceipt(FileReceipt),
    AmendReceipt(AmendReceipt),
}

/// Event: ReceiptFiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFiled {
    pub receipt_id: ReceiptId,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub vendor_id: VendorId,
    pub details: ReceiptDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptAmended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptAmended {
    pub receipt_id: ReceiptId,
    pub details: ReceiptDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptEvent {
    ReceiptFiled(ReceiptFiled),
    ReceiptAmended(ReceiptAmended),
}

impl Event for ReceiptEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReceiptEvent::ReceiptFiled(_) => "fulfillment.receipt.filed",
            ReceiptEvent::ReceiptAmended(_) => "fulfillment.receipt.amended",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReceiptEvent::ReceiptFiled(e) => e.occurred_at,
            ReceiptEvent::ReceiptAmended(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Receipt {
    type Command = ReceiptCommand;
    type Event = ReceiptEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReceiptEvent::ReceiptFiled(e) => {
                self.id = e.receipt_id;
                self.order_id = Some(e.order_id);
                self.buyer_id = Some(e.buyer_id);
                self.vendor_id = Some(e.vendor_id);
                self.receipt_date = Some(e.occurred_at.date_naive());
                self.details = Some(e.details.clone());
                self.created = true;
            }
            ReceiptEvent::ReceiptAmended(e) => {
                self.details = Some(e.details.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ReceiptCommand::FileReceipt(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("receipt already exists"));
                }
                validate(&cmd.details)?;
                Ok(vec![ReceiptEvent::ReceiptFiled(ReceiptFiled {
                    receipt_id: cmd.receipt_id,
                    order_id: cmd.order_id,
                    buyer_id: cmd.buyer_id,
                    vendor_id: cmd.vendor_id,
                    details: cmd.details.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            ReceiptCommand::AmendReceipt(cmd) => {
                if !self.created || self.id != cmd.receipt_id {
                    return Err(DomainError::not_found());
                }
                validate(&cmd.details)?;
                Ok(vec![ReceiptEvent::ReceiptAmended(ReceiptAmended {
                    receipt_id: cmd.receipt_id,
                    details: cmd.details.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

fn validate(details: &ReceiptDetails) -> Result<(), DomainError> {
    if details.receipt_number.trim().is_empty() {
        return Err(DomainError::validation("receipt number cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_events::execute;

    fn test_details(received_quantity: u32) -> ReceiptDetails {
        ReceiptDetails {
            receipt_number: "RCT-1".to_string(),
            received_quantity,
            condition: Some(ReceivedCondition::Good),
            inspection_notes: None,
        }
    }

    fn filed_receipt() -> Receipt {
        let receipt_id = ReceiptId::generate();
        let mut receipt = Receipt::empty(receipt_id);
        execute(
            &mut receipt,
            &ReceiptCommand::FileReceipt(FileReceipt {
                receipt_id,
                order_id: OrderId::generate(),
                buyer_id: UserId::new(),
                vendor_id: VendorId::for_user(UserId::new()),
                details: test_details(50),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        receipt
    }

    #[test]
    fn filing_records_date_and_details() {
        let receipt = filed_receipt();
        assert!(receipt.receipt_date().is_some());
        assert_eq!(receipt.details().unwrap().received_quantity, 50);
    }

    #[test]
    fn amend_replaces_details() {
        let mut receipt = filed_receipt();
        let receipt_id = receipt.id_typed();
        let mut details = test_details(48);
        details.condition = Some(ReceivedCondition::Damaged);
        details.inspection_notes = Some("two crates crushed".to_string());

        execute(
            &mut receipt,
            &ReceiptCommand::AmendReceipt(AmendReceipt {
                receipt_id,
                details,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let details = receipt.details().unwrap();
        assert_eq!(details.received_quantity, 48);
        assert_eq!(details.condition, Some(ReceivedCondition::Damaged));
        assert_eq!(receipt.version(), 2);
    }

    #[test]
    fn second_filing_is_a_conflict() {
        let receipt = filed_receipt();
        let err = receipt
            .handle(&ReceiptCommand::FileReceipt(FileReceipt {
                receipt_id: receipt.id_typed(),
                order_id: OrderId::generate(),
                buyer_id: UserId::new(),
                vendor_id: VendorId::for_user(UserId::new()),
                details: test_details(1),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
