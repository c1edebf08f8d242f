use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateRoot, DomainError, UserId};
use procura_events::Event;
use procura_inventory::InventoryItemId;
use procura_parties::VendorId;

use crate::bid::BidId;

procura_core::typed_aggregate_id!(
    /// Requisition identifier.
    RequisitionId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// Requisition lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequisitionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Officer-editable terms of a requisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionDetails {
    pub requested_quantity: u32,
    pub expected_delivery: NaiveDate,
    pub urgency: Urgency,
    pub comments: Option<String>,
}

/// A vendor's registered bid against this requisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRegistration {
    pub vendor_id: VendorId,
    pub bid_id: BidId,
}

/// Aggregate root: Requisition.
///
/// Besides its own lifecycle, the requisition owns the registry of bids raised
/// against it. Every bid submission and every award writes this stream, which
/// makes the one-bid-per-vendor rule and the single-award rule
/// compare-and-swap checks on one version number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requisition {
    id: RequisitionId,
    item_id: Option<InventoryItemId>,
    owner: Option<UserId>,
    requisition_number: String,
    details: Option<RequisitionDetails>,
    status: RequisitionStatus,
    bids: Vec<BidRegistration>,
    awarded_bid: Option<BidId>,
    deleted: bool,
    version: u64,
    created: bool,
}

impl Requisition {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RequisitionId) -> Self {
        Self {
            id,
            item_id: None,
            owner: None,
            requisition_number: String::new(),
            details: None,
            status: RequisitionStatus::Pending,
            bids: Vec::new(),
            awarded_bid: None,
            deleted: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RequisitionId {
        self.id
    }

    /// Created and not deleted.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn item_id(&self) -> Option<InventoryItemId> {
        self.item_id
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn requisition_number(&self) -> &str {
        &self.requisition_number
    }

    pub fn details(&self) -> Option<&RequisitionDetails> {
        self.details.as_ref()
    }

    pub fn requested_quantity(&self) -> u32 {
        self.details.as_ref().map_or(0, |d| d.requested_quantity)
    }

    pub fn status(&self) -> RequisitionStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.exists() && self.status == RequisitionStatus::Pending
    }

    pub fn bids(&self) -> &[BidRegistration] {
        &self.bids
    }

    pub fn bid_ids(&self) -> impl Iterator<Item = BidId> + '_ {
        self.bids.iter().map(|b| b.bid_id)
    }

    pub fn awarded_bid(&self) -> Option<BidId> {
        self.awarded_bid
    }
}

impl AggregateRoot for Requisition {
    type Id = RequisitionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenRequisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequisition {
    pub requisition_id: RequisitionId,
    pub item_id: InventoryItemId,
    pub owner: UserId,
    pub requisition_number: String,
    pub details: RequisitionDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditRequisition (only while pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequisition {
    pub requisition_id: RequisitionId,
    pub details: RequisitionDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteRequisition (never once approved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequisition {
    pub requisition_id: RequisitionId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectRequisition (close without award).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectRequisition {
    pub requisition_id: RequisitionId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RegisterBid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBid {
    pub requisition_id: RequisitionId,
    pub bid_id: BidId,
    pub vendor_id: VendorId,
    pub fulfilled_quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UnregisterBid (bid withdrawn by its vendor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregisterBid {
    pub requisition_id: RequisitionId,
    pub bid_id: BidId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AwardBid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardBid {
    pub requisition_id: RequisitionId,
    pub bid_id: BidId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequisitionCommand {
    OpenRequisition(OpenRequisition),
    EditRequisition(EditRequisition),
    DeleteRequisition(DeleteRequisition),
    RejectRequisition(RejectRequisition),
    RegisterBid(RegisterBid),
    UnregisterBid(UnregisterBid),
    AwardBid(AwardBid),
}

/// Event: RequisitionOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionOpened {
    pub requisition_id: RequisitionId,
    pub item_id: InventoryItemId,
    pub owner: UserId,
    pub requisition_number: String,
    pub details: RequisitionDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequisitionEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionEdited {
    pub requisition_id: RequisitionId,
    pub details: RequisitionDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequisitionDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionDeleted {
    pub requisition_id: RequisitionId,
    pub item_id: InventoryItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequisitionRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionRejected {
    pub requisition_id: RequisitionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BidRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRegistered {
    pub requisition_id: RequisitionId,
    pub bid_id: BidId,
    pub vendor_id: VendorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BidUnregistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidUnregistered {
    pub requisition_id: RequisitionId,
    pub bid_id: BidId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BidAwarded. Approves the requisition; `rejected_bids` are every sibling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidAwarded {
    pub requisition_id: RequisitionId,
    pub bid_id: BidId,
    pub rejected_bids: Vec<BidId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequisitionEvent {
    RequisitionOpened(RequisitionOpened),
    RequisitionEdited(RequisitionEdited),
    RequisitionDeleted(RequisitionDeleted),
    RequisitionRejected(RequisitionRejected),
    BidRegistered(BidRegistered),
    BidUnregistered(BidUnregistered),
    BidAwarded(BidAwarded),
}

impl Event for RequisitionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RequisitionEvent::RequisitionOpened(_) => "purchasing.requisition.opened",
            RequisitionEvent::RequisitionEdited(_) => "purchasing.requisition.edited",
            RequisitionEvent::RequisitionDeleted(_) => "purchasing.requisition.deleted",
            RequisitionEvent::RequisitionRejected(_) => "purchasing.requisition.rejected",
            RequisitionEvent::BidRegistered(_) => "purchasing.requisition.bid_registered",
            RequisitionEvent::BidUnregistered(_) => "purchasing.requisition.bid_unregistered",
            RequisitionEvent::BidAwarded(_) => "purchasing.requisition.bid_awarded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RequisitionEvent::RequisitionOpened(e) => e.occurred_at,
            RequisitionEvent::RequisitionEdited(e) => e.occurred_at,
            RequisitionEvent::RequisitionDeleted(e) => e.occurred_at,
            RequisitionEvent::RequisitionRejected(e) => e.occurred_at,
            RequisitionEvent::BidRegistered(e) => e.occurred_at,
            RequisitionEvent::BidUnregistered(e) => e.occurred_at,
            RequisitionEvent::BidAwarded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Requisition {
    type Command = RequisitionCommand;
    type Event = RequisitionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RequisitionEvent::RequisitionOpened(e) => {
                self.id = e.requisition_id;
                self.item_id = Some(e.item_id);
                self.owner = Some(e.owner);
                self.requisition_number = e.requisition_number.clone();
                self.details = Some(e.details.clone());
                self.status = RequisitionStatus::Pending;
                self.created = true;
            }
            RequisitionEvent::RequisitionEdited(e) => {
                self.details = Some(e.details.clone());
            }
            RequisitionEvent::RequisitionDeleted(_) => {
                self.deleted = true;
            }
            RequisitionEvent::RequisitionRejected(_) => {
                self.status = RequisitionStatus::Rejected;
            }
            RequisitionEvent::BidRegistered(e) => {
                self.bids.push(BidRegistration {
                    vendor_id: e.vendor_id,
                    bid_id: e.bid_id,
                });
            }
            RequisitionEvent::BidUnregistered(e) => {
                self.bids.retain(|b| b.bid_id != e.bid_id);
            }
            RequisitionEvent::BidAwarded(e) => {
                self.awarded_bid = Some(e.bid_id);
                self.status = RequisitionStatus::Approved;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RequisitionCommand::OpenRequisition(cmd) => self.handle_open(cmd),
            RequisitionCommand::EditRequisition(cmd) => self.handle_edit(cmd),
            RequisitionCommand::DeleteRequisition(cmd) => self.handle_delete(cmd),
            RequisitionCommand::RejectRequisition(cmd) => self.handle_reject(cmd),
            RequisitionCommand::RegisterBid(cmd) => self.handle_register_bid(cmd),
            RequisitionCommand::UnregisterBid(cmd) => self.handle_unregister_bid(cmd),
            RequisitionCommand::AwardBid(cmd) => self.handle_award(cmd),
        }
    }
}

impl Requisition {
    fn ensure_exists(&self, requisition_id: RequisitionId) -> Result<(), DomainError> {
        if !self.exists() || self.id != requisition_id {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_pending(&self, action: &str) -> Result<(), DomainError> {
        match self.status {
            RequisitionStatus::Pending => Ok(()),
            RequisitionStatus::Approved => Err(DomainError::conflict(format!(
                "cannot {action}: requisition is already approved"
            ))),
            RequisitionStatus::Rejected => Err(DomainError::conflict(format!(
                "cannot {action}: requisition is rejected"
            ))),
        }
    }

    fn validate_details(details: &RequisitionDetails) -> Result<(), DomainError> {
        if details.requested_quantity == 0 {
            return Err(DomainError::validation(
                "requested quantity must be a positive integer",
            ));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenRequisition) -> Result<Vec<RequisitionEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("requisition already exists"));
        }
        if cmd.requisition_number.trim().is_empty() {
            return Err(DomainError::validation("requisition number cannot be empty"));
        }
        Self::validate_details(&cmd.details)?;

        Ok(vec![RequisitionEvent::RequisitionOpened(RequisitionOpened {
            requisition_id: cmd.requisition_id,
            item_id: cmd.item_id,
            owner: cmd.owner,
            requisition_number: cmd.requisition_number.trim().to_string(),
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit(&self, cmd: &EditRequisition) -> Result<Vec<RequisitionEvent>, DomainError> {
        self.ensure_exists(cmd.requisition_id)?;
        self.ensure_pending("edit")?;
        Self::validate_details(&cmd.details)?;

        Ok(vec![RequisitionEvent::RequisitionEdited(RequisitionEdited {
            requisition_id: cmd.requisition_id,
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteRequisition) -> Result<Vec<RequisitionEvent>, DomainError> {
        self.ensure_exists(cmd.requisition_id)?;

        if self.status == RequisitionStatus::Approved {
            return Err(DomainError::conflict(
                "an approved requisition cannot be deleted",
            ));
        }
        let item_id = self.item_id.ok_or_else(DomainError::not_found)?;

        Ok(vec![RequisitionEvent::RequisitionDeleted(RequisitionDeleted {
            requisition_id: cmd.requisition_id,
            item_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectRequisition) -> Result<Vec<RequisitionEvent>, DomainError> {
        self.ensure_exists(cmd.requisition_id)?;
        self.ensure_pending("reject")?;

        Ok(vec![RequisitionEvent::RequisitionRejected(RequisitionRejected {
            requisition_id: cmd.requisition_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_register_bid(&self, cmd: &RegisterBid) -> Result<Vec<RequisitionEvent>, DomainError> {
        self.ensure_exists(cmd.requisition_id)?;
        self.ensure_pending("submit a bid")?;

        if cmd.fulfilled_quantity < self.requested_quantity() {
            return Err(DomainError::validation(format!(
                "fulfilled quantity {} is below the requested quantity {}",
                cmd.fulfilled_quantity,
                self.requested_quantity()
            )));
        }
        if self.bids.iter().any(|b| b.vendor_id == cmd.vendor_id) {
            return Err(DomainError::conflict(
                "vendor has already bid on this requisition",
            ));
        }

        Ok(vec![RequisitionEvent::BidRegistered(BidRegistered {
            requisition_id: cmd.requisition_id,
            bid_id: cmd.bid_id,
            vendor_id: cmd.vendor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unregister_bid(
        &self,
        cmd: &UnregisterBid,
    ) -> Result<Vec<RequisitionEvent>, DomainError> {
        self.ensure_exists(cmd.requisition_id)?;

        if !self.bids.iter().any(|b| b.bid_id == cmd.bid_id) {
            return Err(DomainError::not_found());
        }
        if self.awarded_bid == Some(cmd.bid_id) {
            return Err(DomainError::conflict("an accepted bid cannot be withdrawn"));
        }

        Ok(vec![RequisitionEvent::BidUnregistered(BidUnregistered {
            requisition_id: cmd.requisition_id,
            bid_id: cmd.bid_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_award(&self, cmd: &AwardBid) -> Result<Vec<RequisitionEvent>, DomainError> {
        self.ensure_exists(cmd.requisition_id)?;

        if self.awarded_bid.is_some() {
            return Err(DomainError::conflict(
                "requisition already has an accepted bid",
            ));
        }
        self.ensure_pending("award a bid")?;
        if !self.bids.iter().any(|b| b.bid_id == cmd.bid_id) {
            return Err(DomainError::not_found());
        }

        let rejected_bids = self
            .bid_ids()
            .filter(|id| *id != cmd.bid_id)
            .collect();

        Ok(vec![RequisitionEvent::BidAwarded(BidAwarded {
            requisition_id: cmd.requisition_id,
            bid_id: cmd.bid_id,
            rejected_bids,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_core::AggregateId;
    use procura_events::execute;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_vendor() -> VendorId {
        VendorId::for_user(UserId::new())
    }

    fn test_details(requested_quantity: u32) -> RequisitionDetails {
        RequisitionDetails {
            requested_quantity,
            expected_delivery: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            urgency: Urgency::High,
            comments: None,
        }
    }

    fn open_requisition(requested_quantity: u32) -> Requisition {
        let requisition_id = RequisitionId::generate();
        let mut requisition = Requisition::empty(requisition_id);
        execute(
            &mut requisition,
            &RequisitionCommand::OpenRequisition(OpenRequisition {
                requisition_id,
                item_id: InventoryItemId::new(AggregateId::new()),
                owner: UserId::new(),
                requisition_number: "REQ-001".to_string(),
                details: test_details(requested_quantity),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        requisition
    }

    fn register(
        requisition: &mut Requisition,
        vendor_id: VendorId,
        fulfilled_quantity: u32,
    ) -> Result<BidId, DomainError> {
        let bid_id = BidId::generate();
        let requisition_id = requisition.id_typed();
        execute(
            requisition,
            &RequisitionCommand::RegisterBid(RegisterBid {
                requisition_id,
                bid_id,
                vendor_id,
                fulfilled_quantity,
                occurred_at: test_time(),
            }),
        )?;
        Ok(bid_id)
    }

    fn award(requisition: &mut Requisition, bid_id: BidId) -> Result<Vec<RequisitionEvent>, DomainError> {
        let requisition_id = requisition.id_typed();
        execute(
            requisition,
            &RequisitionCommand::AwardBid(AwardBid {
                requisition_id,
                bid_id,
                occurred_at: test_time(),
            }),
        )
    }

    #[test]
    fn open_starts_pending() {
        let requisition = open_requisition(50);
        assert_eq!(requisition.status(), RequisitionStatus::Pending);
        assert_eq!(requisition.requisition_number(), "REQ-001");
        assert_eq!(requisition.requested_quantity(), 50);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let requisition = Requisition::empty(RequisitionId::generate());
        let err = requisition
            .handle(&RequisitionCommand::OpenRequisition(OpenRequisition {
                requisition_id: requisition.id_typed(),
                item_id: InventoryItemId::new(AggregateId::new()),
                owner: UserId::new(),
                requisition_number: "REQ-002".to_string(),
                details: test_details(0),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn bid_below_requested_quantity_is_a_validation_error() {
        let mut requisition = open_requisition(50);
        let err = register(&mut requisition, test_vendor(), 49).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(requisition.bids().is_empty());
    }

    #[test]
    fn second_bid_from_same_vendor_is_a_conflict() {
        let mut requisition = open_requisition(50);
        let vendor = test_vendor();
        register(&mut requisition, vendor, 50).unwrap();

        let err = register(&mut requisition, vendor, 60).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(requisition.bids().len(), 1);
    }

    #[test]
    fn award_approves_and_lists_every_sibling() {
        let mut requisition = open_requisition(50);
        let a = register(&mut requisition, test_vendor(), 50).unwrap();
        let b = register(&mut requisition, test_vendor(), 60).unwrap();
        let c = register(&mut requisition, test_vendor(), 70).unwrap();

        let events = award(&mut requisition, a).unwrap();
        match &events[0] {
            RequisitionEvent::BidAwarded(e) => {
                assert_eq!(e.bid_id, a);
                assert_eq!(e.rejected_bids, vec![b, c]);
            }
            _ => panic!("Expected BidAwarded event"),
        }
        assert_eq!(requisition.status(), RequisitionStatus::Approved);
        assert_eq!(requisition.awarded_bid(), Some(a));
    }

    #[test]
    fn second_award_is_a_conflict_and_changes_nothing() {
        let mut requisition = open_requisition(50);
        let a = register(&mut requisition, test_vendor(), 50).unwrap();
        let b = register(&mut requisition, test_vendor(), 60).unwrap();
        award(&mut requisition, a).unwrap();
        let version = requisition.version();

        assert!(matches!(award(&mut requisition, b), Err(DomainError::Conflict(_))));
        assert_eq!(requisition.awarded_bid(), Some(a));
        assert_eq!(requisition.version(), version);
    }

    #[test]
    fn approved_requisition_is_frozen() {
        let mut requisition = open_requisition(50);
        let a = register(&mut requisition, test_vendor(), 50).unwrap();
        award(&mut requisition, a).unwrap();
        let requisition_id = requisition.id_typed();

        let edit = requisition.handle(&RequisitionCommand::EditRequisition(EditRequisition {
            requisition_id,
            details: test_details(10),
            occurred_at: test_time(),
        }));
        let delete = requisition.handle(&RequisitionCommand::DeleteRequisition(DeleteRequisition {
            requisition_id,
            occurred_at: test_time(),
        }));

        assert!(matches!(edit, Err(DomainError::Conflict(_))));
        assert!(matches!(delete, Err(DomainError::Conflict(_))));
        assert!(matches!(
            register(&mut requisition, test_vendor(), 50),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn rejected_requisition_accepts_no_bids_but_can_be_deleted() {
        let mut requisition = open_requisition(50);
        let requisition_id = requisition.id_typed();
        execute(
            &mut requisition,
            &RequisitionCommand::RejectRequisition(RejectRequisition {
                requisition_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert!(matches!(
            register(&mut requisition, test_vendor(), 50),
            Err(DomainError::Conflict(_))
        ));

        execute(
            &mut requisition,
            &RequisitionCommand::DeleteRequisition(DeleteRequisition {
                requisition_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert!(!requisition.exists());
        assert!(matches!(
            register(&mut requisition, test_vendor(), 50),
            Err(DomainError::NotFound)
        ));
    }

    #[test]
    fn withdrawn_vendor_may_bid_again() {
        let mut requisition = open_requisition(50);
        let vendor = test_vendor();
        let bid_id = register(&mut requisition, vendor, 50).unwrap();
        let requisition_id = requisition.id_typed();

        execute(
            &mut requisition,
            &RequisitionCommand::UnregisterBid(UnregisterBid {
                requisition_id,
                bid_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert!(register(&mut requisition, vendor, 55).is_ok());
    }

    #[test]
    fn awarding_an_unregistered_bid_is_not_found() {
        let mut requisition = open_requisition(50);
        register(&mut requisition, test_vendor(), 50).unwrap();
        assert_eq!(
            award(&mut requisition, BidId::generate()),
            Err(DomainError::NotFound)
        );
    }
}
