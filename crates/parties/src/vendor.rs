use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use procura_events::Event;

use crate::rating::VendorRatingState;

procura_core::typed_aggregate_id!(
    /// Vendor identifier. One vendor profile per vendor user account.
    VendorId
);

impl VendorId {
    /// The vendor stream owned by `user`.
    pub fn for_user(user: UserId) -> Self {
        Self(AggregateId::from_uuid(*user.as_uuid()))
    }

    /// The user account this vendor stream belongs to.
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(*self.0.as_uuid())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorType {
    Supplier,
    Manufacturer,
    ServiceProvider,
}

/// Vendor-maintained profile. Rating fields are deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorProfile {
    pub name: String,
    pub address: String,
    pub vendor_type: VendorType,
    pub certified: bool,
    pub contract_expiry: NaiveDate,
}

/// Aggregate root: Vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct Vendor {
    id: VendorId,
    user_id: Option<UserId>,
    profile: Option<VendorProfile>,
    rating: VendorRatingState,
    version: u64,
    created: bool,
}

impl Vendor {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: VendorId) -> Self {
        Self {
            id,
            user_id: None,
            profile: None,
            rating: VendorRatingState::default(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> VendorId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn profile(&self) -> Option<&VendorProfile> {
        self.profile.as_ref()
    }

    pub fn rating(&self) -> VendorRatingState {
        self.rating
    }
}

impl AggregateRoot for Vendor {
    type Id = VendorId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterVendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterVendor {
    pub vendor_id: VendorId,
    pub user_id: UserId,
    pub profile: VendorProfile,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateVendorProfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateVendorProfile {
    pub vendor_id: VendorId,
    pub profile: VendorProfile,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordRating (issued only when a paid invoice is rated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRating {
    pub vendor_id: VendorId,
    pub invoice_id: AggregateId,
    pub rating: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VendorCommand {
    RegisterVendor(RegisterVendor),
    UpdateVendorProfile(UpdateVendorProfile),
    RecordRating(RecordRating),
}

/// Event: VendorRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRegistered {
    pub vendor_id: VendorId,
    pub user_id: UserId,
    pub profile: VendorProfile,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VendorProfileUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorProfileUpdated {
    pub vendor_id: VendorId,
    pub profile: VendorProfile,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RatingRecorded. Carries the resulting state so replay never recomputes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecorded {
    pub vendor_id: VendorId,
    pub invoice_id: AggregateId,
    pub rating: f64,
    pub state: VendorRatingState,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VendorEvent {
    VendorRegistered(VendorRegistered),
    VendorProfileUpdated(VendorProfileUpdated),
    RatingRecorded(RatingRecorded),
}

impl Event for VendorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            VendorEvent::VendorRegistered(_) => "parties.vendor.registered",
            VendorEvent::VendorProfileUpdated(_) => "parties.vendor.profile_updated",
            VendorEvent::RatingRecorded(_) => "parties.vendor.rating_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            VendorEvent::VendorRegistered(e) => e.occurred_at,
            VendorEvent::VendorProfileUpdated(e) => e.occurred_at,
            VendorEvent::RatingRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Vendor {
    type Command = VendorCommand;
    type Event = VendorEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            VendorEvent::VendorRegistered(e) => {
                self.id = e.vendor_id;
                self.user_id = Some(e.user_id);
                self.profile = Some(e.profile.clone());
                self.rating = VendorRatingState::default();
                self.created = true;
            }
            VendorEvent::VendorProfileUpdated(e) => {
                self.profile = Some(e.profile.clone());
            }
            VendorEvent::RatingRecorded(e) => {
                self.rating = e.state;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            VendorCommand::RegisterVendor(cmd) => self.handle_register(cmd),
            VendorCommand::UpdateVendorProfile(cmd) => self.handle_update(cmd),
            VendorCommand::RecordRating(cmd) => self.handle_rating(cmd),
        }
    }
}

impl Vendor {
    fn ensure_exists(&self, vendor_id: VendorId) -> Result<(), DomainError> {
        if !self.created || self.id != vendor_id {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn validate_profile(profile: &VendorProfile) -> Result<(), DomainError> {
        if profile.name.trim().is_empty() {
            return Err(DomainError::validation("vendor name cannot be empty"));
        }
        if profile.address.trim().is_empty() {
            return Err(DomainError::validation("address cannot be empty"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterVendor) -> Result<Vec<VendorEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("vendor profile already exists"));
        }
        Self::validate_profile(&cmd.profile)?;

        Ok(vec![VendorEvent::VendorRegistered(VendorRegistered {
            vendor_id: cmd.vendor_id,
            user_id: cmd.user_id,
            profile: cmd.profile.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateVendorProfile) -> Result<Vec<VendorEvent>, DomainError> {
        self.ensure_exists(cmd.vendor_id)?;
        Self::validate_profile(&cmd.profile)?;

        Ok(vec![VendorEvent::VendorProfileUpdated(VendorProfileUpdated {
            vendor_id: cmd.vendor_id,
            profile: cmd.profile.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rating(&self, cmd: &RecordRating) -> Result<Vec<VendorEvent>, DomainError> {
        self.ensure_exists(cmd.vendor_id)?;

        let state = self.rating.record(cmd.rating)?;

        Ok(vec![VendorEvent::RatingRecorded(RatingRecorded {
            vendor_id: cmd.vendor_id,
            invoice_id: cmd.invoice_id,
            rating: cmd.rating,
            state,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_events::execute;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_profile() -> VendorProfile {
        VendorProfile {
            name: "Acme Supplies".to_string(),
            address: "12 Dock Road".to_string(),
            vendor_type: VendorType::Supplier,
            certified: true,
            contract_expiry: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        }
    }

    fn registered_vendor() -> Vendor {
        let user_id = UserId::new();
        let vendor_id = VendorId::for_user(user_id);
        let mut vendor = Vendor::empty(vendor_id);
        execute(
            &mut vendor,
            &VendorCommand::RegisterVendor(RegisterVendor {
                vendor_id,
                user_id,
                profile: test_profile(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        vendor
    }

    fn rate(vendor: &mut Vendor, rating: f64) -> Result<Vec<VendorEvent>, DomainError> {
        let vendor_id = vendor.id_typed();
        execute(
            vendor,
            &VendorCommand::RecordRating(RecordRating {
                vendor_id,
                invoice_id: AggregateId::new(),
                rating,
                occurred_at: test_time(),
            }),
        )
    }

    #[test]
    fn vendor_id_is_derived_from_user() {
        let user = UserId::new();
        assert_eq!(VendorId::for_user(user), VendorId::for_user(user));
        assert_eq!(VendorId::for_user(user).aggregate_id().as_uuid(), user.as_uuid());
    }

    #[test]
    fn registration_starts_with_empty_rating() {
        let vendor = registered_vendor();
        assert_eq!(vendor.rating(), VendorRatingState { rating: 0.0, total_ratings: 0 });
        assert_eq!(vendor.profile().unwrap().name, "Acme Supplies");
    }

    #[test]
    fn registering_twice_is_a_conflict() {
        let vendor = registered_vendor();
        let err = vendor
            .handle(&VendorCommand::RegisterVendor(RegisterVendor {
                vendor_id: vendor.id_typed(),
                user_id: vendor.user_id().unwrap(),
                profile: test_profile(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn ratings_fold_into_running_mean() {
        let mut vendor = registered_vendor();
        rate(&mut vendor, 4.0).unwrap();
        rate(&mut vendor, 2.0).unwrap();

        assert_eq!(vendor.rating(), VendorRatingState { rating: 3.0, total_ratings: 2 });
        assert!(matches!(rate(&mut vendor, 6.0), Err(DomainError::Validation(_))));
        assert_eq!(vendor.rating().total_ratings, 2);
    }

    #[test]
    fn profile_update_keeps_rating() {
        let mut vendor = registered_vendor();
        rate(&mut vendor, 5.0).unwrap();

        let mut profile = test_profile();
        profile.certified = false;
        let vendor_id = vendor.id_typed();
        execute(
            &mut vendor,
            &VendorCommand::UpdateVendorProfile(UpdateVendorProfile {
                vendor_id,
                profile,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert!(!vendor.profile().unwrap().certified);
        assert_eq!(vendor.rating().total_ratings, 1);
    }

    #[test]
    fn unregistered_vendor_cannot_be_rated() {
        let mut vendor = Vendor::empty(VendorId::for_user(UserId::new()));
        assert_eq!(rate(&mut vendor, 3.0), Err(DomainError::NotFound));
    }
}
