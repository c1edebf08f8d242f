//! Vendor profiles.

use chrono::Utc;
use serde_json::Value as JsonValue;

use procura_auth::{Capability, Principal, authorize};
use procura_events::{EventBus, EventEnvelope};
use procura_parties::{RegisterVendor, UpdateVendorProfile, Vendor, VendorCommand, VendorId, VendorProfile};

use super::{Procurement, vendor_of};
use crate::error::DispatchError;
use crate::event_store::EventStore;
use crate::unit_of_work::UnitOfWork;

impl<S, B> Procurement<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Create the caller's vendor profile. Required before bidding.
    #[tracing::instrument(skip_all, fields(user_id = %caller.user_id), err(level = "debug"))]
    pub fn register_vendor(
        &self,
        caller: &Principal,
        profile: VendorProfile,
    ) -> Result<VendorId, DispatchError> {
        authorize(caller, Capability::ActAsVendor)?;

        let vendor_id = vendor_of(caller);
        let mut vendor = self.load_vendor(vendor_id)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut vendor,
            &VendorCommand::RegisterVendor(RegisterVendor {
                vendor_id,
                user_id: caller.user_id,
                profile,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(%vendor_id, "vendor registered");
        Ok(vendor_id)
    }

    /// Replace the caller's profile. Rating fields are untouched.
    #[tracing::instrument(skip_all, fields(user_id = %caller.user_id), err(level = "debug"))]
    pub fn update_vendor_profile(
        &self,
        caller: &Principal,
        profile: VendorProfile,
    ) -> Result<(), DispatchError> {
        authorize(caller, Capability::ActAsVendor)?;

        let vendor_id = vendor_of(caller);
        let mut vendor = self.existing_vendor(vendor_id)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut vendor,
            &VendorCommand::UpdateVendorProfile(UpdateVendorProfile {
                vendor_id,
                profile,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(%vendor_id, "vendor profile updated");
        Ok(())
    }

    /// Vendors see their own profile; officers see any vendor's.
    pub fn vendor(&self, caller: &Principal, vendor_id: VendorId) -> Result<Vendor, DispatchError> {
        if vendor_id != vendor_of(caller) && !caller.can_act_as_procurement_officer() {
            return Err(DispatchError::NotFound);
        }
        Ok(self.existing_vendor(vendor_id)?.into_inner())
    }
}
