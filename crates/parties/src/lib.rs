//! Parties domain module (vendors, event-sourced).
//!
//! Vendor profiles and the running-average rating vendors accumulate from paid
//! invoices, implemented purely as deterministic domain logic.

pub mod rating;
pub mod vendor;

pub use rating::{MAX_RATING, MIN_RATING, VendorRatingState};
pub use vendor::{
    RatingRecorded, RecordRating, RegisterVendor, UpdateVendorProfile, Vendor, VendorCommand,
    VendorEvent, VendorId, VendorProfile, VendorProfileUpdated, VendorRegistered, VendorType,
};
