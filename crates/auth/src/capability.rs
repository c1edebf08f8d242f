use serde::{Deserialize, Serialize};

/// What a caller may act as.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Submit and maintain bids, advance orders, issue invoices.
    ActAsVendor,
    /// Manage items and requisitions, award bids, file receipts, settle invoices.
    ActAsProcurementOfficer,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ActAsVendor => "act_as_vendor",
            Capability::ActAsProcurementOfficer => "act_as_procurement_officer",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
