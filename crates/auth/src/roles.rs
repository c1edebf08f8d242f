use serde::{Deserialize, Serialize};

use crate::Capability;

/// Account role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ProcurementOfficer,
    Vendor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ProcurementOfficer => "procurement_officer",
            Role::Vendor => "vendor",
        }
    }

    /// Capabilities granted by this role.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::ProcurementOfficer => &[Capability::ActAsProcurementOfficer],
            Role::Vendor => &[Capability::ActAsVendor],
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
