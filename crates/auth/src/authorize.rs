use std::collections::HashSet;

use thiserror::Error;

use procura_core::UserId;

use crate::{Capability, Role};

/// A resolved caller for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: HashSet<Role>,
}

impl Principal {
    pub fn new(user_id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn procurement_officer(user_id: UserId) -> Self {
        Self::new(user_id, [Role::ProcurementOfficer])
    }

    pub fn vendor(user_id: UserId) -> Self {
        Self::new(user_id, [Role::Vendor])
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.roles
            .iter()
            .any(|r| r.capabilities().contains(&capability))
    }

    pub fn can_act_as_vendor(&self) -> bool {
        self.has_capability(Capability::ActAsVendor)
    }

    pub fn can_act_as_procurement_officer(&self) -> bool {
        self.has_capability(Capability::ActAsProcurementOfficer)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing capability '{0}'")]
    Forbidden(Capability),
}

/// Check that `principal` holds `required`.
///
/// - No IO
/// - No panics
/// - No business logic (ownership is checked by the engine, not here)
pub fn authorize(principal: &Principal, required: Capability) -> Result<(), AuthzError> {
    if principal.has_capability(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn officer_cannot_act_as_vendor() {
        let officer = Principal::procurement_officer(UserId::new());

        assert!(officer.can_act_as_procurement_officer());
        assert!(!officer.can_act_as_vendor());
        assert!(authorize(&officer, Capability::ActAsProcurementOfficer).is_ok());
        assert_eq!(
            authorize(&officer, Capability::ActAsVendor),
            Err(AuthzError::Forbidden(Capability::ActAsVendor))
        );
    }

    #[test]
    fn principal_with_both_roles_holds_both_capabilities() {
        let both = Principal::new(UserId::new(), [Role::Vendor, Role::ProcurementOfficer]);
        assert!(both.can_act_as_vendor());
        assert!(both.can_act_as_procurement_officer());
    }

    #[test]
    fn principal_without_roles_is_forbidden_everything() {
        let nobody = Principal::new(UserId::new(), []);
        assert!(authorize(&nobody, Capability::ActAsVendor).is_err());
        assert!(authorize(&nobody, Capability::ActAsProcurementOfficer).is_err());
    }
}
