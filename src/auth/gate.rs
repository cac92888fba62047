use serde::Serialize;

use super::{AuthError, Identity};

/// Role flag carried on an identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Admin,
    Supplier,
    Customer,
}

impl Capability {
    pub fn granted_to(self, identity: &Identity) -> bool {
        match self {
            Capability::Admin => identity.is_admin,
            Capability::Supplier => identity.is_supplier,
            Capability::Customer => identity.is_customer,
        }
    }
}

/// Succeeds iff every required capability is granted. Stops at the first miss.
pub fn authorize<'a>(identity: &'a Identity, required: &[Capability]) -> Result<&'a Identity, AuthError> {
    match required.iter().find(|cap| !cap.granted_to(identity)) {
        Some(missing) => {
            tracing::warn!("User '{}' lacks {:?} capability", identity.username, missing);
            Err(AuthError::Forbidden)
        }
        None => Ok(identity),
    }
}

/// Capability requirement attached to a route
#[derive(Clone, Copy, Debug)]
pub enum Requirement {
    All(&'static [Capability]),
    AnyOf(&'static [Capability]),
}

impl Requirement {
    pub const ADMIN: Requirement = Requirement::All(&[Capability::Admin]);
    pub const SUPPLIER: Requirement = Requirement::All(&[Capability::Supplier]);
    pub const ADMIN_OR_SUPPLIER: Requirement =
        Requirement::AnyOf(&[Capability::Admin, Capability::Supplier]);

    pub fn check<'a>(&self, identity: &'a Identity) -> Result<&'a Identity, AuthError> {
        match self {
            Requirement::All(required) => authorize(identity, required),
            Requirement::AnyOf(options) => {
                if options.iter().any(|cap| cap.granted_to(identity)) {
                    Ok(identity)
                } else {
                    tracing::warn!("User '{}' lacks any of {:?}", identity.username, options);
                    Err(AuthError::Forbidden)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(is_admin: bool, is_supplier: bool, is_customer: bool) -> Identity {
        Identity {
            username: "user".to_string(),
            id: 1,
            is_admin,
            is_supplier,
            is_customer,
        }
    }

    const ALL: [Capability; 3] = [Capability::Admin, Capability::Supplier, Capability::Customer];

    #[test]
    fn authorize_is_and_over_every_flag_combination() {
        for mask in 0u8..8 {
            let who = identity(mask & 1 != 0, mask & 2 != 0, mask & 4 != 0);
            for subset in 0u8..8 {
                let required: Vec<Capability> = ALL
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| subset & (1 << i) != 0)
                    .map(|(_, c)| *c)
                    .collect();
                let expected = required.iter().all(|c| c.granted_to(&who));
                assert_eq!(authorize(&who, &required).is_ok(), expected, "mask={mask} subset={subset}");

                // Order of the required set must not change the outcome
                let reversed: Vec<Capability> = required.iter().rev().copied().collect();
                assert_eq!(authorize(&who, &reversed).is_ok(), expected);
            }
        }
    }

    #[test]
    fn authorize_returns_identity_unchanged() {
        let who = identity(true, false, true);
        assert_eq!(authorize(&who, &[Capability::Admin]), Ok(&who));
        assert_eq!(authorize(&who, &[]), Ok(&who));
    }

    #[test]
    fn admin_only_rejects_supplier() {
        let supplier = identity(false, true, true);
        assert_eq!(Requirement::ADMIN.check(&supplier), Err(AuthError::Forbidden));
    }

    #[test]
    fn any_of_accepts_either_flag() {
        assert!(Requirement::ADMIN_OR_SUPPLIER.check(&identity(true, false, false)).is_ok());
        assert!(Requirement::ADMIN_OR_SUPPLIER.check(&identity(false, true, false)).is_ok());
        assert_eq!(
            Requirement::ADMIN_OR_SUPPLIER.check(&identity(false, false, true)),
            Err(AuthError::Forbidden)
        );
    }
}
