/*!
 * # Actor and role checks
 *
 * Identity and sessions live outside this crate; every operation receives the
 * acting user id and role and checks them against the permission table below.
 */

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Id recorded when the engine itself performs a transition (e.g. transfer auto-approval).
pub const SYSTEM_USER_ID: Uuid = Uuid::nil();

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Role {
    Admin,
    Manager,
    Staff,
    Keeper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    ManageLocations,
    CreateOutbound,
    ApproveOutbound,
    SubmitReceiving,
    ApproveReceiving,
    ConfirmPutaway,
}

impl Role {
    pub fn grants(self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Role::Admin => true,
            Role::Manager => true,
            Role::Staff => matches!(permission, CreateOutbound | SubmitReceiving),
            Role::Keeper => matches!(permission, SubmitReceiving | ConfirmPutaway),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn system() -> Self {
        Self {
            user_id: SYSTEM_USER_ID,
            role: Role::Admin,
        }
    }

    pub fn require(&self, permission: Permission) -> Result<(), ServiceError> {
        if self.role.grants(permission) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "role {} lacks permission {}",
                self.role, permission
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn staff_cannot_approve_outbound() {
        let staff = Actor::new(Uuid::new_v4(), Role::Staff);
        assert!(staff.require(Permission::CreateOutbound).is_ok());
        assert!(matches!(
            staff.require(Permission::ApproveOutbound),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn keeper_confirms_putaway_only() {
        assert!(Role::Keeper.grants(Permission::ConfirmPutaway));
        assert!(!Role::Keeper.grants(Permission::CreateOutbound));
        assert!(!Role::Keeper.grants(Permission::ManageLocations));
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(Role::from_str("manager").unwrap(), Role::Manager);
        assert_eq!(Role::Keeper.to_string(), "KEEPER");
        assert_eq!(Actor::system().user_id, SYSTEM_USER_ID);
    }
}
