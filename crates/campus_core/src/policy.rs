//! crates/campus_core/src/policy.rs
//!
//! The single ownership rule shared by opportunities, collaborations and events:
//! an actor may mutate an entity iff they are an admin or its owner.

use uuid::Uuid;

use crate::domain::{OwnerRef, Role};
use crate::ports::{PortError, PortResult};

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Platform staff: admins and moderators.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Moderator)
    }
}

/// Owner-or-admin check. The owner may be a raw id or a populated user; both
/// are compared by identifier.
pub fn can_mutate(actor: &Actor, owner: impl Into<OwnerRef>) -> bool {
    actor.is_admin() || owner.into().id() == actor.id
}

pub fn require_mutate(actor: &Actor, owner: impl Into<OwnerRef>) -> PortResult<()> {
    if can_mutate(actor, owner) {
        Ok(())
    } else {
        Err(PortError::Forbidden(
            "only the owner or an admin may modify this resource".to_string(),
        ))
    }
}

/// Self-or-admin check for user records.
pub fn require_self_or_admin(actor: &Actor, user_id: Uuid) -> PortResult<()> {
    require_mutate(actor, user_id)
}

pub fn require_admin(actor: &Actor) -> PortResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(PortError::Forbidden("admin access required".to_string()))
    }
}

pub fn require_staff(actor: &Actor) -> PortResult<()> {
    if actor.is_staff() {
        Ok(())
    } else {
        Err(PortError::Forbidden("moderator access required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserSummary;

    #[test]
    fn owner_may_mutate_and_others_may_not() {
        let owner = Uuid::new_v4();
        let stranger = Actor::new(Uuid::new_v4(), Role::Student);
        assert!(can_mutate(&Actor::new(owner, Role::Student), owner));
        assert!(!can_mutate(&stranger, owner));
        assert!(matches!(
            require_mutate(&stranger, owner),
            Err(PortError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_may_mutate_anything() {
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        assert!(can_mutate(&admin, Uuid::new_v4()));
    }

    #[test]
    fn moderators_and_recruiters_get_no_override() {
        let owner = Uuid::new_v4();
        for role in [Role::Moderator, Role::Recruiter] {
            assert!(!can_mutate(&Actor::new(Uuid::new_v4(), role), owner));
        }
    }

    #[test]
    fn populated_owner_is_compared_by_id() {
        let owner = Uuid::new_v4();
        let populated = UserSummary {
            id: owner,
            name: "Ravi".into(),
            avatar_url: None,
            college: None,
        };
        assert!(can_mutate(&Actor::new(owner, Role::Student), populated.clone()));
        assert!(!can_mutate(&Actor::new(Uuid::new_v4(), Role::Student), populated));
    }

    #[test]
    fn staff_checks() {
        assert!(require_staff(&Actor::new(Uuid::new_v4(), Role::Moderator)).is_ok());
        assert!(require_admin(&Actor::new(Uuid::new_v4(), Role::Moderator)).is_err());
    }
}
