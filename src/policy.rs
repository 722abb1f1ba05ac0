use crate::{auth::AuthUser, config::ProfileAccess, error::ApiError, error::NOT_AUTHENTICATED};

/// Action
///
/// What a request intends to do, independent of HTTP routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

impl Action {
    /// List and retrieve never change state.
    pub fn is_safe(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

/// Resource
///
/// The target of an action. Item variants carry the owning user id of the loaded
/// record so the decision needs no store access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Users,
    User { id: i64 },
    Posts,
    Post { poster: i64 },
    Profiles,
    Profile { user: i64 },
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

/// Policy
///
/// Pure authorization decision over identity, action and target. Rules in order:
///
/// 1. Anonymous callers may only sign up (create on `Users`) and obtain a token.
/// 2. Safe actions are open to every authenticated identity.
/// 3. Creation is open to every authenticated identity. Ownership of the new record is
///    assigned by the handler from the identity, never from the body.
/// 4. Mutations on a user or post need the owner or a staff identity.
///    Profiles follow `ProfileAccess`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Policy {
    pub profile_access: ProfileAccess,
}

impl Policy {
    pub fn new(profile_access: ProfileAccess) -> Self {
        Self { profile_access }
    }

    pub fn authorize(&self, actor: Option<&AuthUser>, action: Action, target: Resource) -> Decision {
        let Some(actor) = actor else {
            return match (action, target) {
                (Action::Create, Resource::Users) | (_, Resource::Token) => Decision::Allow,
                _ => Decision::Deny(Denial::Unauthenticated),
            };
        };

        if action.is_safe() || action == Action::Create {
            return Decision::Allow;
        }

        let owner = match target {
            Resource::User { id } => Some(id),
            Resource::Post { poster } => Some(poster),
            Resource::Profile { user } => match self.profile_access {
                ProfileAccess::Open => None,
                ProfileAccess::OwnerOrStaff => Some(user),
            },
            // Collection-level mutations and token exchange are not ownership-scoped.
            Resource::Users | Resource::Posts | Resource::Profiles | Resource::Token => None,
        };

        match owner {
            Some(owner) if owner != actor.id && !actor.is_staff => Decision::Deny(Denial::Forbidden),
            _ => Decision::Allow,
        }
    }

    /// Same decision as `authorize`, rendered as the error the handler returns.
    pub fn check(&self, actor: Option<&AuthUser>, action: Action, target: Resource) -> Result<(), ApiError> {
        match self.authorize(actor, action, target) {
            Decision::Allow => Ok(()),
            Decision::Deny(Denial::Unauthenticated) => {
                Err(ApiError::Unauthenticated(NOT_AUTHENTICATED))
            }
            Decision::Deny(Denial::Forbidden) => {
                tracing::warn!(
                    actor = actor.map(|a| a.id),
                    ?action,
                    ?target,
                    "authorization denied"
                );
                Err(ApiError::Forbidden)
            }
        }
    }
}
