//! Capability model and the permission evaluator seam.
//!
//! The real evaluator (roles, sharing links, org policies) lives outside
//! this workspace; the gateway only ever asks "may this actor do X here".

use crate::{List, Role, SessionId, UserId};
use serde::{Deserialize, Serialize};

/// Something an actor may be allowed to do on a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read the list.
    View,
    /// Add, update, delete, reorder, archive or restore URLs; edit list fields.
    Edit,
    /// Owner-level: collaborator management.
    Manage,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::View => write!(f, "view"),
            Capability::Edit => write!(f, "edit"),
            Capability::Manage => write!(f, "manage"),
        }
    }
}

/// The caller of a gateway operation.
///
/// `session_id` identifies one signed-in client of the user. It is copied
/// onto activity records so a client can tell its own changes apart from
/// those made by the same user elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

impl Actor {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            session_id: None,
        }
    }

    pub fn in_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// Capability check collaborator.
pub trait PermissionEvaluator: Send + Sync {
    fn allows(&self, list: &List, actor: &Actor, capability: Capability) -> bool;
}

/// Default evaluator based on the list's owner and collaborator table.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePermissions;

impl RolePermissions {
    fn role_grants(role: Role, capability: Capability) -> bool {
        match (role, capability) {
            (Role::Owner, _) => true,
            (Role::Editor, Capability::View | Capability::Edit) => true,
            (Role::Viewer, Capability::View) => true,
            _ => false,
        }
    }
}

impl PermissionEvaluator for RolePermissions {
    fn allows(&self, list: &List, actor: &Actor, capability: Capability) -> bool {
        match list.role_of(actor.user_id) {
            Some(role) => Self::role_grants(role, capability),
            None => list.is_public && capability == Capability::View,
        }
    }
}
