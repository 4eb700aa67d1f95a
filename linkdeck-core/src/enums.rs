//! Enum types shared across the workspace

use serde::{Deserialize, Serialize};

/// Entity type discriminator used in errors and cache bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    List,
    Url,
    Collaborator,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::List => write!(f, "List"),
            EntityType::Url => write!(f, "Url"),
            EntityType::Collaborator => write!(f, "Collaborator"),
        }
    }
}

/// Role a user holds on a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full control, including collaborator management.
    Owner,
    /// May add, edit, reorder, archive and delete URLs.
    Editor,
    /// Read-only access to a private list.
    Viewer,
}

impl Role {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Some(Role::Owner),
            "editor" => Some(Role::Editor),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_db_roundtrip() {
        for role in [Role::Owner, Role::Editor, Role::Viewer] {
            assert_eq!(Role::from_db_str(role.as_db_str()), Some(role));
        }
        assert_eq!(Role::from_db_str("EDITOR"), Some(Role::Editor));
        assert_eq!(Role::from_db_str("admin"), None);
    }

    #[test]
    fn test_role_serializes_snake_case() {
        let json = serde_json::to_string(&Role::Editor).unwrap();
        assert_eq!(json, "\"editor\"");
    }
}
