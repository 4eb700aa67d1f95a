//! List mutations and their deterministic application.
//!
//! [`apply_operation`] is the single place that turns "old list + operation"
//! into "new list + change". The server gateway runs it before persisting;
//! clients run the same function for their optimistic copy.

use crate::{
    order, Capability, ChangeKind, Collaborator, EntityType, LinkdeckError, LinkdeckResult, List,
    PageMetadata, Role, Timestamp, UrlId, UrlItem, UrlPatch, UserId, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// OPERATION INPUTS
// ============================================================================

/// Fields supplied by the user when adding a URL. Anything left empty may be
/// filled from resolved page metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewUrl {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    pub is_pinned: Option<bool>,
}

impl NewUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    fn into_item(self, position: i64) -> UrlItem {
        let mut item = UrlItem::new(self.url.trim(), position);
        item.title = self.title;
        item.description = self.description;
        item.category = self.category;
        item.tags = self.tags;
        item.notes = self.notes;
        item.is_favorite = self.is_favorite;
        item.is_pinned = self.is_pinned;
        item
    }
}

/// Reorder input: either the full ordered id array or an explicit position
/// per id. Both must name exactly the list's active ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ReorderInput {
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    OrderedIds(Vec<UrlId>),
    #[cfg_attr(feature = "openapi", schema(value_type = HashMap<String, i64>))]
    Positions(HashMap<UrlId, i64>),
}

impl ReorderInput {
    fn ids(&self) -> Vec<UrlId> {
        match self {
            ReorderInput::OrderedIds(ids) => ids.clone(),
            ReorderInput::Positions(map) => map.keys().copied().collect(),
        }
    }
}

/// Partial update of list-level fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

impl ListPatch {
    pub fn is_empty(&self) -> bool {
        self == &ListPatch::default()
    }
}

/// A mutation of one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UrlOperation {
    Add {
        new_url: NewUrl,
    },
    Update {
        url_id: UrlId,
        patch: UrlPatch,
    },
    Delete {
        url_id: UrlId,
    },
    Reorder {
        input: ReorderInput,
    },
    Archive {
        url_id: UrlId,
    },
    Restore {
        url_id: UrlId,
    },
    UpdateList {
        patch: ListPatch,
    },
    UpdateCollaboratorRole {
        user_id: UserId,
        role: Role,
    },
}

impl UrlOperation {
    /// Capability the actor must hold on the list.
    pub fn required_capability(&self) -> Capability {
        match self {
            UrlOperation::UpdateCollaboratorRole { .. } => Capability::Manage,
            _ => Capability::Edit,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UrlOperation::Add { .. } => "add_url",
            UrlOperation::Update { .. } => "update_url",
            UrlOperation::Delete { .. } => "delete_url",
            UrlOperation::Reorder { .. } => "reorder_urls",
            UrlOperation::Archive { .. } => "archive_url",
            UrlOperation::Restore { .. } => "restore_url",
            UrlOperation::UpdateList { .. } => "update_list",
            UrlOperation::UpdateCollaboratorRole { .. } => "update_collaborator_role",
        }
    }

    /// The URL string this operation wants metadata for, if any: the new URL
    /// of an add, or the replacement URL of an update.
    pub fn url_to_enrich(&self) -> Option<&str> {
        match self {
            UrlOperation::Add { new_url } => Some(new_url.url.trim()),
            UrlOperation::Update { patch, .. } => patch.url.as_deref().map(str::trim),
            _ => None,
        }
    }

    /// Input checks that need nothing but the operation itself.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            UrlOperation::Add { new_url } => {
                if new_url.url.trim().is_empty() {
                    return Err(ValidationError::RequiredFieldMissing {
                        field: "url".to_string(),
                    });
                }
            }
            UrlOperation::Update { patch, .. } => {
                if patch.is_empty() {
                    return Err(ValidationError::InvalidValue {
                        field: "patch".to_string(),
                        reason: "no fields to update".to_string(),
                    });
                }
                if matches!(&patch.url, Some(url) if url.trim().is_empty()) {
                    return Err(ValidationError::RequiredFieldMissing {
                        field: "url".to_string(),
                    });
                }
            }
            UrlOperation::Reorder { input } => {
                let ids = input.ids();
                if ids.is_empty() {
                    return Err(ValidationError::RequiredFieldMissing {
                        field: "ids".to_string(),
                    });
                }
                let unique: HashSet<_> = ids.iter().collect();
                if unique.len() != ids.len() {
                    return Err(ValidationError::ConstraintViolation {
                        constraint: "unique_url_id".to_string(),
                        reason: "reorder names an id more than once".to_string(),
                    });
                }
            }
            UrlOperation::UpdateList { patch } => {
                if patch.is_empty() {
                    return Err(ValidationError::InvalidValue {
                        field: "patch".to_string(),
                        reason: "no fields to update".to_string(),
                    });
                }
                if matches!(&patch.title, Some(title) if title.trim().is_empty()) {
                    return Err(ValidationError::RequiredFieldMissing {
                        field: "title".to_string(),
                    });
                }
            }
            UrlOperation::UpdateCollaboratorRole { role, .. } => {
                if *role == Role::Owner {
                    return Err(ValidationError::InvalidValue {
                        field: "role".to_string(),
                        reason: "ownership cannot be granted through a role update".to_string(),
                    });
                }
            }
            UrlOperation::Delete { .. }
            | UrlOperation::Archive { .. }
            | UrlOperation::Restore { .. } => {}
        }
        Ok(())
    }

    /// Check that the operation's target exists in `list`.
    pub fn check_target(&self, list: &List) -> LinkdeckResult<()> {
        match self {
            UrlOperation::Update { url_id, .. } | UrlOperation::Archive { url_id } => {
                list.find_url(*url_id)
                    .map(|_| ())
                    .ok_or_else(|| LinkdeckError::not_found(EntityType::Url, url_id))
            }
            UrlOperation::Delete { url_id } => {
                if list.find_url(*url_id).is_some() || list.find_archived(*url_id).is_some() {
                    Ok(())
                } else {
                    Err(LinkdeckError::not_found(EntityType::Url, url_id))
                }
            }
            UrlOperation::Restore { url_id } => list
                .find_archived(*url_id)
                .map(|_| ())
                .ok_or_else(|| LinkdeckError::not_found(EntityType::Url, url_id)),
            UrlOperation::UpdateCollaboratorRole { user_id, .. } => {
                if *user_id == list.owner_id {
                    Err(LinkdeckError::invalid_value(
                        "user_id",
                        "the owner's role cannot be changed",
                    ))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// APPLICATION
// ============================================================================

/// What [`apply_operation`] did to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    pub change: ChangeKind,
    /// The set of active URL ids changed.
    pub membership_changed: bool,
    /// An existing item now points at a different URL.
    pub url_changed: bool,
    /// The item that was added, updated, deleted, archived or restored.
    pub url: Option<UrlItem>,
    /// Free-text audit detail.
    pub detail: Option<String>,
}

impl AppliedChange {
    fn new(change: ChangeKind) -> Self {
        Self {
            change,
            membership_changed: false,
            url_changed: false,
            url: None,
            detail: None,
        }
    }
}

/// Apply `operation` to `list` in place.
///
/// Deterministic given the same list, operation and `now`, apart from the
/// id minted for an added item. Input and target errors leave the list
/// untouched.
pub fn apply_operation(
    list: &mut List,
    operation: UrlOperation,
    now: Timestamp,
) -> LinkdeckResult<AppliedChange> {
    operation.validate()?;
    operation.check_target(list)?;

    let applied = match operation {
        UrlOperation::Add { new_url } => {
            let item = new_url.into_item(order::next_position(&list.urls));
            list.urls.push(item.clone());
            AppliedChange {
                membership_changed: true,
                url: Some(item.clone()),
                ..AppliedChange::new(ChangeKind::UrlAdded {
                    url_id: item.id,
                    url_count: list.urls.len(),
                })
            }
        }
        UrlOperation::Update { url_id, patch } => {
            let item = list
                .find_url_mut(url_id)
                .ok_or_else(|| LinkdeckError::not_found(EntityType::Url, url_id))?;
            let url_changed = patch.apply_to(item, now);
            let change = if patch.is_favorite_only() {
                ChangeKind::UrlFavorited {
                    url_id,
                    is_favorite: item.is_favorite,
                }
            } else if patch.is_pin_only() {
                ChangeKind::UrlPinned {
                    url_id,
                    is_pinned: item.is_pinned.unwrap_or(false),
                }
            } else {
                ChangeKind::UrlUpdated { url_id }
            };
            AppliedChange {
                url_changed,
                url: Some(item.clone()),
                ..AppliedChange::new(change)
            }
        }
        UrlOperation::Delete { url_id } => {
            let (removed, was_active) = match list.urls.iter().position(|u| u.id == url_id) {
                Some(index) => (list.urls.remove(index), true),
                None => {
                    let index = list
                        .archived_urls
                        .iter()
                        .position(|u| u.id == url_id)
                        .ok_or_else(|| LinkdeckError::not_found(EntityType::Url, url_id))?;
                    (list.archived_urls.remove(index), false)
                }
            };
            AppliedChange {
                membership_changed: was_active,
                url: Some(removed),
                ..AppliedChange::new(ChangeKind::UrlDeleted {
                    url_id,
                    url_count: list.urls.len(),
                })
            }
        }
        UrlOperation::Reorder { input } => {
            list.urls = reorder(&list.urls, &input)?;
            AppliedChange {
                detail: Some("reorder".to_string()),
                ..AppliedChange::new(ChangeKind::UrlReordered {
                    url_count: list.urls.len(),
                })
            }
        }
        UrlOperation::Archive { url_id } => {
            let index = list
                .urls
                .iter()
                .position(|u| u.id == url_id)
                .ok_or_else(|| LinkdeckError::not_found(EntityType::Url, url_id))?;
            let mut item = list.urls.remove(index);
            item.updated_at = now;
            list.archived_urls.push(item.clone());
            AppliedChange {
                membership_changed: true,
                url: Some(item),
                ..AppliedChange::new(ChangeKind::UrlArchived {
                    url_id,
                    url_count: list.urls.len(),
                })
            }
        }
        UrlOperation::Restore { url_id } => {
            let index = list
                .archived_urls
                .iter()
                .position(|u| u.id == url_id)
                .ok_or_else(|| LinkdeckError::not_found(EntityType::Url, url_id))?;
            let mut item = list.archived_urls.remove(index);
            item.position = order::next_position(&list.urls);
            item.updated_at = now;
            list.urls.push(item.clone());
            AppliedChange {
                membership_changed: true,
                url: Some(item),
                ..AppliedChange::new(ChangeKind::UrlRestored {
                    url_id,
                    url_count: list.urls.len(),
                })
            }
        }
        UrlOperation::UpdateList { patch } => {
            if let Some(title) = patch.title {
                list.title = title.trim().to_string();
            }
            if let Some(description) = patch.description {
                list.description = Some(description);
            }
            if let Some(is_public) = patch.is_public {
                list.is_public = is_public;
            }
            AppliedChange::new(ChangeKind::ListUpdated)
        }
        UrlOperation::UpdateCollaboratorRole { user_id, role } => {
            match list.collaborators.iter_mut().find(|c| c.user_id == user_id) {
                Some(existing) => existing.role = role,
                None => list.collaborators.push(Collaborator { user_id, role }),
            }
            AppliedChange {
                detail: Some(role.as_db_str().to_string()),
                ..AppliedChange::new(ChangeKind::CollaboratorRoleUpdated { user_id, role })
            }
        }
    };

    list.updated_at = now;
    list.validate()?;
    Ok(applied)
}

/// Fill an item's empty fields from resolved metadata. Returns the updated
/// item when it is present.
pub fn fill_item_metadata(list: &mut List, url_id: UrlId, metadata: &PageMetadata) -> Option<UrlItem> {
    let item = list.find_url_mut(url_id)?;
    item.fill_from_metadata(metadata);
    Some(item.clone())
}

fn reorder(urls: &[UrlItem], input: &ReorderInput) -> Result<Vec<UrlItem>, ValidationError> {
    let current = order::id_set(urls);
    let requested: HashSet<UrlId> = input.ids().into_iter().collect();
    if requested.len() != urls.len() || requested != current {
        return Err(ValidationError::ConstraintViolation {
            constraint: "reorder_id_set".to_string(),
            reason: format!(
                "reorder names {} ids but the list holds a different set of {}",
                requested.len(),
                urls.len()
            ),
        });
    }

    let mut reordered = match input {
        ReorderInput::OrderedIds(ids) => {
            let by_id: HashMap<UrlId, &UrlItem> = urls.iter().map(|u| (u.id, u)).collect();
            ids.iter()
                .filter_map(|id| by_id.get(id).map(|item| (*item).clone()))
                .collect::<Vec<_>>()
        }
        ReorderInput::Positions(positions) => {
            let mut items = urls.to_vec();
            for item in items.iter_mut() {
                if let Some(position) = positions.get(&item.id) {
                    item.position = *position;
                }
            }
            order::sort_by_position(&mut items);
            items
        }
    };
    order::reassign_positions(&mut reordered);
    Ok(reordered)
}

// =============================================================================
// TESTS
// =============================================================================
