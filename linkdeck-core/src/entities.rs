//! Core entity structures

use crate::{
    new_entity_id, order, HealthCheck, ListId, PageMetadata, Role, Timestamp, UrlId, UserId,
    ValidationError,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A user's role on a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Collaborator {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub user_id: UserId,
    pub role: Role,
}

/// One entry of a list.
///
/// `position` defines canonical order. Values are not required to be unique
/// (concurrent adds may collide) so every sort over it must be stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UrlItem {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub id: UrlId,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub position: i64,
    #[serde(default)]
    pub is_favorite: bool,
    pub is_pinned: Option<bool>,
    #[serde(default)]
    pub click_count: u64,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
    #[serde(default)]
    pub health: HealthCheck,
}

impl UrlItem {
    /// Create a new item with a freshly minted id.
    pub fn new(url: impl Into<String>, position: i64) -> Self {
        let now = Utc::now();
        Self {
            id: new_entity_id(),
            url: url.into(),
            title: None,
            description: None,
            image: None,
            category: None,
            tags: Vec::new(),
            notes: None,
            position,
            is_favorite: false,
            is_pinned: None,
            click_count: 0,
            created_at: now,
            updated_at: now,
            health: HealthCheck::default(),
        }
    }

    /// Fill empty descriptive fields from resolved metadata.
    ///
    /// Fields the user already set are never overwritten. Returns true when
    /// anything changed.
    pub fn fill_from_metadata(&mut self, metadata: &PageMetadata) -> bool {
        let mut changed = false;
        if self.title.is_none() && metadata.title.is_some() {
            self.title = metadata.title.clone();
            changed = true;
        }
        if self.description.is_none() && metadata.description.is_some() {
            self.description = metadata.description.clone();
            changed = true;
        }
        if self.image.is_none() && metadata.image.is_some() {
            self.image = metadata.image.clone();
            changed = true;
        }
        if self.category.is_none() && metadata.category.is_some() {
            self.category = metadata.category.clone();
            changed = true;
        }
        for tag in &metadata.tags {
            if !self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                self.tags.push(tag.clone());
                changed = true;
            }
        }
        changed
    }

    /// Replace fields previously filled from a fallback record.
    ///
    /// A fallback title is the bare hostname, so when the enriched record
    /// arrives the title is taken over if it still equals the fallback.
    pub fn upgrade_from_fallback(&mut self, fallback: &PageMetadata, enriched: &PageMetadata) -> bool {
        let mut changed = false;
        if fallback.title.is_some() && self.title == fallback.title && enriched.title.is_some() {
            if self.title != enriched.title {
                self.title = enriched.title.clone();
                changed = true;
            }
        }
        changed |= self.fill_from_metadata(enriched);
        changed
    }
}

/// Partial update for a URL item. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UrlPatch {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub is_favorite: Option<bool>,
    pub is_pinned: Option<bool>,
}

impl UrlPatch {
    pub fn is_empty(&self) -> bool {
        self == &UrlPatch::default()
    }

    /// True when the patch only flips the favorite flag.
    pub fn is_favorite_only(&self) -> bool {
        self.is_favorite.is_some()
            && UrlPatch {
                is_favorite: None,
                ..self.clone()
            }
            .is_empty()
    }

    /// True when the patch only flips the pinned flag.
    pub fn is_pin_only(&self) -> bool {
        self.is_pinned.is_some()
            && UrlPatch {
                is_pinned: None,
                ..self.clone()
            }
            .is_empty()
    }

    /// Apply the patch. Returns true when the URL itself changed.
    ///
    /// A new URL makes the old page's title, description, image and
    /// category stale, so those are cleared unless the patch sets them. The
    /// caller refills them from the new page's metadata.
    pub fn apply_to(&self, item: &mut UrlItem, now: Timestamp) -> bool {
        let mut url_changed = false;
        if let Some(url) = &self.url {
            let url = url.trim();
            if url != item.url {
                item.url = url.to_string();
                item.title = None;
                item.description = None;
                item.image = None;
                item.category = None;
                url_changed = true;
            }
        }
        if let Some(title) = &self.title {
            item.title = Some(title.clone());
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        if let Some(category) = &self.category {
            item.category = Some(category.clone());
        }
        if let Some(tags) = &self.tags {
            item.tags = tags.clone();
        }
        if let Some(notes) = &self.notes {
            item.notes = Some(notes.clone());
        }
        if let Some(is_favorite) = self.is_favorite {
            item.is_favorite = is_favorite;
        }
        if let Some(is_pinned) = self.is_pinned {
            item.is_pinned = Some(is_pinned);
        }
        item.updated_at = now;
        url_changed
    }
}

/// A list of URLs.
///
/// Invariants: `urls` holds no duplicate id, and `urls` and `archived_urls`
/// are disjoint by id. See [`List::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct List {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub id: ListId,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub owner_id: UserId,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
    #[serde(default)]
    pub urls: Vec<UrlItem>,
    #[serde(default)]
    pub archived_urls: Vec<UrlItem>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl List {
    pub fn new(owner_id: UserId, slug: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_entity_id(),
            slug: slug.into(),
            title: title.into(),
            description: None,
            is_public: false,
            owner_id,
            collaborators: Vec::new(),
            urls: Vec::new(),
            archived_urls: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Ids of the active URLs in their current array order.
    pub fn url_ids(&self) -> Vec<UrlId> {
        order::id_sequence(&self.urls)
    }

    pub fn find_url(&self, id: UrlId) -> Option<&UrlItem> {
        self.urls.iter().find(|u| u.id == id)
    }

    pub fn find_url_mut(&mut self, id: UrlId) -> Option<&mut UrlItem> {
        self.urls.iter_mut().find(|u| u.id == id)
    }

    pub fn find_archived(&self, id: UrlId) -> Option<&UrlItem> {
        self.archived_urls.iter().find(|u| u.id == id)
    }

    /// The role `user` holds on this list, if any. The owner always holds
    /// [`Role::Owner`] regardless of the collaborator table.
    pub fn role_of(&self, user: UserId) -> Option<Role> {
        if user == self.owner_id {
            return Some(Role::Owner);
        }
        self.collaborators
            .iter()
            .find(|c| c.user_id == user)
            .map(|c| c.role)
    }

    /// Check the list invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(self.urls.len());
        for item in &self.urls {
            if !seen.insert(item.id) {
                return Err(ValidationError::ConstraintViolation {
                    constraint: "unique_url_id".to_string(),
                    reason: format!("url id {} appears more than once", item.id),
                });
            }
        }
        for item in &self.archived_urls {
            if seen.contains(&item.id) {
                return Err(ValidationError::ConstraintViolation {
                    constraint: "archived_disjoint".to_string(),
                    reason: format!("url id {} is both active and archived", item.id),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn list_with(urls: Vec<UrlItem>) -> List {
        let mut list = List::new(Uuid::now_v7(), "reading", "Reading");
        list.urls = urls;
        list
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let a = UrlItem::new("https://a.example", 0);
        let mut list = list_with(vec![a.clone(), a]);
        assert!(list.validate().is_err());
        list.urls.pop();
        assert!(list.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_with_archive() {
        let a = UrlItem::new("https://a.example", 0);
        let mut list = list_with(vec![a.clone()]);
        list.archived_urls.push(a);
        assert!(matches!(
            list.validate(),
            Err(ValidationError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_role_of_owner_and_collaborators() {
        let owner = Uuid::now_v7();
        let editor = Uuid::now_v7();
        let mut list = List::new(owner, "s", "t");
        list.collaborators.push(Collaborator {
            user_id: editor,
            role: Role::Editor,
        });
        assert_eq!(list.role_of(owner), Some(Role::Owner));
        assert_eq!(list.role_of(editor), Some(Role::Editor));
        assert_eq!(list.role_of(Uuid::now_v7()), None);
    }

    #[test]
    fn test_patch_classification() {
        let fav = UrlPatch {
            is_favorite: Some(true),
            ..Default::default()
        };
        assert!(fav.is_favorite_only());
        assert!(!fav.is_pin_only());

        let pin = UrlPatch {
            is_pinned: Some(true),
            ..Default::default()
        };
        assert!(pin.is_pin_only());

        let mixed = UrlPatch {
            is_favorite: Some(true),
            title: Some("x".into()),
            ..Default::default()
        };
        assert!(!mixed.is_favorite_only());
        assert!(UrlPatch::default().is_empty());
    }

    #[test]
    fn test_patch_reports_url_change() {
        let mut item = UrlItem::new("https://a.example", 0);
        let now = Utc::now();
        let same = UrlPatch {
            url: Some("https://a.example".into()),
            ..Default::default()
        };
        assert!(!same.apply_to(&mut item, now));
        let moved = UrlPatch {
            url: Some("https://b.example".into()),
            notes: Some("moved".into()),
            ..Default::default()
        };
        assert!(moved.apply_to(&mut item, now));
        assert_eq!(item.url, "https://b.example");
        assert_eq!(item.notes.as_deref(), Some("moved"));
    }

    #[test]
    fn test_patch_trims_url() {
        let mut item = UrlItem::new("https://a.example", 0);
        let padded = UrlPatch {
            url: Some("  https://a.example ".into()),
            ..Default::default()
        };
        assert!(!padded.apply_to(&mut item, Utc::now()));

        let moved = UrlPatch {
            url: Some("  https://moved.example/page ".into()),
            ..Default::default()
        };
        assert!(moved.apply_to(&mut item, Utc::now()));
        assert_eq!(item.url, "https://moved.example/page");
    }

    #[test]
    fn test_url_change_clears_old_page_fields() {
        let mut item = UrlItem::new("https://old.example", 0);
        item.title = Some("Old page".into());
        item.description = Some("About old".into());
        item.image = Some("https://old.example/og.png".into());
        item.category = Some("news".into());
        item.notes = Some("keep me".into());
        item.is_favorite = true;

        let moved = UrlPatch {
            url: Some("https://new.example".into()),
            category: Some("docs".into()),
            ..Default::default()
        };
        assert!(moved.apply_to(&mut item, Utc::now()));
        assert_eq!(item.title, None);
        assert_eq!(item.description, None);
        assert_eq!(item.image, None);
        assert_eq!(item.category.as_deref(), Some("docs"));
        assert_eq!(item.notes.as_deref(), Some("keep me"));
        assert!(item.is_favorite);
    }

    #[test]
    fn test_fill_from_metadata_keeps_user_fields() {
        let mut item = UrlItem::new("https://a.example", 0);
        item.title = Some("Mine".into());
        let meta = PageMetadata {
            title: Some("Theirs".into()),
            description: Some("Desc".into()),
            tags: vec!["news".into()],
            ..Default::default()
        };
        assert!(item.fill_from_metadata(&meta));
        assert_eq!(item.title.as_deref(), Some("Mine"));
        assert_eq!(item.description.as_deref(), Some("Desc"));
        assert_eq!(item.tags, vec!["news".to_string()]);
        assert!(!item.fill_from_metadata(&meta));
    }

    #[test]
    fn test_upgrade_from_fallback_replaces_hostname_title() {
        let fallback = PageMetadata::fallback("a.example");
        let mut item = UrlItem::new("https://a.example", 0);
        item.fill_from_metadata(&fallback);
        assert_eq!(item.title.as_deref(), Some("a.example"));

        let enriched = PageMetadata {
            title: Some("A Example".into()),
            description: Some("About A".into()),
            ..Default::default()
        };
        assert!(item.upgrade_from_fallback(&fallback, &enriched));
        assert_eq!(item.title.as_deref(), Some("A Example"));
        assert_eq!(item.description.as_deref(), Some("About A"));
    }
}
