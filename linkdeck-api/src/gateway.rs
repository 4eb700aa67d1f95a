//! Mutation Gateway
//!
//! The single path every list mutation takes:
//!
//! 1. resolve the list and check the actor's capability
//! 2. validate the operation against the current record
//! 3. for adds and URL replacements, wait up to the add-path ceiling for
//!    metadata, then re-read the list
//! 4. apply, persist, invalidate the list bundle (and suggestions when
//!    membership or a URL string changed)
//! 5. publish a change event with its activity record
//! 6. hand a deferred fetch to the background enricher
//!
//! Only permission, not-found, validation and persisted-write failures
//! reach the caller. Cache and notification failures are logged by the
//! components that hit them; enrichment failures degrade to a fallback.

use std::sync::Arc;

use chrono::Utc;
use linkdeck_core::{
    apply_operation, fill_item_metadata, ActivityRecord, Actor, Capability, ChangeEvent,
    EntityType, LinkdeckError, LinkdeckResult, List, ListPatch, NewUrl, PageMetadata,
    PermissionEvaluator, ReorderInput, Role, SyncConfig, UrlId, UrlItem, UrlOperation, UrlPatch,
    UserId,
};
use linkdeck_enrich::{parse_http_url, CeilingOutcome, EnrichmentPipeline};
use linkdeck_events::{publish_best_effort, ChangeNotifier};
use linkdeck_storage::{ListStore, SafeCache};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::background::{BackgroundEnricher, CompletionOutcome, EnrichmentJob};

/// Fail with `PermissionDenied` unless `actor` holds `capability` on `list`.
pub fn authorize(
    evaluator: &dyn PermissionEvaluator,
    list: &List,
    actor: &Actor,
    capability: Capability,
) -> LinkdeckResult<()> {
    if evaluator.allows(list, actor, capability) {
        Ok(())
    } else {
        debug!(
            list_id = %list.id,
            actor = %actor.user_id,
            capability = %capability,
            "Permission denied"
        );
        Err(LinkdeckError::PermissionDenied {
            actor: actor.user_id,
            capability,
            list_id: list.id,
        })
    }
}

/// Result of a successful mutation.
#[derive(Debug)]
pub struct GatewayOutcome {
    /// The list as persisted.
    pub list: List,
    /// The event that was published (delivery not guaranteed).
    pub event: ChangeEvent,
    /// The item added or changed, if the operation targeted one.
    pub url: Option<UrlItem>,
    /// Metadata the item was filled from, possibly a fallback.
    pub metadata: Option<PageMetadata>,
    /// Background completion for a fetch that outlived the ceiling.
    pub background: Option<JoinHandle<CompletionOutcome>>,
}

impl GatewayOutcome {
    pub fn enrichment_pending(&self) -> bool {
        self.background.is_some()
    }
}

/// Applies [`UrlOperation`]s to persisted lists.
pub struct MutationGateway {
    store: Arc<dyn ListStore>,
    cache: SafeCache,
    notifier: Arc<dyn ChangeNotifier>,
    permissions: Arc<dyn PermissionEvaluator>,
    enrichment: EnrichmentPipeline,
    background: BackgroundEnricher,
    config: SyncConfig,
}

impl MutationGateway {
    pub fn new(
        store: Arc<dyn ListStore>,
        cache: SafeCache,
        notifier: Arc<dyn ChangeNotifier>,
        permissions: Arc<dyn PermissionEvaluator>,
        enrichment: EnrichmentPipeline,
        config: SyncConfig,
    ) -> Self {
        let background = BackgroundEnricher::new(
            store.clone(),
            cache.clone(),
            notifier.clone(),
            config.background_enrichment_lifetime,
        );
        Self {
            store,
            cache,
            notifier,
            permissions,
            enrichment,
            background,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn ListStore> {
        &self.store
    }

    pub fn permissions(&self) -> &Arc<dyn PermissionEvaluator> {
        &self.permissions
    }

    /// Apply one operation on behalf of `actor`.
    ///
    /// `list_key` is a list id or slug.
    pub async fn apply(
        &self,
        list_key: &str,
        operation: UrlOperation,
        actor: Actor,
    ) -> LinkdeckResult<GatewayOutcome> {
        let op_name = operation.name();
        let mut list = self.store.require(list_key).await?;
        let capability = operation.required_capability();
        authorize(self.permissions.as_ref(), &list, &actor, capability)?;
        operation.validate()?;
        operation.check_target(&list)?;

        let enrichment = match enrichment_target(&list, &operation) {
            Some(url) => {
                parse_http_url(&url).map_err(|e| LinkdeckError::invalid_value("url", e.to_string()))?;
                let outcome = self
                    .enrichment
                    .enrich_with_ceiling(&url, self.config.add_path_ceiling)
                    .await;
                // The list may have changed while we waited on the fetch.
                list = self
                    .store
                    .get_by_id(list.id)
                    .await?
                    .ok_or_else(|| LinkdeckError::not_found(EntityType::List, list.id))?;
                authorize(self.permissions.as_ref(), &list, &actor, capability)?;
                Some((url, outcome))
            }
            None => None,
        };

        let applied = apply_operation(&mut list, operation, Utc::now())?;

        let mut url = applied.url.clone();
        let metadata = enrichment.as_ref().map(|(_, o)| o.immediate().clone());
        if let (Some(meta), Some(item)) = (&metadata, &applied.url) {
            url = fill_item_metadata(&mut list, item.id, meta).or(url);
        }

        self.store.put(&list).await?;

        self.cache.invalidate_bundle(list.id).await;
        if applied.membership_changed || applied.url_changed {
            self.cache.invalidate_suggestions(list.id).await;
        }

        let mut activity = ActivityRecord::by_actor(list.id, &actor, &applied.change);
        if let Some(detail) = &applied.detail {
            activity = activity.with_detail(detail.clone());
        }
        let event = ChangeEvent::new(list.id, applied.change).with_activity(activity);
        let delivered = publish_best_effort(self.notifier.as_ref(), &event).await;

        let background = match (enrichment, &url) {
            (Some((url_string, CeilingOutcome::Deferred { fallback, pending })), Some(item)) => {
                Some(self.background.spawn(EnrichmentJob {
                    list_id: list.id,
                    url_id: item.id,
                    url: url_string,
                    fallback,
                    pending,
                }))
            }
            _ => None,
        };

        info!(
            list_id = %list.id,
            actor = %actor.user_id,
            op = op_name,
            action = event.action_name(),
            delivered,
            enrichment_pending = background.is_some(),
            "Applied list mutation"
        );

        Ok(GatewayOutcome {
            list,
            event,
            url,
            metadata,
            background,
        })
    }

    // ------------------------------------------------------------------------
    // Operation wrappers
    // ------------------------------------------------------------------------

    pub async fn add_url(
        &self,
        list_key: &str,
        new_url: NewUrl,
        actor: Actor,
    ) -> LinkdeckResult<GatewayOutcome> {
        self.apply(list_key, UrlOperation::Add { new_url }, actor)
            .await
    }

    pub async fn update_url(
        &self,
        list_key: &str,
        url_id: UrlId,
        patch: UrlPatch,
        actor: Actor,
    ) -> LinkdeckResult<GatewayOutcome> {
        self.apply(list_key, UrlOperation::Update { url_id, patch }, actor)
            .await
    }

    pub async fn delete_url(
        &self,
        list_key: &str,
        url_id: UrlId,
        actor: Actor,
    ) -> LinkdeckResult<GatewayOutcome> {
        self.apply(list_key, UrlOperation::Delete { url_id }, actor)
            .await
    }

    pub async fn reorder_urls(
        &self,
        list_key: &str,
        input: ReorderInput,
        actor: Actor,
    ) -> LinkdeckResult<GatewayOutcome> {
        self.apply(list_key, UrlOperation::Reorder { input }, actor)
            .await
    }

    pub async fn archive_url(
        &self,
        list_key: &str,
        url_id: UrlId,
        actor: Actor,
    ) -> LinkdeckResult<GatewayOutcome> {
        self.apply(list_key, UrlOperation::Archive { url_id }, actor)
            .await
    }

    pub async fn restore_url(
        &self,
        list_key: &str,
        url_id: UrlId,
        actor: Actor,
    ) -> LinkdeckResult<GatewayOutcome> {
        self.apply(list_key, UrlOperation::Restore { url_id }, actor)
            .await
    }

    pub async fn update_list(
        &self,
        list_key: &str,
        patch: ListPatch,
        actor: Actor,
    ) -> LinkdeckResult<GatewayOutcome> {
        self.apply(list_key, UrlOperation::UpdateList { patch }, actor)
            .await
    }

    pub async fn update_collaborator_role(
        &self,
        list_key: &str,
        user_id: UserId,
        role: Role,
        actor: Actor,
    ) -> LinkdeckResult<GatewayOutcome> {
        self.apply(
            list_key,
            UrlOperation::UpdateCollaboratorRole { user_id, role },
            actor,
        )
        .await
    }
}

/// The URL to fetch metadata for: an added URL, or an update's replacement
/// URL when it differs from the stored one.
fn enrichment_target(list: &List, operation: &UrlOperation) -> Option<String> {
    let url = operation.url_to_enrich()?;
    if let UrlOperation::Update { url_id, .. } = operation {
        let current = list.find_url(*url_id)?;
        if current.url.trim() == url {
            return None;
        }
    }
    Some(url.to_string())
}
