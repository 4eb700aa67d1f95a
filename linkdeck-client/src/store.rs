//! Client Reconciliation Store
//!
//! Holds one list snapshot for rendering. Local mutations apply
//! optimistically before the request is sent; server snapshots are merged
//! with [`ReconciliationStore::merge_snapshot`]:
//!
//! 1. No difference: keep the held snapshot.
//! 2. Only the id sequence differs: keep the held order and take every
//!    other field from the server.
//! 3. A drag shadow validated against the server: server content in the
//!    shadow's order.
//! 4. Anything else: replace wholesale.
//!
//! A membership or content change therefore always beats a local order,
//! including one still being dragged.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use linkdeck_api::WsFrame;
use linkdeck_core::{
    apply_operation, reassign_positions, ChangeCategory, ChangeEvent, List, ReorderInput, UrlId,
    UrlItem, UrlOperation,
};
use linkdeck_events::Notification;
use tracing::{debug, info, warn};

use crate::api_client::ListApi;
use crate::diff::SnapshotDiff;
use crate::error::{ClientError, ClientResult};
use crate::realtime::check_event;
use crate::session::SessionContext;

/// What a merge did to the held snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// Nothing differed; no re-render needed.
    KeptHeld,
    /// Only order differed; the held order was kept.
    PreservedOrder,
    /// Server content arranged in the drag shadow's order.
    ShadowOrder,
    /// The server snapshot replaced the held one.
    Replaced,
}

impl MergeDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeDecision::KeptHeld => "kept_held",
            MergeDecision::PreservedOrder => "preserved_order",
            MergeDecision::ShadowOrder => "shadow_order",
            MergeDecision::Replaced => "replaced",
        }
    }

    pub fn needs_render(&self) -> bool {
        *self != MergeDecision::KeptHeld
    }
}

impl fmt::Display for MergeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct ReconciliationStore {
    api: Arc<dyn ListApi>,
    session: SessionContext,
    list_key: String,
    held: Option<List>,
}

impl ReconciliationStore {
    pub fn new(api: Arc<dyn ListApi>, session: SessionContext, list_key: impl Into<String>) -> Self {
        Self {
            api,
            session,
            list_key: list_key.into(),
            held: None,
        }
    }

    pub fn snapshot(&self) -> Option<&List> {
        self.held.as_ref()
    }

    pub fn list_key(&self) -> &str {
        &self.list_key
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Leave the list view and hand the session back.
    pub fn into_session(mut self) -> SessionContext {
        if let Some(list) = &self.held {
            self.session.navigate_away(list.id);
        }
        self.session
    }

    fn held(&self) -> ClientResult<&List> {
        self.held
            .as_ref()
            .ok_or_else(|| ClientError::NotLoaded(self.list_key.clone()))
    }

    // ========================================================================
    // SNAPSHOT OPERATIONS
    // ========================================================================

    /// Fetch and hold the canonical snapshot, replacing whatever was held.
    pub async fn load(&mut self) -> ClientResult<&List> {
        let list = self.api.fetch_list(&self.list_key).await?;
        Ok(self.held.insert(list))
    }

    /// Apply `operation` to the held snapshot without any network call.
    pub fn apply_optimistic(&mut self, operation: &UrlOperation) -> ClientResult<&List> {
        let mut next = self.held()?.clone();
        apply_operation(&mut next, operation.clone(), Utc::now())?;
        Ok(self.held.insert(next))
    }

    /// Merge a server snapshot into the held one.
    pub fn merge_snapshot(&mut self, incoming: List) -> MergeDecision {
        let Some(held) = self.held.as_ref() else {
            self.held = Some(incoming);
            return MergeDecision::Replaced;
        };

        let list_id = incoming.id;
        let shadow_order = match self.session.drag.validate(list_id, &incoming.urls) {
            Some(validation) if validation.valid => self.session.drag.shadow_ids(list_id),
            _ => None,
        };

        let diff = SnapshotDiff::between(held, &incoming);
        let decision = if diff.is_empty() {
            MergeDecision::KeptHeld
        } else if diff.is_order_only() {
            let urls = held.urls.clone();
            self.held = Some(List { urls, ..incoming });
            MergeDecision::PreservedOrder
        } else if let Some(order) = shadow_order.filter(|_| !diff.metadata_changed) {
            self.held = Some(arrange(incoming, &order));
            MergeDecision::ShadowOrder
        } else {
            self.held = Some(incoming);
            MergeDecision::Replaced
        };

        debug!(
            list_id = %list_id,
            decision = %decision,
            metadata_changed = diff.metadata_changed,
            length_changed = diff.urls_length_changed,
            order_changed = diff.urls_order_changed,
            content_changed = diff.urls_content_changed,
            "Merged server snapshot"
        );
        decision
    }

    /// Refetch and merge. Used after reconnects, lag and on a timer.
    pub async fn refetch(&mut self) -> ClientResult<MergeDecision> {
        let list = self.api.fetch_list(&self.list_key).await?;
        Ok(self.merge_snapshot(list))
    }

    /// Replace the held snapshot with a freshly fetched one and drop any
    /// drag shadow.
    pub async fn rollback(&mut self) -> ClientResult<&List> {
        let list = self.api.fetch_list(&self.list_key).await?;
        self.session.drag.clear(list.id);
        info!(list_id = %list.id, "Rolled back to canonical snapshot");
        Ok(self.held.insert(list))
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Optimistically apply `operation`, send it, then merge the persisted
    /// list. On a failed request the store rolls back and returns the
    /// request's error.
    pub async fn commit(&mut self, operation: UrlOperation) -> ClientResult<MergeDecision> {
        let list_id = self.held()?.id;
        self.apply_optimistic(&operation)?;

        match self.api.mutate(&self.list_key, &operation).await {
            Ok(response) => {
                if matches!(operation, UrlOperation::Reorder { .. }) {
                    self.session.drag.clear(list_id);
                }
                Ok(self.merge_snapshot(response.list))
            }
            Err(err) => {
                warn!(
                    list_id = %list_id,
                    operation = operation.name(),
                    error = %err,
                    "Mutation failed, rolling back"
                );
                if let Err(rollback_err) = self.rollback().await {
                    warn!(list_id = %list_id, error = %rollback_err, "Rollback refetch failed");
                    self.session.drag.clear(list_id);
                }
                Err(err)
            }
        }
    }

    // ========================================================================
    // DRAG HOOKS
    // ========================================================================

    pub fn begin_drag(&mut self) -> ClientResult<()> {
        let held = self.held.as_ref().ok_or_else(|| ClientError::NotLoaded(self.list_key.clone()))?;
        self.session.drag.begin(held.id, &held.urls);
        Ok(())
    }

    /// Show `ordered_ids` locally and record it as the shadow order.
    pub fn update_drag(&mut self, ordered_ids: &[UrlId]) -> ClientResult<&List> {
        let reorder = UrlOperation::Reorder {
            input: ReorderInput::OrderedIds(ordered_ids.to_vec()),
        };
        self.apply_optimistic(&reorder)?;
        let held = self.held()?;
        let (list_id, urls) = (held.id, held.urls.clone());
        self.session.drag.update(list_id, urls);
        self.held()
    }

    /// Release the drag and persist the shadow order. Returns `None` when
    /// the shadow was invalidated while dragging, in which case the held
    /// snapshot already shows the server's order.
    pub async fn finish_drag(&mut self) -> ClientResult<Option<MergeDecision>> {
        let list_id = self.held()?.id;
        self.session.drag.end(list_id);
        let Some(order) = self.session.drag.shadow_ids(list_id) else {
            debug!(list_id = %list_id, "Drag shadow gone before persist");
            return Ok(None);
        };
        let reorder = UrlOperation::Reorder {
            input: ReorderInput::OrderedIds(order),
        };
        self.commit(reorder).await.map(Some)
    }

    // ========================================================================
    // INCOMING CHANGES
    // ========================================================================

    /// React to a change from another client. Changes this session issued
    /// are skipped, since their result was merged from the response. Other
    /// sessions of the same user are treated like anyone else. An order
    /// change from elsewhere is adopted wholesale unless a drag shadow is
    /// protecting the local order.
    pub async fn handle_event(&mut self, event: &ChangeEvent) -> ClientResult<Option<MergeDecision>> {
        check_event(event)?;
        let Some(held) = &self.held else {
            return Ok(None);
        };
        if event.list_id != held.id {
            return Ok(None);
        }
        let own = event
            .activity
            .as_ref()
            .is_some_and(|a| self.session.issued(a.session_id));
        if own {
            return Ok(None);
        }

        match event.category {
            ChangeCategory::Order => {
                if self.session.drag.has_shadow(held.id) {
                    debug!(list_id = %held.id, "Order change ignored during drag");
                    return Ok(None);
                }
                self.load().await?;
                Ok(Some(MergeDecision::Replaced))
            }
            ChangeCategory::Membership | ChangeCategory::Content | ChangeCategory::Permission => {
                self.refetch().await.map(Some)
            }
        }
    }

    pub async fn handle_frame(&mut self, frame: &WsFrame) -> ClientResult<Option<MergeDecision>> {
        match frame {
            WsFrame::Notification {
                notification: Notification::Change(event),
                ..
            } => self.handle_event(event).await,
            WsFrame::Notification { .. } => Ok(None),
            WsFrame::Connected { .. } | WsFrame::Lagged { .. } => {
                if self.held.is_some() {
                    self.refetch().await.map(Some)
                } else {
                    self.load().await?;
                    Ok(Some(MergeDecision::Replaced))
                }
            }
            WsFrame::Disconnected { .. } => Ok(None),
        }
    }
}

/// `incoming`'s items in `order`, positions rewritten to match.
fn arrange(mut incoming: List, order: &[UrlId]) -> List {
    let mut by_id: HashMap<UrlId, UrlItem> = incoming.urls.drain(..).map(|u| (u.id, u)).collect();
    let mut urls: Vec<UrlItem> = order.iter().filter_map(|id| by_id.remove(id)).collect();
    reassign_positions(&mut urls);
    incoming.urls = urls;
    incoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use linkdeck_api::MutationResponse;
    use linkdeck_core::{id_sequence, ActivityRecord, Actor, ChangeKind};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Serves a fixed list and fails mutations on demand.
    struct StaticApi {
        list: Mutex<List>,
        fail_mutations: bool,
    }

    #[async_trait]
    impl ListApi for StaticApi {
        async fn fetch_list(&self, _list_key: &str) -> ClientResult<List> {
            Ok(self.list.lock().unwrap().clone())
        }

        async fn mutate(&self, _list_key: &str, operation: &UrlOperation) -> ClientResult<MutationResponse> {
            if self.fail_mutations {
                return Err(ClientError::InvalidResponse("HTTP 503".into()));
            }
            let mut list = self.list.lock().unwrap();
            let applied = apply_operation(&mut list, operation.clone(), Utc::now())?;
            Ok(MutationResponse {
                list: list.clone(),
                event: ChangeEvent::new(list.id, applied.change),
                url: applied.url,
                metadata: None,
                enrichment_pending: false,
            })
        }
    }

    fn server_list(n: usize) -> List {
        let mut list = List::new(Uuid::now_v7(), "team", "Team");
        list.urls = (0..n)
            .map(|i| UrlItem::new(format!("https://u{}.example", i), i as i64))
            .collect();
        list
    }

    fn store_for(list: &List, fail_mutations: bool) -> ReconciliationStore {
        store_with_api(list, fail_mutations).0
    }

    fn store_with_api(list: &List, fail_mutations: bool) -> (ReconciliationStore, Arc<StaticApi>) {
        let api = Arc::new(StaticApi {
            list: Mutex::new(list.clone()),
            fail_mutations,
        });
        let store = ReconciliationStore::new(
            api.clone(),
            SessionContext::new(Actor::new(list.owner_id)),
            "team",
        );
        (store, api)
    }

    #[tokio::test]
    async fn test_first_merge_replaces() {
        let list = server_list(2);
        let mut store = store_for(&list, false);
        assert_eq!(store.merge_snapshot(list.clone()), MergeDecision::Replaced);
        assert_eq!(store.snapshot(), Some(&list));
    }

    #[tokio::test]
    async fn test_order_only_keeps_held_order() {
        let list = server_list(3);
        let mut store = store_for(&list, false);
        store.load().await.unwrap();
        let ids = id_sequence(&list.urls);
        store.update_drag(&[ids[2], ids[0], ids[1]]).unwrap();

        let mut stale = list.clone();
        stale.updated_at = Utc::now();
        assert_eq!(store.merge_snapshot(stale), MergeDecision::PreservedOrder);
        assert_eq!(id_sequence(&store.snapshot().unwrap().urls), vec![ids[2], ids[0], ids[1]]);
    }

    #[tokio::test]
    async fn test_content_change_replaces() {
        let list = server_list(2);
        let mut store = store_for(&list, false);
        store.load().await.unwrap();

        let mut incoming = list.clone();
        incoming.urls[0].title = Some("Renamed".into());
        assert_eq!(store.merge_snapshot(incoming.clone()), MergeDecision::Replaced);
        assert_eq!(store.snapshot(), Some(&incoming));
    }

    #[tokio::test]
    async fn test_valid_shadow_orders_new_content() {
        let list = server_list(3);
        let mut store = store_for(&list, false);
        store.load().await.unwrap();
        let ids = id_sequence(&list.urls);

        store.begin_drag().unwrap();
        store.update_drag(&[ids[1], ids[2], ids[0]]).unwrap();

        let mut incoming = list.clone();
        incoming.urls[2].notes = Some("from elsewhere".into());
        assert_eq!(store.merge_snapshot(incoming), MergeDecision::ShadowOrder);

        let held = store.snapshot().unwrap();
        assert_eq!(id_sequence(&held.urls), vec![ids[1], ids[2], ids[0]]);
        assert_eq!(held.urls[1].notes.as_deref(), Some("from elsewhere"));
        assert_eq!(held.urls[1].position, 1);
    }

    #[tokio::test]
    async fn test_apply_optimistic_rejects_invalid_locally() {
        let list = server_list(1);
        let mut store = store_for(&list, false);
        store.load().await.unwrap();

        let result = store.apply_optimistic(&UrlOperation::Delete { url_id: Uuid::now_v7() });
        assert!(matches!(result, Err(ClientError::Rejected(_))));
        assert_eq!(store.snapshot(), Some(&list));
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back_to_server() {
        let list = server_list(2);
        let mut store = store_for(&list, true);
        store.load().await.unwrap();

        let result = store
            .commit(UrlOperation::Delete {
                url_id: list.urls[0].id,
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.snapshot(), Some(&list));
    }

    #[tokio::test]
    async fn test_finish_drag_persists_and_clears_shadow() {
        let list = server_list(3);
        let mut store = store_for(&list, false);
        store.load().await.unwrap();
        let ids = id_sequence(&list.urls);

        store.begin_drag().unwrap();
        store.update_drag(&[ids[2], ids[1], ids[0]]).unwrap();
        let decision = store.finish_drag().await.unwrap();

        assert_eq!(decision, Some(MergeDecision::KeptHeld));
        assert!(!store.session().drag.has_shadow(list.id));
        assert_eq!(id_sequence(&store.snapshot().unwrap().urls), vec![ids[2], ids[1], ids[0]]);
    }

    #[tokio::test]
    async fn test_own_and_foreign_events() {
        let list = server_list(1);
        let mut store = store_for(&list, false);
        store.load().await.unwrap();

        let own = ChangeEvent::new(list.id, ChangeKind::ListUpdated).with_activity(
            ActivityRecord::by_actor(list.id, &store.session().actor, &ChangeKind::ListUpdated),
        );
        assert_eq!(store.handle_event(&own).await.unwrap(), None);

        let same_user_elsewhere = ChangeEvent::new(list.id, ChangeKind::ListUpdated).with_activity(
            ActivityRecord::by_actor(
                list.id,
                &Actor::new(list.owner_id).in_session(Uuid::now_v7()),
                &ChangeKind::ListUpdated,
            ),
        );
        assert_eq!(
            store.handle_event(&same_user_elsewhere).await.unwrap(),
            Some(MergeDecision::KeptHeld)
        );

        let other_list = ChangeEvent::new(Uuid::now_v7(), ChangeKind::ListUpdated);
        assert_eq!(store.handle_event(&other_list).await.unwrap(), None);

        let foreign = ChangeEvent::new(list.id, ChangeKind::ListUpdated);
        assert_eq!(
            store.handle_event(&foreign).await.unwrap(),
            Some(MergeDecision::KeptHeld)
        );
    }

    #[tokio::test]
    async fn test_not_loaded() {
        let list = server_list(1);
        let mut store = store_for(&list, false);
        assert!(matches!(store.begin_drag(), Err(ClientError::NotLoaded(_))));
        assert!(matches!(
            store.commit(UrlOperation::Delete { url_id: list.urls[0].id }).await,
            Err(ClientError::NotLoaded(_))
        ));
    }

    #[tokio::test]
    async fn test_inconsistent_event_is_rejected() {
        let list = server_list(1);
        let mut store = store_for(&list, false);
        store.load().await.unwrap();

        let mut event = ChangeEvent::new(list.id, ChangeKind::UrlReordered { url_count: 1 });
        event.category = ChangeCategory::Membership;
        assert!(matches!(
            store.handle_event(&event).await,
            Err(ClientError::InvalidResponse(_))
        ));
        assert_eq!(store.snapshot(), Some(&list));
    }

    #[tokio::test]
    async fn test_connected_and_lagged_frames_refetch() {
        let list = server_list(2);
        let (mut store, api) = store_with_api(&list, false);

        let connected = WsFrame::Connected {
            list_id: list.id,
            channels: vec![format!("list:{}", list.id)],
        };
        assert_eq!(
            store.handle_frame(&connected).await.unwrap(),
            Some(MergeDecision::Replaced)
        );
        assert_eq!(store.snapshot(), Some(&list));

        // Changes the stream dropped while the client lagged.
        let missed = {
            let mut server = api.list.lock().unwrap();
            server.urls.push(UrlItem::new("https://missed.example", 2));
            server.clone()
        };
        assert_eq!(
            store.handle_frame(&WsFrame::Lagged { skipped: 3 }).await.unwrap(),
            Some(MergeDecision::Replaced)
        );
        assert_eq!(store.snapshot(), Some(&missed));

        assert_eq!(
            store.handle_frame(&connected).await.unwrap(),
            Some(MergeDecision::KeptHeld)
        );
    }

    #[tokio::test]
    async fn test_activity_and_disconnect_frames_do_nothing() {
        let list = server_list(1);
        let mut store = store_for(&list, false);
        store.load().await.unwrap();

        let record = ActivityRecord::for_change(list.id, Uuid::now_v7(), &ChangeKind::ListUpdated);
        let activity = WsFrame::Notification {
            channel: format!("list-activity:{}", list.id),
            notification: Notification::Activity(record),
        };
        assert_eq!(store.handle_frame(&activity).await.unwrap(), None);

        let closed = WsFrame::Disconnected {
            reason: "Connection closed".into(),
        };
        assert_eq!(store.handle_frame(&closed).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_change_frame_from_other_session_is_merged() {
        let list = server_list(1);
        let (mut store, api) = store_with_api(&list, false);
        store.load().await.unwrap();

        let renamed = {
            let mut server = api.list.lock().unwrap();
            server.title = "Renamed".into();
            server.clone()
        };
        let event = ChangeEvent::new(list.id, ChangeKind::ListUpdated).with_activity(
            ActivityRecord::for_change(list.id, Uuid::now_v7(), &ChangeKind::ListUpdated),
        );
        let frame = WsFrame::Notification {
            channel: format!("list:{}", list.id),
            notification: Notification::Change(event),
        };
        assert_eq!(
            store.handle_frame(&frame).await.unwrap(),
            Some(MergeDecision::Replaced)
        );
        assert_eq!(store.snapshot(), Some(&renamed));
    }
}
