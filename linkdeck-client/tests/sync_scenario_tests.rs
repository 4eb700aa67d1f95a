//! Two clients against one in-process gateway.
//!
//! Events recorded by the gateway's notifier are handed to the other
//! client by hand, which makes the interleavings deterministic.

use std::sync::Arc;

use async_trait::async_trait;
use linkdeck_api::{authorize, ApiError, MutationGateway, MutationResponse};
use linkdeck_client::{
    ClientError, ClientResult, ListApi, MergeDecision, ReconciliationStore, SessionContext,
};
use linkdeck_core::{
    id_sequence, Actor, Capability, List, NewUrl, ReorderInput, RolePermissions, SyncConfig,
    UrlItem, UrlOperation,
};
use linkdeck_enrich::EnrichmentPipeline;
use linkdeck_storage::{InMemoryCacheBackend, InMemoryListStore, ListStore, SafeCache};
use linkdeck_test_utils::{fixtures, RecordingNotifier, ScriptedFetcher};

/// `ListApi` served directly by a gateway, as the HTTP routes would.
struct GatewayApi {
    gateway: Arc<MutationGateway>,
    actor: Actor,
}

#[async_trait]
impl ListApi for GatewayApi {
    async fn fetch_list(&self, list_key: &str) -> ClientResult<List> {
        let list = self
            .gateway
            .store()
            .require(list_key)
            .await
            .map_err(ApiError::from)?;
        authorize(
            self.gateway.permissions().as_ref(),
            &list,
            &self.actor,
            Capability::View,
        )
        .map_err(ApiError::from)?;
        Ok(list)
    }

    async fn mutate(&self, list_key: &str, operation: &UrlOperation) -> ClientResult<MutationResponse> {
        let outcome = self
            .gateway
            .apply(list_key, operation.clone(), self.actor)
            .await
            .map_err(ApiError::from)?;
        Ok(outcome.into())
    }
}

struct World {
    gateway: Arc<MutationGateway>,
    notifier: Arc<RecordingNotifier>,
    store: Arc<InMemoryListStore>,
}

impl World {
    fn new(list: List) -> Self {
        let config = SyncConfig::default();
        let store = Arc::new(InMemoryListStore::with_lists([list]));
        let cache = SafeCache::new(Arc::new(InMemoryCacheBackend::new()));
        let notifier = Arc::new(RecordingNotifier::new());
        let pipeline = EnrichmentPipeline::new(Arc::new(ScriptedFetcher::new()), cache.clone(), &config);
        let gateway = Arc::new(MutationGateway::new(
            store.clone(),
            cache,
            notifier.clone(),
            Arc::new(RolePermissions),
            pipeline,
            config,
        ));
        Self {
            gateway,
            notifier,
            store,
        }
    }

    /// A client session for `actor`. Mutations carry the session's id, as
    /// the REST client's session header does.
    fn client(&self, actor: Actor, list_key: &str) -> ReconciliationStore {
        let session = SessionContext::new(actor);
        let api = Arc::new(GatewayApi {
            gateway: self.gateway.clone(),
            actor: session.actor,
        });
        ReconciliationStore::new(api, session, list_key)
    }
}

fn ids_of(store: &ReconciliationStore) -> Vec<uuid::Uuid> {
    id_sequence(&store.snapshot().unwrap().urls)
}

/// List [a, b]. Client 1 drags to [b, a]; before its reorder is sent,
/// client 2 adds c and the event reaches client 1. The membership change
/// wins: client 1 shows the server order [a, b, c] and its stale reorder is
/// rejected.
#[tokio::test]
async fn test_concurrent_add_beats_in_flight_drag() {
    let shared = fixtures::shared_list("team", 2);
    let a = shared.list.urls[0].id;
    let b = shared.list.urls[1].id;
    let world = World::new(shared.list.clone());

    let mut client1 = world.client(shared.owner, "team");
    let mut client2 = world.client(shared.editor, "team");
    client1.load().await.unwrap();
    client2.load().await.unwrap();

    client1.begin_drag().unwrap();
    client1.update_drag(&[b, a]).unwrap();
    assert_eq!(ids_of(&client1), vec![b, a]);

    let decision = client2
        .commit(UrlOperation::Add {
            new_url: NewUrl::new("https://c.example"),
        })
        .await
        .unwrap();
    assert_eq!(decision, MergeDecision::Replaced);
    let c = ids_of(&client2)[2];

    let event = world.notifier.events().pop().unwrap();
    assert_eq!(event.action_name(), "url_added");
    let decision = client1.handle_event(&event).await.unwrap();

    assert_eq!(decision, Some(MergeDecision::Replaced));
    assert_eq!(ids_of(&client1), vec![a, b, c]);
    assert!(!client1.session().drag.has_shadow(shared.list.id));

    // The reorder that was already in flight names only [b, a].
    let stale = client1
        .commit(UrlOperation::Reorder {
            input: ReorderInput::OrderedIds(vec![b, a]),
        })
        .await;
    assert!(stale.is_err());
    assert_eq!(ids_of(&client1), vec![a, b, c]);

    let persisted = world.store.get_by_id(shared.list.id).await.unwrap().unwrap();
    assert_eq!(id_sequence(&persisted.urls), vec![a, b, c]);
}

/// A stale refresh during a drag does not snap the order back, and the
/// release persists the dragged order.
#[tokio::test]
async fn test_stale_refresh_during_drag_keeps_dragged_order() {
    let shared = fixtures::shared_list("team", 3);
    let ids = id_sequence(&shared.list.urls);
    let world = World::new(shared.list.clone());

    let mut client = world.client(shared.editor, "team");
    client.load().await.unwrap();
    client.begin_drag().unwrap();
    client.update_drag(&[ids[2], ids[0], ids[1]]).unwrap();

    assert_eq!(client.refetch().await.unwrap(), MergeDecision::PreservedOrder);
    assert_eq!(ids_of(&client), vec![ids[2], ids[0], ids[1]]);

    let decision = client.finish_drag().await.unwrap();
    assert_eq!(decision, Some(MergeDecision::KeptHeld));
    assert!(!client.session().drag.has_shadow(shared.list.id));

    let persisted = world.store.get_by_id(shared.list.id).await.unwrap().unwrap();
    assert_eq!(id_sequence(&persisted.urls), vec![ids[2], ids[0], ids[1]]);
    assert_eq!(world.notifier.actions(), vec!["url_reordered"]);
}

/// Another client's reorder arriving as an order event is shown when no
/// drag is protecting the local order.
#[tokio::test]
async fn test_remote_reorder_is_adopted_without_drag() {
    let shared = fixtures::shared_list("team", 2);
    let ids = id_sequence(&shared.list.urls);
    let world = World::new(shared.list.clone());

    let mut watcher = world.client(shared.viewer, "team");
    let mut editor = world.client(shared.editor, "team");
    watcher.load().await.unwrap();
    editor.load().await.unwrap();

    editor
        .commit(UrlOperation::Reorder {
            input: ReorderInput::OrderedIds(vec![ids[1], ids[0]]),
        })
        .await
        .unwrap();
    let event = world.notifier.events().pop().unwrap();

    assert_eq!(
        watcher.handle_event(&event).await.unwrap(),
        Some(MergeDecision::Replaced)
    );
    assert_eq!(ids_of(&watcher), vec![ids[1], ids[0]]);
}

/// A viewer's optimistic add is undone when the server refuses it.
#[tokio::test]
async fn test_forbidden_mutation_rolls_back() {
    let shared = fixtures::shared_list("team", 1);
    let world = World::new(shared.list.clone());

    let mut viewer = world.client(shared.viewer, "team");
    viewer.load().await.unwrap();

    let result = viewer
        .commit(UrlOperation::Add {
            new_url: NewUrl::new("https://nope.example"),
        })
        .await;
    match result {
        Err(ClientError::Api { code, .. }) => assert_eq!(code, linkdeck_api::ErrorCode::Forbidden),
        other => panic!("Expected forbidden, got {:?}", other),
    }
    let held: &Vec<UrlItem> = &viewer.snapshot().unwrap().urls;
    assert_eq!(held.len(), 1);
    assert!(world.notifier.events().is_empty());
}

/// The same user on two devices: a change made on one shows up on the
/// other, while the issuing device skips its own echo.
#[tokio::test]
async fn test_same_user_on_two_devices_sees_each_other() {
    let shared = fixtures::shared_list("team", 1);
    let world = World::new(shared.list.clone());

    let mut phone = world.client(shared.editor, "team");
    let mut laptop = world.client(shared.editor, "team");
    phone.load().await.unwrap();
    laptop.load().await.unwrap();

    phone
        .commit(UrlOperation::Add {
            new_url: NewUrl::new("https://from-phone.example"),
        })
        .await
        .unwrap();
    let event = world.notifier.events().pop().unwrap();
    assert_eq!(
        event.activity.as_ref().map(|a| a.actor_id),
        Some(shared.editor.user_id)
    );

    assert_eq!(phone.handle_event(&event).await.unwrap(), None);
    assert_eq!(
        laptop.handle_event(&event).await.unwrap(),
        Some(MergeDecision::Replaced)
    );
    assert_eq!(laptop.snapshot().unwrap().urls.len(), 2);
    assert_eq!(phone.snapshot(), laptop.snapshot());
}
