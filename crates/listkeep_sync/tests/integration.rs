//! Integration tests for both backends against in-memory remotes.

use listkeep_codec::{EntityId, Item, ListRecord};
use listkeep_storage::InMemoryStore;
use listkeep_sync::cloud_kv::{KvCloud, MemoryKvStore};
use listkeep_sync::gist::{HttpMethod, LoopbackClient, LoopbackGistServer};
use listkeep_sync::{
    CloudKvBackend, CloudKvConfig, GistBackend, GistConfig, LocalLibrary, SyncBackend, SyncError,
    SyncStatus, WriteOutcome,
};
use listkeep_testkit::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const TOKEN: &str = "ghp_integration";

fn gist_server() -> Arc<LoopbackGistServer> {
    let server = Arc::new(LoopbackGistServer::new());
    server.add_account(TOKEN, "octo", 7);
    server
}

fn gist_backend(
    server: &Arc<LoopbackGistServer>,
    store: Arc<InMemoryStore>,
) -> GistBackend<LoopbackClient, InMemoryStore> {
    GistBackend::gist(
        LoopbackClient::new(Arc::clone(server)),
        GistConfig::new("https://loopback.test"),
        store,
    )
}

fn kv_backend(
    cloud: &KvCloud,
    store: Arc<InMemoryStore>,
) -> CloudKvBackend<MemoryKvStore, InMemoryStore> {
    CloudKvBackend::cloud_kv(cloud.attach(Some("icloud-user")), CloudKvConfig::default(), store)
}

// ---------------------------------------------------------------------------
// Gist backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gist_backup_restores_on_fresh_instance() {
    let server = gist_server();
    let user = sample_user();

    let device_a = gist_backend(&server, seeded_memory_store());
    device_a.authenticate(TOKEN).await.unwrap();
    let receipt = device_a.backup(&user, &[groceries()], &[]).await.unwrap();
    assert_eq!(receipt.outcome, WriteOutcome::Created);
    assert_eq!(device_a.status(), SyncStatus::Success);

    let empty = Arc::new(InMemoryStore::new());
    let device_b = gist_backend(&server, Arc::clone(&empty));
    device_b.authenticate(TOKEN).await.unwrap();
    let snapshot = device_b.restore(&user).await.unwrap();

    assert_eq!(snapshot.lists(), &[groceries()]);
    assert_eq!(snapshot.items_for(&groceries().id).unwrap(), groceries_items().as_slice());
    assert_eq!(snapshot.timestamp(), receipt.timestamp);

    let library = LocalLibrary::new(empty);
    library.apply_snapshot(&user.user_id, &snapshot).unwrap();
    assert_eq!(library.load_lists(&user.user_id).unwrap(), vec![groceries()]);
    assert_eq!(library.load_items(&groceries().id).unwrap(), Some(groceries_items()));
}

#[tokio::test]
async fn gist_sequential_backups_update_one_document() {
    let server = gist_server();
    let backend = gist_backend(&server, seeded_memory_store());
    backend.authenticate(TOKEN).await.unwrap();

    let first = backend.backup(&sample_user(), &[groceries()], &[]).await.unwrap();
    let second = backend.backup(&sample_user(), &[groceries()], &[]).await.unwrap();

    assert_eq!(first.outcome, WriteOutcome::Created);
    assert_eq!(second.outcome, WriteOutcome::Updated);
    assert_eq!(server.gist_count(), 1);
    assert_eq!(server.count_method(HttpMethod::Post), 1);
    assert_eq!(server.count_method(HttpMethod::Patch), 1);
}

#[tokio::test]
async fn gist_concurrent_backups_update_one_document() {
    let server = gist_server();
    let backend = gist_backend(&server, seeded_memory_store());
    backend.authenticate(TOKEN).await.unwrap();

    let user = sample_user();
    let lists = [groceries()];
    let (a, b) = tokio::join!(
        backend.backup(&user, &lists, &[]),
        backend.backup(&user, &lists, &[])
    );

    let mut outcomes = vec![a.unwrap().outcome, b.unwrap().outcome];
    outcomes.sort_by_key(|o| *o == WriteOutcome::Updated);
    assert_eq!(outcomes, vec![WriteOutcome::Created, WriteOutcome::Updated]);
    assert_eq!(server.gist_count(), 1);
    assert!(!backend.is_busy());
}

#[tokio::test]
async fn gist_restore_without_backup_is_not_found() {
    let server = gist_server();
    let backend = gist_backend(&server, Arc::new(InMemoryStore::new()));
    backend.authenticate(TOKEN).await.unwrap();

    let err = backend.restore(&sample_user()).await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound));
    assert!(backend.status().is_error());
}

#[tokio::test]
async fn gist_unauthenticated_makes_no_requests() {
    let server = gist_server();
    let backend = gist_backend(&server, seeded_memory_store());

    let err = backend.backup(&sample_user(), &[groceries()], &[]).await.unwrap_err();
    assert!(matches!(err, SyncError::NotAuthenticated));
    let err = backend.restore(&sample_user()).await.unwrap_err();
    assert!(matches!(err, SyncError::NotAuthenticated));

    assert_eq!(server.request_count(), 0);
    assert_eq!(
        backend.status(),
        SyncStatus::Error(SyncError::NotAuthenticated.to_string())
    );
}

#[tokio::test]
async fn gist_failed_update_reports_status() {
    let server = gist_server();
    let backend = gist_backend(&server, seeded_memory_store());
    backend.authenticate(TOKEN).await.unwrap();
    backend.backup(&sample_user(), &[groceries()], &[]).await.unwrap();
    let synced_at = backend.last_sync_date();

    server.set_offline(true);
    let err = backend.backup(&sample_user(), &[groceries()], &[]).await.unwrap_err();
    assert!(matches!(err, SyncError::Network { .. }));
    assert!(backend.status().error_message().unwrap().contains("list gists"));
    assert_eq!(backend.last_sync_date(), synced_at);
}

#[tokio::test]
async fn deleted_lists_keep_their_items_out_of_the_snapshot() {
    let server = gist_server();
    let store = seeded_memory_store();
    let discarded = ListRecord::with_id("D1", "Old", fixed_time());
    seed_items(store.as_ref(), &discarded.id, &[Item::with_id("I9", "Nails", true)]);

    let backend = gist_backend(&server, store);
    backend.authenticate(TOKEN).await.unwrap();
    backend
        .backup(&sample_user(), &[groceries()], &[discarded.clone()])
        .await
        .unwrap();

    let snapshot = backend.restore(&sample_user()).await.unwrap();
    assert_eq!(snapshot.deleted_lists(), &[discarded.clone()]);
    assert!(snapshot.items_for(&discarded.id).is_none());
    assert_eq!(snapshot.items().len(), 1);
}

#[tokio::test]
async fn lists_without_stored_items_are_omitted() {
    let server = gist_server();
    let backend = gist_backend(&server, seeded_memory_store());
    backend.authenticate(TOKEN).await.unwrap();

    let bare = ListRecord::with_id("L2", "Hardware", fixed_time());
    backend
        .backup(&sample_user(), &[groceries(), bare.clone()], &[])
        .await
        .unwrap();

    let snapshot = backend.restore(&sample_user()).await.unwrap();
    assert_eq!(snapshot.lists().len(), 2);
    assert!(snapshot.items_for(&bare.id).is_none());
}

// ---------------------------------------------------------------------------
// Cloud key-value backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn kv_backup_restores_on_another_device() {
    let cloud = KvCloud::new();
    let user = sample_user();

    let device_a = kv_backend(&cloud, seeded_memory_store());
    device_a.backup(&user, &[groceries()], &[]).await.unwrap();
    assert_eq!(cloud.keys(), vec!["appData_a_b_com".to_string()]);

    let device_b = kv_backend(&cloud, Arc::new(InMemoryStore::new()));
    let snapshot = device_b.restore(&user).await.unwrap();
    assert_eq!(snapshot.lists(), &[groceries()]);
    assert_eq!(snapshot.items_for(&groceries().id).unwrap(), groceries_items().as_slice());
    assert_eq!(device_b.status(), SyncStatus::Success);
}

#[tokio::test]
async fn kv_concurrent_backups_share_one_key() {
    let cloud = KvCloud::new();
    let backend = kv_backend(&cloud, seeded_memory_store());
    let user = sample_user();
    let lists = [groceries()];

    let (a, b) = tokio::join!(
        backend.backup(&user, &lists, &[]),
        backend.backup(&user, &lists, &[])
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(cloud.keys().len(), 1);
    assert_eq!(backend.remote().store().write_count(), 2);
}

#[tokio::test]
async fn kv_quota_boundary() {
    let cloud = KvCloud::new();
    let store = Arc::new(InMemoryStore::new());
    let backend = kv_backend(&cloud, Arc::clone(&store));
    let user = sample_user();

    let at_limit = items_for_encoded_size(&user, &groceries(), 1_000_000).unwrap();
    seed_items(store.as_ref(), &groceries().id, &at_limit);
    let receipt = backend.backup(&user, &[groceries()], &[]).await.unwrap();
    assert_eq!(receipt.bytes, 1_000_000);
    assert_eq!(backend.remote().store().write_count(), 1);

    let over_limit = items_for_encoded_size(&user, &groceries(), 1_000_001).unwrap();
    seed_items(store.as_ref(), &groceries().id, &over_limit);
    let err = backend.backup(&user, &[groceries()], &[]).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::QuotaExceeded {
            size: 1_000_001,
            limit: 1_000_000
        }
    ));
    assert_eq!(backend.remote().store().write_count(), 1);
    assert!(backend.status().is_error());
}

#[tokio::test]
async fn kv_unavailable_device_is_untouched() {
    let cloud = KvCloud::new();
    let backend = CloudKvBackend::cloud_kv(
        cloud.attach(None),
        CloudKvConfig::default(),
        seeded_memory_store(),
    );

    assert!(!SyncBackend::is_ready(&backend));
    let err = backend.backup(&sample_user(), &[groceries()], &[]).await.unwrap_err();
    assert!(matches!(err, SyncError::NotAvailable));
    let err = backend.restore(&sample_user()).await.unwrap_err();
    assert!(matches!(err, SyncError::NotAvailable));

    assert_eq!(backend.remote().store().call_count(), 0);
    assert!(cloud.keys().is_empty());
}

#[tokio::test]
async fn kv_external_changes_are_dispatched() {
    let cloud = KvCloud::new();
    let watcher = Arc::new(kv_backend(&cloud, Arc::new(InMemoryStore::new())));
    let mut changes = watcher.subscribe_changes();
    let mut status = watcher.subscribe_status();
    let listener = watcher.spawn_change_listener();

    let writer = kv_backend(&cloud, seeded_memory_store());
    writer.backup(&sample_user(), &[groceries()], &[]).await.unwrap();

    let changed = tokio::time::timeout(Duration::from_secs(2), changes.recv())
        .await
        .expect("change event")
        .unwrap();
    assert_eq!(changed.key, "appData_a_b_com");

    tokio::time::timeout(Duration::from_secs(2), status.wait_for(|s| *s == SyncStatus::Success))
        .await
        .expect("status update")
        .unwrap();
    assert!(watcher.last_sync_date().is_some());

    drop(watcher);
    tokio::time::timeout(Duration::from_secs(2), listener)
        .await
        .expect("listener stops with its backend")
        .unwrap();
}

#[tokio::test]
async fn kv_list_items_are_visible_to_other_devices() {
    let cloud = KvCloud::new();
    let device_a = kv_backend(&cloud, Arc::new(InMemoryStore::new()));
    let device_b = kv_backend(&cloud, Arc::new(InMemoryStore::new()));
    let list = EntityId::from("L1");

    device_a.save_list_items(&list, &groceries_items()).await.unwrap();
    assert_eq!(
        device_b.load_list_items(&list).await.unwrap(),
        Some(groceries_items())
    );
}

#[tokio::test]
async fn kv_key_uses_sanitized_user_id() {
    let cloud = KvCloud::new();
    let backend = kv_backend(&cloud, Arc::new(InMemoryStore::new()));
    let user = listkeep_codec::User::new("Ada", "Byron", "a.b@c.com", "pw");

    backend.backup(&user, &[], &[]).await.unwrap();
    assert_eq!(cloud.keys(), vec!["appData_a_b_c_com".to_string()]);
}

// ---------------------------------------------------------------------------
// Runtime backend selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn backends_are_interchangeable_behind_the_trait() {
    let server = gist_server();
    let gist = gist_backend(&server, seeded_memory_store());
    gist.authenticate(TOKEN).await.unwrap();

    let cloud = KvCloud::new();
    let backends: Vec<Box<dyn SyncBackend>> = vec![
        Box::new(gist),
        Box::new(kv_backend(&cloud, seeded_memory_store())),
    ];

    for backend in &backends {
        assert!(backend.is_ready(), "{} should be ready", backend.name());
        backend.backup(&sample_user(), &[groceries()], &[]).await.unwrap();
        let snapshot = backend.restore(&sample_user()).await.unwrap();
        assert_eq!(snapshot.item_count(), 1);
    }
}
