//! Failure paths: upload gating, fail-fast validation, partial
//! multi-step writes, the delete confirmation gate and auth errors.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use api_types::{CreateTaskRequest, DocumentId, ImageAttachment};
use async_trait::async_trait;
use local_store::{MemoryBlobStore, MemoryIdentityProvider, MemoryStore};
use remote::{
    BlobError, BlobHandle, BlobStore, CollectionPath, DocSubscription, Document, DocumentSnapshot,
    DocumentStore, Query, StoreError, Subscription,
};
use services::{AlwaysConfirm, App, Confirm, Status};
use tokio::{sync::watch, time::timeout};

const CONVERGENCE: Duration = Duration::from_secs(1);

async fn converge<T: Clone>(
    rx: &mut watch::Receiver<T>,
    pred: impl FnMut(&T) -> bool,
) -> anyhow::Result<T> {
    Ok(timeout(CONVERGENCE, rx.wait_for(pred)).await??.clone())
}

async fn sign_in(app: &App, email: &str, username: &str) -> anyhow::Result<()> {
    app.mutations.register(email, "secret1", username).await;
    app.mutations.login(email, "secret1").await;
    let mut session = app.session.subscribe();
    converge(&mut session, |user| user.is_some()).await?;
    Ok(())
}

/// Blob store whose uploads always fail.
struct BrokenBlobStore;

#[async_trait]
impl BlobStore for BrokenBlobStore {
    async fn upload(&self, _path: &str, _bytes: &[u8]) -> Result<BlobHandle, BlobError> {
        Err(BlobError::Upload("disk full".to_string()))
    }

    async fn retrieval_url(&self, handle: &BlobHandle) -> Result<String, BlobError> {
        Err(BlobError::Resolve(handle.path.clone()))
    }
}

/// Blob store that counts uploads.
struct CountingBlobStore {
    inner: MemoryBlobStore,
    uploads: AtomicUsize,
}

#[async_trait]
impl BlobStore for CountingBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<BlobHandle, BlobError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner.upload(path, bytes).await
    }

    async fn retrieval_url(&self, handle: &BlobHandle) -> Result<String, BlobError> {
        self.inner.retrieval_url(handle).await
    }
}

/// Document store that fails the n-th `create` call (zero-based) and
/// delegates everything else.
struct FlakyStore {
    inner: MemoryStore,
    creates: AtomicUsize,
    fail_at: usize,
}

impl FlakyStore {
    fn new(fail_at: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            creates: AtomicUsize::new(0),
            fail_at,
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn create(
        &self,
        collection: &CollectionPath,
        fields: Document,
    ) -> Result<DocumentId, StoreError> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst);
        if n == self.fail_at {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        self.inner.create(collection, fields).await
    }

    async fn set(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.inner.set(collection, id, fields).await
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    fn subscribe(&self, query: Query) -> Subscription {
        self.inner.subscribe(query)
    }

    fn observe(&self, collection: &CollectionPath, id: &DocumentId) -> DocSubscription {
        self.inner.observe(collection, id)
    }
}

/// Store whose keyed writes fail and everything else delegates.
struct FailingSetStore {
    inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for FailingSetStore {
    async fn create(
        &self,
        collection: &CollectionPath,
        fields: Document,
    ) -> Result<DocumentId, StoreError> {
        self.inner.create(collection, fields).await
    }

    async fn set(
        &self,
        _collection: &CollectionPath,
        _id: &DocumentId,
        _fields: Document,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("injected outage".to_string()))
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    fn subscribe(&self, query: Query) -> Subscription {
        self.inner.subscribe(query)
    }

    fn observe(&self, collection: &CollectionPath, id: &DocumentId) -> DocSubscription {
        self.inner.observe(collection, id)
    }
}

/// Store that tracks every handed-out document observation, so tests can
/// assert each one is closed again on teardown.
struct TrackingStore {
    inner: MemoryStore,
    observations: Mutex<Vec<Arc<watch::Sender<Option<DocumentSnapshot>>>>>,
}

impl TrackingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            observations: Mutex::new(Vec::new()),
        }
    }

    fn open_observations(&self) -> usize {
        self.observations
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

#[async_trait]
impl DocumentStore for TrackingStore {
    async fn create(
        &self,
        collection: &CollectionPath,
        fields: Document,
    ) -> Result<DocumentId, StoreError> {
        self.inner.create(collection, fields).await
    }

    async fn set(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.inner.set(collection, id, fields).await
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    fn subscribe(&self, query: Query) -> Subscription {
        self.inner.subscribe(query)
    }

    // Interpose a forwarding channel whose sole receiver is the one handed
    // out, so `is_closed` reports whether the caller dropped it.
    fn observe(&self, collection: &CollectionPath, id: &DocumentId) -> DocSubscription {
        let mut upstream = self.inner.observe(collection, id);
        let (tx, mut rx) = watch::channel(upstream.borrow_and_update().clone());
        let tx = Arc::new(tx);
        self.observations.lock().unwrap().push(tx.clone());
        tokio::spawn(async move {
            while upstream.changed().await.is_ok() {
                let snapshot = upstream.borrow_and_update().clone();
                tx.send_replace(snapshot);
            }
        });
        rx.mark_changed();
        rx
    }
}

/// Confirmation gate that refuses everything.
struct DenyConfirm;

impl Confirm for DenyConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

fn app_with(
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    confirm: Arc<dyn Confirm>,
) -> App {
    services::logging::init_tracing();
    App::new(
        store,
        Arc::new(MemoryIdentityProvider::new()),
        blobs,
        confirm,
    )
}

#[tokio::test]
async fn failed_upload_prevents_the_task_write() -> anyhow::Result<()> {
    let app = app_with(
        Arc::new(MemoryStore::new()),
        Arc::new(BrokenBlobStore),
        Arc::new(AlwaysConfirm),
    );
    sign_in(&app, "a@x.com", "alice").await?;
    app.mutations.create_team("Eng").await;

    app.mutations
        .create_task(
            CreateTaskRequest {
                title: "Screenshot the crash".to_string(),
                ..Default::default()
            },
            Some(ImageAttachment {
                file_name: "crash.png".to_string(),
                bytes: vec![1, 2, 3],
            }),
        )
        .await;

    let mut status = app.status();
    let current = converge(&mut status, |s| s.is_some()).await?;
    assert!(current.is_some_and(|s| s.is_error()));
    assert!(app.tasks.current().is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_title_fails_before_any_upload_or_write() -> anyhow::Result<()> {
    let blobs = Arc::new(CountingBlobStore {
        inner: MemoryBlobStore::new(),
        uploads: AtomicUsize::new(0),
    });
    let app = app_with(
        Arc::new(MemoryStore::new()),
        blobs.clone(),
        Arc::new(AlwaysConfirm),
    );
    sign_in(&app, "a@x.com", "alice").await?;
    app.mutations.create_team("Eng").await;

    app.mutations
        .create_task(
            CreateTaskRequest::default(),
            Some(ImageAttachment {
                file_name: "crash.png".to_string(),
                bytes: vec![1, 2, 3],
            }),
        )
        .await;

    assert_eq!(blobs.uploads.load(Ordering::SeqCst), 0);
    assert!(app.tasks.current().is_empty());
    assert_eq!(
        app.mutations.status().current(),
        Some(Status::Error("Enter the task title".to_string()))
    );
    Ok(())
}

#[tokio::test]
async fn failed_owner_membership_leaves_the_team_without_a_roster() -> anyhow::Result<()> {
    // The team record is the first create, the owner membership the
    // second. Failing the second leaves the team behind with no members
    // and no active-team adoption.
    let store = Arc::new(FlakyStore::new(1));
    let app = app_with(
        store.clone(),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(AlwaysConfirm),
    );
    sign_in(&app, "a@x.com", "alice").await?;

    app.mutations.create_team("Eng").await;

    let mut status = app.status();
    let current = converge(&mut status, |s| s.is_some()).await?;
    assert!(current.is_some_and(|s| s.is_error()));
    assert_eq!(app.team.active_team(), None);
    assert!(app.team.roster().is_empty());

    // The orphaned team record is still there.
    let mut teams = store.subscribe(Query::collection(remote::shapes::teams_path()));
    let snapshots = converge(&mut teams, |_| true).await?;
    assert_eq!(snapshots.len(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_profile_write_orphans_the_identity() -> anyhow::Result<()> {
    // Registration is identity creation followed by the profile write,
    // with no rollback in between.
    let store = Arc::new(FailingSetStore {
        inner: MemoryStore::new(),
    });
    let app = app_with(
        store.clone(),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(AlwaysConfirm),
    );

    app.mutations.register("a@x.com", "secret1", "alice").await;
    assert!(
        app.mutations
            .status()
            .current()
            .is_some_and(|s| s.is_error())
    );

    // No profile document was written.
    let mut users = store.subscribe(Query::collection(remote::shapes::users_path()));
    assert!(converge(&mut users, |_| true).await?.is_empty());

    // The identity itself exists and is usable.
    app.mutations.login("a@x.com", "secret1").await;
    let mut session = app.session.subscribe();
    let user = converge(&mut session, |u| u.is_some())
        .await?
        .expect("signed in");
    assert_eq!(user.email, "a@x.com");
    assert_eq!(user.username, None);
    Ok(())
}

#[tokio::test]
async fn teardown_closes_every_document_observation() -> anyhow::Result<()> {
    let store = Arc::new(TrackingStore::new());
    let app = app_with(
        store.clone(),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(AlwaysConfirm),
    );
    app.mutations.register("b@x.com", "secret1", "bob").await;
    sign_in(&app, "a@x.com", "alice").await?;
    app.mutations.create_team("Eng").await;

    let mut directory = app.directory.subscribe();
    let bob = converge(&mut directory, |users| !users.is_empty()).await?[0].clone();
    app.mutations.add_member(Some(&bob.id)).await;

    let mut roster = app.team.subscribe_roster();
    converge(&mut roster, |r| r.len() == 2).await?;
    assert!(store.open_observations() > 0);

    drop(roster);
    drop(directory);
    drop(app);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        store.open_observations(),
        0,
        "document observations still open after teardown"
    );
    Ok(())
}

#[tokio::test]
async fn denied_confirmation_aborts_the_delete_untouched() -> anyhow::Result<()> {
    let app = app_with(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(DenyConfirm),
    );
    sign_in(&app, "a@x.com", "alice").await?;
    app.mutations.create_team("Eng").await;
    app.mutations
        .create_task(
            CreateTaskRequest {
                title: "Keep me".to_string(),
                ..Default::default()
            },
            None,
        )
        .await;

    let mut tasks = app.tasks.subscribe();
    let list = converge(&mut tasks, |t| t.len() == 1).await?;
    let before = app.mutations.status().current();

    app.mutations.delete_task(&list[0].id).await;

    // No write, no status transition, not even a clear.
    assert_eq!(app.tasks.current().len(), 1);
    assert_eq!(app.mutations.status().current(), before);
    Ok(())
}

#[tokio::test]
async fn auth_failures_surface_as_user_messages() -> anyhow::Result<()> {
    let app = app_with(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(AlwaysConfirm),
    );

    app.mutations.register("a@x.com", "secret1", "alice").await;
    app.mutations.register("a@x.com", "secret1", "alice2").await;
    assert_eq!(
        app.mutations.status().current(),
        Some(Status::Error("Email already registered".to_string()))
    );

    app.mutations.register("b@x.com", "short", "bob").await;
    assert_eq!(
        app.mutations.status().current(),
        Some(Status::Error(
            "Password too weak (minimum 6 characters)".to_string()
        ))
    );

    app.mutations.login("a@x.com", "wrong-secret").await;
    assert_eq!(
        app.mutations.status().current(),
        Some(Status::Error("Wrong password".to_string()))
    );

    app.mutations.login("nobody@x.com", "secret1").await;
    assert_eq!(
        app.mutations.status().current(),
        Some(Status::Error("User not found".to_string()))
    );
    assert!(!app.session.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn stale_member_selection_fails_with_not_found() -> anyhow::Result<()> {
    let app = app_with(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(AlwaysConfirm),
    );
    sign_in(&app, "a@x.com", "alice").await?;
    app.mutations.create_team("Eng").await;
    let mut roster = app.team.subscribe_roster();
    converge(&mut roster, |r| r.len() == 1).await?;

    app.mutations.add_member(Some(&DocumentId::from("ghost"))).await;
    assert_eq!(
        app.mutations.status().current(),
        Some(Status::Error("User not found".to_string()))
    );
    assert_eq!(app.team.roster().len(), 1);

    app.mutations.add_member(None).await;
    assert_eq!(
        app.mutations.status().current(),
        Some(Status::Error("Select a user".to_string()))
    );
    Ok(())
}
