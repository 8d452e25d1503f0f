//! Concurrent mutation tests
//!
//! Revision conflicts must surface per role without clobbering the
//! concurrent writer, and the single-holder invariant must survive any
//! sequence of mutations.

use async_trait::async_trait;
use budibase_authz::{
    DocWriteResponse, DocumentStore, GrantIndex, InMemoryDocumentStore, PermissionGrant,
    PermissionLevel, PermissionMutator, PermissionUpdateType, Role, RoleStore,
};
use budibase_authz::{BulkDocResult, Result};
use proptest::prelude::*;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Store that lets another writer update one document right before the next
/// bulk write lands
struct RacingStore {
    inner: InMemoryDocumentStore,
    contested_id: String,
    raced: AtomicBool,
}

impl RacingStore {
    fn new(inner: InMemoryDocumentStore, contested_id: &str) -> Self {
        Self {
            inner,
            contested_id: contested_id.to_string(),
            raced: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl DocumentStore for RacingStore {
    async fn all_docs(&self, prefix: &str) -> Result<Vec<Value>> {
        self.inner.all_docs(prefix).await
    }

    async fn get(&self, id: &str) -> Result<Option<Value>> {
        self.inner.get(id).await
    }

    async fn put(&self, doc: Value) -> Result<DocWriteResponse> {
        self.inner.put(doc).await
    }

    async fn bulk_docs(&self, docs: Vec<Value>) -> Result<Vec<BulkDocResult>> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            if let Some(mut doc) = self.inner.get(&self.contested_id).await? {
                doc["name"] = Value::String("renamed elsewhere".to_string());
                self.inner.put(doc).await?;
            }
        }
        self.inner.bulk_docs(docs).await
    }

    async fn remove(&self, id: &str, rev: &str) -> Result<()> {
        self.inner.remove(id, rev).await
    }
}

#[tokio::test]
async fn test_stale_revision_reported_per_role() {
    let inner = InMemoryDocumentStore::new();
    let seed = RoleStore::new(Arc::new(inner.clone()));
    seed.save(Role::new("", "a").with_permission("ta_orders", PermissionLevel::Read))
        .await
        .unwrap();
    seed.save(Role::new("", "b")).await.unwrap();

    let store = RoleStore::new(Arc::new(RacingStore::new(inner, "role_a")));
    let mutator = PermissionMutator::new(store.clone());

    let results = mutator
        .update_permission_on_role(
            &PermissionGrant::new("b", "ta_orders", PermissionLevel::Read),
            PermissionUpdateType::Add,
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    let a = results.iter().find(|r| r.id == "a").unwrap();
    let b = results.iter().find(|r| r.id == "b").unwrap();
    assert_eq!(a.error.as_deref(), Some("conflict"));
    assert!(a.rev.is_none());
    assert!(b.is_ok());

    // the concurrent write survived and the stale removal did not land
    let stored_a = store.get("a").await.unwrap().unwrap();
    assert_eq!(stored_a.name, "renamed elsewhere");
    assert!(stored_a.has_permission("ta_orders", PermissionLevel::Read));
    assert!(store.get("b").await.unwrap().unwrap().has_permission("ta_orders", PermissionLevel::Read));

    // no automatic retry: the caller repeats the move
    let retry = mutator
        .update_permission_on_role(
            &PermissionGrant::new("b", "ta_orders", PermissionLevel::Read),
            PermissionUpdateType::Add,
        )
        .await
        .unwrap();
    assert_eq!(retry.len(), 1);
    assert_eq!(retry[0].id, "a");
    assert!(retry[0].is_ok());

    let index = GrantIndex::build(&store.get_all().await.unwrap());
    assert_eq!(index.holders("ta_orders", PermissionLevel::Read), ["role_b".to_string()]);
}

/// Store that yields after every read, so concurrent mutations all plan
/// against the same snapshot before any of them writes
struct YieldingStore {
    inner: InMemoryDocumentStore,
}

#[async_trait]
impl DocumentStore for YieldingStore {
    async fn all_docs(&self, prefix: &str) -> Result<Vec<Value>> {
        let docs = self.inner.all_docs(prefix).await?;
        tokio::task::yield_now().await;
        Ok(docs)
    }

    async fn get(&self, id: &str) -> Result<Option<Value>> {
        self.inner.get(id).await
    }

    async fn put(&self, doc: Value) -> Result<DocWriteResponse> {
        self.inner.put(doc).await
    }

    async fn bulk_docs(&self, docs: Vec<Value>) -> Result<Vec<BulkDocResult>> {
        self.inner.bulk_docs(docs).await
    }

    async fn remove(&self, id: &str, rev: &str) -> Result<()> {
        self.inner.remove(id, rev).await
    }
}

#[tokio::test]
async fn test_concurrent_mutations_never_overwrite() {
    let store = RoleStore::new(Arc::new(YieldingStore {
        inner: InMemoryDocumentStore::new(),
    }));
    store.save(Role::new("", "shared")).await.unwrap();
    let mutator = PermissionMutator::new(store.clone());

    let grants: Vec<PermissionGrant> = (0..8)
        .map(|i| PermissionGrant::new("shared", format!("ta_{}", i), PermissionLevel::Read))
        .collect();
    let outcomes = futures::future::join_all(
        grants
            .iter()
            .map(|grant| mutator.update_permission_on_role(grant, PermissionUpdateType::Add)),
    )
    .await;

    let mut landed = Vec::new();
    let mut rejected = Vec::new();
    for (grant, outcome) in grants.iter().zip(outcomes) {
        let results = outcome.unwrap();
        assert_eq!(results.len(), 1);
        if results[0].is_ok() {
            landed.push(grant.clone());
        } else {
            assert_eq!(results[0].error.as_deref(), Some("conflict"));
            rejected.push(grant.clone());
        }
    }
    assert!(!landed.is_empty());
    assert!(!rejected.is_empty());

    // exactly the writes reported as ok are stored
    let shared = store.get("shared").await.unwrap().unwrap();
    assert_eq!(shared.permissions.len(), landed.len());
    for grant in &landed {
        assert!(shared.has_permission(&grant.resource_id, grant.level));
    }
    for grant in &rejected {
        assert!(!shared.has_permission(&grant.resource_id, grant.level));
    }

    // retrying the rejected grants one at a time loses none of the others
    for grant in &rejected {
        let results = mutator
            .update_permission_on_role(grant, PermissionUpdateType::Add)
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.is_ok()));
    }
    let shared = store.get("shared").await.unwrap().unwrap();
    assert_eq!(shared.permissions.len(), grants.len());
}

#[derive(Debug, Clone)]
struct Op {
    role: usize,
    resource: usize,
    level: PermissionLevel,
    remove: bool,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (
        0usize..4,
        0usize..3,
        prop_oneof![
            Just(PermissionLevel::Read),
            Just(PermissionLevel::Write),
            Just(PermissionLevel::Execute),
        ],
        any::<bool>(),
    )
        .prop_map(|(role, resource, level, remove)| Op {
            role,
            resource,
            level,
            remove,
        })
}

const ROLES: [&str; 4] = ["r0", "r1", "BASIC", "POWER"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_single_holder_invariant(ops in prop::collection::vec(op_strategy(), 1..20)) {
        tokio_test::block_on(async {
            let store = RoleStore::new(Arc::new(InMemoryDocumentStore::new()));
            store.save(Role::new("", "r0")).await.unwrap();
            store.save(Role::new("", "r1").with_inherits(["r0"])).await.unwrap();
            let mutator = PermissionMutator::new(store.clone());

            for op in &ops {
                let grant = PermissionGrant::new(ROLES[op.role], format!("ta_{}", op.resource), op.level);
                let update = if op.remove { PermissionUpdateType::Remove } else { PermissionUpdateType::Add };
                let results = mutator.update_permission_on_role(&grant, update).await.unwrap();
                assert!(results.iter().all(|r| r.is_ok()));

                let index = GrantIndex::build(&store.get_all().await.unwrap());
                assert_eq!(index.duplicates().count(), 0);

                let holders = index.holders(&grant.resource_id, grant.level);
                if op.remove {
                    assert!(holders.is_empty());
                } else {
                    assert_eq!(holders.len(), 1);
                    assert_eq!(holders[0], format!("role_{}", ROLES[op.role]));
                }
            }
        });
    }
}
