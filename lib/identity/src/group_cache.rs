//! Cache of internal group records.

use crate::cache::{CacheStats, LoadingCache};
use crate::config::CacheConfig;
use crate::group::{GroupDescription, GroupKey, GroupReference, InternalGroup};
use crate::store::IdentityStore;
use crate::system::SystemGroups;
use revu_core::{GroupId, GroupUuid, Result, StoreError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

type Entry = Option<Arc<InternalGroup>>;

/// Caches internal groups by id, uuid and name.
///
/// Each key has its own cache, so a group may be resident under some keys
/// and not others. Absent groups are cached as `None` until evicted, which
/// is why creation and renames must be reported through
/// [`on_create`](Self::on_create) and [`on_rename`](Self::on_rename).
pub struct GroupCache {
    store: Arc<dyn IdentityStore>,
    by_id: LoadingCache<GroupId, Entry>,
    by_uuid: LoadingCache<GroupUuid, Entry>,
    by_name: LoadingCache<String, Entry>,
}

impl GroupCache {
    /// Creates an empty cache in front of `store`.
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            by_id: LoadingCache::new("groups_by_id", config),
            by_uuid: LoadingCache::new("groups_by_uuid", config),
            by_name: LoadingCache::new("groups_by_name", config),
        }
    }

    /// Returns the group with integer id `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: GroupId) -> Result<Entry, StoreError> {
        self.by_id
            .get_or_load(&id, || self.load(GroupKey::Id(id)))
            .await
    }

    /// Returns the group with uuid `uuid`.
    ///
    /// Uuids of other backends never have an internal record and are
    /// answered without consulting the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn get_by_uuid(&self, uuid: &GroupUuid) -> Result<Entry, StoreError> {
        if !uuid.is_internal() {
            return Ok(None);
        }
        self.by_uuid
            .get_or_load(uuid, || self.load(GroupKey::Uuid(uuid.clone())))
            .await
    }

    /// Returns the group named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn get_by_name(&self, name: &str) -> Result<Entry, StoreError> {
        let key = name.to_string();
        self.by_name
            .get_or_load(&key, || self.load(GroupKey::Name(key.clone())))
            .await
    }

    /// Describes the group with uuid `uuid`, whatever its backend.
    ///
    /// System groups are described by name. Internal uuids the store no
    /// longer has, and uuids of backends this server cannot query, are
    /// described with their uuid as name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn describe(&self, uuid: &GroupUuid) -> Result<GroupDescription, StoreError> {
        if let Some(system) = SystemGroups::describe(uuid) {
            return Ok(system);
        }
        Ok(match self.get_by_uuid(uuid).await? {
            Some(group) => GroupDescription::internal(group),
            None => GroupDescription::unresolved(uuid.clone()),
        })
    }

    /// Lists every internal group, straight from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Vec<GroupReference>, StoreError> {
        self.store.load_all_groups().await
    }

    /// Drops `group` under all three keys.
    pub async fn evict(&self, group: &InternalGroup) {
        self.evict_by_id(group.id()).await;
        self.evict_by_uuid(group.uuid()).await;
        self.evict_by_name(group.name()).await;
    }

    /// Drops the entry for `id` and any entry holding that group, including
    /// entries still loading.
    pub async fn evict_by_id(&self, id: GroupId) {
        self.by_id.evict(&id).await;
        self.evict_matching(move |g| g.id() == id).await;
    }

    /// Drops the entry for `uuid` and any entry holding that group,
    /// including entries still loading.
    pub async fn evict_by_uuid(&self, uuid: &GroupUuid) {
        self.by_uuid.evict(uuid).await;
        let uuid = uuid.clone();
        self.evict_matching(move |g| g.uuid() == &uuid).await;
    }

    /// Drops the entry for `name` and any entry holding a group of that
    /// name, including entries still loading.
    pub async fn evict_by_name(&self, name: &str) {
        let name = name.to_string();
        self.by_name.evict(&name).await;
        self.evict_matching(move |g| g.name() == name).await;
    }

    /// Drops negative entries a newly created group would contradict.
    pub async fn on_create(&self, id: GroupId, uuid: &GroupUuid, name: &str) {
        debug!(%id, %uuid, name, "group created");
        self.by_id.evict(&id).await;
        self.by_uuid.evict(uuid).await;
        self.by_name.evict(&name.to_string()).await;
    }

    /// Drops every entry of a renamed group, under its old and new name.
    pub async fn on_rename(
        &self,
        id: GroupId,
        uuid: &GroupUuid,
        old_name: &str,
        new_name: &str,
    ) {
        debug!(%id, %uuid, old_name, new_name, "group renamed");
        self.evict_by_id(id).await;
        self.evict_by_uuid(uuid).await;
        self.evict_by_name(old_name).await;
        self.evict_by_name(new_name).await;
    }

    /// Drops every entry.
    pub fn evict_all(&self) {
        self.by_id.evict_all();
        self.by_uuid.evict_all();
        self.by_name.evict_all();
    }

    /// Returns the counters of every underlying cache.
    #[must_use]
    pub fn stats(&self) -> Vec<CacheStats> {
        vec![self.by_id.stats(), self.by_uuid.stats(), self.by_name.stats()]
    }

    async fn evict_matching(
        &self,
        matches: impl Fn(&InternalGroup) -> bool + Clone + Send + Sync + 'static,
    ) {
        let holds = move |entry: &Entry| entry.as_deref().is_some_and(&matches);
        self.by_id.evict_matching(holds.clone()).await;
        self.by_uuid.evict_matching(holds.clone()).await;
        self.by_name.evict_matching(holds).await;
    }

    async fn load(&self, key: GroupKey) -> Result<Entry, StoreError> {
        let group = self.store.load_group(&key).await?;
        if group.is_none() {
            debug!(%key, "no such group");
        }
        Ok(group.map(Arc::new))
    }
}

impl fmt::Debug for GroupCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupCache")
            .field("by_id", &self.by_id)
            .field("by_uuid", &self.by_uuid)
            .field("by_name", &self.by_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::testing::{GatedStore, group, uuid};
    use revu_core::AccountId;

    fn fixture() -> (Arc<InMemoryStore>, GroupCache) {
        let store = Arc::new(InMemoryStore::new());
        store.insert_group(group(1, "g1", "reviewers"));
        let cache = GroupCache::new(store.clone(), &CacheConfig::default());
        (store, cache)
    }

    #[tokio::test]
    async fn lookups_by_every_key_agree() {
        let (store, cache) = fixture();

        let by_id = cache.get(GroupId::new(1)).await.unwrap().expect("by id");
        let by_uuid = cache.get_by_uuid(&uuid("g1")).await.unwrap().expect("by uuid");
        let by_name = cache.get_by_name("reviewers").await.unwrap().expect("by name");
        assert_eq!(by_id, by_uuid);
        assert_eq!(by_uuid, by_name);

        cache.get(GroupId::new(1)).await.unwrap();
        assert_eq!(store.calls().load_group, 3);
    }

    #[tokio::test]
    async fn absent_groups_are_cached_until_created() {
        let (store, cache) = fixture();

        assert!(cache.get_by_name("new").await.unwrap().is_none());
        let (created, event) = store.create_group("new", None).expect("create");
        assert!(cache.get_by_name("new").await.unwrap().is_none(), "negative entry");

        let crate::event::IdentityEvent::GroupCreated { group_id, uuid, name } = event else {
            panic!("unexpected event");
        };
        cache.on_create(group_id, &uuid, &name).await;
        let found = cache.get_by_name("new").await.unwrap().expect("created group");
        assert_eq!(found.uuid(), created.uuid());
    }

    #[tokio::test]
    async fn rename_evicts_old_and_new_names() {
        let (store, cache) = fixture();
        cache.get_by_name("reviewers").await.unwrap().expect("old name");
        assert!(cache.get_by_name("approvers").await.unwrap().is_none());
        cache.get(GroupId::new(1)).await.unwrap().expect("by id");

        store.rename_group(&uuid("g1"), "approvers").expect("rename");
        cache.on_rename(GroupId::new(1), &uuid("g1"), "reviewers", "approvers").await;

        assert!(cache.get_by_name("reviewers").await.unwrap().is_none());
        let renamed = cache.get_by_name("approvers").await.unwrap().expect("new name");
        assert_eq!(renamed.uuid(), &uuid("g1"));
        let by_id = cache.get(GroupId::new(1)).await.unwrap().expect("by id");
        assert_eq!(by_id.name(), "approvers");
    }

    #[tokio::test]
    async fn evict_by_uuid_reaches_entries_under_other_keys() {
        let (store, cache) = fixture();
        cache.get(GroupId::new(1)).await.unwrap().expect("by id");

        store.add_member(&uuid("g1"), AccountId::new(5)).expect("add member");
        cache.evict_by_uuid(&uuid("g1")).await;

        let reloaded = cache.get(GroupId::new(1)).await.unwrap().expect("by id");
        assert!(reloaded.members().contains(&AccountId::new(5)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn evict_by_uuid_reaches_a_load_in_flight() {
        let store = GatedStore::new(Arc::new(InMemoryStore::new()));
        store.inner().insert_group(group(1, "g1", "reviewers"));
        let cache = Arc::new(GroupCache::new(store.clone(), &CacheConfig::default()));

        // Hold a by-id load after it has read the old record.
        store.arm();
        let parked = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(GroupId::new(1)).await })
        };
        store.gate().arrival().await;

        store.inner().add_member(&uuid("g1"), AccountId::new(5)).expect("add member");
        cache.evict_by_uuid(&uuid("g1")).await;
        store.gate().open();

        let seen = parked.await.expect("join").unwrap().expect("by id");
        assert!(seen.members().contains(&AccountId::new(5)));
        let cached = cache.get(GroupId::new(1)).await.unwrap().expect("by id");
        assert!(cached.members().contains(&AccountId::new(5)));
        assert_eq!(store.inner().calls().load_group, 2);
    }

    #[tokio::test]
    async fn external_uuids_have_no_record() {
        let (store, cache) = fixture();
        assert!(cache.get_by_uuid(&uuid("ldap:cn=x")).await.unwrap().is_none());
        assert_eq!(store.calls().load_group, 0);
    }

    #[tokio::test]
    async fn describe_covers_every_backend() {
        let (_store, cache) = fixture();

        let internal = cache.describe(&uuid("g1")).await.unwrap();
        assert_eq!(internal.name(), "reviewers");
        assert!(internal.internal_group().is_some());

        let system = cache.describe(&SystemGroups::registered_users()).await.unwrap();
        assert_eq!(system.name(), "Registered Users");

        let stale = cache.describe(&uuid("gone")).await.unwrap();
        assert!(stale.is_stale());
        assert_eq!(stale.name(), "gone");
    }

    #[tokio::test]
    async fn all_lists_store_contents() {
        let (_store, cache) = fixture();
        let all = cache.all().await.unwrap();
        assert_eq!(
            all,
            vec![GroupReference {
                uuid: uuid("g1"),
                name: "reviewers".to_string(),
            }]
        );
    }
}
