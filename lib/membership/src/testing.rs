//! Test helpers: an inclusion index backed by a fixed edge list.

use crate::index::GroupIncludeIndex;
use async_trait::async_trait;
use revu_core::{GroupUuid, Result, StoreError};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) fn uuid(s: &str) -> GroupUuid {
    GroupUuid::parse(s).expect("valid uuid")
}

/// Inclusion index over a fixed set of `parent -> subgroup` edges.
#[derive(Default)]
pub(crate) struct StaticIncludeIndex {
    subgroups: HashMap<GroupUuid, BTreeSet<GroupUuid>>,
    parents: HashMap<GroupUuid, BTreeSet<GroupUuid>>,
    parent_lookups: Mutex<HashMap<GroupUuid, usize>>,
    unavailable: AtomicBool,
}

impl StaticIncludeIndex {
    pub(crate) fn new(edges: &[(&str, &str)]) -> Self {
        let mut index = Self::default();
        for (parent, subgroup) in edges {
            index
                .subgroups
                .entry(uuid(parent))
                .or_default()
                .insert(uuid(subgroup));
            index
                .parents
                .entry(uuid(subgroup))
                .or_default()
                .insert(uuid(parent));
        }
        index
    }

    pub(crate) fn parent_lookups(&self, group: &str) -> usize {
        let lookups = self.parent_lookups.lock().expect("lock");
        lookups.get(&uuid(group)).copied().unwrap_or(0)
    }

    pub(crate) fn total_parent_lookups(&self) -> usize {
        self.parent_lookups.lock().expect("lock").values().sum()
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl GroupIncludeIndex for StaticIncludeIndex {
    async fn parent_groups_of(
        &self,
        group: &GroupUuid,
    ) -> Result<Arc<BTreeSet<GroupUuid>>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "index offline".to_string(),
            }
            .into());
        }
        *self
            .parent_lookups
            .lock()
            .expect("lock")
            .entry(group.clone())
            .or_default() += 1;
        Ok(Arc::new(self.parents.get(group).cloned().unwrap_or_default()))
    }

    async fn subgroups_of(
        &self,
        group: &GroupUuid,
    ) -> Result<Arc<BTreeSet<GroupUuid>>, StoreError> {
        Ok(Arc::new(
            self.subgroups.get(group).cloned().unwrap_or_default(),
        ))
    }
}
