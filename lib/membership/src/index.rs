//! Direct inclusion edges between groups.
//!
//! The index is supplied by the identity layer (normally a cache in front
//! of the backing store). Membership resolution only ever asks for direct
//! edges; transitive closure is computed here, not by the index.

use async_trait::async_trait;
use revu_core::{GroupUuid, Result, StoreError};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Source of direct group inclusion edges.
///
/// An edge `parent -> subgroup` means every member of `subgroup` is also a
/// member of `parent`. The graph may contain cycles.
#[async_trait]
pub trait GroupIncludeIndex: Send + Sync {
    /// Returns the groups that directly include `group`.
    async fn parent_groups_of(
        &self,
        group: &GroupUuid,
    ) -> Result<Arc<BTreeSet<GroupUuid>>, StoreError>;

    /// Returns the groups directly included by `group`.
    async fn subgroups_of(&self, group: &GroupUuid)
    -> Result<Arc<BTreeSet<GroupUuid>>, StoreError>;
}
