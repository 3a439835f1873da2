//! Lazily materialized transitive group membership.
//!
//! A user directly belongs to a handful of groups (the seed). Every group
//! that includes one of those groups, directly or through a chain of
//! inclusions, is also one of the user's groups. Computing that closure is
//! expensive for large installations while most permission checks only ask
//! about one or two groups, so the closure is expanded on demand:
//!
//! - `includes` holds every group confirmed reachable so far
//! - `frontier` holds confirmed groups whose parents have not been fetched
//!
//! A query first consults `includes` and only then expands the frontier
//! breadth-first, stopping as soon as the answer is known. Each group is
//! expanded at most once, which also guarantees termination when the
//! inclusion graph has cycles.

use crate::index::GroupIncludeIndex;
use revu_core::{GroupUuid, Result, StoreError};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Transitive membership resolved incrementally through an include index.
///
/// Not shareable across requests: queries mutate the traversal state in
/// place, which is why every method takes `&mut self`.
pub struct MaterializedGroupMembership {
    index: Arc<dyn GroupIncludeIndex>,
    includes: HashSet<GroupUuid>,
    frontier: VecDeque<GroupUuid>,
}

impl MaterializedGroupMembership {
    /// Creates a membership seeded with the groups an identity directly
    /// belongs to.
    #[must_use]
    pub fn new(index: Arc<dyn GroupIncludeIndex>, seed: impl IntoIterator<Item = GroupUuid>) -> Self {
        let mut includes = HashSet::new();
        let mut frontier = VecDeque::new();
        for group in seed {
            if includes.insert(group.clone()) {
                frontier.push_back(group);
            }
        }
        Self {
            index,
            includes,
            frontier,
        }
    }

    /// Returns true if `group` is reachable from the seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the include index fails while expanding.
    pub async fn contains(&mut self, group: &GroupUuid) -> Result<bool, StoreError> {
        if self.includes.contains(group) {
            return Ok(true);
        }
        self.expand_until(|found| found == group).await
    }

    /// Returns true if any of `groups` is reachable from the seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the include index fails while expanding.
    pub async fn contains_any_of<'a, I>(&mut self, groups: I) -> Result<bool, StoreError>
    where
        I: IntoIterator<Item = &'a GroupUuid>,
    {
        let wanted: HashSet<&GroupUuid> = groups.into_iter().collect();
        if wanted.is_empty() {
            return Ok(false);
        }
        if wanted.iter().any(|g| self.includes.contains(*g)) {
            return Ok(true);
        }
        self.expand_until(|found| wanted.contains(found)).await
    }

    /// Returns every group reachable from the seed.
    ///
    /// Forces the full closure on first use; later calls reuse it.
    ///
    /// # Errors
    ///
    /// Returns an error if the include index fails while expanding.
    pub async fn known_groups(&mut self) -> Result<BTreeSet<GroupUuid>, StoreError> {
        self.expand_until(|_| false).await?;
        Ok(self.includes.iter().cloned().collect())
    }

    /// Returns true once the closure has been fully expanded.
    #[must_use]
    pub fn is_fully_materialized(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Expands the frontier until `stop` accepts a newly discovered group
    /// or the frontier is exhausted.
    async fn expand_until<F>(&mut self, mut stop: F) -> Result<bool, StoreError>
    where
        F: FnMut(&GroupUuid) -> bool + Send,
    {
        let mut expanded = 0usize;
        while let Some(next) = self.frontier.pop_front() {
            let parents = match self.index.parent_groups_of(&next).await {
                Ok(parents) => parents,
                Err(e) => {
                    warn!(group = %next, "failed to load parent groups");
                    // Not expanded yet; a later query resumes from it.
                    self.frontier.push_front(next);
                    return Err(e);
                }
            };
            expanded += 1;

            let mut found = false;
            for parent in parents.iter() {
                if self.includes.insert(parent.clone()) {
                    self.frontier.push_back(parent.clone());
                    found |= stop(parent);
                }
            }
            if found {
                debug!(expanded, pending = self.frontier.len(), "membership target found");
                return Ok(true);
            }
        }
        debug!(expanded, known = self.includes.len(), "membership fully materialized");
        Ok(false)
    }
}

impl fmt::Debug for MaterializedGroupMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedGroupMembership")
            .field("includes", &self.includes)
            .field("frontier", &self.frontier)
            .finish_non_exhaustive()
    }
}
