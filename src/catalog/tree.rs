use std::collections::BTreeSet;

use async_trait::async_trait;

/// Source of parent -> child edges between categories
#[async_trait]
pub trait CategoryChildren {
    type Error;

    /// Ids of categories whose parent is any of `parents`
    async fn children_of(&self, parents: &[i64]) -> Result<Vec<i64>, Self::Error>;
}

/// Breadth-first closure of `root` over the category parent relation.
///
/// Returns `root` plus every reachable descendant exactly once. Ids already
/// visited are never expanded again, so cyclic parent data terminates.
pub async fn descendant_ids<S>(source: &S, root: i64) -> Result<BTreeSet<i64>, S::Error>
where
    S: CategoryChildren + Sync + ?Sized,
{
    let mut visited = BTreeSet::from([root]);
    let mut frontier = vec![root];

    while !frontier.is_empty() {
        let children = source.children_of(&frontier).await?;
        frontier = children
            .into_iter()
            .filter(|id| visited.insert(*id))
            .collect();
    }

    tracing::debug!("Category {} resolves to {} categories", root, visited.len());
    Ok(visited)
}
