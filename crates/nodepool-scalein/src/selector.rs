//! Pool selector: picks which nodes of a pool to remove.
//!
//! Filters the cluster inventory down to the pool named by a
//! [`PoolIdentifier`], drops the node the scaler itself runs on, orders the
//! rest by the requested [`NodeIdStrategy`], and takes up to the requested
//! count. Asking for more nodes than the pool holds is not an error: the
//! returned [`Selection`] reports the shortfall instead.

use std::cmp::Ordering;

use tracing::debug;

use nodepool_core::{NodeIdStrategy, NodeRecord, PoolIdentifier, ScaleInError, ScaleInResult};

/// Nodes chosen for removal, in strategy order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub nodes: Vec<NodeRecord>,
    /// Number of nodes the caller asked for.
    pub requested: usize,
    /// Number of eligible nodes after filtering.
    pub available: usize,
}

impl Selection {
    /// Fewer nodes were selected than requested.
    pub fn is_degraded(&self) -> bool {
        self.nodes.len() < self.requested
    }
}

/// Select up to `count` nodes from the pool named by `pool`.
///
/// `exclude_id` is removed after pool filtering; if that empties the pool the
/// result is [`ScaleInError::NoEligibleNodes`], the same as an empty pool.
pub fn select(
    all_nodes: &[NodeRecord],
    pool: &PoolIdentifier,
    strategy: NodeIdStrategy,
    count: usize,
    exclude_id: Option<&str>,
) -> ScaleInResult<Selection> {
    debug!(filter = %pool.key, value = %pool.value, "filtering node list");

    let mut eligible: Vec<NodeRecord> = all_nodes
        .iter()
        .filter(|n| pool.matches(n))
        .filter(|n| {
            if n.drain {
                debug!(node_id = %n.id, "skipping node with drain in progress");
            }
            !n.drain
        })
        .cloned()
        .collect();

    let no_eligible = || ScaleInError::NoEligibleNodes {
        key: pool.key,
        value: pool.value.clone(),
    };

    if eligible.is_empty() {
        return Err(no_eligible());
    }

    eligible = filter_out_node_id(eligible, exclude_id);
    if eligible.is_empty() {
        return Err(no_eligible());
    }

    sort_by_strategy(&mut eligible, strategy);

    let available = eligible.len();
    eligible.truncate(count.min(available));

    for node in &eligible {
        debug!(node_id = %node.id, create_index = node.create_index, "identified node for removal");
    }

    Ok(Selection {
        nodes: eligible,
        requested: count,
        available,
    })
}

/// Drop the node with `id`, if present.
pub fn filter_out_node_id(nodes: Vec<NodeRecord>, id: Option<&str>) -> Vec<NodeRecord> {
    match id {
        Some(id) if !id.is_empty() => nodes.into_iter().filter(|n| n.id != id).collect(),
        _ => nodes,
    }
}

/// Order nodes so the first ones are removed first.
pub fn sort_by_strategy(nodes: &mut [NodeRecord], strategy: NodeIdStrategy) {
    match strategy {
        NodeIdStrategy::NewestCreateIndex => nodes.sort_by(newest_first),
    }
}

fn newest_first(a: &NodeRecord, b: &NodeRecord) -> Ordering {
    b.create_index
        .cmp(&a.create_index)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::node;

    fn ids(nodes: &[NodeRecord]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    fn pool_of(indices: &[(&str, u64)]) -> Vec<NodeRecord> {
        indices
            .iter()
            .map(|(id, idx)| node(id, "high-memory", *idx))
            .collect()
    }

    #[test]
    fn empty_pool_is_no_eligible_nodes() {
        let nodes = pool_of(&[("a", 1), ("b", 2)]);
        let err = select(
            &nodes,
            &PoolIdentifier::class("gpu"),
            NodeIdStrategy::NewestCreateIndex,
            1,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, ScaleInError::NoEligibleNodes { ref value, .. } if value == "gpu"));
    }

    #[test]
    fn selects_newest_first() {
        let nodes = pool_of(&[("a", 3), ("b", 1), ("c", 4), ("d", 1), ("e", 5)]);
        let sel = select(
            &nodes,
            &PoolIdentifier::class("high-memory"),
            NodeIdStrategy::NewestCreateIndex,
            5,
            None,
        )
        .unwrap();

        assert_eq!(ids(&sel.nodes), vec!["e", "c", "a", "b", "d"]);
        assert!(!sel.is_degraded());
    }

    #[test]
    fn ordering_is_stable_across_input_permutations() {
        let forward = pool_of(&[("a", 3), ("b", 1), ("c", 4), ("d", 1), ("e", 5)]);
        let mut reversed = forward.clone();
        reversed.reverse();

        let pool = PoolIdentifier::class("high-memory");
        let first = select(&forward, &pool, NodeIdStrategy::NewestCreateIndex, 5, None).unwrap();
        for _ in 0..3 {
            let again =
                select(&reversed, &pool, NodeIdStrategy::NewestCreateIndex, 5, None).unwrap();
            assert_eq!(ids(&again.nodes), ids(&first.nodes));
        }
    }

    #[test]
    fn ties_break_on_node_id() {
        let nodes = pool_of(&[("z", 7), ("m", 7), ("b", 7)]);
        let sel = select(
            &nodes,
            &PoolIdentifier::class("high-memory"),
            NodeIdStrategy::NewestCreateIndex,
            2,
            None,
        )
        .unwrap();
        assert_eq!(ids(&sel.nodes), vec!["b", "m"]);
    }

    #[test]
    fn count_above_pool_size_is_degraded_not_error() {
        let nodes = pool_of(&[("a", 1), ("b", 2)]);
        let sel = select(
            &nodes,
            &PoolIdentifier::class("high-memory"),
            NodeIdStrategy::NewestCreateIndex,
            5,
            None,
        )
        .unwrap();

        assert_eq!(sel.nodes.len(), 2);
        assert_eq!(sel.requested, 5);
        assert_eq!(sel.available, 2);
        assert!(sel.is_degraded());
    }

    #[test]
    fn only_matching_pool_is_considered() {
        let mut nodes = pool_of(&[("a", 1), ("b", 2)]);
        nodes.push(node("other", "batch", 99));

        let sel = select(
            &nodes,
            &PoolIdentifier::class("high-memory"),
            NodeIdStrategy::NewestCreateIndex,
            3,
            None,
        )
        .unwrap();
        assert_eq!(ids(&sel.nodes), vec!["b", "a"]);
    }

    #[test]
    fn datacenter_pool() {
        let mut nodes = pool_of(&[("a", 1)]);
        let mut remote = node("b", "high-memory", 2);
        remote.datacenter = "dc2".to_string();
        nodes.push(remote);

        let sel = select(
            &nodes,
            &PoolIdentifier::datacenter("dc2"),
            NodeIdStrategy::NewestCreateIndex,
            2,
            None,
        )
        .unwrap();
        assert_eq!(ids(&sel.nodes), vec!["b"]);
    }

    #[test]
    fn self_node_is_excluded() {
        let nodes = pool_of(&[("a", 1), ("self", 9)]);
        let sel = select(
            &nodes,
            &PoolIdentifier::class("high-memory"),
            NodeIdStrategy::NewestCreateIndex,
            2,
            Some("self"),
        )
        .unwrap();
        assert_eq!(ids(&sel.nodes), vec!["a"]);
        assert_eq!(sel.available, 1);
    }

    #[test]
    fn excluding_only_node_is_no_eligible_nodes() {
        let nodes = pool_of(&[("self", 1)]);
        let err = select(
            &nodes,
            &PoolIdentifier::class("high-memory"),
            NodeIdStrategy::NewestCreateIndex,
            1,
            Some("self"),
        )
        .unwrap_err();
        assert!(matches!(err, ScaleInError::NoEligibleNodes { .. }));
    }

    #[test]
    fn excluding_absent_id_leaves_set_unchanged() {
        let nodes = pool_of(&[("a", 1), ("b", 2)]);
        assert_eq!(filter_out_node_id(nodes.clone(), Some("missing")), nodes);
        assert_eq!(filter_out_node_id(nodes.clone(), Some("")), nodes);
        assert_eq!(filter_out_node_id(nodes.clone(), None), nodes);

        let once = filter_out_node_id(nodes.clone(), Some("a"));
        let twice = filter_out_node_id(once.clone(), Some("a"));
        assert_eq!(once, twice);
    }

    #[test]
    fn draining_nodes_are_skipped() {
        let mut nodes = pool_of(&[("a", 1), ("b", 2)]);
        nodes[1].drain = true;

        let sel = select(
            &nodes,
            &PoolIdentifier::class("high-memory"),
            NodeIdStrategy::NewestCreateIndex,
            2,
            None,
        )
        .unwrap();
        assert_eq!(ids(&sel.nodes), vec!["a"]);
    }

    #[test]
    fn zero_count_selects_nothing() {
        let nodes = pool_of(&[("a", 1)]);
        let sel = select(
            &nodes,
            &PoolIdentifier::class("high-memory"),
            NodeIdStrategy::NewestCreateIndex,
            0,
            None,
        )
        .unwrap();
        assert!(sel.nodes.is_empty());
        assert!(!sel.is_degraded());
    }
}
