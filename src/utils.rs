use std::collections::VecDeque;

use petgraph::{
    graph::{Graph, IndexType, NodeIndex},
    Undirected,
};

/// Neighbors of `n` in increasing index order, so that every traversal below
/// is deterministic regardless of edge insertion order.
pub fn sorted_neighbors<N, E, Ix>(g: &Graph<N, E, Undirected, Ix>, n: NodeIndex<Ix>) -> Vec<NodeIndex<Ix>>
where
    Ix: IndexType,
{
    let mut nbrs: Vec<_> = g.neighbors(n).collect();
    nbrs.sort();
    nbrs.dedup();
    nbrs
}

/// Number of bonds on a shortest path from `source` to every node, or `None`
/// for nodes that cannot be reached.
pub fn bfs_distances<N, E, Ix>(g: &Graph<N, E, Undirected, Ix>, source: NodeIndex<Ix>) -> Vec<Option<usize>>
where
    Ix: IndexType,
{
    let mut dist = vec![None; g.node_count()];
    if source.index() >= dist.len() {
        return dist;
    }
    dist[source.index()] = Some(0);
    let mut queue = VecDeque::from([source]);
    while let Some(u) = queue.pop_front() {
        let du = dist[u.index()].unwrap_or(0);
        for v in g.neighbors(u) {
            if dist[v.index()].is_none() {
                dist[v.index()] = Some(du + 1);
                queue.push_back(v);
            }
        }
    }
    dist
}

/// Shortest path from `from` to `to` (both included) that only steps on nodes
/// accepted by `allowed`. The endpoints are always accepted. Ties are broken
/// towards lower node indices.
pub fn bfs_path<N, E, Ix, F>(
    g: &Graph<N, E, Undirected, Ix>,
    from: NodeIndex<Ix>,
    to: NodeIndex<Ix>,
    allowed: F,
) -> Option<Vec<NodeIndex<Ix>>>
where
    Ix: IndexType,
    F: Fn(NodeIndex<Ix>) -> bool,
{
    let n = g.node_count();
    if from.index() >= n || to.index() >= n {
        return None;
    }

    let mut pred: Vec<Option<NodeIndex<Ix>>> = vec![None; n];
    let mut seen = vec![false; n];
    seen[from.index()] = true;
    let mut queue = VecDeque::from([from]);
    while let Some(u) = queue.pop_front() {
        if u == to {
            break;
        }
        for v in sorted_neighbors(g, u) {
            if seen[v.index()] || (v != to && !allowed(v)) {
                continue;
            }
            seen[v.index()] = true;
            pred[v.index()] = Some(u);
            queue.push_back(v);
        }
    }

    if !seen[to.index()] {
        return None;
    }

    // Walk the predecessor chain back to the source.
    let mut path = vec![to];
    let mut cur = to;
    while cur != from {
        cur = pred[cur.index()]?;
        path.push(cur);
    }
    path.reverse();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> Graph<(), (), Undirected, u32> {
        // 0-1-2-3 with a shortcut 0-4-3
        let mut g = Graph::default();
        let n: Vec<_> = (0..5).map(|_| g.add_node(())).collect();
        g.add_edge(n[0], n[1], ());
        g.add_edge(n[1], n[2], ());
        g.add_edge(n[2], n[3], ());
        g.add_edge(n[0], n[4], ());
        g.add_edge(n[4], n[3], ());
        g
    }

    #[test]
    fn distances_follow_shortcut() {
        let g = ladder();
        let d = bfs_distances(&g, NodeIndex::new(0));
        assert_eq!(d, vec![Some(0), Some(1), Some(2), Some(2), Some(1)]);
    }

    #[test]
    fn path_respects_allowed_nodes() {
        let g = ladder();
        let short = bfs_path(&g, NodeIndex::new(0), NodeIndex::new(3), |_| true).unwrap();
        assert_eq!(short.len(), 3);

        let long = bfs_path(&g, NodeIndex::new(0), NodeIndex::new(3), |n| n.index() != 4).unwrap();
        let ids: Vec<_> = long.iter().map(|n| n.index()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn unreachable_target() {
        let mut g = ladder();
        let lonely = g.add_node(());
        assert!(bfs_path(&g, NodeIndex::new(0), lonely, |_| true).is_none());
        assert_eq!(bfs_distances(&g, NodeIndex::new(0))[lonely.index()], None);
    }
}
