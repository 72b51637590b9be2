use bit_set::BitSet;

/// Symmetric compatibility relation over the ring-closing vertices of one
/// search, stored as one adjacency bit set per vertex position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatGraph {
    graph: Vec<BitSet>,
}

impl CompatGraph {
    pub fn new(size: usize) -> Self {
        // Initialize empty graph
        let mut graph = Vec::with_capacity(size);
        for _ in 0..size {
            graph.push(BitSet::with_capacity(size));
        }
        Self { graph }
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn connect(&mut self, v: usize, u: usize) {
        self.graph[v].insert(u);
        self.graph[u].insert(v);
    }

    pub fn disconnect(&mut self, v: usize, u: usize) {
        self.graph[v].remove(u);
        self.graph[u].remove(v);
    }

    /// Drop every pair involving `v`.
    pub fn isolate(&mut self, v: usize) {
        let nbrs: Vec<usize> = self.graph[v].iter().collect();
        for u in nbrs {
            self.disconnect(v, u);
        }
    }

    pub fn degree(&self, v: usize, subgraph: &BitSet) -> usize {
        self.graph[v].intersection(subgraph).count()
    }

    pub fn compatible_with(&self, v: usize) -> &BitSet {
        &self.graph[v]
    }

    pub fn neighbors(&self, v: usize, subgraph: &BitSet) -> BitSet {
        let mut neighbors = self.graph[v].clone();
        neighbors.intersect_with(subgraph);

        neighbors
    }

    /// Neighbors of `v` with a larger position, restricted to `subgraph`.
    pub fn forward_neighbors(&self, v: usize, subgraph: &BitSet) -> BitSet {
        let mut neighbors = self.neighbors(v, subgraph);
        let behind: Vec<usize> = neighbors.iter().take_while(|u| *u <= v).collect();
        for u in behind {
            neighbors.remove(u);
        }

        neighbors
    }

    pub fn are_adjacent(&self, v: usize, u: usize) -> bool {
        self.graph[v].contains(u)
    }

    /// Every compatible pair `(v, u)` with `v < u`, in lexicographic order.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let all: BitSet = (0..self.len()).collect();
        (0..self.len())
            .flat_map(|v| self.forward_neighbors(v, &all).iter().map(move |u| (v, u)).collect::<Vec<_>>())
            .collect()
    }
}
