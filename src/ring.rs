use crate::{
    error::{Error, Result},
    graph::{BondType, VertexIx},
};

/// A closed ring: the vertices of its path from head to tail, plus the type of
/// the chord that joins the two ring-closing ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ring {
    vertices: Vec<VertexIx>,
    bond: BondType,
}

impl Ring {
    pub fn new(vertices: Vec<VertexIx>, bond: BondType) -> Result<Self> {
        if vertices.len() < 2 {
            return Err(Error::structural(format!(
                "a ring needs at least two vertices, got {}",
                vertices.len()
            )));
        }
        Ok(Self { vertices, bond })
    }

    pub fn vertices(&self) -> &[VertexIx] {
        &self.vertices
    }

    pub fn head(&self) -> VertexIx {
        self.vertices[0]
    }

    pub fn tail(&self) -> VertexIx {
        self.vertices[self.vertices.len() - 1]
    }

    pub fn bond(&self) -> BondType {
        self.bond
    }

    /// Number of vertices, never less than two.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn contains(&self, v: VertexIx) -> bool {
        self.vertices.contains(&v)
    }

    pub fn has_end(&self, v: VertexIx) -> bool {
        self.head() == v || self.tail() == v
    }

    /// Same pair of ends, in either direction.
    pub fn has_same_ends(&self, other: &Ring) -> bool {
        (self.head() == other.head() && self.tail() == other.tail())
            || (self.head() == other.tail() && self.tail() == other.head())
    }
}

/// Two ring sets are the same iff they have the same size and every ring of
/// `a` has the same ends as some ring of `b`.
pub fn are_same_rings_set(a: &[Ring], b: &[Ring]) -> bool {
    a.len() == b.len() && a.iter().all(|r| b.iter().any(|s| r.has_same_ends(s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: usize) -> VertexIx {
        VertexIx::new(i)
    }

    fn ring(ends: (usize, usize)) -> Ring {
        Ring::new(vec![v(ends.0), v(0), v(ends.1)], BondType::Single).unwrap()
    }

    #[test]
    fn too_short_ring() {
        assert!(Ring::new(vec![], BondType::Single).is_err());
        assert!(Ring::new(vec![v(1)], BondType::Single).is_err());
        assert_eq!(Ring::new(vec![v(1), v(2)], BondType::Single).unwrap().len(), 2);
    }

    #[test]
    fn ring_sets_ignore_direction_and_order() {
        let a = vec![ring((1, 2)), ring((3, 4))];
        let b = vec![ring((4, 3)), ring((2, 1))];
        assert!(are_same_rings_set(&a, &b));

        let c = vec![ring((1, 3)), ring((2, 4))];
        assert!(!are_same_rings_set(&a, &c));
        assert!(!are_same_rings_set(&a, &a[..1]));
    }
}
