use bit_set::BitSet;

/// One node of the matching search over ring-closing vertices.
///
/// Positions below `next` have been decided (either paired or left open);
/// `used` holds the positions already taken by a chosen pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingState {
    next: usize,
    used: BitSet,
    pairs: Vec<(usize, usize)>,
}

impl MatchingState {
    pub fn new(size: usize) -> Self {
        Self {
            next: 0,
            used: BitSet::with_capacity(size),
            pairs: Vec::new(),
        }
    }

    /// Leave the current position unpaired and move on.
    pub fn skip(&self) -> Self {
        Self {
            next: self.next + 1,
            used: self.used.clone(),
            pairs: self.pairs.clone(),
        }
    }

    /// Pair the current position with `partner`.
    pub fn update(&self, partner: usize) -> Self {
        Self {
            next: self.next + 1,
            used: {
                let mut clone = self.used.clone();
                clone.insert(self.next);
                clone.insert(partner);
                clone
            },
            pairs: {
                let mut clone = self.pairs.clone();
                clone.push((self.next, partner));
                clone
            },
        }
    }

    pub fn next(&self) -> usize {
        self.next
    }

    pub fn used(&self) -> &BitSet {
        &self.used
    }

    pub fn is_used(&self, v: usize) -> bool {
        self.used.contains(v)
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }
}
