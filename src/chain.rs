//! Canonical text identity of a ring-closing chain.
//!
//! A chain lists, for each building block strictly between the two
//! ring-closing vertices, its id, its type and the attachment points the path
//! enters and leaves through. Equivalent chains (the same ring read in the
//! other direction or starting from another block) share one archive entry,
//! so a chain also knows all its alternative identifiers.
//!
//! The identifier format is `id/TYPE/apXapY_` per block followed by `%` and
//! the position of the turning point, or `-1` if there is none.

use std::{fmt::Display, str::FromStr};

use crate::graph::{BBType, BuildingBlock};

/// Thrown by [`ClosableChain::from_str`] for malformed chain identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChainError(pub String);

impl Display for ParseChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed chain identifier: {}", self.0)
    }
}

impl std::error::Error for ParseChainError {}

/// One building block of a chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChainLink {
    pub bb_id: usize,
    pub bb_type: BBType,
    pub ap_left: usize,
    pub ap_right: usize,
}

impl ChainLink {
    pub fn new(bb_id: usize, bb_type: BBType, ap_left: usize, ap_right: usize) -> Self {
        Self {
            bb_id,
            bb_type,
            ap_left,
            ap_right,
        }
    }

    /// The same link walked in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            ap_left: self.ap_right,
            ap_right: self.ap_left,
            ..*self
        }
    }
}

impl Display for ChainLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/ap{}ap{}",
            self.bb_id, self.bb_type, self.ap_left, self.ap_right
        )
    }
}

impl FromStr for ChainLink {
    type Err = ParseChainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseChainError(s.to_owned());
        let mut parts = s.split('/');
        let (Some(id), Some(kind), Some(aps), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(err());
        };
        let (left, right) = aps
            .strip_prefix("ap")
            .and_then(|rest| rest.split_once("ap"))
            .ok_or_else(err)?;
        Ok(Self {
            bb_id: id.parse().map_err(|_| err())?,
            bb_type: kind.parse().map_err(|_| err())?,
            ap_left: left.parse().map_err(|_| err())?,
            ap_right: right.parse().map_err(|_| err())?,
        })
    }
}

/// Sequence of chain links plus the position of the turning point, i.e., the
/// common ancestor where the path switches from climbing to descending.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClosableChain {
    links: Vec<ChainLink>,
    turning_point: Option<usize>,
}

impl ClosableChain {
    pub fn new(links: Vec<ChainLink>, turning_point: Option<usize>) -> Self {
        Self {
            links,
            turning_point,
        }
    }

    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn turning_point(&self) -> Option<usize> {
        self.turning_point
    }

    /// Building-block id of the turning point.
    pub fn turning_point_bb_id(&self) -> Option<usize> {
        self.turning_point
            .and_then(|tp| self.links.get(tp))
            .map(|l| l.bb_id)
    }

    pub fn reversed(&self) -> Self {
        let n = self.links.len();
        Self {
            links: self.links.iter().rev().map(ChainLink::reversed).collect(),
            turning_point: self.turning_point.map(|tp| n - 1 - tp),
        }
    }

    /// The same cycle read starting from link `k`.
    pub fn rotated(&self, k: usize) -> Self {
        let n = self.links.len();
        if n == 0 {
            return self.clone();
        }
        let k = k % n;
        let mut links = self.links.clone();
        links.rotate_left(k);
        Self {
            links,
            turning_point: self.turning_point.map(|tp| (tp + n - k) % n),
        }
    }

    /// All identifiers under which this chain may have been archived, forward
    /// and reverse first, without duplicates.
    pub fn alternative_ids(&self) -> Vec<String> {
        let reverse = self.reversed();
        let mut ids: Vec<String> = Vec::with_capacity(2 * self.links.len().max(1));
        let n = self.links.len().max(1);
        for k in 0..n {
            for id in [self.rotated(k).to_string(), reverse.rotated(k).to_string()] {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// Position of the first link made of building block `bb`, if any.
    pub fn involves_vertex(&self, bb: &BuildingBlock) -> Option<usize> {
        self.links
            .iter()
            .position(|l| l.bb_id == bb.id() && l.bb_type == bb.kind())
    }

    /// Position of the first link made of `bb` and entered/left through the
    /// attachment points `ap_a` and `ap_b`, in either order.
    pub fn involves_vertex_and_ap(&self, bb: &BuildingBlock, ap_a: usize, ap_b: usize) -> Option<usize> {
        self.links.iter().position(|l| {
            l.bb_id == bb.id()
                && l.bb_type == bb.kind()
                && ((l.ap_left == ap_a && l.ap_right == ap_b)
                    || (l.ap_left == ap_b && l.ap_right == ap_a))
        })
    }
}

impl Display for ClosableChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for link in &self.links {
            write!(f, "{link}_")?;
        }
        match self.turning_point {
            Some(tp) => write!(f, "%{tp}"),
            None => write!(f, "%-1"),
        }
    }
}

impl FromStr for ClosableChain {
    type Err = ParseChainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseChainError(s.to_owned());
        let (body, tp) = s.rsplit_once('%').ok_or_else(err)?;
        let tp: i64 = tp.parse().map_err(|_| err())?;
        let links = body
            .split('_')
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<ChainLink>, _>>()?;
        let turning_point = match usize::try_from(tp) {
            Ok(tp) if tp < links.len() => Some(tp),
            Ok(_) => return Err(err()),
            Err(_) => None,
        };
        Ok(Self::new(links, turning_point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClosableChain {
        ClosableChain::new(
            vec![
                ChainLink::new(4, BBType::Fragment, 0, 1),
                ChainLink::new(7, BBType::Scaffold, 2, 0),
                ChainLink::new(4, BBType::Fragment, 1, 0),
            ],
            Some(1),
        )
    }

    #[test]
    fn identifier_format() {
        assert_eq!(
            sample().to_string(),
            "4/FRAGMENT/ap0ap1_7/SCAFFOLD/ap2ap0_4/FRAGMENT/ap1ap0_%1"
        );
        let bare = ClosableChain::new(vec![], None);
        assert_eq!(bare.to_string(), "%-1");
    }

    #[test]
    fn parse_inverts_display() {
        let chain = sample();
        let parsed: ClosableChain = chain.to_string().parse().unwrap();
        assert_eq!(parsed, chain);
        assert_eq!(parsed.turning_point_bb_id(), Some(7));
        assert!("4/FRAGMENT/ap0_%0".parse::<ClosableChain>().is_err());
        assert!("4/FRAGMENT/ap0ap1_%3".parse::<ClosableChain>().is_err());
    }

    #[test]
    fn reverse_swaps_aps_and_moves_turning_point() {
        let rev = sample().reversed();
        assert_eq!(rev.links()[0], ChainLink::new(4, BBType::Fragment, 0, 1));
        assert_eq!(rev.links()[1], ChainLink::new(7, BBType::Scaffold, 0, 2));
        assert_eq!(rev.turning_point(), Some(1));
        assert_eq!(rev.reversed(), sample());
    }

    #[test]
    fn alternatives_start_with_forward_then_reverse() {
        let chain = sample();
        let alts = chain.alternative_ids();
        assert_eq!(alts[0], chain.to_string());
        assert_eq!(alts[1], chain.reversed().to_string());
        assert!(alts.contains(&chain.rotated(2).to_string()));
        assert!(alts.len() <= 6);
        for id in &alts {
            let other: ClosableChain = id.parse().unwrap();
            assert_eq!(other.turning_point_bb_id(), Some(7));
        }
    }

    #[test]
    fn involvement_queries() {
        let chain = sample();
        let scaffold = BuildingBlock::Fragment {
            id: 7,
            kind: BBType::Scaffold,
        };
        let stranger = BuildingBlock::Fragment {
            id: 7,
            kind: BBType::Fragment,
        };
        assert_eq!(chain.involves_vertex(&scaffold), Some(1));
        assert_eq!(chain.involves_vertex(&stranger), None);
        assert_eq!(chain.involves_vertex_and_ap(&scaffold, 0, 2), Some(1));
        assert_eq!(chain.involves_vertex_and_ap(&scaffold, 1, 2), None);
    }
}
