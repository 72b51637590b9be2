//! Parameters of the ring-closure engine.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    closability::ClosabilityMode,
    error::{Error, Result},
    geometry::{ClosureStrategy, ClosureTolerances},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RingClosureParameters {
    /// How candidate chords are judged closable.
    pub mode: ClosabilityMode,
    /// Chains with more atoms than this + 2 skip the torsional search.
    pub max_rotatable_bonds: usize,
    pub max_ring_size: usize,
    /// `[size, weight]` pairs; sizes not listed get weight 0.
    pub ring_size_bias: Vec<(usize, u32)>,
    /// Bond angles at or above this (degrees) freeze the adjacent torsions.
    pub linearity_limit: f64,
    pub distance_tolerance: f64,
    pub extra_distance_tolerance: f64,
    pub max_dot_product: f64,
    /// Torsion increment in degrees.
    pub torsion_step: f64,
    pub closure_strategy: ClosureStrategy,
    pub exhaustive_search: bool,
    pub check_interdependent_chains: bool,
    pub max_ring_closures: usize,
    /// Element symbols that must lie on the ring path.
    pub required_ring_elements: Vec<String>,
    /// Named patterns handed to the pattern matcher.
    pub constitutional_patterns: BTreeMap<String, String>,
    /// Attachment-point class -> classes it may close a ring with.
    pub rc_compatibility: BTreeMap<String, Vec<String>>,
    pub metal_coordinating_classes: Vec<String>,
    pub archive_index: Option<PathBuf>,
    pub archive_folder: Option<PathBuf>,
}

impl Default for RingClosureParameters {
    fn default() -> Self {
        Self {
            mode: ClosabilityMode::RingSize,
            max_rotatable_bonds: 7,
            max_ring_size: 9,
            ring_size_bias: vec![(5, 2), (6, 4), (7, 1)],
            linearity_limit: 178.5,
            distance_tolerance: 0.33,
            extra_distance_tolerance: 1.1,
            max_dot_product: -0.75,
            torsion_step: 12.0,
            closure_strategy: ClosureStrategy::BondOverlap,
            exhaustive_search: false,
            check_interdependent_chains: false,
            max_ring_closures: 50,
            required_ring_elements: Vec::new(),
            constitutional_patterns: BTreeMap::new(),
            rc_compatibility: BTreeMap::new(),
            metal_coordinating_classes: Vec::new(),
            archive_index: None,
            archive_folder: None,
        }
    }
}

impl RingClosureParameters {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::configuration(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if !(self.torsion_step > 0.0 && self.torsion_step <= 360.0) {
            return Err(Error::configuration(format!(
                "torsion step must be in (0, 360], got {}",
                self.torsion_step
            )));
        }
        if !(self.linearity_limit > 0.0 && self.linearity_limit <= 180.0) {
            return Err(Error::configuration(format!(
                "linearity limit must be in (0, 180], got {}",
                self.linearity_limit
            )));
        }
        if self.distance_tolerance < 0.0 || self.extra_distance_tolerance < 0.0 {
            return Err(Error::configuration("distance tolerances must not be negative"));
        }
        if let Some((size, _)) = self
            .ring_size_bias
            .iter()
            .find(|(size, _)| *size > self.max_ring_size)
        {
            return Err(Error::configuration(format!(
                "ring size bias lists size {size} beyond the maximum ring size {}",
                self.max_ring_size
            )));
        }
        Ok(())
    }

    /// Validate, resolve dependent switches, and prepare the archive folder.
    pub fn checked(mut self) -> Result<Self> {
        self.validate()?;
        if self.check_interdependent_chains && !self.exhaustive_search {
            warn!("interdependent chain checking requires exhaustive torsional search; enabling it");
            self.exhaustive_search = true;
        }
        if let Some(folder) = &self.archive_folder {
            fs::create_dir_all(folder)?;
        }
        Ok(self)
    }

    /// Weight of rings of `size` atoms.
    pub fn bias_for(&self, size: usize) -> u32 {
        if size > self.max_ring_size {
            return 0;
        }
        self.ring_size_bias
            .iter()
            .rev()
            .find(|(s, _)| *s == size)
            .map_or(0, |(_, w)| *w)
    }

    pub fn tolerances(&self) -> ClosureTolerances {
        ClosureTolerances {
            strategy: self.closure_strategy,
            distance_factor: self.distance_tolerance,
            extra_factor: self.extra_distance_tolerance,
            max_dot: self.max_dot_product,
        }
    }

    /// Whether two attachment-point classes may be joined by a ring. An empty
    /// compatibility map allows everything.
    pub fn classes_compatible(&self, a: Option<&str>, b: Option<&str>) -> bool {
        if self.rc_compatibility.is_empty() {
            return true;
        }
        let (Some(a), Some(b)) = (a, b) else {
            return false;
        };
        let listed = |x: &str, y: &str| {
            self.rc_compatibility
                .get(x)
                .is_some_and(|partners| partners.iter().any(|p| p == y))
        };
        listed(a, b) || listed(b, a)
    }

    pub fn is_metal_coordinating(&self, class: Option<&str>) -> bool {
        class.is_some_and(|c| self.metal_coordinating_classes.iter().any(|m| m == c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let p = RingClosureParameters::from_toml_str("").unwrap();
        assert_eq!(p, RingClosureParameters::default());
        assert_eq!(p.bias_for(6), 4);
        assert_eq!(p.bias_for(8), 0);
        assert_eq!(p.bias_for(12), 0);
    }

    #[test]
    fn toml_overrides() {
        let p = RingClosureParameters::from_toml_str(
            r#"
            mode = "both"
            torsion-step = 1.0
            "#,
        );
        assert!(p.is_err(), "field names are snake_case");

        let p = RingClosureParameters::from_toml_str(
            r#"
            mode = "geometry"
            closure_strategy = "bond-complementarity"
            ring_size_bias = [[5, 1], [6, 1]]
            check_interdependent_chains = true

            [rc_compatibility]
            "a:0" = ["b:0"]
            "#,
        )
        .unwrap();
        assert_eq!(p.mode, ClosabilityMode::Geometry);
        assert_eq!(p.closure_strategy, ClosureStrategy::BondComplementarity);
        assert_eq!(p.bias_for(5), 1);
        assert!(p.classes_compatible(Some("b:0"), Some("a:0")));
        assert!(!p.classes_compatible(Some("a:0"), Some("a:0")));
        assert!(!p.classes_compatible(None, Some("a:0")));

        let p = p.checked().unwrap();
        assert!(p.exhaustive_search);
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let p = RingClosureParameters {
            torsion_step: 0.0,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(Error::Configuration(_))));

        let p = RingClosureParameters {
            max_ring_size: 6,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(Error::Configuration(_))));

        assert!(matches!(
            RingClosureParameters::from_toml_str("mode = \"sometimes\""),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn checked_creates_archive_folder() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("blobs");
        let p = RingClosureParameters {
            archive_folder: Some(folder.clone()),
            ..Default::default()
        };
        p.checked().unwrap();
        assert!(folder.is_dir());
    }
}
